// THEORY:
// The `ResultAccumulator` is the only window into the filter bank's internals. The
// filter bank offers it every grid it produces; the accumulator keeps intermediates
// only when asked to, and always keeps the final edge map. It is handed back to the
// caller by value at the end of a run, so no stage state is ever shared or mutated
// from the outside.

use crate::core_modules::pixel_grid::{EdgeMap, PixelGrid};
use image::GrayImage;

/// Identifies which stage of the filter bank produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStage {
    Grayscale,
    GaussianBlur,
    AdaptiveBlur,
    GradientX,
    GradientY,
    Magnitude,
    EdgeMap,
}

/// A displayable snapshot of one stage's output.
#[derive(Debug, Clone)]
pub struct StageImage {
    pub stage: FilterStage,
    pub image: GrayImage,
}

/// Collects the images produced by one filter bank run.
#[derive(Debug, Clone)]
pub struct ResultAccumulator {
    intermediates_enabled: bool,
    results: Vec<StageImage>,
    final_edge_map: Option<EdgeMap>,
}

impl ResultAccumulator {
    pub fn new(intermediates_enabled: bool) -> Self {
        Self {
            intermediates_enabled,
            results: Vec::new(),
            final_edge_map: None,
        }
    }

    /// Records an intermediate grid, clamped into [0, 255], if intermediates are enabled.
    pub fn save_intermediate(&mut self, stage: FilterStage, grid: &PixelGrid) {
        if self.intermediates_enabled {
            self.results.push(StageImage {
                stage,
                image: grid.to_gray_image(),
            });
        }
    }

    /// Records a signed gradient field by magnitude, if intermediates are enabled.
    pub fn save_gradient(&mut self, stage: FilterStage, field: &PixelGrid) {
        if self.intermediates_enabled {
            self.results.push(StageImage {
                stage,
                image: field.to_abs_gray_image(),
            });
        }
    }

    /// Records the designated final edge map. Always kept, regardless of the flag.
    pub fn save_final(&mut self, edge_map: EdgeMap) {
        self.results.push(StageImage {
            stage: FilterStage::EdgeMap,
            image: edge_map.to_gray_image(),
        });
        self.final_edge_map = Some(edge_map);
    }

    pub fn intermediates_enabled(&self) -> bool {
        self.intermediates_enabled
    }

    /// Every recorded image in production order. The final edge map, once saved, is last.
    pub fn results(&self) -> &[StageImage] {
        &self.results
    }

    pub fn final_edge_map(&self) -> Option<&EdgeMap> {
        self.final_edge_map.as_ref()
    }

    /// Consumes the accumulator, yielding the final edge map.
    pub fn into_final_edge_map(self) -> Option<EdgeMap> {
        self.final_edge_map
    }

    /// Consumes the accumulator, yielding the recorded images and the final edge map.
    pub fn into_parts(self) -> (Vec<StageImage>, Option<EdgeMap>) {
        (self.results, self.final_edge_map)
    }
}
