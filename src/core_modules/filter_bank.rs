// THEORY:
// The `EdgeFilterBank` is the orchestrator of the filtering layer. It is not a filter
// itself; it owns an immutable `FilterConfiguration`, runs the individual filters in
// order, and turns their output into a binary edge map.
//
// Stage order for one frame:
// 1.  **Grayscale**: color frame -> intensity grid.
// 2.  **Gaussian Blur**: suppresses sensor noise (shrinks by `radius` per side).
// 3.  **Adaptive Blur** (optional): gradient-weighted smoothing that flattens what
//     noise survived without softening real edges (shrinks by 4 per side).
// 4.  **Sobel Gradients**: horizontal and vertical responses (shrinks by 2 per side).
// 5.  **Magnitude**: `sqrt(gx^2 + gy^2)` per pixel.
// 6.  **Double Threshold**: a statistical high threshold,
//     `mean + number_deviations * stddev`, and a low threshold `fract * high`. Strong
//     pixels are edges outright; weak pixels become edges only when 8-connected to a
//     strong one.
//
// Every grid is offered to a fresh `ResultAccumulator`, which is returned to the
// caller. The accumulator is the only way intermediate artifacts leave the bank.

use crate::core_modules::adaptive;
use crate::core_modules::gaussian::{self, GaussianKernel, SeparableMode};
use crate::core_modules::grayscale;
use crate::core_modules::pixel_grid::{EdgeMap, PixelGrid};
use crate::core_modules::results::{FilterStage, ResultAccumulator};
use crate::core_modules::sobel;
use crate::error::{MotionError, Result};
use image::RgbImage;

/// Value written to edge pixels in the final edge map.
pub const EDGE: i32 = 255;

/// Immutable options for one `EdgeFilterBank`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfiguration {
    /// Record every intermediate grid in the `ResultAccumulator`.
    pub enable_intermediate_results: bool,
    /// Gaussian kernel radius; the kernel is `2 * radius + 1` taps wide.
    pub gaussian_radius: usize,
    /// Standard deviation of the Gaussian kernel.
    pub gaussian_intensity: f64,
    /// Standard deviations above the mean magnitude for the high threshold.
    pub number_deviations: f64,
    /// The low threshold as a fraction of the high threshold.
    pub fract: f64,
    /// Run the adaptive blur between the Gaussian blur and the Sobel stage.
    pub adaptive_smoothing: bool,
    /// Chain the Gaussian vertical pass from the horizontal pass. When false the
    /// legacy single-direction behavior is used.
    pub separable_gaussian: bool,
}

impl Default for FilterConfiguration {
    fn default() -> Self {
        Self {
            enable_intermediate_results: false,
            gaussian_radius: 7,
            gaussian_intensity: 1.5,
            number_deviations: 1.0,
            fract: 0.04,
            adaptive_smoothing: true,
            separable_gaussian: true,
        }
    }
}

impl FilterConfiguration {
    pub fn validate(&self) -> Result<()> {
        if self.gaussian_radius == 0 {
            return Err(MotionError::InvalidConfig("gaussian_radius must be at least 1".into()));
        }
        if !self.gaussian_intensity.is_finite() || self.gaussian_intensity <= 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "gaussian_intensity must be positive, got {}",
                self.gaussian_intensity
            )));
        }
        if !self.number_deviations.is_finite() {
            return Err(MotionError::InvalidConfig("number_deviations must be finite".into()));
        }
        if !self.fract.is_finite() || self.fract < 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "fract must be a non-negative fraction, got {}",
                self.fract
            )));
        }
        Ok(())
    }
}

/// Runs the configured filter stages and produces binary edge maps.
#[derive(Debug, Clone)]
pub struct EdgeFilterBank {
    config: FilterConfiguration,
    kernel: GaussianKernel,
}

impl EdgeFilterBank {
    pub fn new(config: FilterConfiguration) -> Result<Self> {
        config.validate()?;
        let kernel = GaussianKernel::new(config.gaussian_radius, config.gaussian_intensity)?;
        Ok(Self { config, kernel })
    }

    pub fn config(&self) -> &FilterConfiguration {
        &self.config
    }

    /// Pixels lost on each side of the frame between input and edge map.
    pub fn border(&self) -> u32 {
        let adaptive_margin = if self.config.adaptive_smoothing { adaptive::MARGIN } else { 0 };
        self.config.gaussian_radius as u32 + adaptive_margin + sobel::MARGIN
    }

    /// Smallest frame side length that leaves at least one edge-map pixel.
    pub fn min_frame_size(&self) -> u32 {
        2 * self.border() + 1
    }

    /// Runs every stage on `frame`.
    pub fn detect_edges(&self, frame: &RgbImage) -> Result<ResultAccumulator> {
        self.check_frame_size(frame.width(), frame.height())?;
        self.detect_edges_in_grid(grayscale::from_rgb_image(frame))
    }

    /// Runs every stage after grayscale conversion on an intensity grid.
    pub fn detect_edges_in_grid(&self, gray: PixelGrid) -> Result<ResultAccumulator> {
        self.check_frame_size(gray.width(), gray.height())?;
        let mut results = ResultAccumulator::new(self.config.enable_intermediate_results);
        results.save_intermediate(FilterStage::Grayscale, &gray);

        let mode = if self.config.separable_gaussian {
            SeparableMode::Chained
        } else {
            SeparableMode::Legacy
        };
        let mut smoothed = gaussian::blur(&gray, &self.kernel, mode)?;
        results.save_intermediate(FilterStage::GaussianBlur, &smoothed);

        if self.config.adaptive_smoothing {
            smoothed = adaptive::blur(&smoothed)?;
            results.save_intermediate(FilterStage::AdaptiveBlur, &smoothed);
        }

        let (gx, gy) = sobel::gradients(&smoothed)?;
        results.save_gradient(FilterStage::GradientX, &gx);
        results.save_gradient(FilterStage::GradientY, &gy);

        let magnitude: Vec<f64> = gx
            .as_slice()
            .iter()
            .zip(gy.as_slice())
            .map(|(&h, &v)| ((h as f64).powi(2) + (v as f64).powi(2)).sqrt())
            .collect();
        let magnitude_grid = PixelGrid::from_vec(
            gx.width(),
            gx.height(),
            magnitude.iter().map(|&m| m.round() as i32).collect(),
        )?;
        results.save_intermediate(FilterStage::Magnitude, &magnitude_grid);

        let (high, low) = self.thresholds(&magnitude);
        let edges = hysteresis(&magnitude, gx.width(), gx.height(), high, low)?;
        results.save_final(edges);

        Ok(results)
    }

    /// High and low thresholds for a magnitude field.
    fn thresholds(&self, magnitude: &[f64]) -> (f64, f64) {
        let count = magnitude.len() as f64;
        let mean = magnitude.iter().sum::<f64>() / count;
        let variance = magnitude.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / count;
        let high = mean + self.config.number_deviations * variance.sqrt();
        (high, self.config.fract * high)
    }

    fn check_frame_size(&self, width: u32, height: u32) -> Result<()> {
        let min = self.min_frame_size();
        if width < min || height < min {
            return Err(MotionError::FrameTooSmall {
                stage: "edge filter bank",
                width,
                height,
                min_width: min,
                min_height: min,
            });
        }
        Ok(())
    }
}

/// Marks strong pixels and every weak pixel 8-connected to one.
fn hysteresis(magnitude: &[f64], width: u32, height: u32, high: f64, low: f64) -> Result<EdgeMap> {
    let (w, h) = (width as i64, height as i64);
    // A flat field has high == 0; nothing there is an edge.
    let is_strong = |m: f64| m > 0.0 && m >= high;
    let is_weak = |m: f64| m > 0.0 && m >= low;

    let mut edges = vec![0i32; magnitude.len()];
    let mut stack: Vec<usize> = Vec::new();
    for (index, &m) in magnitude.iter().enumerate() {
        if is_strong(m) {
            edges[index] = EDGE;
            stack.push(index);
        }
    }

    while let Some(index) = stack.pop() {
        let (x, y) = ((index as i64) % w, (index as i64) / w);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    continue;
                }
                let neighbor = (ny * w + nx) as usize;
                if edges[neighbor] == 0 && is_weak(magnitude[neighbor]) {
                    edges[neighbor] = EDGE;
                    stack.push(neighbor);
                }
            }
        }
    }

    PixelGrid::from_vec(width, height, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn square_frame(size: u32, left: u32, top: u32, side: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x >= left && x < left + side && y >= top && y < top + side {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    #[test]
    fn border_accounts_for_every_stage() {
        let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        assert_eq!(bank.border(), 7 + 4 + 2);
        assert_eq!(bank.min_frame_size(), 27);

        let plain = EdgeFilterBank::new(FilterConfiguration {
            adaptive_smoothing: false,
            gaussian_radius: 2,
            ..FilterConfiguration::default()
        })
        .expect("valid config");
        assert_eq!(plain.border(), 4);
    }

    #[test]
    fn edge_map_has_the_shrunk_dimensions_and_is_binary() {
        let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        let frame = square_frame(64, 20, 20, 24);
        let results = bank.detect_edges(&frame).expect("large enough");

        let edges = results.final_edge_map().expect("final map is always saved");
        assert_eq!(edges.dimensions(), (64 - 26, 64 - 26));
        assert!(edges.as_slice().iter().all(|&v| v == 0 || v == EDGE));
        assert!(edges.as_slice().iter().any(|&v| v == EDGE));
    }

    #[test]
    fn edges_follow_the_square_outline() {
        let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        let frame = square_frame(64, 20, 20, 24);
        let edges = bank
            .detect_edges(&frame)
            .expect("large enough")
            .into_final_edge_map()
            .expect("final map is always saved");

        let border = bank.border();
        // Left side of the square, halfway down, in edge-map coordinates.
        assert_eq!(edges.get(20 - border, 32 - border), EDGE);
        // Middle of the square and far background are flat.
        assert_eq!(edges.get(32 - border, 32 - border), 0);
        assert_eq!(edges.get(0, 0), 0);
    }

    #[test]
    fn flat_frame_has_no_edges() {
        let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        let frame = RgbImage::from_pixel(40, 40, Rgb([90, 90, 90]));
        let edges = bank.detect_edges(&frame).expect("large enough");
        let map = edges.final_edge_map().expect("final map is always saved");
        assert!(map.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn intermediates_are_recorded_only_on_request() {
        let frame = square_frame(48, 15, 15, 16);

        let quiet = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        let results = quiet.detect_edges(&frame).expect("large enough");
        assert_eq!(results.results().len(), 1);

        let verbose = EdgeFilterBank::new(FilterConfiguration {
            enable_intermediate_results: true,
            ..FilterConfiguration::default()
        })
        .expect("valid config");
        let results = verbose.detect_edges(&frame).expect("large enough");
        let stages: Vec<FilterStage> = results.results().iter().map(|r| r.stage).collect();
        assert_eq!(
            stages,
            vec![
                FilterStage::Grayscale,
                FilterStage::GaussianBlur,
                FilterStage::AdaptiveBlur,
                FilterStage::GradientX,
                FilterStage::GradientY,
                FilterStage::Magnitude,
                FilterStage::EdgeMap,
            ]
        );
    }

    #[test]
    fn undersized_frames_are_rejected_before_filtering() {
        let bank = EdgeFilterBank::new(FilterConfiguration::default()).expect("valid config");
        let frame = RgbImage::new(26, 200);
        assert!(matches!(
            bank.detect_edges(&frame),
            Err(MotionError::FrameTooSmall { stage: "edge filter bank", .. })
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let bad = FilterConfiguration {
            fract: -0.5,
            ..FilterConfiguration::default()
        };
        assert!(matches!(EdgeFilterBank::new(bad), Err(MotionError::InvalidConfig(_))));
    }

    #[test]
    fn weak_pixels_survive_only_next_to_strong_ones() {
        // 5x1 magnitudes: strong, weak, gap, weak, weak.
        let magnitude = [10.0, 3.0, 0.0, 3.0, 3.0];
        let edges = hysteresis(&magnitude, 5, 1, 9.0, 2.0).expect("valid dimensions");
        assert_eq!(edges.as_slice(), &[EDGE, EDGE, 0, 0, 0]);
    }
}
