// THEORY:
// The `pipeline` module is the top-level, sequential API of the engine. It wires the
// core modules into the per-frame data flow and drives a whole stream from a frame
// source to a frame sink.
//
// Per-frame data flow:
// 1.  **Resize**: frames larger than `max_output_frame_size` are scaled down to it.
// 2.  **Edge Detection**: the `EdgeFilterBank` turns the frame into a binary edge map.
// 3.  **Temporal Difference**: the `FrameDifferencer` compares it with the oldest map
//     in its window and yields a motion mask.
// 4.  **Cleanup**: the mask is dilated, then optionally opened.
// 5.  **Spatial Grouping**: the `ContourMerger` extracts 8-connected contours on its
//     worker pool and drops those below `min_contour_pixel_count`.
// 6.  **Annotation**: each surviving contour's bounding box is mapped back from
//     edge-map to frame coordinates and drawn in green.
//
// Every piece of state except the merger's pool belongs to exactly one pipeline and
// is touched from one thread at a time.

use crate::core_modules::bounding_box::{self, BoundingBox};
use crate::core_modules::contour_merger::ContourMerger;
use crate::core_modules::filter_bank::{EdgeFilterBank, FilterConfiguration};
use crate::core_modules::frame_differencer::{DEFAULT_WINDOW_SIZE, DiffPolicy, FrameDifferencer};
use crate::core_modules::morphology::{ImageprocMorphology, MorphologicalOps, StructuringElement};
use crate::core_modules::results::StageImage;
use crate::error::{MotionError, Result};
use crate::frame_io::{FrameSink, RawFrameSource};
use crate::progress::ProgressReporter;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info, warn};
use std::time::Instant;

/// Color of the rectangles drawn around moving objects.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Configuration for the MotionPipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub filter: FilterConfiguration,
    /// Contours with fewer pixels than this are treated as noise.
    pub min_contour_pixel_count: usize,
    /// Number of edge maps kept by the differencer. The newest is compared with the
    /// oldest, so motion accumulates over `diff_frame_window_size - 1` frames.
    pub diff_frame_window_size: usize,
    pub diff_policy: DiffPolicy,
    /// Frames larger than this in either dimension are resized to exactly this size.
    pub max_output_frame_size: (u32, u32),
    pub structuring_element: StructuringElement,
    /// Open the mask after dilating it.
    pub open_mask: bool,
    /// Row-scan workers for the contour merger; `None` uses every CPU.
    pub workers: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfiguration::default(),
            min_contour_pixel_count: 500,
            diff_frame_window_size: DEFAULT_WINDOW_SIZE,
            diff_policy: DiffPolicy::default(),
            max_output_frame_size: (800, 600),
            structuring_element: StructuringElement::default(),
            open_mask: true,
            workers: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        if self.diff_frame_window_size < 2 {
            return Err(MotionError::InvalidConfig(format!(
                "diff_frame_window_size must be at least 2, got {}",
                self.diff_frame_window_size
            )));
        }
        let (width, height) = self.max_output_frame_size;
        if width == 0 || height == 0 {
            return Err(MotionError::InvalidConfig(format!(
                "max_output_frame_size must be non-zero, got {width}x{height}"
            )));
        }
        if self.workers == Some(0) {
            return Err(MotionError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything the pipeline learned about one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Zero-based position of the frame in the stream.
    pub frame_index: u64,
    /// The (possibly resized) frame with every box drawn on it.
    pub frame: RgbImage,
    /// Boxes around moving objects, in frame coordinates.
    pub boxes: Vec<BoundingBox>,
    /// Contours found before size filtering.
    pub contour_count: usize,
    /// Filter bank stage images. Only the edge map unless intermediate results are
    /// enabled.
    pub stages: Vec<StageImage>,
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub boxes_drawn: usize,
}

/// The sequential motion detection engine.
pub struct MotionPipeline {
    config: PipelineConfig,
    filter_bank: EdgeFilterBank,
    differencer: FrameDifferencer,
    merger: ContourMerger,
    morphology: Box<dyn MorphologicalOps + Send>,
    next_frame_index: u64,
}

impl MotionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_morphology(config, Box::new(ImageprocMorphology))
    }

    /// A pipeline that cleans masks with a caller-provided morphology implementation.
    pub fn with_morphology(
        config: PipelineConfig,
        morphology: Box<dyn MorphologicalOps + Send>,
    ) -> Result<Self> {
        config.validate()?;
        let filter_bank = EdgeFilterBank::new(config.filter.clone())?;
        let differencer = FrameDifferencer::new(config.diff_frame_window_size, config.diff_policy)?;
        let merger = match config.workers {
            Some(workers) => ContourMerger::with_workers(config.min_contour_pixel_count, workers)?,
            None => ContourMerger::new(config.min_contour_pixel_count)?,
        };
        debug!(
            "motion pipeline ready: border {}px, {} contour workers",
            filter_bank.border(),
            merger.workers()
        );
        Ok(Self {
            config,
            filter_bank,
            differencer,
            merger,
            morphology,
            next_frame_index: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.next_frame_index
    }

    /// Runs one frame through every stage and draws the resulting boxes on it.
    pub fn process_frame(&mut self, frame: RgbImage) -> Result<FrameReport> {
        let started = Instant::now();
        let mut frame = self.resize_if_needed(frame);

        let (stages, edge_map) = self.filter_bank.detect_edges(&frame)?.into_parts();
        let edge_map = edge_map.ok_or_else(|| {
            MotionError::InvalidInput("filter bank produced no edge map".into())
        })?;
        let edges_done = Instant::now();

        let mut mask = self.differencer.push(edge_map)?;
        mask = self.morphology.dilate(&mask, self.config.structuring_element);
        if self.config.open_mask {
            mask = self.morphology.open(&mask, self.config.structuring_element);
        }

        let contours = self.merger.scan(&mask);
        let contour_count = contours.len();
        let border = self.filter_bank.border();
        let boxes: Vec<BoundingBox> = contours
            .iter()
            .filter(|c| c.len() >= self.merger.min_pixel_count())
            .filter_map(bounding_box::from_contour)
            .map(|b| b.translate(border, border))
            .collect();
        annotate(&mut frame, &boxes);

        let frame_index = self.next_frame_index;
        self.next_frame_index += 1;
        debug!(
            "frame {}: edges in {:?}, total {:?}, {} contours, {} boxes",
            frame_index,
            edges_done - started,
            started.elapsed(),
            contour_count,
            boxes.len()
        );

        Ok(FrameReport {
            frame_index,
            frame,
            boxes,
            contour_count,
            stages,
        })
    }

    /// Processes `source` until end of stream, writing every annotated frame to `sink`.
    /// Stops at the first error; the sink is only finished after a complete run.
    pub fn run<S, K, P>(&mut self, source: &mut S, sink: &mut K, progress: &mut P) -> Result<RunSummary>
    where
        S: RawFrameSource + ?Sized,
        K: FrameSink + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        let mut summary = RunSummary::default();
        while let Some(frame) = source.next_frame()? {
            let report = self.process_frame(frame)?;
            summary.frames_processed += 1;
            summary.boxes_drawn += report.boxes.len();
            sink.write_frame(report.frame)?;
            progress.step();
        }
        sink.finish()?;
        info!(
            "motion detection finished: {} frames, {} boxes",
            summary.frames_processed, summary.boxes_drawn
        );
        Ok(summary)
    }

    fn resize_if_needed(&self, frame: RgbImage) -> RgbImage {
        let (max_width, max_height) = self.config.max_output_frame_size;
        if frame.width() <= max_width && frame.height() <= max_height {
            return frame;
        }
        warn!(
            "resizing {}x{} frame to {}x{}",
            frame.width(),
            frame.height(),
            max_width,
            max_height
        );
        imageops::resize(&frame, max_width, max_height, FilterType::Triangle)
    }
}

/// Draws each box as a one-pixel hollow rectangle with inclusive corners.
pub fn annotate(frame: &mut RgbImage, boxes: &[BoundingBox]) {
    for b in boxes {
        let rect = Rect::at(b.min_x as i32, b.min_y as i32).of_size(b.width() + 1, b.height() + 1);
        draw_hollow_rect_mut(frame, rect, BOX_COLOR);
    }
}
