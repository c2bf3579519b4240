// THEORY:
// This file is the main entry point for the `edge_motion` library crate.
// It defines the public API exposed to applications that feed video frames in and
// want annotated frames and bounding boxes out.
//
// The primary exports are the sequential `MotionPipeline`, its async counterpart
// `ParallelPipeline`, and the `PipelineConfig` that tunes both. The filter stages,
// differencer and contour merger under `core_modules` stay public so they can be
// used and tested on their own, but most callers never need to reach into them.

pub mod core_modules;
pub mod error;
pub mod frame_io;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod progress;

pub use crate::core_modules::bounding_box::BoundingBox;
pub use crate::core_modules::filter_bank::FilterConfiguration;
pub use crate::core_modules::frame_differencer::DiffPolicy;
pub use crate::core_modules::morphology::{MorphologicalOps, StructuringElement};
pub use crate::error::{MotionError, Result};
pub use crate::frame_io::{FrameSink, IterFrameSource, RawFrameSource};
pub use crate::parallel_pipeline::ParallelPipeline;
pub use crate::pipeline::{FrameReport, MotionPipeline, PipelineConfig, RunSummary};
pub use crate::progress::{NoProgress, ProgressBar, ProgressReporter};
