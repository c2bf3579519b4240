// THEORY:
// Every fallible operation in the engine reports through one error type. The
// variants map onto the three kinds of failure the engine knows about:
// 1.  **Precondition violations** (`DimensionMismatch`, `FrameTooSmall`,
//     `InvalidInput`): the caller handed us data the filters cannot work on.
//     These terminate processing; nothing is retried.
// 2.  **Configuration errors** (`InvalidConfig`): caught once, up front, by
//     `PipelineConfig::validate`.
// 3.  **Collaborator failures** (`Source`, `Sink`, `WorkerUnavailable`,
//     `ThreadPool`): the world outside the core went away.
// End-of-stream is not an error: it is a normal `Ok(None)` from the frame source.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {found_width}x{found_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },
    #[error("{stage}: {width}x{height} is smaller than the required {min_width}x{min_height}")]
    FrameTooSmall {
        stage: &'static str,
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("frame source error: {0}")]
    Source(String),
    #[error("frame sink error: {0}")]
    Sink(String),
    #[error("detection worker is no longer running")]
    WorkerUnavailable,
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, MotionError>;
