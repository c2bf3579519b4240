// THEORY:
// The `ParallelPipeline` is the async front end of the engine. Detection itself is
// CPU-bound and never yields, so it cannot live on the async executor. Instead a
// single dedicated blocking worker owns a `MotionPipeline` and is fed `FrameTask`s
// over a bounded channel; each task carries a oneshot sender for its report.
//
// Key architectural principles:
// 1.  **Strict Ordering**: There is exactly one worker and one queue, so frames are
//     differenced and reported in submission order. Row-level parallelism happens
//     inside the worker, on the contour merger's pool.
// 2.  **Backpressure**: The task queue is bounded. A producer that outruns the worker
//     waits on `send` instead of buffering an unbounded number of frames.
// 3.  **Clean Shutdown**: Dropping the last sender ends the worker loop; `shutdown`
//     does that and then waits for the worker to exit.

use crate::error::{MotionError, Result};
use crate::frame_io::FrameSink;
use crate::pipeline::{FrameReport, MotionPipeline, PipelineConfig, RunSummary};
use crate::progress::ProgressReporter;
use futures::{Stream, StreamExt, pin_mut};
use image::RgbImage;
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const TASK_QUEUE_DEPTH: usize = 8;

/// One frame on its way to the worker, with the channel its report goes back on.
pub struct FrameTask {
    pub frame: RgbImage,
    pub reply: oneshot::Sender<Result<FrameReport>>,
}

pub struct ParallelPipeline {
    task_sender: mpsc::Sender<FrameTask>,
    worker: JoinHandle<()>,
}

impl ParallelPipeline {
    /// Builds the pipeline and starts its worker. Must be called from within a tokio
    /// runtime.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pipeline = MotionPipeline::new(config)?;
        let (task_sender, task_receiver) = mpsc::channel::<FrameTask>(TASK_QUEUE_DEPTH);
        let worker = tokio::task::spawn_blocking(move || run_worker(pipeline, task_receiver));
        Ok(Self { task_sender, worker })
    }

    /// Submits one frame and waits for its report.
    pub async fn process_frame(&self, frame: RgbImage) -> Result<FrameReport> {
        let (reply, report) = oneshot::channel();
        self.task_sender
            .send(FrameTask { frame, reply })
            .await
            .map_err(|_| MotionError::WorkerUnavailable)?;
        report.await.map_err(|_| MotionError::WorkerUnavailable)?
    }

    /// Processes every frame of `frames`, writing annotated frames to `sink` in order.
    /// Stops at the first error.
    pub async fn run_stream<St, K, P>(&self, frames: St, sink: &mut K, progress: &mut P) -> Result<RunSummary>
    where
        St: Stream<Item = RgbImage>,
        K: FrameSink + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        pin_mut!(frames);
        let mut summary = RunSummary::default();
        while let Some(frame) = frames.next().await {
            let report = self.process_frame(frame).await?;
            summary.frames_processed += 1;
            summary.boxes_drawn += report.boxes.len();
            sink.write_frame(report.frame)?;
            progress.step();
        }
        sink.finish()?;
        info!(
            "stream finished: {} frames, {} boxes",
            summary.frames_processed, summary.boxes_drawn
        );
        Ok(summary)
    }

    /// Stops accepting frames and waits for the worker to drain and exit.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.task_sender);
        self.worker.await.map_err(|_| MotionError::WorkerUnavailable)
    }
}

fn run_worker(mut pipeline: MotionPipeline, mut tasks: mpsc::Receiver<FrameTask>) {
    while let Some(task) = tasks.blocking_recv() {
        let report = pipeline.process_frame(task.frame);
        // The submitter may have given up waiting.
        let _ = task.reply.send(report);
    }
    debug!("detection worker exiting after {} frames", pipeline.frames_processed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressBar;
    use image::Rgb;

    fn square_frame(left: u32) -> RgbImage {
        RgbImage::from_fn(96, 96, |x, y| {
            let inside = (left..left + 24).contains(&x) && (30..54).contains(&y);
            if inside { Rgb([230, 230, 230]) } else { Rgb([20, 20, 20]) }
        })
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            min_contour_pixel_count: 100,
            workers: Some(2),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn reports_come_back_in_submission_order() {
        let pipeline = ParallelPipeline::new(config()).expect("valid config");
        for (i, left) in [20, 26, 32].into_iter().enumerate() {
            let report = pipeline.process_frame(square_frame(left)).await.expect("frame");
            assert_eq!(report.frame_index, i as u64);
            assert_eq!(report.boxes.is_empty(), i == 0);
        }
        pipeline.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn errors_are_returned_and_the_worker_keeps_going() {
        let pipeline = ParallelPipeline::new(config()).expect("valid config");
        let err = pipeline.process_frame(RgbImage::new(8, 8)).await.expect_err("too small");
        assert!(matches!(err, MotionError::FrameTooSmall { .. }));

        let report = pipeline.process_frame(square_frame(20)).await.expect("frame");
        assert_eq!(report.frame_index, 0);
        pipeline.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn run_stream_drives_a_whole_stream() {
        let pipeline = ParallelPipeline::new(config()).expect("valid config");
        let frames = futures::stream::iter([20, 26, 32, 38].map(square_frame));
        let mut sink: Vec<RgbImage> = Vec::new();
        let mut progress = ProgressBar::new(4, "Motion detection");

        let summary = pipeline.run_stream(frames, &mut sink, &mut progress).await.expect("run");
        assert_eq!(summary.frames_processed, 4);
        assert!(summary.boxes_drawn >= 3);
        assert_eq!(sink.len(), 4);
        assert_eq!(progress.done(), 4);
        pipeline.shutdown().await.expect("clean shutdown");
    }

    #[test]
    fn invalid_config_is_rejected_before_the_worker_starts() {
        let config = PipelineConfig { diff_frame_window_size: 0, ..config() };
        assert!(matches!(ParallelPipeline::new(config), Err(MotionError::InvalidConfig(_))));
    }
}
