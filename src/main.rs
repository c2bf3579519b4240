// Example runner for the `edge_motion` library.
//
//   edge_motion <input_frame_dir>
//       Reads every image in the directory in file-name order and reports how many
//       moving objects were boxed.
//   edge_motion
//       Same, on a synthetic clip of a square sliding across a dark background,
//       driven through the async pipeline.
//
// Set RUST_LOG=info for the progress bar, RUST_LOG=debug for per-frame timings.

use anyhow::{Context, bail};
use edge_motion::{
    FrameSink, MotionError, MotionPipeline, ParallelPipeline, PipelineConfig, ProgressBar,
    RawFrameSource,
};
use image::{Rgb, RgbImage};
use log::info;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEMO_FRAMES: u32 = 24;

/// Frames decoded one at a time from a directory of still images.
struct DirectoryFrameSource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl DirectoryFrameSource {
    fn open(dir: &Path) -> anyhow::Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        Ok(Self { paths: paths.into_iter() })
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

impl RawFrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> edge_motion::Result<Option<RgbImage>> {
        let Some(path) = self.paths.next() else {
            return Ok(None);
        };
        let frame = image::open(&path)
            .map_err(|e| MotionError::Source(format!("{}: {e}", path.display())))?;
        Ok(Some(frame.to_rgb8()))
    }
}

/// Counts annotated frames and drops them.
#[derive(Default)]
struct CountingSink {
    written: usize,
}

impl FrameSink for CountingSink {
    fn write_frame(&mut self, _frame: RgbImage) -> edge_motion::Result<()> {
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> edge_motion::Result<()> {
        info!("{} annotated frames produced", self.written);
        Ok(())
    }
}

fn demo_frame(index: u32) -> RgbImage {
    let left = 20 + 6 * index;
    RgbImage::from_fn(320, 240, |x, y| {
        let inside = (left..left + 40).contains(&x) && (100..140).contains(&y);
        if inside { Rgb([230, 230, 230]) } else { Rgb([20, 20, 20]) }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --- 1. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    let mut sink = CountingSink::default();
    let config = PipelineConfig::default();

    // --- 2. Processing ---
    let summary = if args.len() < 2 {
        let pipeline = ParallelPipeline::new(config)?;
        let frames = futures::stream::iter((0..DEMO_FRAMES).map(demo_frame));
        let mut progress = ProgressBar::new(DEMO_FRAMES, "Motion detection progress");
        let summary = pipeline.run_stream(frames, &mut sink, &mut progress).await?;
        pipeline.shutdown().await?;
        summary
    } else {
        let input_dir = Path::new(&args[1]);
        let mut source = DirectoryFrameSource::open(input_dir)?;
        if source.len() == 0 {
            bail!("no frames found in {}", input_dir.display());
        }
        let total = u32::try_from(source.len()).context("too many input frames")?;
        let mut progress = ProgressBar::new(total, "Motion detection progress");
        let mut pipeline = MotionPipeline::new(config)?;
        tokio::task::block_in_place(|| pipeline.run(&mut source, &mut sink, &mut progress))?
    };

    // --- 3. Summary ---
    println!(
        "Processed {} frames, drew {} boxes.",
        summary.frames_processed, summary.boxes_drawn
    );
    Ok(())
}
