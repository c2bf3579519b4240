// THEORY:
// Frames enter and leave the engine through two small traits. Decoding video and
// encoding the annotated output are somebody else's job; the pipeline only needs a
// pull-based source of RGB frames and a push-based sink.
//
// Key architectural principles:
// 1.  **End of Stream Is Not an Error**: A source signals exhaustion with `Ok(None)`.
//     An `Err` means the source broke and the run stops.
// 2.  **Explicit Flush**: `FrameSink::finish` is called exactly once after the last
//     frame of a successful run, so sinks can buffer freely.

use crate::error::Result;
use image::RgbImage;

/// Pull-based supplier of decoded RGB frames.
pub trait RawFrameSource {
    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Consumer of annotated frames, in processing order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: RgbImage) -> Result<()>;

    /// Flushes buffered output. Called once at end of stream.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A `RawFrameSource` over any iterator of frames.
pub struct IterFrameSource<I> {
    frames: I,
}

impl<I> IterFrameSource<I>
where
    I: Iterator<Item = RgbImage>,
{
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self { frames: frames.into_iter() }
    }
}

impl<I> RawFrameSource for IterFrameSource<I>
where
    I: Iterator<Item = RgbImage>,
{
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.next())
    }
}

impl FrameSink for Vec<RgbImage> {
    fn write_frame(&mut self, frame: RgbImage) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}
