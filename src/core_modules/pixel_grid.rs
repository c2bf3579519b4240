// THEORY:
// The `PixelGrid` is the most fundamental unit of the filter bank. It is a "dumb"
// data container: a rectangular, row-major block of
// intensity values that knows how to hand out rows and convert itself to and from
// the `image` crate's buffers, but knows nothing about convolution.
//
// Key architectural principles:
// 1.  **Signed Storage**: Values are `i32`, not `u8`. Gradient convolution produces
//     negative and greater-than-255 values, and those must survive until a stage
//     explicitly clamps them. The same container therefore doubles as the
//     `GradientField` and the `EdgeMap`.
// 2.  **Shrinking Stages**: Every convolution stage returns a *smaller* grid (its
//     unusable border is dropped, not zero-filled). Dimensions are always read from
//     the grid itself, never assumed.
// 3.  **Explicit Clamping**: Conversion to a displayable `GrayImage` is the only place
//     values are forced into [0, 255].

use crate::error::{MotionError, Result};
use image::{GrayImage, Luma};

/// A grid of signed gradient magnitudes along one axis.
pub type GradientField = PixelGrid;

/// A grid whose nonzero values mark detected edges.
pub type EdgeMap = PixelGrid;

/// A rectangular, row-major array of intensity values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    data: Vec<i32>,
}

impl PixelGrid {
    /// Creates a zero-filled grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: u32, height: u32, value: i32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Wraps an existing row-major buffer. The buffer length must match the dimensions.
    pub fn from_vec(width: u32, height: u32, data: Vec<i32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MotionError::InvalidInput(format!(
                "grid buffer holds {} values, {}x{} needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Builds a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> i32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> i32 {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: i32) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub fn row(&self, y: u32) -> &[i32] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Fails with `FrameTooSmall` unless the grid is at least `min_width` x `min_height`.
    pub fn ensure_at_least(&self, stage: &'static str, min_width: u32, min_height: u32) -> Result<()> {
        if self.width < min_width || self.height < min_height {
            return Err(MotionError::FrameTooSmall {
                stage,
                width: self.width,
                height: self.height,
                min_width,
                min_height,
            });
        }
        Ok(())
    }

    /// Converts to an 8-bit image, clamping every value into [0, 255].
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.get(x, y).clamp(0, 255) as u8])
        })
    }

    /// Like `to_gray_image`, but takes the absolute value first. Used to display
    /// signed gradient fields.
    pub fn to_abs_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.get(x, y).unsigned_abs().min(255) as u8])
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) outside {}x{}", self.width, self.height);
        y as usize * self.width as usize + x as usize
    }
}

impl From<&GrayImage> for PixelGrid {
    fn from(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.as_raw().iter().map(|&v| v as i32).collect(),
        }
    }
}
