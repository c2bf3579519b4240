// THEORY:
// The `gaussian` module is the first smoothing stage of the filter bank. It builds a
// one-dimensional, normalized Gaussian kernel of width `2 * radius + 1` and applies it
// as a separable convolution: once along every row, then once along every column.
//
// Key architectural principles:
// 1.  **Separable Passes**: A 2D Gaussian factors into two 1D passes, reducing cost per
//     pixel from O(k^2) to O(2k). The horizontal pass keeps full `f64` precision and
//     the vertical pass reads from it; rounding happens exactly once, at the end.
// 2.  **Legacy Mode**: `SeparableMode::Legacy` reproduces an older behavior in which
//     the vertical pass re-read the *input* grid, so the horizontal result was
//     discarded and the output was only blurred vertically. It exists so historical
//     outputs can be reproduced; nothing in the default pipeline uses it.
// 3.  **Valid Region Only**: A `radius`-pixel border on every side has no complete
//     neighborhood and is dropped, shrinking the output by `2 * radius` per dimension.

use crate::core_modules::pixel_grid::PixelGrid;
use crate::error::{MotionError, Result};

/// How the vertical pass obtains its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparableMode {
    /// The vertical pass convolves the output of the horizontal pass.
    Chained,
    /// The vertical pass convolves the original grid, discarding the horizontal pass.
    Legacy,
}

/// A one-dimensional Gaussian kernel, normalized to sum to 1.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    radius: usize,
    weights: Vec<f64>,
}

impl GaussianKernel {
    pub fn new(radius: usize, intensity: f64) -> Result<Self> {
        if radius == 0 {
            return Err(MotionError::InvalidConfig("gaussian radius must be at least 1".into()));
        }
        if !intensity.is_finite() || intensity <= 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "gaussian intensity must be positive, got {intensity}"
            )));
        }

        let two_sigma_squared = 2.0 * intensity * intensity;
        let scale = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * intensity);
        let mut weights: Vec<f64> = (0..=2 * radius)
            .map(|tap| {
                let offset = tap as f64 - radius as f64;
                scale * (-(offset * offset) / two_sigma_squared).exp()
            })
            .collect();

        let norm: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= norm);

        Ok(Self { radius, weights })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of taps, `2 * radius + 1`.
    pub fn width(&self) -> usize {
        self.weights.len()
    }
}

/// Blurs `grid` and returns a grid shrunk by `2 * radius` in each dimension.
pub fn blur(grid: &PixelGrid, kernel: &GaussianKernel, mode: SeparableMode) -> Result<PixelGrid> {
    let taps = kernel.width() as u32;
    grid.ensure_at_least("gaussian blur", taps, taps)?;

    let radius = kernel.radius() as u32;
    let out_width = grid.width() - 2 * radius;
    let out_height = grid.height() - 2 * radius;

    let output = match mode {
        SeparableMode::Chained => {
            // Rows keep full height so the vertical pass has its context.
            let horizontal = horizontal_pass(grid, kernel, out_width);
            PixelGrid::from_fn(out_width, out_height, |x, y| {
                let sum: f64 = kernel
                    .weights()
                    .iter()
                    .enumerate()
                    .map(|(tap, w)| w * horizontal[(y as usize + tap) * out_width as usize + x as usize])
                    .sum();
                sum.round() as i32
            })
        }
        SeparableMode::Legacy => PixelGrid::from_fn(out_width, out_height, |x, y| {
            let sum: f64 = kernel
                .weights()
                .iter()
                .enumerate()
                .map(|(tap, w)| w * grid.get(x + radius, y + tap as u32) as f64)
                .sum();
            sum.round() as i32
        }),
    };

    Ok(output)
}

/// Convolves every row of `grid`, keeping only columns with a full neighborhood.
/// The result is `out_width x grid.height()` in row-major order.
fn horizontal_pass(grid: &PixelGrid, kernel: &GaussianKernel, out_width: u32) -> Vec<f64> {
    let mut out = Vec::with_capacity(out_width as usize * grid.height() as usize);
    for y in 0..grid.height() {
        let row = grid.row(y);
        for x in 0..out_width as usize {
            let sum: f64 = kernel
                .weights()
                .iter()
                .zip(&row[x..x + kernel.width()])
                .map(|(w, &v)| w * v as f64)
                .sum();
            out.push(sum);
        }
    }
    out
}
