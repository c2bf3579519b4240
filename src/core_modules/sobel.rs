// THEORY:
// The `sobel` module computes directional intensity gradients with a pair of fixed
// 5x5 kernels. `MASK_H` responds to intensity changes between the rows above and
// below a pixel; `MASK_V` is its 90-degree rotation and responds to changes
// between the columns to the left and right.
//
// Key architectural principles:
// 1.  **Valid Convolution Only**: A 5x5 kernel needs two pixels of context on every
//     side. Those border pixels are never computed; `process` returns a grid that is
//     4 smaller in each dimension and callers account for the shrinkage.
// 2.  **Point Evaluation**: `gradient_at` evaluates a kernel around a single pixel.
//     `process` is nothing more than `gradient_at` mapped over the interior.

use crate::core_modules::pixel_grid::{GradientField, PixelGrid};
use crate::error::Result;

/// Side length of the Sobel kernels.
pub const KERNEL_SIZE: usize = 5;

/// Pixels lost on each side of the grid by a Sobel pass.
pub const MARGIN: u32 = (KERNEL_SIZE / 2) as u32;

pub type Mask = [[i32; KERNEL_SIZE]; KERNEL_SIZE];

pub const MASK_H: Mask = [
    [2, 2, 4, 2, 2],
    [1, 1, 2, 1, 1],
    [0, 0, 0, 0, 0],
    [-1, -1, -2, -1, -1],
    [-2, -2, -4, -2, -2],
];

pub const MASK_V: Mask = [
    [2, 1, 0, -1, -2],
    [2, 1, 0, -1, -2],
    [4, 2, 0, -2, -4],
    [2, 1, 0, -1, -2],
    [2, 1, 0, -1, -2],
];

/// Applies `mask` to the 5x5 neighborhood centered on `(x, y)`.
///
/// `(x, y)` must lie at least `MARGIN` pixels inside every border of `grid`.
#[inline]
pub fn gradient_at(grid: &PixelGrid, mask: &Mask, x: u32, y: u32) -> i32 {
    debug_assert!(x >= MARGIN && y >= MARGIN);
    debug_assert!(x + MARGIN < grid.width() && y + MARGIN < grid.height());

    let left = (x - MARGIN) as usize;
    let mut sum = 0;
    for (kernel_row, weights) in mask.iter().enumerate() {
        let row = grid.row(y - MARGIN + kernel_row as u32);
        for (kernel_col, &weight) in weights.iter().enumerate() {
            sum += weight * row[left + kernel_col];
        }
    }
    sum
}

/// Convolves every interior pixel of `grid` with `mask`.
///
/// The result is `(width - 4) x (height - 4)`: output pixel `(x, y)` holds the
/// response centered on input pixel `(x + 2, y + 2)`.
pub fn process(grid: &PixelGrid, mask: &Mask) -> Result<GradientField> {
    let size = KERNEL_SIZE as u32;
    grid.ensure_at_least("sobel", size, size)?;

    let out_width = grid.width() - 2 * MARGIN;
    let out_height = grid.height() - 2 * MARGIN;
    Ok(PixelGrid::from_fn(out_width, out_height, |x, y| {
        gradient_at(grid, mask, x + MARGIN, y + MARGIN)
    }))
}

/// Horizontal and vertical gradient fields of `grid`, in that order.
pub fn gradients(grid: &PixelGrid) -> Result<(GradientField, GradientField)> {
    Ok((process(grid, &MASK_H)?, process(grid, &MASK_V)?))
}
