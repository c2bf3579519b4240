// THEORY:
// The `adaptive` module implements a noise-aware alternative to uniform blurring.
// Every output pixel is a weighted mean of its 3x3 neighborhood, where each
// neighbor's weight falls off with the Sobel gradient magnitude measured *at that
// neighbor*:
//
//     d = sqrt(gx^2 + gy^2)
//     w = exp(-sqrt(d) / (2 * h^2)),  h = 0.5
//     out = floor(sum(intensity * w) / sum(w))
//
// Flat regions (low gradient everywhere) get a near-uniform average and lose their
// noise; pixels on an edge carry almost no weight, so they do not bleed into the
// smooth side of the edge.
//
// The weight of a pixel does not depend on which neighborhood it is read from, so the
// weight field is computed once per grid from two full Sobel passes instead of
// nine point evaluations per pixel.

use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::sobel;
use crate::error::Result;

/// Fixed smoothing constant `h`.
pub const SMOOTHING: f64 = 0.5;

/// Pixels dropped on each side of the grid.
pub const MARGIN: u32 = 4;

/// Weight of a pixel whose gradient components are `gx` and `gy`.
#[inline]
pub fn gradient_weight(gx: i32, gy: i32) -> f64 {
    let (gx, gy) = (gx as f64, gy as f64);
    let magnitude = (gx * gx + gy * gy).sqrt();
    (-(magnitude.sqrt()) / (2.0 * SMOOTHING * SMOOTHING)).exp()
}

/// Smooths `grid`, returning a grid shrunk by `2 * MARGIN` in each dimension.
pub fn blur(grid: &PixelGrid) -> Result<PixelGrid> {
    let min_size = 2 * MARGIN + 1;
    grid.ensure_at_least("adaptive blur", min_size, min_size)?;

    // Weight field in Sobel-output coordinates: weights.get(x, y) belongs to
    // input pixel (x + sobel::MARGIN, y + sobel::MARGIN).
    let (gx, gy) = sobel::gradients(grid)?;
    let weights: Vec<f64> = gx
        .as_slice()
        .iter()
        .zip(gy.as_slice())
        .map(|(&h, &v)| gradient_weight(h, v))
        .collect();
    let weights_width = gx.width() as usize;
    let weight_of = |x: u32, y: u32| {
        weights[(y - sobel::MARGIN) as usize * weights_width + (x - sobel::MARGIN) as usize]
    };

    let out_width = grid.width() - 2 * MARGIN;
    let out_height = grid.height() - 2 * MARGIN;
    Ok(PixelGrid::from_fn(out_width, out_height, |ox, oy| {
        let (cx, cy) = (ox + MARGIN, oy + MARGIN);
        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        for ny in cy - 1..=cy + 1 {
            for nx in cx - 1..=cx + 1 {
                let w = weight_of(nx, ny);
                weight_sum += w;
                weighted += grid.get(nx, ny) as f64 * w;
            }
        }
        (weighted / weight_sum).floor() as i32
    }))
}
