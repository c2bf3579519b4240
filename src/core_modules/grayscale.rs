// THEORY:
// The `grayscale` module is the entry point of the filter bank. It collapses a color
// frame into a single intensity channel using the plain channel mean,
// `round((r + g + b) / 3)`, rather than a perceptual luma weighting.
//
// Two layouts are accepted: the `image` crate's `RgbImage`, and packed `0x00RRGGBB`
// words as produced by most capture APIs, from which channels are extracted by
// shifting and byte masking.

use crate::core_modules::pixel_grid::PixelGrid;
use crate::error::{MotionError, Result};
use image::RgbImage;

const CHANNEL_MASK: u32 = 0xff;

/// Mean of three 8-bit channels, rounded to the nearest integer.
#[inline]
fn channel_mean(red: u32, green: u32, blue: u32) -> i32 {
    // sum / 3 never lands on .5, so adding 1 before the division rounds correctly.
    ((red + green + blue + 1) / 3) as i32
}

/// Converts an RGB image into an intensity grid of the same dimensions.
pub fn from_rgb_image(frame: &RgbImage) -> PixelGrid {
    PixelGrid::from_fn(frame.width(), frame.height(), |x, y| {
        let [red, green, blue] = frame.get_pixel(x, y).0;
        channel_mean(red as u32, green as u32, blue as u32)
    })
}

/// Converts packed `0x00RRGGBB` pixels into an intensity grid.
pub fn from_packed_rgb(pixels: &[u32], width: u32, height: u32) -> Result<PixelGrid> {
    if pixels.len() != width as usize * height as usize {
        return Err(MotionError::InvalidInput(format!(
            "packed frame holds {} pixels, {}x{} needs {}",
            pixels.len(),
            width,
            height,
            width as usize * height as usize
        )));
    }

    let intensities = pixels
        .iter()
        .map(|&pixel| {
            let red = (pixel >> 16) & CHANNEL_MASK;
            let green = (pixel >> 8) & CHANNEL_MASK;
            let blue = pixel & CHANNEL_MASK;
            channel_mean(red, green, blue)
        })
        .collect();

    PixelGrid::from_vec(width, height, intensities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn averages_channels_with_rounding() {
        let mut frame = RgbImage::new(3, 1);
        frame.put_pixel(0, 0, Rgb([255, 255, 255]));
        frame.put_pixel(1, 0, Rgb([1, 1, 0])); // 2/3 rounds up to 1
        frame.put_pixel(2, 0, Rgb([1, 0, 0])); // 1/3 rounds down to 0

        let grid = from_rgb_image(&frame);
        assert_eq!(grid.as_slice(), &[255, 1, 0]);
    }

    #[test]
    fn packed_pixels_ignore_the_alpha_byte() {
        let pixels = [0xff_10_20_30u32, 0x00_ff_00_00];
        let grid = from_packed_rgb(&pixels, 2, 1).expect("valid frame");
        assert_eq!(grid.get(0, 0), 32); // (16 + 32 + 48) / 3
        assert_eq!(grid.get(1, 0), 85);
    }

    #[test]
    fn packed_and_image_layouts_agree() {
        let frame = RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 60) as u8, (y * 80) as u8, 7]));
        let packed: Vec<u32> = frame
            .pixels()
            .map(|p| ((p.0[0] as u32) << 16) | ((p.0[1] as u32) << 8) | p.0[2] as u32)
            .collect();

        let from_packed = from_packed_rgb(&packed, 4, 3).expect("valid frame");
        assert_eq!(from_packed, from_rgb_image(&frame));
    }

    #[test]
    fn packed_length_mismatch_is_rejected() {
        assert!(matches!(
            from_packed_rgb(&[0; 5], 2, 2),
            Err(MotionError::InvalidInput(_))
        ));
    }
}
