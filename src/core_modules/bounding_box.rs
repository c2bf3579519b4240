// THEORY:
// The `bounding_box` module reduces each surviving contour to an axis-aligned
// rectangle, which is all the drawing stage needs. Each extreme is found by its own
// reduction over the pixel set, so no combined comparator is needed. A single-pixel
// contour yields a zero-area box sitting on that pixel.

use crate::core_modules::contour::Contour;

/// An axis-aligned rectangle with inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    /// Horizontal extent, `max_x - min_x`. Zero for a one-pixel-wide box.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// Shifts the box by `(dx, dy)`, e.g. from edge-map into frame coordinates.
    pub fn translate(&self, dx: u32, dy: u32) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }
}

/// Computes the bounding box of `contour`, or `None` when it has no pixels.
pub fn from_contour(contour: &Contour) -> Option<BoundingBox> {
    let pixels = contour.pixels();
    Some(BoundingBox {
        min_x: pixels.iter().map(|p| p.x).min()?,
        min_y: pixels.iter().map(|p| p.y).min()?,
        max_x: pixels.iter().map(|p| p.x).max()?,
        max_y: pixels.iter().map(|p| p.y).max()?,
    })
}

/// Bounding boxes of every non-empty contour, in contour order.
pub fn extract(contours: &[Contour]) -> Vec<BoundingBox> {
    contours.iter().filter_map(from_contour).collect()
}
