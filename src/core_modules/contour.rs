// THEORY:
// A `Contour` is the spatial grouping unit of the engine: one candidate moving object
// in one frame. Like the blobs it descends from, it is a "dumb" data container. It
// holds the coordinates of a set of mutually 8-connected foreground pixels and
// nothing else.
//
// Key architectural principles:
// 1.  **Set Semantics**: A contour's pixels are unordered. Insertion order depends on
//     how row scans interleave and must never be relied upon; compare contours with
//     `pixel_set()`.
// 2.  **No Cached Geometry**: Bounding boxes are derived on demand and never stored
//     on the contour.
// 3.  **Frame Lifetime**: Contours carry no identity across frames. They are
//     discarded once their bounding boxes have been extracted.

use crate::core_modules::bounding_box::{self, BoundingBox};
use std::collections::BTreeSet;

/// A pixel coordinate on the motion mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Handle of a contour record inside the merger's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContourId(pub usize);

/// A set of 8-connected foreground pixels representing one moving-object candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pixels: Vec<Point>,
}

impl Contour {
    pub fn new(pixels: Vec<Point>) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &[Point] {
        &self.pixels
    }

    /// Number of pixels in the contour.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The pixels as an ordered set, for order-independent comparison.
    pub fn pixel_set(&self) -> BTreeSet<Point> {
        self.pixels.iter().copied().collect()
    }

    /// Freshly computed bounding box; `None` for an empty contour.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        bounding_box::from_contour(self)
    }

    pub(crate) fn push(&mut self, point: Point) {
        self.pixels.push(point);
    }

    pub(crate) fn into_pixels(self) -> Vec<Point> {
        self.pixels
    }
}
