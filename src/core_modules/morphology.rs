// THEORY:
// Morphological cleanup sits between the frame differencer and the contour merger.
// Raw motion masks are speckled and thin edges break apart, so the mask is dilated to
// close small gaps and optionally opened to drop isolated noise before contours are
// extracted. The engine only depends on the `MorphologicalOps` trait; the default
// implementation delegates to `imageproc::morphology`.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Shape and radius of the neighborhood used by dilate and open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructuringElement {
    /// A `(2k + 1)` square, chessboard distance `k`.
    Square(u8),
    /// A diamond, city-block distance `k`.
    Diamond(u8),
}

impl StructuringElement {
    fn norm_and_radius(self) -> (Norm, u8) {
        match self {
            StructuringElement::Square(k) => (Norm::LInf, k),
            StructuringElement::Diamond(k) => (Norm::L1, k),
        }
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Square(1)
    }
}

/// Binary morphology on motion masks.
pub trait MorphologicalOps {
    fn dilate(&self, mask: &GrayImage, element: StructuringElement) -> GrayImage;

    /// Erosion followed by dilation.
    fn open(&self, mask: &GrayImage, element: StructuringElement) -> GrayImage;
}

/// `MorphologicalOps` backed by `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocMorphology;

impl MorphologicalOps for ImageprocMorphology {
    fn dilate(&self, mask: &GrayImage, element: StructuringElement) -> GrayImage {
        let (norm, k) = element.norm_and_radius();
        morphology::dilate(mask, norm, k)
    }

    fn open(&self, mask: &GrayImage, element: StructuringElement) -> GrayImage {
        let (norm, k) = element.norm_and_radius();
        morphology::open(mask, norm, k)
    }
}
