// THEORY:
// The engine's building blocks, ordered leaves first. Filter stages work on
// `PixelGrid`s and shrink them by their convolution margins; the filter bank chains
// them into an edge map. The differencer, morphology, contour merger and bounding box
// extractor then turn a stream of edge maps into rectangles. Nothing in here knows
// about frame sources, sinks or progress reporting.

pub mod pixel_grid;
pub mod grayscale;
pub mod sobel;
pub mod gaussian;
pub mod adaptive;
pub mod results;
pub mod filter_bank;
pub mod frame_differencer;
pub mod morphology;
pub mod contour;
pub mod contour_merger;
pub mod bounding_box;
