pub mod raster;
pub mod saliency;

pub use raster::ContentMask;
pub use saliency::{SaliencyExtractor, DEFAULT_FILTER_THRESHOLD};
