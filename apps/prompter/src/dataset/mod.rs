pub mod manifest;

pub use manifest::{Annotations, LoadedSplit, Manifest, RawRecord};
