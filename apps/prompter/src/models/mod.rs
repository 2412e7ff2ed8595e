pub mod bbox;
pub mod generated;
pub mod layout;

pub use bbox::{normalize_pixel_box, BoxFormat, CanvasSize, DiscreteBbox, NormalizedBbox, PixelBbox};
pub use generated::{Coordinates, GeneratedLayout, SerializedElement};
pub use layout::{
    ContentRasters, Label, LayoutData, LayoutRecord, OrderedLayout, ProcessedLayoutData,
    Provenance,
};
