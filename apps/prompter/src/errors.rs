use thiserror::Error;

/// Library-level error type.
/// Every variant aborts processing of a single record; batch callers decide
/// whether to skip and continue.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Element count mismatch: {bboxes} bboxes vs {labels} labels")]
    ElementCountMismatch { bboxes: usize, labels: usize },

    #[error("Invalid bbox: {0}")]
    InvalidBbox(String),

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("Label '{0}' is not in the label dictionary")]
    UnknownLabel(String),

    #[error("Label pool is empty: process the training data first")]
    EmptyLabelPool,

    #[error("Invalid pipeline configuration: {0}")]
    InvalidPipeline(String),

    #[error("Record is not content-aware: {0}")]
    NotContentAware(String),

    #[error("Record has no layout elements")]
    MissingElements,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
