pub mod batch;
pub mod content_aware;
pub mod label_pool;
pub mod processor;

pub use batch::{process_query_split, process_split, process_train_split, SplitOutput};
pub use content_aware::ContentAwareProcessor;
pub use label_pool::LabelPool;
pub use processor::LayoutProcessor;
