//! Preprocessing core for content-aware layout generation.
//!
//! Raw observations (`LayoutData`) pass through ordering transforms and a
//! terminal discretizer into `ProcessedLayoutData`. A content-aware selector
//! retrieves few-shot exemplars for a query, and a `Ranker` orders the layouts
//! a generation backend returns.

pub mod content;
pub mod dataset;
pub mod errors;
pub mod models;
pub mod processing;
pub mod ranking;
pub mod selection;
pub mod settings;
pub mod transforms;

pub use errors::{LayoutError, Result};
