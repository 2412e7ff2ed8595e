//! Content-agnostic processors: annotated records in, processed records out.

use rand::Rng;
use tracing::debug;

use crate::errors::{LayoutError, Result};
use crate::models::layout::{LayoutData, ProcessedLayoutData};
use crate::settings::TaskSettings;
use crate::transforms::pipeline::{Pipeline, TaskKind};

/// Runs one of the fixed task pipelines over fully annotated records.
#[derive(Debug, Clone)]
pub struct LayoutProcessor {
    task: TaskKind,
    pipeline: Pipeline,
}

impl LayoutProcessor {
    /// Content-aware tasks need saliency handling and a label pool; they go
    /// through `ContentAwareProcessor` instead.
    pub fn new(task: TaskKind, settings: &TaskSettings) -> Result<Self> {
        if task.is_content_aware() {
            return Err(LayoutError::InvalidPipeline(format!(
                "task '{task}' needs the content-aware processor"
            )));
        }
        settings.validate()?;
        Ok(Self {
            task,
            pipeline: Pipeline::for_task(task, settings)?,
        })
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn process<R>(&self, layout: LayoutData, rng: &mut R) -> Result<ProcessedLayoutData>
    where
        R: Rng + ?Sized,
    {
        if !layout.has_annotations() {
            return Err(LayoutError::MissingElements);
        }
        debug!(task = %self.task, idx = ?layout.idx(), "processing record");
        self.pipeline.run(layout, rng)
    }
}
