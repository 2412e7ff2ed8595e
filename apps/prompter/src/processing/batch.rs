//! Split-level orchestration.
//!
//! Records are processed in parallel and merged index-stably: the output keeps
//! input order minus exclusions. A failing or unscoreable record is logged and
//! listed in `excluded`. A query split fails as a whole only when its records
//! need labels from an empty pool.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::errors::{LayoutError, Result};
use crate::models::layout::{LayoutData, ProcessedLayoutData};
use crate::processing::content_aware::ContentAwareProcessor;
use crate::processing::label_pool::LabelPool;
use crate::processing::processor::LayoutProcessor;

/// Reason recorded for a record whose saliency map yields no content box.
pub const NO_CONTENT_BOXES: &str = "no content boxes extracted";

#[derive(Debug, Clone, Default)]
pub struct SplitOutput {
    pub records: Vec<ProcessedLayoutData>,
    /// `(record index, reason)`
    pub excluded: Vec<(usize, String)>,
}

impl SplitOutput {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Maps `f` over the split in parallel. `f` gets the record's index: its
/// `idx` when set, else its position in the split. `Ok(None)` marks an
/// unscoreable record.
pub fn process_split<F>(split: &str, records: Vec<LayoutData>, f: F) -> SplitOutput
where
    F: Fn(usize, LayoutData) -> Result<Option<ProcessedLayoutData>> + Sync + Send,
{
    let total = records.len();
    let results: Vec<(usize, Result<Option<ProcessedLayoutData>>)> = records
        .into_par_iter()
        .enumerate()
        .map(|(position, record)| {
            let idx = record.idx().unwrap_or(position);
            (idx, f(idx, record))
        })
        .collect();

    let mut output = SplitOutput::default();
    for (idx, result) in results {
        match result {
            Ok(Some(processed)) => output.records.push(processed),
            Ok(None) => {
                warn!(split, idx, "excluding record: {NO_CONTENT_BOXES}");
                output.excluded.push((idx, NO_CONTENT_BOXES.to_string()));
            }
            Err(e) => {
                warn!(split, idx, error = %e, "excluding record");
                output.excluded.push((idx, e.to_string()));
            }
        }
    }

    info!(
        split,
        total,
        kept = output.records.len(),
        excluded = output.excluded.len(),
        "split processed"
    );
    output
}

/// Training pass. The label pool is folded in record order after the parallel
/// map, so its content does not depend on scheduling.
pub fn process_train_split(
    split: &str,
    processor: &ContentAwareProcessor,
    records: Vec<LayoutData>,
) -> (SplitOutput, LabelPool) {
    let output = process_split(split, records, |_, record| {
        processor.process_annotated(record)
    });

    let mut pool = processor.new_label_pool();
    for processed in &output.records {
        pool.observe(processed.orig_labels());
    }
    info!(split, sequences = pool.len(), "label pool built");
    (output, pool)
}

/// Generation-time pass. Each record draws from its own rng seeded by
/// `(seed, index)`, so results are reproducible under parallelism.
///
/// Fails with `EmptyLabelPool` before any work when the pool is empty and a
/// record has no explicit labels to fall back on.
pub fn process_query_split(
    split: &str,
    processor: &ContentAwareProcessor,
    records: Vec<LayoutData>,
    pool: &LabelPool,
    seed: u64,
) -> Result<SplitOutput> {
    if pool.is_empty() && records.iter().any(|r| r.labels().is_none()) {
        return Err(LayoutError::EmptyLabelPool);
    }
    Ok(process_split(split, records, |idx, record| {
        let mut rng = record_rng(seed, idx);
        processor.process_query(record, pool, &mut rng)
    }))
}

/// Content-agnostic tasks over annotated records.
pub fn process_layout_split(
    split: &str,
    processor: &LayoutProcessor,
    records: Vec<LayoutData>,
    seed: u64,
) -> SplitOutput {
    process_split(split, records, |idx, record| {
        let mut rng = record_rng(seed, idx);
        processor.process(record, &mut rng).map(Some)
    })
}

pub fn record_rng(seed: u64, idx: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(idx as u64))
}
