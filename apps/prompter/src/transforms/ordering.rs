//! Deterministic element orderings.
//!
//! Both sorts are stable: elements that compare equal keep the relative order
//! produced by the previous stage.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::trace;

use crate::errors::{LayoutError, Result};
use crate::models::bbox::NormalizedBbox;
use crate::models::layout::{Label, LayoutRecord};

// ────────────────────────────────────────────────────────────────────────────
// LexicographicSort
// ────────────────────────────────────────────────────────────────────────────

/// Orders elements by `(top, left)` ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexicographicSort;

impl LexicographicSort {
    /// `order[i]` is the source index of the element that lands in slot `i`.
    pub fn order(bboxes: &[NormalizedBbox]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..bboxes.len()).collect();
        order.sort_by(|&a, &b| {
            let (ba, bb) = (&bboxes[a], &bboxes[b]);
            ba.top
                .partial_cmp(&bb.top)
                .unwrap_or(Ordering::Equal)
                .then(ba.left.partial_cmp(&bb.left).unwrap_or(Ordering::Equal))
        });
        order
    }

    pub fn apply(&self, record: LayoutRecord) -> Result<LayoutRecord> {
        let bboxes = record
            .layout()
            .bboxes()
            .ok_or(LayoutError::MissingElements)?;
        let order = Self::order(bboxes);
        trace!(?order, "lexicographic sort");
        record.permute(&order)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LabelDictSort
// ────────────────────────────────────────────────────────────────────────────

/// Groups elements by label, groups ordered by the label's dictionary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDictSort {
    label_index: HashMap<Label, usize>,
}

impl LabelDictSort {
    /// The dictionary index of a label is its position in `labels`. A label
    /// repeated in the vocabulary keeps its first position.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Label>,
    {
        let mut label_index = HashMap::new();
        for (idx, label) in labels.into_iter().enumerate() {
            label_index.entry(label.into()).or_insert(idx);
        }
        Self { label_index }
    }

    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.label_index
            .get(label)
            .copied()
            .ok_or_else(|| LayoutError::UnknownLabel(label.to_string()))
    }

    pub fn order(&self, labels: &[Label]) -> Result<Vec<usize>> {
        let keys = labels
            .iter()
            .map(|label| self.index_of(label))
            .collect::<Result<Vec<_>>>()?;
        let mut order: Vec<usize> = (0..labels.len()).collect();
        order.sort_by_key(|&i| keys[i]);
        Ok(order)
    }

    pub fn apply(&self, record: LayoutRecord) -> Result<LayoutRecord> {
        let labels = record
            .layout()
            .labels()
            .ok_or(LayoutError::MissingElements)?;
        let order = self.order(labels)?;
        trace!(?order, "label dict sort");
        record.permute(&order)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
