//! Content-aware exemplar selection.
//!
//! Given a query and a pool of processed exemplars, selection runs four stages:
//! 1. Score: rasterize each candidate's discrete content boxes and take the
//!    Laplace-smoothed IoU against the query's mask.
//! 2. Rank: sort descending by score, stable on ties (pool order wins).
//! 3. Filter-while-collecting: skip candidates with a degenerate gold box,
//!    stop at `num_prompt`.
//! 4. Optional shuffle of the accepted list.
//!
//! Fewer than `num_prompt` acceptable candidates is not an error.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::raster::ContentMask;
use crate::errors::{LayoutError, Result};
use crate::models::bbox::CanvasSize;
use crate::models::layout::ProcessedLayoutData;

pub const DEFAULT_NUM_PROMPT: usize = 10;

/// Reason recorded for candidates skipped by the filter stage.
pub const DEGENERATE_GOLD: &str = "gold layout has a zero-width or zero-height box";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub num_prompt: usize,
    /// Pool is sub-sampled to this size once, at construction.
    pub candidate_size: Option<usize>,
    pub is_shuffle: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            num_prompt: DEFAULT_NUM_PROMPT,
            candidate_size: None,
            is_shuffle: true,
        }
    }
}

/// Similarity of one pool candidate to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub pool_index: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SelectedExample {
    pub pool_index: usize,
    pub score: f64,
    pub example: ProcessedLayoutData,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub selected: Vec<SelectedExample>,
    pub excluded: Vec<(usize, String)>, // (pool_index, reason)
}

impl SelectionResult {
    pub fn examples(&self) -> Vec<ProcessedLayoutData> {
        self.selected.iter().map(|s| s.example.clone()).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Selector
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ContentAwareSelector {
    examples: Vec<ProcessedLayoutData>,
    canvas_size: CanvasSize,
    config: SelectorConfig,
}

impl ContentAwareSelector {
    pub fn new<R>(
        mut examples: Vec<ProcessedLayoutData>,
        canvas_size: CanvasSize,
        config: SelectorConfig,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        canvas_size.validate()?;
        if let Some(candidate_size) = config.candidate_size {
            examples.shuffle(rng);
            examples.truncate(candidate_size);
            debug!(candidate_size, pool = examples.len(), "candidate pool sub-sampled");
        }
        Ok(Self {
            examples,
            canvas_size,
            config,
        })
    }

    pub fn add_example(&mut self, example: ProcessedLayoutData) {
        self.examples.push(example);
    }

    pub fn examples(&self) -> &[ProcessedLayoutData] {
        &self.examples
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas_size
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Stage 1. Scores in pool order. The query must carry discrete content
    /// boxes; a candidate without them scores as an empty canvas.
    pub fn score_candidates(&self, query: &ProcessedLayoutData) -> Result<Vec<ScoredCandidate>> {
        let query_boxes = query.discrete_content_bboxes().ok_or_else(|| {
            LayoutError::NotContentAware("query has no discrete content boxes".to_string())
        })?;
        let query_mask = ContentMask::rasterize(query_boxes, self.canvas_size);

        Ok(self
            .examples
            .par_iter()
            .enumerate()
            .map(|(pool_index, candidate)| {
                let boxes = candidate.discrete_content_bboxes().unwrap_or_default();
                let mask = ContentMask::rasterize(boxes, self.canvas_size);
                ScoredCandidate {
                    pool_index,
                    score: query_mask.smoothed_iou(&mask),
                }
            })
            .collect())
    }

    /// All four stages, with scores and exclusions.
    pub fn select<R>(&self, query: &ProcessedLayoutData, rng: &mut R) -> Result<SelectionResult>
    where
        R: Rng + ?Sized,
    {
        let ranked = rank_scores(self.score_candidates(query)?);
        let (accepted, excluded) = filter_collect(&ranked, &self.examples, self.config.num_prompt);

        let mut selected: Vec<SelectedExample> = accepted
            .into_iter()
            .map(|c| SelectedExample {
                pool_index: c.pool_index,
                score: c.score,
                example: self.examples[c.pool_index].clone(),
            })
            .collect();
        if self.config.is_shuffle {
            selected.shuffle(rng);
        }

        debug!(
            query = ?query.layout().idx(),
            selected = selected.len(),
            excluded = excluded.len(),
            "exemplars selected"
        );
        Ok(SelectionResult { selected, excluded })
    }

    pub fn select_examples<R>(
        &self,
        query: &ProcessedLayoutData,
        rng: &mut R,
    ) -> Result<Vec<ProcessedLayoutData>>
    where
        R: Rng + ?Sized,
    {
        Ok(self
            .select(query, rng)?
            .selected
            .into_iter()
            .map(|s| s.example)
            .collect())
    }
}

/// Stage 2. Descending by score; `sort_by` is stable so ties keep pool order.
pub fn rank_scores(mut scores: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scores
}

/// Stage 3. Walks `ranked` and keeps candidates whose gold layout is not
/// degenerate, until `num_prompt` are kept. Skipped candidates seen during
/// the walk are returned as exclusions.
pub fn filter_collect(
    ranked: &[ScoredCandidate],
    examples: &[ProcessedLayoutData],
    num_prompt: usize,
) -> (Vec<ScoredCandidate>, Vec<(usize, String)>) {
    let mut accepted = Vec::with_capacity(num_prompt.min(ranked.len()));
    let mut excluded = Vec::new();
    for candidate in ranked {
        if accepted.len() >= num_prompt {
            break;
        }
        let Some(example) = examples.get(candidate.pool_index) else {
            continue;
        };
        if example.has_degenerate_gold() {
            excluded.push((candidate.pool_index, DEGENERATE_GOLD.to_string()));
            continue;
        }
        accepted.push(*candidate);
    }
    (accepted, excluded)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
