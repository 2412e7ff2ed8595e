//! Ranking of generated layout candidates.
//!
//! `Ranker` is the seam: the caller holds a `Box<dyn Ranker>` (or any `R: Ranker`)
//! and swaps strategies without touching the generation flow.
//! Default strategy: `LayoutRanker` (alignment + overlap, deterministic).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::bbox::CanvasSize;
use crate::models::generated::GeneratedLayout;
use crate::ranking::metrics::{compute_alignment, compute_overlap, min_max_scale};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Reorders candidates by decreasing estimated quality. The output is the same
/// multiset as the input.
pub trait Ranker: Send + Sync {
    fn rank(&self, candidates: Vec<GeneratedLayout>) -> Vec<GeneratedLayout>;
}

// ────────────────────────────────────────────────────────────────────────────
// IdentityRanker
// ────────────────────────────────────────────────────────────────────────────

/// Keeps generation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRanker;

impl Ranker for IdentityRanker {
    fn rank(&self, candidates: Vec<GeneratedLayout>) -> Vec<GeneratedLayout> {
        candidates
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LayoutRanker
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankerWeights {
    pub alignment: f64,
    pub overlap: f64,
}

impl Default for RankerWeights {
    fn default() -> Self {
        Self {
            alignment: 0.2,
            overlap: 0.2,
        }
    }
}

/// Per-candidate breakdown, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuality {
    pub alignment: f64,
    pub overlap: f64,
    /// Weighted sum of the min-max scaled metrics; lower is better.
    pub quality: f64,
}

/// Scores candidates by alignment and overlap.
///
/// Algorithm:
/// 1. Normalize each candidate's boxes by the canvas, convert to ltrb.
/// 2. Compute alignment and overlap per candidate.
/// 3. Min-max scale each metric across the candidate set.
/// 4. quality = w_ali × alignment + w_ove × overlap
/// 5. Sort ascending by quality (stable).
#[derive(Debug, Clone, Copy)]
pub struct LayoutRanker {
    canvas_size: CanvasSize,
    weights: RankerWeights,
}

impl LayoutRanker {
    pub fn new(canvas_size: CanvasSize) -> Self {
        Self::with_weights(canvas_size, RankerWeights::default())
    }

    pub fn with_weights(canvas_size: CanvasSize, weights: RankerWeights) -> Self {
        Self {
            canvas_size,
            weights,
        }
    }

    pub fn assess(&self, candidates: &[GeneratedLayout]) -> Vec<CandidateQuality> {
        let (alignment, overlap): (Vec<f64>, Vec<f64>) = candidates
            .iter()
            .map(|candidate| {
                let boxes: Vec<[f64; 4]> = candidate
                    .normalized_bboxes(self.canvas_size.width, self.canvas_size.height)
                    .iter()
                    .map(|b| b.to_ltrb())
                    .collect();
                (compute_alignment(&boxes), compute_overlap(&boxes))
            })
            .unzip();

        let scaled_alignment = min_max_scale(&alignment);
        let scaled_overlap = min_max_scale(&overlap);

        (0..candidates.len())
            .map(|i| CandidateQuality {
                alignment: alignment[i],
                overlap: overlap[i],
                quality: self.weights.alignment * scaled_alignment[i]
                    + self.weights.overlap * scaled_overlap[i],
            })
            .collect()
    }
}

impl Ranker for LayoutRanker {
    fn rank(&self, candidates: Vec<GeneratedLayout>) -> Vec<GeneratedLayout> {
        let qualities = self.assess(&candidates);
        let mut scored: Vec<(f64, GeneratedLayout)> = qualities
            .iter()
            .map(|q| q.quality)
            .zip(candidates)
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        debug!(
            qualities = ?scored.iter().map(|(q, _)| *q).collect::<Vec<_>>(),
            "candidates ranked"
        );
        scored.into_iter().map(|(_, candidate)| candidate).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generated::{Coordinates, SerializedElement};

    fn element(label: &str, left: i64, top: i64, width: i64, height: i64) -> SerializedElement {
        SerializedElement {
            class_name: label.to_string(),
            coord: Coordinates {
                left,
                top,
                width,
                height,
            },
        }
    }

    fn make_layout(elements: Vec<SerializedElement>) -> GeneratedLayout {
        GeneratedLayout { layouts: elements }
    }

    fn canvas() -> CanvasSize {
        CanvasSize::new(100, 100).unwrap()
    }

    #[test]
    fn test_identity_ranker_keeps_order() {
        let a = make_layout(vec![element("text", 0, 0, 10, 10)]);
        let b = make_layout(vec![element("logo", 5, 5, 10, 10)]);
        let ranked = IdentityRanker.rank(vec![a.clone(), b.clone()]);
        assert_eq!(ranked, vec![a, b]);
    }

    #[test]
    fn test_clean_layout_ranks_first() {
        // Heavy overlap and ragged edges.
        let messy = make_layout(vec![
            element("text", 10, 10, 50, 30),
            element("logo", 17, 23, 40, 30),
        ]);
        // Left-aligned, no overlap.
        let clean = make_layout(vec![
            element("text", 10, 10, 50, 20),
            element("logo", 10, 50, 30, 20),
        ]);
        let ranked = LayoutRanker::new(canvas()).rank(vec![messy.clone(), clean.clone()]);
        assert_eq!(ranked, vec![clean, messy]);
    }

    #[test]
    fn test_rank_preserves_multiset() {
        let layouts: Vec<GeneratedLayout> = (0..5)
            .map(|i| {
                make_layout(vec![
                    element("text", i * 3, 0, 20, 20),
                    element("logo", 5, i * 7, 20, 20),
                ])
            })
            .collect();
        let ranked = LayoutRanker::new(canvas()).rank(layouts.clone());
        assert_eq!(ranked.len(), layouts.len());
        for layout in &layouts {
            assert!(ranked.contains(layout));
        }
    }

    #[test]
    fn test_equal_quality_keeps_generation_order() {
        let a = make_layout(vec![element("text", 0, 0, 10, 10)]);
        let b = make_layout(vec![element("logo", 50, 50, 10, 10)]);
        let ranked = LayoutRanker::new(canvas()).rank(vec![a.clone(), b.clone()]);
        assert_eq!(ranked, vec![a, b]);
    }

    #[test]
    fn test_assess_reports_raw_metrics() {
        let overlapping = make_layout(vec![
            element("text", 0, 0, 20, 20),
            element("logo", 10, 10, 40, 40),
        ]);
        let qualities = LayoutRanker::new(canvas()).assess(&[overlapping]);
        let expected_overlap = (0.01 / 0.04 + 0.01 / 0.16) / 2.0;
        assert!((qualities[0].overlap - expected_overlap).abs() < 1e-9);
        // Single candidate: scaled metrics collapse to 0.
        assert_eq!(qualities[0].quality, 0.0);
    }

    #[test]
    fn test_ranker_is_object_safe() {
        let rankers: Vec<Box<dyn Ranker>> =
            vec![Box::new(IdentityRanker), Box::new(LayoutRanker::new(canvas()))];
        for ranker in rankers {
            assert!(ranker.rank(Vec::new()).is_empty());
        }
    }
}
