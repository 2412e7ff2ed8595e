//! Label sequences observed during the training pass.
//!
//! The pool is an explicit accumulator: training-time processing writes into
//! it, generation-time processing only reads from it. Sampling from an empty
//! pool is a precondition failure.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{LayoutError, Result};
use crate::models::layout::Label;

pub const DEFAULT_MAX_ELEMENT_NUMBERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPool {
    max_element_numbers: usize,
    sequences: Vec<Vec<Label>>,
}

impl Default for LabelPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ELEMENT_NUMBERS)
    }
}

impl LabelPool {
    pub fn new(max_element_numbers: usize) -> Self {
        Self {
            max_element_numbers,
            sequences: Vec::new(),
        }
    }

    pub fn max_element_numbers(&self) -> usize {
        self.max_element_numbers
    }

    /// Records a training label sequence. Sequences longer than
    /// `max_element_numbers` are not kept. Returns whether it was kept.
    pub fn observe(&mut self, labels: &[Label]) -> bool {
        if labels.len() > self.max_element_numbers {
            return false;
        }
        self.sequences.push(labels.to_vec());
        true
    }

    /// Uniformly draws one observed sequence.
    pub fn sample<R>(&self, rng: &mut R) -> Result<&[Label]>
    where
        R: Rng + ?Sized,
    {
        let labels = self
            .sequences
            .choose(rng)
            .ok_or(LayoutError::EmptyLabelPool)?;
        debug!(?labels, "sampled label sequence");
        Ok(labels.as_slice())
    }

    /// Appends `other`'s sequences after this pool's, in order.
    pub fn merge(&mut self, other: LabelPool) {
        self.sequences.extend(other.sequences);
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Label]> {
        self.sequences.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn labels(items: &[&str]) -> Vec<Label> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_pool_refuses_to_sample() {
        let pool = LabelPool::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(pool.sample(&mut rng), Err(LayoutError::EmptyLabelPool)));
    }

    #[test]
    fn test_long_sequences_are_not_kept() {
        let mut pool = LabelPool::new(2);
        assert!(pool.observe(&labels(&["text", "logo"])));
        assert!(!pool.observe(&labels(&["text", "logo", "underlay"])));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_sample_draws_every_sequence() {
        let mut pool = LabelPool::default();
        pool.observe(&labels(&["text", "logo"]));
        pool.observe(&labels(&["text"]));

        let mut rng = StdRng::seed_from_u64(17);
        let mut seen_pair = false;
        let mut seen_single = false;
        for _ in 0..200 {
            match pool.sample(&mut rng).unwrap().len() {
                2 => seen_pair = true,
                1 => seen_single = true,
                n => panic!("unexpected sequence length {n}"),
            }
        }
        assert!(seen_pair && seen_single);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut a = LabelPool::default();
        a.observe(&labels(&["text"]));
        let mut b = LabelPool::default();
        b.observe(&labels(&["logo"]));
        b.observe(&labels(&["underlay"]));
        a.merge(b);
        let firsts: Vec<&str> = a.iter().map(|s| s[0].as_str()).collect();
        assert_eq!(firsts, vec!["text", "logo", "underlay"]);
    }
}
