use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::Result;
use crate::models::layout::LayoutRecord;

/// Uniformly random permutation of every per-element array.
///
/// Only for size-focused variants. Gold boxes follow the permutation, so a
/// shuffled record's gold order is the shuffled order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShuffleElements;

impl ShuffleElements {
    pub fn apply<R>(&self, record: LayoutRecord, rng: &mut R) -> Result<LayoutRecord>
    where
        R: Rng + ?Sized,
    {
        let mut order: Vec<usize> = (0..record.element_count()).collect();
        order.shuffle(rng);
        record.permute(&order)
    }
}
