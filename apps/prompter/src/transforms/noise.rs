//! Gaussian jitter for refinement inputs.
//!
//! Only the working `bboxes` move. Gold boxes keep the clean positions.

use std::f64::consts::TAU;

use rand::Rng;

use crate::errors::{LayoutError, Result};
use crate::models::bbox::NormalizedBbox;
use crate::models::layout::LayoutRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddGaussianNoise {
    mean: f64,
    std: f64,
    bernoulli_beta: f64,
}

impl Default for AddGaussianNoise {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: 0.01,
            bernoulli_beta: 1.0,
        }
    }
}

impl AddGaussianNoise {
    /// `bernoulli_beta` is the per-element probability of being jittered.
    pub fn new(mean: f64, std: f64, bernoulli_beta: f64) -> Result<Self> {
        if !mean.is_finite() || !std.is_finite() || std < 0.0 {
            return Err(LayoutError::InvalidPipeline(format!(
                "gaussian noise needs finite mean and non-negative std, got mean={mean} std={std}"
            )));
        }
        if !(0.0..=1.0).contains(&bernoulli_beta) {
            return Err(LayoutError::InvalidPipeline(format!(
                "bernoulli_beta={bernoulli_beta} is not a probability"
            )));
        }
        Ok(Self {
            mean,
            std,
            bernoulli_beta,
        })
    }

    pub fn apply<R>(&self, record: LayoutRecord, rng: &mut R) -> Result<LayoutRecord>
    where
        R: Rng + ?Sized,
    {
        record.replace_bboxes(|bboxes| {
            bboxes
                .iter()
                .map(|bbox| {
                    if !rng.random_bool(self.bernoulli_beta) {
                        return *bbox;
                    }
                    NormalizedBbox::clamped(
                        bbox.left + self.sample(rng),
                        bbox.top + self.sample(rng),
                        bbox.width + self.sample(rng),
                        bbox.height + self.sample(rng),
                    )
                })
                .collect()
        })
    }

    /// Box–Muller draw from `N(mean, std²)`.
    fn sample<R>(&self, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        // u1 in (0, 1] keeps ln finite.
        let u1 = 1.0 - rng.random::<f64>();
        let u2 = rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
        self.mean + self.std * z
    }
}
