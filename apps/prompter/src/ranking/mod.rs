pub mod metrics;
pub mod ranker;

pub use metrics::{compute_alignment, compute_overlap};
pub use ranker::{CandidateQuality, IdentityRanker, LayoutRanker, Ranker, RankerWeights};
