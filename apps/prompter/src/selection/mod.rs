pub mod selector;

pub use selector::{
    filter_collect, rank_scores, ContentAwareSelector, ScoredCandidate, SelectedExample,
    SelectionResult, SelectorConfig,
};
