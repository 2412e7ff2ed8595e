pub mod discretize;
pub mod noise;
pub mod ordering;
pub mod pipeline;
pub mod shuffle;

pub use discretize::{continuize, discretize, Discretizer};
pub use noise::AddGaussianNoise;
pub use ordering::{LabelDictSort, LexicographicSort};
pub use pipeline::{OrderingFlags, Pipeline, Stage, TaskKind};
pub use shuffle::ShuffleElements;
