//! Pipelines: ordered stages applied left-to-right, terminated by the discretizer.
//!
//! Processor variants are fixed pipeline configurations selected by `TaskKind`.
//! Each variant sets exactly one ordering flag:
//!
//! | task         | flag                               | stages                                       |
//! |--------------|------------------------------------|----------------------------------------------|
//! | `gen-t`      | `sort_by_pos_before_sort_by_label` | Lexicographic → LabelDict                    |
//! | `gen-ts`     | `shuffle_before_sort_by_label`     | Shuffle → LabelDict                          |
//! | `completion` | `sort_by_pos`                      | Lexicographic                                |
//! | `refinement` | `sort_by_pos_before_sort_by_label` | GaussianNoise → Lexicographic → LabelDict    |
//! | `content`    | `sort_by_pos_before_sort_by_label` | Lexicographic → LabelDict                    |

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::{LayoutError, Result};
use crate::models::layout::{LayoutRecord, ProcessedLayoutData};
use crate::settings::TaskSettings;
use crate::transforms::discretize::Discretizer;
use crate::transforms::noise::AddGaussianNoise;
use crate::transforms::ordering::{LabelDictSort, LexicographicSort};
use crate::transforms::shuffle::ShuffleElements;

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stage {
    LexicographicSort(LexicographicSort),
    LabelDictSort(LabelDictSort),
    Shuffle(ShuffleElements),
    GaussianNoise(AddGaussianNoise),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::LexicographicSort(_) => "lexicographic-sort",
            Stage::LabelDictSort(_) => "label-dict-sort",
            Stage::Shuffle(_) => "shuffle-elements",
            Stage::GaussianNoise(_) => "gaussian-noise",
        }
    }

    pub fn apply<R>(&self, record: LayoutRecord, rng: &mut R) -> Result<LayoutRecord>
    where
        R: Rng + ?Sized,
    {
        match self {
            Stage::LexicographicSort(sort) => sort.apply(record),
            Stage::LabelDictSort(sort) => sort.apply(record),
            Stage::Shuffle(shuffle) => shuffle.apply(record, rng),
            Stage::GaussianNoise(noise) => noise.apply(record, rng),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    discretizer: Discretizer,
}

impl Pipeline {
    pub fn new(discretizer: Discretizer) -> Self {
        Self {
            stages: Vec::new(),
            discretizer,
        }
    }

    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn discretizer(&self) -> &Discretizer {
        &self.discretizer
    }

    /// Stages run left-to-right, then the discretizer. `rng` is only consumed by
    /// random stages; deterministic pipelines return the same output for any rng.
    pub fn run<R>(&self, record: impl Into<LayoutRecord>, rng: &mut R) -> Result<ProcessedLayoutData>
    where
        R: Rng + ?Sized,
    {
        let mut record = record.into();
        for stage in &self.stages {
            trace!(stage = stage.name(), "applying stage");
            record = stage.apply(record, rng)?;
        }
        self.discretizer.apply(record)
    }

    /// Builds the ordering stages from validated flags, on the settings grid.
    pub fn from_flags(
        flags: OrderingFlags,
        settings: &TaskSettings,
        noise: Option<AddGaussianNoise>,
    ) -> Result<Self> {
        flags.validate()?;
        let mut pipeline = Self::new(Discretizer::new(settings.canvas_size)?);
        if let Some(noise) = noise {
            pipeline = pipeline.then(Stage::GaussianNoise(noise));
        }

        if flags.sort_by_pos {
            return Ok(pipeline.then(Stage::LexicographicSort(LexicographicSort)));
        }
        if flags.shuffle_before_sort_by_label {
            pipeline = pipeline.then(Stage::Shuffle(ShuffleElements));
        } else if flags.sort_by_pos_before_sort_by_label {
            pipeline = pipeline.then(Stage::LexicographicSort(LexicographicSort));
        }
        Ok(pipeline.then(Stage::LabelDictSort(settings.label_dict_sort())))
    }

    pub fn for_task(task: TaskKind, settings: &TaskSettings) -> Result<Self> {
        let noise = match task {
            TaskKind::Refinement => Some(AddGaussianNoise::default()),
            _ => None,
        };
        Self::from_flags(task.ordering_flags(), settings, noise)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ordering flags
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingFlags {
    pub sort_by_pos: bool,
    pub shuffle_before_sort_by_label: bool,
    pub sort_by_pos_before_sort_by_label: bool,
}

impl OrderingFlags {
    /// Exactly one flag must be set.
    pub fn validate(&self) -> Result<()> {
        let set = [
            self.sort_by_pos,
            self.shuffle_before_sort_by_label,
            self.sort_by_pos_before_sort_by_label,
        ]
        .into_iter()
        .filter(|f| *f)
        .count();
        match set {
            1 => Ok(()),
            0 => Err(LayoutError::InvalidPipeline(
                "at least one ordering flag must be set".to_string(),
            )),
            _ => Err(LayoutError::InvalidPipeline(format!(
                "conflicting ordering flags: {self:?}"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Task kinds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "gen-t")]
    GenType,
    #[serde(rename = "gen-ts")]
    GenTypeSize,
    #[serde(rename = "completion")]
    Completion,
    #[serde(rename = "refinement")]
    Refinement,
    #[serde(rename = "content")]
    ContentAware,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::GenType,
        TaskKind::GenTypeSize,
        TaskKind::Completion,
        TaskKind::Refinement,
        TaskKind::ContentAware,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::GenType => "gen-t",
            TaskKind::GenTypeSize => "gen-ts",
            TaskKind::Completion => "completion",
            TaskKind::Refinement => "refinement",
            TaskKind::ContentAware => "content",
        }
    }

    pub fn ordering_flags(self) -> OrderingFlags {
        match self {
            TaskKind::GenType | TaskKind::Refinement | TaskKind::ContentAware => OrderingFlags {
                sort_by_pos_before_sort_by_label: true,
                ..OrderingFlags::default()
            },
            TaskKind::GenTypeSize => OrderingFlags {
                shuffle_before_sort_by_label: true,
                ..OrderingFlags::default()
            },
            TaskKind::Completion => OrderingFlags {
                sort_by_pos: true,
                ..OrderingFlags::default()
            },
        }
    }

    pub fn is_content_aware(self) -> bool {
        matches!(self, TaskKind::ContentAware)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|task| task.as_str() == s)
            .ok_or_else(|| LayoutError::InvalidPipeline(format!("unknown task '{s}'")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::bbox::NormalizedBbox;
    use crate::models::layout::LayoutData;

    fn make_layout() -> LayoutData {
        let settings = TaskSettings::poster_layout();
        LayoutData::new(
            settings.canvas_size,
            Some(vec![
                NormalizedBbox::new(0.1, 0.7, 0.8, 0.1).unwrap(),
                NormalizedBbox::new(0.2, 0.05, 0.6, 0.1).unwrap(),
                NormalizedBbox::new(0.0, 0.6, 1.0, 0.3).unwrap(),
                NormalizedBbox::new(0.1, 0.3, 0.8, 0.1).unwrap(),
            ]),
            Some(
                ["text", "logo", "underlay", "text"]
                    .map(String::from)
                    .to_vec(),
            ),
        )
        .unwrap()
    }

    fn stage_names(pipeline: &Pipeline) -> Vec<&'static str> {
        pipeline.stages().iter().map(Stage::name).collect()
    }

    #[test]
    fn test_task_stage_configurations() {
        let settings = TaskSettings::poster_layout();
        let names = |task| stage_names(&Pipeline::for_task(task, &settings).unwrap());
        assert_eq!(names(TaskKind::GenType), vec!["lexicographic-sort", "label-dict-sort"]);
        assert_eq!(names(TaskKind::GenTypeSize), vec!["shuffle-elements", "label-dict-sort"]);
        assert_eq!(names(TaskKind::Completion), vec!["lexicographic-sort"]);
        assert_eq!(
            names(TaskKind::Refinement),
            vec!["gaussian-noise", "lexicographic-sort", "label-dict-sort"]
        );
        assert_eq!(names(TaskKind::ContentAware), vec!["lexicographic-sort", "label-dict-sort"]);
    }

    #[test]
    fn test_flag_validation() {
        assert!(OrderingFlags::default().validate().is_err());
        let conflicting = OrderingFlags {
            sort_by_pos: true,
            shuffle_before_sort_by_label: true,
            ..OrderingFlags::default()
        };
        assert!(matches!(
            conflicting.validate(),
            Err(LayoutError::InvalidPipeline(_))
        ));
        for task in TaskKind::ALL {
            assert!(task.ordering_flags().validate().is_ok(), "{task}");
        }
    }

    #[test]
    fn test_task_kind_round_trips_through_str() {
        for task in TaskKind::ALL {
            assert_eq!(task.as_str().parse::<TaskKind>().unwrap(), task);
        }
        assert!("layout".parse::<TaskKind>().is_err());
        let json = serde_json::to_string(&TaskKind::GenTypeSize).unwrap();
        assert_eq!(json, "\"gen-ts\"");
    }

    #[test]
    fn test_content_pipeline_output_order() {
        let settings = TaskSettings::poster_layout();
        let pipeline = Pipeline::for_task(TaskKind::ContentAware, &settings).unwrap();
        let processed = pipeline
            .run(make_layout(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(processed.labels(), &["text", "text", "logo", "underlay"].map(String::from));
        let tops: Vec<f64> = processed.bboxes().iter().map(|b| b.top).collect();
        assert_eq!(tops, vec![0.3, 0.7, 0.05, 0.6]);
        assert_eq!(processed.gold_bboxes(), processed.bboxes());
        assert_eq!(processed.orig_bboxes(), make_layout().bboxes().unwrap());
    }

    #[test]
    fn test_deterministic_pipeline_ignores_rng() {
        let settings = TaskSettings::poster_layout();
        let pipeline = Pipeline::for_task(TaskKind::GenType, &settings).unwrap();
        let a = pipeline.run(make_layout(), &mut StdRng::seed_from_u64(1)).unwrap();
        let b = pipeline.run(make_layout(), &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(a.discrete_bboxes(), b.discrete_bboxes());
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn test_unknown_label_aborts_record() {
        let settings = TaskSettings::poster_layout();
        let layout = LayoutData::new(
            settings.canvas_size,
            Some(vec![NormalizedBbox::ZERO]),
            Some(vec!["banner".to_string()]),
        )
        .unwrap();
        let pipeline = Pipeline::for_task(TaskKind::GenType, &settings).unwrap();
        let err = pipeline.run(layout, &mut StdRng::seed_from_u64(0));
        assert!(matches!(err, Err(LayoutError::UnknownLabel(_))));
    }
}
