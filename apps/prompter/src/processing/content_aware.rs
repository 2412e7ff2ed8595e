//! Content-aware processing.
//!
//! Training records carry annotations: their label sequence goes into the
//! label pool and they run through the content pipeline. Query records carry
//! only rasters: they get a label sequence (explicit, or drawn from the pool)
//! and zero-area placeholder boxes before the same pipeline.
//!
//! A record whose saliency map yields no content box is unscoreable and comes
//! back as `Ok(None)`.

use rand::Rng;
use tracing::debug;

use crate::content::saliency::{SaliencyExtractor, DEFAULT_FILTER_THRESHOLD};
use crate::errors::{LayoutError, Result};
use crate::models::bbox::NormalizedBbox;
use crate::models::layout::{LayoutData, ProcessedLayoutData};
use crate::processing::label_pool::{LabelPool, DEFAULT_MAX_ELEMENT_NUMBERS};
use crate::settings::TaskSettings;
use crate::transforms::pipeline::{Pipeline, TaskKind};

#[derive(Debug, Clone)]
pub struct ContentAwareProcessor {
    extractor: SaliencyExtractor,
    max_element_numbers: usize,
    pipeline: Pipeline,
}

impl ContentAwareProcessor {
    pub fn new(
        settings: &TaskSettings,
        filter_threshold: u8,
        max_element_numbers: usize,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            extractor: SaliencyExtractor::new(filter_threshold),
            max_element_numbers,
            pipeline: Pipeline::for_task(TaskKind::ContentAware, settings)?,
        })
    }

    pub fn with_defaults(settings: &TaskSettings) -> Result<Self> {
        Self::new(settings, DEFAULT_FILTER_THRESHOLD, DEFAULT_MAX_ELEMENT_NUMBERS)
    }

    pub fn max_element_numbers(&self) -> usize {
        self.max_element_numbers
    }

    /// An empty pool sized for this processor.
    pub fn new_label_pool(&self) -> LabelPool {
        LabelPool::new(self.max_element_numbers)
    }

    /// Fills in `content_bboxes` from the saliency map unless the caller
    /// already supplied them. `None` when extraction finds nothing.
    pub fn attach_content(&self, layout: LayoutData) -> Result<Option<LayoutData>> {
        if layout.content_bboxes().is_some() {
            if layout.rasters().is_empty() {
                return Err(LayoutError::NotContentAware(
                    "content boxes supplied without a raster".to_string(),
                ));
            }
            return Ok(Some(layout));
        }

        let Some(saliency_map) = layout.rasters().saliency_map.clone() else {
            return Err(LayoutError::NotContentAware(
                "record has no saliency map".to_string(),
            ));
        };

        let content_bboxes = self.extractor.extract_normalized(&saliency_map);
        if content_bboxes.is_empty() {
            debug!(idx = ?layout.idx(), "no content box extracted from saliency map");
            return Ok(None);
        }
        debug!(idx = ?layout.idx(), count = content_bboxes.len(), "content boxes extracted");
        Ok(Some(layout.with_content_bboxes(content_bboxes)?))
    }

    /// Runs an annotated record through the pipeline without touching any pool.
    pub fn process_annotated(&self, layout: LayoutData) -> Result<Option<ProcessedLayoutData>> {
        if !layout.has_annotations() {
            return Err(LayoutError::MissingElements);
        }
        let Some(layout) = self.attach_content(layout)? else {
            return Ok(None);
        };
        // The content pipeline has no random stage.
        let processed = self.pipeline.run(layout, &mut rand::rng())?;
        Ok(Some(processed))
    }

    /// Training-time processing. The record's label sequence is observed into
    /// `pool` once the record is processed.
    pub fn process_train(
        &self,
        layout: LayoutData,
        pool: &mut LabelPool,
    ) -> Result<Option<ProcessedLayoutData>> {
        let processed = self.process_annotated(layout)?;
        if let Some(processed) = &processed {
            pool.observe(processed.orig_labels());
        }
        Ok(processed)
    }

    /// Generation-time processing. Explicit labels on the record are kept;
    /// otherwise a sequence is drawn from `pool`. Boxes are zero-area
    /// placeholders.
    pub fn process_query<R>(
        &self,
        layout: LayoutData,
        pool: &LabelPool,
        rng: &mut R,
    ) -> Result<Option<ProcessedLayoutData>>
    where
        R: Rng + ?Sized,
    {
        let labels = match layout.labels() {
            Some(labels) => labels.to_vec(),
            None => pool.sample(rng)?.to_vec(),
        };
        let bboxes = vec![NormalizedBbox::ZERO; labels.len()];
        let layout = layout.with_elements(Some(bboxes), Some(labels))?;

        let Some(layout) = self.attach_content(layout)? else {
            return Ok(None);
        };
        Ok(Some(self.pipeline.run(layout, rng)?))
    }

    /// Dispatches on whether the record carries annotations.
    pub fn process<R>(
        &self,
        layout: LayoutData,
        pool: &mut LabelPool,
        rng: &mut R,
    ) -> Result<Option<ProcessedLayoutData>>
    where
        R: Rng + ?Sized,
    {
        if layout.has_annotations() {
            self.process_train(layout, pool)
        } else {
            self.process_query(layout, pool, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn saliency(blobs: &[(u32, u32, u32, u32)]) -> Arc<GrayImage> {
        let mut img = GrayImage::new(102, 150);
        for &(x, y, w, h) in blobs {
            for yy in y..y + h {
                for xx in x..x + w {
                    img.put_pixel(xx, yy, Luma([220]));
                }
            }
        }
        Arc::new(img)
    }

    fn make_train(labels: &[&str], blobs: &[(u32, u32, u32, u32)]) -> LayoutData {
        let settings = TaskSettings::poster_layout();
        let bboxes = (0..labels.len())
            .map(|i| NormalizedBbox::new(0.1, 0.1 * i as f64, 0.5, 0.05).unwrap())
            .collect();
        LayoutData::new(
            settings.canvas_size,
            Some(bboxes),
            Some(labels.iter().map(|s| s.to_string()).collect()),
        )
        .unwrap()
        .with_saliency_map(saliency(blobs))
    }

    fn make_query(blobs: &[(u32, u32, u32, u32)]) -> LayoutData {
        LayoutData::new(TaskSettings::poster_layout().canvas_size, None, None)
            .unwrap()
            .with_saliency_map(saliency(blobs))
    }

    fn make_processor() -> ContentAwareProcessor {
        ContentAwareProcessor::with_defaults(&TaskSettings::poster_layout()).unwrap()
    }

    #[test]
    fn test_train_record_is_observed_and_content_aware() {
        let processor = make_processor();
        let mut pool = processor.new_label_pool();
        let processed = processor
            .process_train(make_train(&["text", "logo"], &[(10, 10, 30, 20)]), &mut pool)
            .unwrap()
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert!(processed.is_content_aware());
        assert_eq!(processed.discrete_content_bboxes().unwrap().len(), 1);
    }

    #[test]
    fn test_blank_saliency_map_is_excluded() {
        let processor = make_processor();
        let mut pool = processor.new_label_pool();
        let out = processor
            .process_train(make_train(&["text"], &[]), &mut pool)
            .unwrap();
        assert!(out.is_none());
        assert!(pool.is_empty(), "excluded records are not observed");
    }

    #[test]
    fn test_query_before_training_fails() {
        let processor = make_processor();
        let pool = processor.new_label_pool();
        let err = processor.process_query(
            make_query(&[(0, 0, 10, 10)]),
            &pool,
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(err, Err(LayoutError::EmptyLabelPool)));
    }

    #[test]
    fn test_query_samples_pool_with_zero_boxes() {
        let processor = make_processor();
        let mut pool = processor.new_label_pool();
        processor
            .process_train(make_train(&["text", "logo"], &[(5, 5, 10, 10)]), &mut pool)
            .unwrap();
        processor
            .process_train(make_train(&["text"], &[(5, 5, 10, 10)]), &mut pool)
            .unwrap();

        let mut rng = StdRng::seed_from_u64(8);
        let mut lengths = std::collections::BTreeSet::new();
        for _ in 0..50 {
            let processed = processor
                .process_query(make_query(&[(40, 60, 20, 20)]), &pool, &mut rng)
                .unwrap()
                .unwrap();
            assert!(processed.bboxes().iter().all(|b| *b == NormalizedBbox::ZERO));
            assert!(processed.discrete_bboxes().iter().all(|b| b.is_degenerate()));
            lengths.insert(processed.labels().len());
        }
        assert_eq!(lengths.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_query_keeps_explicit_labels() {
        let processor = make_processor();
        let pool = processor.new_label_pool();
        let query = LayoutData::new(
            TaskSettings::poster_layout().canvas_size,
            None,
            Some(vec!["underlay".to_string(), "text".to_string()]),
        )
        .unwrap()
        .with_saliency_map(saliency(&[(0, 0, 20, 20)]));
        let processed = processor
            .process_query(query, &pool, &mut StdRng::seed_from_u64(0))
            .unwrap()
            .unwrap();
        assert_eq!(processed.labels(), &["text".to_string(), "underlay".to_string()]);
    }

    #[test]
    fn test_long_training_sequence_processed_but_not_pooled() {
        let settings = TaskSettings::poster_layout();
        let processor = ContentAwareProcessor::new(&settings, 100, 1).unwrap();
        let mut pool = processor.new_label_pool();
        let out = processor
            .process_train(make_train(&["text", "logo"], &[(5, 5, 10, 10)]), &mut pool)
            .unwrap();
        assert!(out.is_some());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_missing_saliency_map_is_an_error() {
        let processor = make_processor();
        let layout = LayoutData::new(
            TaskSettings::poster_layout().canvas_size,
            Some(vec![NormalizedBbox::ZERO]),
            Some(vec!["text".to_string()]),
        )
        .unwrap();
        let err = processor.process_annotated(layout);
        assert!(matches!(err, Err(LayoutError::NotContentAware(_))));
    }
}
