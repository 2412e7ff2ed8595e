//! Layout record model.
//!
//! A record moves through three states, each an immutable value:
//!
//! ```text
//! LayoutData ──ordering──▶ OrderedLayout ──discretize──▶ ProcessedLayoutData
//!      └────────────────────────discretize──────────────────────┘
//! ```
//!
//! `Provenance` (gold boxes plus the pre-transform snapshot) is captured the first
//! time a raw record is touched by any stage and carried forward from then on.

use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use serde::Serialize;

use crate::errors::{LayoutError, Result};
use crate::models::bbox::{CanvasSize, DiscreteBbox, NormalizedBbox};
use crate::models::generated::GeneratedLayout;

/// Element class name, e.g. `"text"`, `"logo"`, `"underlay"`.
pub type Label = String;

// ────────────────────────────────────────────────────────────────────────────
// Raster references
// ────────────────────────────────────────────────────────────────────────────

/// Caller-owned raster payloads. Cloning a record clones the `Arc`s, never pixels.
#[derive(Clone, Default)]
pub struct ContentRasters {
    pub content_image: Option<Arc<DynamicImage>>,
    pub saliency_map: Option<Arc<GrayImage>>,
}

impl ContentRasters {
    pub fn is_empty(&self) -> bool {
        self.content_image.is_none() && self.saliency_map.is_none()
    }
}

impl fmt::Debug for ContentRasters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRasters")
            .field(
                "content_image",
                &self
                    .content_image
                    .as_ref()
                    .map(|img| (img.width(), img.height())),
            )
            .field(
                "saliency_map",
                &self.saliency_map.as_ref().map(|img| img.dimensions()),
            )
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LayoutData
// ────────────────────────────────────────────────────────────────────────────

/// A single design's raw observation.
///
/// `bboxes`/`labels` are absent for generation-time queries. When both are
/// present they have the same length; construction fails otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutData {
    idx: Option<usize>,
    bboxes: Option<Vec<NormalizedBbox>>,
    labels: Option<Vec<Label>>,
    canvas_size: CanvasSize,
    #[serde(skip)]
    rasters: ContentRasters,
    content_bboxes: Option<Vec<NormalizedBbox>>,
}

impl LayoutData {
    pub fn new(
        canvas_size: CanvasSize,
        bboxes: Option<Vec<NormalizedBbox>>,
        labels: Option<Vec<Label>>,
    ) -> Result<Self> {
        canvas_size.validate()?;
        validate_elements(bboxes.as_deref(), labels.as_deref())?;
        Ok(Self {
            idx: None,
            bboxes,
            labels,
            canvas_size,
            rasters: ContentRasters::default(),
            content_bboxes: None,
        })
    }

    pub fn with_index(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    pub fn with_content_bboxes(mut self, content_bboxes: Vec<NormalizedBbox>) -> Result<Self> {
        for bbox in &content_bboxes {
            bbox.validate()?;
        }
        self.content_bboxes = Some(content_bboxes);
        Ok(self)
    }

    pub fn with_content_image(mut self, image: Arc<DynamicImage>) -> Self {
        self.rasters.content_image = Some(image);
        self
    }

    pub fn with_saliency_map(mut self, saliency_map: Arc<GrayImage>) -> Self {
        self.rasters.saliency_map = Some(saliency_map);
        self
    }

    /// Returns a copy with new per-element arrays, re-validated.
    pub fn with_elements(
        mut self,
        bboxes: Option<Vec<NormalizedBbox>>,
        labels: Option<Vec<Label>>,
    ) -> Result<Self> {
        validate_elements(bboxes.as_deref(), labels.as_deref())?;
        self.bboxes = bboxes;
        self.labels = labels;
        Ok(self)
    }

    pub fn idx(&self) -> Option<usize> {
        self.idx
    }

    pub fn bboxes(&self) -> Option<&[NormalizedBbox]> {
        self.bboxes.as_deref()
    }

    pub fn labels(&self) -> Option<&[Label]> {
        self.labels.as_deref()
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas_size
    }

    pub fn rasters(&self) -> &ContentRasters {
        &self.rasters
    }

    pub fn content_bboxes(&self) -> Option<&[NormalizedBbox]> {
        self.content_bboxes.as_deref()
    }

    /// Number of layout elements, from whichever per-element array is present.
    pub fn element_count(&self) -> usize {
        self.bboxes
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.labels.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    /// Both ground-truth arrays are present (a training-time observation).
    pub fn has_annotations(&self) -> bool {
        self.bboxes.is_some() && self.labels.is_some()
    }

    /// Content-aware requires both a raster reference and its extracted content boxes.
    pub fn is_content_aware(&self) -> bool {
        !self.rasters.is_empty() && self.content_bboxes.is_some()
    }

    /// Reorders every per-element array by `order` (`order[i]` = source index of slot `i`).
    fn permuted(mut self, order: &[usize]) -> Self {
        self.bboxes = self.bboxes.map(|b| apply_permutation(&b, order));
        self.labels = self.labels.map(|l| apply_permutation(&l, order));
        self
    }
}

fn validate_elements(bboxes: Option<&[NormalizedBbox]>, labels: Option<&[Label]>) -> Result<()> {
    if let (Some(b), Some(l)) = (bboxes, labels) {
        if b.len() != l.len() {
            return Err(LayoutError::ElementCountMismatch {
                bboxes: b.len(),
                labels: l.len(),
            });
        }
    }
    for bbox in bboxes.unwrap_or_default() {
        bbox.validate()?;
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Provenance
// ────────────────────────────────────────────────────────────────────────────

/// Ground-truth bookkeeping carried across the pipeline.
///
/// `gold_bboxes` is reordered together with the elements. `orig_bboxes` and
/// `orig_labels` are the snapshot taken before the first transform and never change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub gold_bboxes: Vec<NormalizedBbox>,
    pub orig_bboxes: Vec<NormalizedBbox>,
    pub orig_labels: Vec<Label>,
}

impl Provenance {
    /// Snapshot of a raw record before any reordering.
    pub fn seed(layout: &LayoutData) -> Self {
        let bboxes = layout.bboxes.clone().unwrap_or_default();
        Self {
            gold_bboxes: bboxes.clone(),
            orig_bboxes: bboxes,
            orig_labels: layout.labels.clone().unwrap_or_default(),
        }
    }

    fn permuted(mut self, order: &[usize]) -> Self {
        if self.gold_bboxes.len() == order.len() {
            self.gold_bboxes = apply_permutation(&self.gold_bboxes, order);
        }
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OrderedLayout
// ────────────────────────────────────────────────────────────────────────────

/// A raw record that has passed at least one ordering/noise stage but has not
/// been discretized yet.
#[derive(Debug, Clone, Serialize)]
pub struct OrderedLayout {
    pub layout: LayoutData,
    pub provenance: Provenance,
}

// ────────────────────────────────────────────────────────────────────────────
// ProcessedLayoutData
// ────────────────────────────────────────────────────────────────────────────

/// Output of the pipeline's terminal discretization stage.
///
/// Built only by `transforms::discretize`; immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedLayoutData {
    layout: LayoutData,
    provenance: Provenance,
    discrete_bboxes: Vec<DiscreteBbox>,
    discrete_gold_bboxes: Vec<DiscreteBbox>,
    discrete_content_bboxes: Option<Vec<DiscreteBbox>>,
}

impl ProcessedLayoutData {
    pub(crate) fn assemble(
        layout: LayoutData,
        provenance: Provenance,
        discrete_bboxes: Vec<DiscreteBbox>,
        discrete_gold_bboxes: Vec<DiscreteBbox>,
        discrete_content_bboxes: Option<Vec<DiscreteBbox>>,
    ) -> Self {
        Self {
            layout,
            provenance,
            discrete_bboxes,
            discrete_gold_bboxes,
            discrete_content_bboxes,
        }
    }

    pub fn layout(&self) -> &LayoutData {
        &self.layout
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn labels(&self) -> &[Label] {
        self.layout.labels().unwrap_or_default()
    }

    pub fn bboxes(&self) -> &[NormalizedBbox] {
        self.layout.bboxes().unwrap_or_default()
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.layout.canvas_size()
    }

    pub fn gold_bboxes(&self) -> &[NormalizedBbox] {
        &self.provenance.gold_bboxes
    }

    pub fn orig_bboxes(&self) -> &[NormalizedBbox] {
        &self.provenance.orig_bboxes
    }

    pub fn orig_labels(&self) -> &[Label] {
        &self.provenance.orig_labels
    }

    pub fn discrete_bboxes(&self) -> &[DiscreteBbox] {
        &self.discrete_bboxes
    }

    pub fn discrete_gold_bboxes(&self) -> &[DiscreteBbox] {
        &self.discrete_gold_bboxes
    }

    pub fn discrete_content_bboxes(&self) -> Option<&[DiscreteBbox]> {
        self.discrete_content_bboxes.as_deref()
    }

    pub fn is_content_aware(&self) -> bool {
        self.layout.is_content_aware()
    }

    /// Labels paired with the discrete gold boxes, in the generation backend's shape.
    pub fn to_serialized(&self) -> GeneratedLayout {
        GeneratedLayout::from_processed(self)
    }

    pub(crate) fn into_parts(self) -> (LayoutData, Provenance) {
        (self.layout, self.provenance)
    }

    /// Any gold box collapsed to zero width or height on the grid.
    pub fn has_degenerate_gold(&self) -> bool {
        self.discrete_gold_bboxes.iter().any(DiscreteBbox::is_degenerate)
    }

    fn permuted(self, order: &[usize]) -> Self {
        let permute_discrete = |boxes: Vec<DiscreteBbox>| {
            if boxes.len() == order.len() {
                apply_permutation(&boxes, order)
            } else {
                boxes
            }
        };
        Self {
            layout: self.layout.permuted(order),
            provenance: self.provenance.permuted(order),
            discrete_bboxes: permute_discrete(self.discrete_bboxes),
            discrete_gold_bboxes: permute_discrete(self.discrete_gold_bboxes),
            discrete_content_bboxes: self.discrete_content_bboxes,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LayoutRecord: what flows between pipeline stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum LayoutRecord {
    Raw(LayoutData),
    Ordered(OrderedLayout),
    Processed(ProcessedLayoutData),
}

impl LayoutRecord {
    pub fn layout(&self) -> &LayoutData {
        match self {
            LayoutRecord::Raw(layout) => layout,
            LayoutRecord::Ordered(ordered) => &ordered.layout,
            LayoutRecord::Processed(processed) => &processed.layout,
        }
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            LayoutRecord::Raw(_) => None,
            LayoutRecord::Ordered(ordered) => Some(&ordered.provenance),
            LayoutRecord::Processed(processed) => Some(&processed.provenance),
        }
    }

    pub fn element_count(&self) -> usize {
        self.layout().element_count()
    }

    /// Reorders all parallel per-element arrays jointly.
    ///
    /// A raw record gets its provenance snapshot before the reorder, so
    /// `orig_*` always reflects the incoming order.
    pub fn permute(self, order: &[usize]) -> Result<LayoutRecord> {
        check_permutation(order, self.element_count())?;
        Ok(match self {
            LayoutRecord::Raw(layout) => {
                let provenance = Provenance::seed(&layout).permuted(order);
                LayoutRecord::Ordered(OrderedLayout {
                    layout: layout.permuted(order),
                    provenance,
                })
            }
            LayoutRecord::Ordered(ordered) => LayoutRecord::Ordered(OrderedLayout {
                layout: ordered.layout.permuted(order),
                provenance: ordered.provenance.permuted(order),
            }),
            LayoutRecord::Processed(processed) => {
                LayoutRecord::Processed(processed.permuted(order))
            }
        })
    }

    /// Replaces the working `bboxes` (not the gold boxes) with `f(bboxes)`.
    pub fn replace_bboxes<F>(self, f: F) -> Result<LayoutRecord>
    where
        F: FnOnce(&[NormalizedBbox]) -> Vec<NormalizedBbox>,
    {
        let (layout, provenance) = match self {
            LayoutRecord::Raw(layout) => {
                let provenance = Provenance::seed(&layout);
                (layout, provenance)
            }
            LayoutRecord::Ordered(ordered) => (ordered.layout, ordered.provenance),
            // Discrete arrays would go stale; re-enter as an ordered record so the
            // terminal stage recomputes them.
            LayoutRecord::Processed(processed) => processed.into_parts(),
        };
        let bboxes = layout.bboxes().ok_or(LayoutError::MissingElements)?;
        let replaced = f(bboxes);
        let labels = layout.labels.clone();
        let layout = layout.with_elements(Some(replaced), labels)?;
        Ok(LayoutRecord::Ordered(OrderedLayout { layout, provenance }))
    }
}

impl From<LayoutData> for LayoutRecord {
    fn from(layout: LayoutData) -> Self {
        LayoutRecord::Raw(layout)
    }
}

impl From<ProcessedLayoutData> for LayoutRecord {
    fn from(processed: ProcessedLayoutData) -> Self {
        LayoutRecord::Processed(processed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn check_permutation(order: &[usize], len: usize) -> Result<()> {
    if order.len() != len {
        return Err(LayoutError::ElementCountMismatch {
            bboxes: len,
            labels: order.len(),
        });
    }
    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(LayoutError::InvalidPipeline(format!(
                    "{order:?} is not a permutation of 0..{len}"
                )))
            }
        }
    }
    Ok(())
}

fn apply_permutation<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| items[i].clone()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> CanvasSize {
        CanvasSize::new(102, 150).unwrap()
    }

    fn bbox(left: f64, top: f64) -> NormalizedBbox {
        NormalizedBbox::new(left, top, 0.1, 0.1).unwrap()
    }

    fn make_layout() -> LayoutData {
        LayoutData::new(
            canvas(),
            Some(vec![bbox(0.5, 0.5), bbox(0.1, 0.1)]),
            Some(vec!["text".to_string(), "logo".to_string()]),
        )
        .unwrap()
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = LayoutData::new(
            canvas(),
            Some(vec![bbox(0.1, 0.1)]),
            Some(vec!["text".to_string(), "logo".to_string()]),
        );
        assert!(matches!(
            err,
            Err(LayoutError::ElementCountMismatch {
                bboxes: 1,
                labels: 2
            })
        ));
    }

    #[test]
    fn test_query_without_elements_is_valid() {
        let layout = LayoutData::new(canvas(), None, None).unwrap();
        assert_eq!(layout.element_count(), 0);
        assert!(!layout.has_annotations());
    }

    #[test]
    fn test_content_aware_requires_raster_and_boxes() {
        let layout = make_layout();
        assert!(!layout.is_content_aware());

        let with_boxes = layout
            .clone()
            .with_content_bboxes(vec![bbox(0.2, 0.2)])
            .unwrap();
        assert!(!with_boxes.is_content_aware(), "boxes without raster");

        let with_raster = layout.with_saliency_map(Arc::new(GrayImage::new(4, 4)));
        assert!(!with_raster.is_content_aware(), "raster without boxes");

        let both = with_raster.with_content_bboxes(vec![bbox(0.2, 0.2)]).unwrap();
        assert!(both.is_content_aware());
    }

    #[test]
    fn test_permute_raw_seeds_provenance_before_reorder() {
        let record = LayoutRecord::Raw(make_layout());
        let permuted = record.permute(&[1, 0]).unwrap();

        let provenance = permuted.provenance().unwrap();
        assert_eq!(provenance.orig_labels, vec!["text", "logo"]);
        assert_eq!(provenance.orig_bboxes, vec![bbox(0.5, 0.5), bbox(0.1, 0.1)]);
        assert_eq!(provenance.gold_bboxes, vec![bbox(0.1, 0.1), bbox(0.5, 0.5)]);
        assert_eq!(
            permuted.layout().labels().unwrap(),
            &["logo".to_string(), "text".to_string()]
        );
    }

    #[test]
    fn test_permute_rejects_non_permutation() {
        let record = LayoutRecord::Raw(make_layout());
        assert!(record.clone().permute(&[0, 0]).is_err());
        assert!(record.permute(&[0]).is_err());
    }

    #[test]
    fn test_replace_bboxes_keeps_gold() {
        let record = LayoutRecord::Raw(make_layout());
        let moved = record
            .replace_bboxes(|b| b.iter().map(|_| NormalizedBbox::ZERO).collect())
            .unwrap();
        assert_eq!(moved.layout().bboxes().unwrap()[0], NormalizedBbox::ZERO);
        assert_eq!(moved.provenance().unwrap().gold_bboxes[0], bbox(0.5, 0.5));
    }

    #[test]
    fn test_rasters_debug_prints_dimensions_only() {
        let rasters = ContentRasters {
            content_image: None,
            saliency_map: Some(Arc::new(GrayImage::new(3, 2))),
        };
        let printed = format!("{rasters:?}");
        assert!(printed.contains("(3, 2)"), "{printed}");
    }
}
