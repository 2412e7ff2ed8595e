//! Continuous ↔ grid coordinates, and assembly of the final processed record.
//!
//! `discretize` clips each component to `[0, 1]`, converts to corner form,
//! scales by the grid and floors. Flooring (never rounding) keeps the mapping
//! monotone. `continuize` divides by the grid; the round trip is exact up to
//! one cell per coordinate.

use crate::errors::Result;
use crate::models::bbox::{CanvasSize, DiscreteBbox, NormalizedBbox};
use crate::models::layout::{LayoutRecord, ProcessedLayoutData, Provenance};

pub fn discretize(boxes: &[NormalizedBbox], grid: CanvasSize) -> Vec<DiscreteBbox> {
    boxes.iter().map(|b| discretize_one(b, grid)).collect()
}

pub fn continuize(boxes: &[DiscreteBbox], grid: CanvasSize) -> Vec<NormalizedBbox> {
    let gw = grid.width.max(1) as f64;
    let gh = grid.height.max(1) as f64;
    boxes
        .iter()
        .map(|b| {
            NormalizedBbox::clamped(
                b.x1() as f64 / gw,
                b.y1() as f64 / gh,
                b.width() as f64 / gw,
                b.height() as f64 / gh,
            )
        })
        .collect()
}

fn discretize_one(bbox: &NormalizedBbox, grid: CanvasSize) -> DiscreteBbox {
    let clipped = NormalizedBbox::clamped(bbox.left, bbox.top, bbox.width, bbox.height);
    // Corners are clipped again so the far edge never leaves the grid.
    let x1 = clipped.left;
    let y1 = clipped.top;
    let x2 = clipped.right().min(1.0);
    let y2 = clipped.bottom().min(1.0);

    let scale = |v: f64, cells: u32| (v * cells as f64).floor() as u32;
    let (dx1, dx2) = (scale(x1, grid.width), scale(x2, grid.width));
    let (dy1, dy2) = (scale(y1, grid.height), scale(y2, grid.height));
    DiscreteBbox::from_corners(dx1, dy1, dx2.max(dx1), dy2.max(dy1))
}

/// Terminal pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discretizer {
    grid: CanvasSize,
}

impl Discretizer {
    pub fn new(grid: CanvasSize) -> Result<Self> {
        grid.validate()?;
        Ok(Self { grid })
    }

    pub fn grid(&self) -> CanvasSize {
        self.grid
    }

    pub fn discretize(&self, boxes: &[NormalizedBbox]) -> Vec<DiscreteBbox> {
        discretize(boxes, self.grid)
    }

    pub fn continuize(&self, boxes: &[DiscreteBbox]) -> Vec<NormalizedBbox> {
        continuize(boxes, self.grid)
    }

    /// Builds the processed record.
    ///
    /// Provenance is carried forward from an already ordered or processed
    /// record, or seeded from the current elements of a raw one. Content boxes
    /// are discretized only for content-aware records.
    pub fn apply(&self, record: LayoutRecord) -> Result<ProcessedLayoutData> {
        let (layout, provenance) = match record {
            LayoutRecord::Raw(layout) => {
                let provenance = Provenance::seed(&layout);
                (layout, provenance)
            }
            LayoutRecord::Ordered(ordered) => (ordered.layout, ordered.provenance),
            LayoutRecord::Processed(processed) => processed.into_parts(),
        };

        let discrete_bboxes = self.discretize(layout.bboxes().unwrap_or_default());
        let discrete_gold_bboxes = self.discretize(&provenance.gold_bboxes);
        let discrete_content_bboxes = if layout.is_content_aware() {
            layout.content_bboxes().map(|boxes| self.discretize(boxes))
        } else {
            None
        };

        Ok(ProcessedLayoutData::assemble(
            layout,
            provenance,
            discrete_bboxes,
            discrete_gold_bboxes,
            discrete_content_bboxes,
        ))
    }
}
