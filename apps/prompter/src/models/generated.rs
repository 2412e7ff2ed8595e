//! Structured layout candidates exchanged with a generation backend.
//!
//! Coordinates are integer grid units on the task canvas, `[left, top, width, height]`.

use serde::{Deserialize, Serialize};

use crate::models::bbox::NormalizedBbox;
use crate::models::layout::{Label, ProcessedLayoutData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Coordinates {
    /// `[left, top, right, bottom]` as floats, for metric computation.
    pub fn to_ltrb(&self) -> [f64; 4] {
        let left = self.left as f64;
        let top = self.top as f64;
        [
            left,
            top,
            left + self.width as f64,
            top + self.height as f64,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedElement {
    pub class_name: Label,
    pub coord: Coordinates,
}

/// One generated layout candidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratedLayout {
    pub layouts: Vec<SerializedElement>,
}

impl GeneratedLayout {
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Boxes as `[left, top, right, bottom]`.
    pub fn ltrb_boxes(&self) -> Vec<[f64; 4]> {
        self.layouts.iter().map(|e| e.coord.to_ltrb()).collect()
    }

    /// Serialized form of a processed exemplar: labels paired with its discrete gold boxes.
    pub fn from_processed(data: &ProcessedLayoutData) -> Self {
        let layouts = data
            .labels()
            .iter()
            .zip(data.discrete_gold_bboxes())
            .map(|(label, bbox)| SerializedElement {
                class_name: label.clone(),
                coord: Coordinates {
                    left: bbox.x1() as i64,
                    top: bbox.y1() as i64,
                    width: bbox.width() as i64,
                    height: bbox.height() as i64,
                },
            })
            .collect();
        Self { layouts }
    }

    /// Normalized boxes relative to the canvas the layout was generated on.
    pub fn normalized_bboxes(&self, canvas_width: u32, canvas_height: u32) -> Vec<NormalizedBbox> {
        let w = canvas_width.max(1) as f64;
        let h = canvas_height.max(1) as f64;
        self.layouts
            .iter()
            .map(|e| {
                let b = NormalizedBbox::clamped(
                    e.coord.left as f64 / w,
                    e.coord.top as f64 / h,
                    e.coord.width as f64 / w,
                    e.coord.height as f64 / h,
                );
                // Far edge stays on the canvas.
                NormalizedBbox {
                    width: b.width.min(1.0 - b.left),
                    height: b.height.min(1.0 - b.top),
                    ..b
                }
            })
            .collect()
    }
}
