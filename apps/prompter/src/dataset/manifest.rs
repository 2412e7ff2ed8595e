//! Local dataset manifest: splits of raw records backed by image files.
//!
//! ```json
//! {
//!   "splits": {
//!     "train": [
//!       {
//!         "saliency_map": "saliency/0001.png",
//!         "content_image": "inpainted/0001.png",
//!         "canvas_width": 513,
//!         "canvas_height": 750,
//!         "annotations": {
//!           "labels": ["logo", "text"],
//!           "boxes": [[120, 40, 390, 110], [60, 600, 450, 680]],
//!           "box_format": "ltrb"
//!         }
//!       }
//!     ],
//!     "test": [ ... ]
//!   }
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory. Annotation boxes
//! are absolute pixels on the record's canvas and are normalized on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{LayoutError, Result};
use crate::models::bbox::{normalize_pixel_box, BoxFormat, CanvasSize};
use crate::models::layout::{Label, LayoutData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub labels: Vec<Label>,
    pub boxes: Vec<[f64; 4]>,
    #[serde(default)]
    pub box_format: BoxFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub saliency_map: PathBuf,
    #[serde(default)]
    pub content_image: Option<PathBuf>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    #[serde(default)]
    pub annotations: Option<Annotations>,
}

/// Records of one split that decoded cleanly, plus `(index, reason)` for the rest.
#[derive(Debug, Clone, Default)]
pub struct LoadedSplit {
    pub records: Vec<LayoutData>,
    pub failed: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub splits: BTreeMap<String, Vec<RawRecord>>,
    #[serde(skip)]
    root: PathBuf,
}

impl Manifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut manifest: Manifest = serde_json::from_str(&raw)?;
        manifest.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(
            path = %path.display(),
            splits = ?manifest.split_names(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    pub fn split_names(&self) -> Vec<&str> {
        self.splits.keys().map(String::as_str).collect()
    }

    pub fn raw_split(&self, name: &str) -> Option<&[RawRecord]> {
        self.splits.get(name).map(Vec::as_slice)
    }

    /// Decodes every record of a split onto `canvas` (the task canvas). Each
    /// record keeps its position as `idx`; a record that fails to decode is
    /// reported in `failed` and does not stop the others.
    pub fn load_split(&self, name: &str, canvas: CanvasSize) -> LoadedSplit {
        let mut loaded = LoadedSplit::default();
        for (idx, raw) in self.raw_split(name).unwrap_or_default().iter().enumerate() {
            match self.load_record(raw, canvas) {
                Ok(layout) => loaded.records.push(layout.with_index(idx)),
                Err(e) => {
                    warn!(split = name, idx, error = %e, "record failed to load");
                    loaded.failed.push((idx, e.to_string()));
                }
            }
        }
        loaded
    }

    pub fn load_record(&self, raw: &RawRecord, canvas: CanvasSize) -> Result<LayoutData> {
        let source_canvas = CanvasSize::new(raw.canvas_width, raw.canvas_height)?;

        let (bboxes, labels) = match &raw.annotations {
            Some(annotations) => {
                if annotations.boxes.len() != annotations.labels.len() {
                    return Err(LayoutError::ElementCountMismatch {
                        bboxes: annotations.boxes.len(),
                        labels: annotations.labels.len(),
                    });
                }
                let bboxes = annotations
                    .boxes
                    .iter()
                    .map(|b| normalize_pixel_box(*b, annotations.box_format, source_canvas))
                    .collect::<Result<Vec<_>>>()?;
                (Some(bboxes), Some(annotations.labels.clone()))
            }
            None => (None, None),
        };

        let saliency = image::open(self.resolve(&raw.saliency_map))?.to_luma8();
        let mut layout =
            LayoutData::new(canvas, bboxes, labels)?.with_saliency_map(Arc::new(saliency));
        if let Some(content_image) = &raw.content_image {
            let image = image::open(self.resolve(content_image))?;
            layout = layout.with_content_image(Arc::new(image));
        }
        Ok(layout)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
