//! Per-task settings: canvas, domain, label vocabulary.
//!
//! Loaded once per run and shared read-only by every pipeline stage.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, Result};
use crate::models::bbox::CanvasSize;
use crate::models::layout::Label;
use crate::transforms::ordering::LabelDictSort;

pub const POSTER_LAYOUT: &str = "poster-layout";
pub const RICO25: &str = "rico25";

const RICO25_LABELS: [&str; 25] = [
    "text",
    "image",
    "icon",
    "list-item",
    "text-button",
    "toolbar",
    "web-view",
    "input",
    "card",
    "advertisement",
    "background-image",
    "drawer",
    "radio-button",
    "checkbox",
    "multi-tab",
    "pager-indicator",
    "modal",
    "on/off-switch",
    "slider",
    "map-view",
    "button-bar",
    "video",
    "bottom-navigation",
    "number-stepper",
    "date-picker",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSettings {
    pub name: String,
    pub domain: String,
    pub canvas_size: CanvasSize,
    pub labels: Vec<Label>,
}

impl TaskSettings {
    pub fn poster_layout() -> Self {
        Self {
            name: POSTER_LAYOUT.to_string(),
            domain: "poster".to_string(),
            canvas_size: CanvasSize {
                width: 102,
                height: 150,
            },
            labels: ["text", "logo", "underlay"].map(String::from).to_vec(),
        }
    }

    pub fn rico25() -> Self {
        Self {
            name: RICO25.to_string(),
            domain: "android".to_string(),
            canvas_size: CanvasSize {
                width: 90,
                height: 160,
            },
            labels: RICO25_LABELS.map(String::from).to_vec(),
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            POSTER_LAYOUT => Some(Self::poster_layout()),
            RICO25 => Some(Self::rico25()),
            _ => None,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: TaskSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// A preset name, or else a path to a JSON settings file.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match Self::preset(name_or_path) {
            Some(settings) => Ok(settings),
            None => Self::from_json_file(Path::new(name_or_path)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.canvas_size.validate()?;
        if self.labels.is_empty() {
            return Err(LayoutError::InvalidPipeline(format!(
                "task '{}' has an empty label vocabulary",
                self.name
            )));
        }
        Ok(())
    }

    /// Label ordering keyed by vocabulary position.
    pub fn label_dict_sort(&self) -> LabelDictSort {
        LabelDictSort::new(self.labels.iter().cloned())
    }
}
