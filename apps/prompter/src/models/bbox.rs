//! Geometric primitives shared by every pipeline stage.
//!
//! - `NormalizedBbox`: continuous `[left, top, width, height]` in canvas fractions.
//! - `DiscreteBbox`: `(x1, y1, x2, y2)` on an integer grid. Only the discretizer builds these.
//! - `PixelBbox`: raw `[x, y, w, h]` pixel rectangle as found on a raster.
//! - `CanvasSize`: pixel canvas, reused as the discretization grid.

use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, Result};

// ────────────────────────────────────────────────────────────────────────────
// Canvas
// ────────────────────────────────────────────────────────────────────────────

/// Canvas dimensions in pixels. When used as a grid, `width`/`height` are the
/// number of x/y cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    /// Rejects zero-sized canvases. Needed after deserialization, which bypasses `new`.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalized bbox
// ────────────────────────────────────────────────────────────────────────────

/// Bounding box in normalized canvas coordinates.
///
/// Every component lies in `[0, 1]`. Zero area is legal: it is the placeholder
/// for elements whose position has not been generated yet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedBbox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBbox {
    /// Zero-area placeholder at the origin.
    pub const ZERO: NormalizedBbox = NormalizedBbox {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Result<Self> {
        let bbox = Self {
            left,
            top,
            width,
            height,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Builds a box with every component clamped into `[0, 1]`. NaN becomes 0.
    pub fn clamped(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left: clamp_unit(left),
            top: clamp_unit(top),
            width: clamp_unit(width),
            height: clamp_unit(height),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("left", self.left),
            ("top", self.top),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(LayoutError::InvalidBbox(format!(
                    "{name}={value} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `[left, top, right, bottom]`.
    pub fn to_ltrb(&self) -> [f64; 4] {
        [self.left, self.top, self.right(), self.bottom()]
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Discrete bbox
// ────────────────────────────────────────────────────────────────────────────

/// Bounding box on an integer grid, `x1 <= x2 <= num_x_grid`, `y1 <= y2 <= num_y_grid`.
///
/// Fields are private: instances come from `transforms::discretize` only.
/// Deserialization goes through the same corner-order check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DiscreteCorners")]
pub struct DiscreteBbox {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

#[derive(Deserialize)]
struct DiscreteCorners {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl TryFrom<DiscreteCorners> for DiscreteBbox {
    type Error = LayoutError;

    fn try_from(c: DiscreteCorners) -> Result<Self> {
        if c.x1 > c.x2 || c.y1 > c.y2 {
            return Err(LayoutError::InvalidBbox(format!(
                "corners out of order: ({}, {}, {}, {})",
                c.x1, c.y1, c.x2, c.y2
            )));
        }
        Ok(Self::from_corners(c.x1, c.y1, c.x2, c.y2))
    }
}

impl DiscreteBbox {
    pub(crate) fn from_corners(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        debug_assert!(x1 <= x2 && y1 <= y2, "corners out of order");
        Self { x1, y1, x2, y2 }
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// True when the box has zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// `(x1, y1, x2, y2)`.
    pub fn to_tuple(&self) -> (u32, u32, u32, u32) {
        (self.x1, self.y1, self.x2, self.y2)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pixel bbox + box formats
// ────────────────────────────────────────────────────────────────────────────

/// Axis-aligned pixel rectangle `[x, y, w, h]` on a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBbox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBbox {
    /// Divides by the raster dimensions the box was found on.
    pub fn normalize(&self, raster_width: u32, raster_height: u32) -> NormalizedBbox {
        let w = raster_width.max(1) as f64;
        let h = raster_height.max(1) as f64;
        NormalizedBbox::clamped(
            self.x as f64 / w,
            self.y as f64 / h,
            self.width as f64 / w,
            self.height as f64 / h,
        )
    }
}

/// Layout of a raw four-number annotation box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFormat {
    /// `[x1, y1, x2, y2]`
    #[default]
    Ltrb,
    /// `[x, y, w, h]`
    Ltwh,
}

/// Converts an absolute pixel annotation box into a normalized `[x, y, w, h]` box.
///
/// Negative extents are rejected. Components that spill past the canvas are
/// clamped into `[0, 1]`.
pub fn normalize_pixel_box(
    raw: [f64; 4],
    format: BoxFormat,
    canvas: CanvasSize,
) -> Result<NormalizedBbox> {
    canvas.validate()?;

    let [x, y, third, fourth] = raw;
    let (w, h) = match format {
        BoxFormat::Ltrb => (third - x, fourth - y),
        BoxFormat::Ltwh => (third, fourth),
    };

    if raw.iter().any(|v| !v.is_finite()) {
        return Err(LayoutError::InvalidBbox(format!(
            "non-finite coordinate in {raw:?}"
        )));
    }
    if w < 0.0 || h < 0.0 {
        return Err(LayoutError::InvalidBbox(format!(
            "negative extent in {raw:?} ({format:?})"
        )));
    }

    let cw = canvas.width as f64;
    let ch = canvas.height as f64;
    Ok(NormalizedBbox::clamped(x / cw, y / ch, w / cw, h / ch))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
