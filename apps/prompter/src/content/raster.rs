//! Binary content masks on the discretization grid.
//!
//! A mask is the union of a layout's discrete content boxes drawn as filled
//! rectangles. Cell `(x, y)` is covered by box `(x1, y1, x2, y2)` when
//! `x1 <= x < x2` and `y1 <= y < y2`.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::models::bbox::{CanvasSize, DiscreteBbox};

const FILLED: Luma<u8> = Luma([255]);

#[derive(Debug, Clone, PartialEq)]
pub struct ContentMask {
    mask: GrayImage,
}

impl ContentMask {
    /// Draws every box onto a blank `grid.width × grid.height` canvas. Zero-area
    /// boxes contribute nothing.
    pub fn rasterize(boxes: &[DiscreteBbox], grid: CanvasSize) -> Self {
        let mut mask = GrayImage::new(grid.width, grid.height);
        for bbox in boxes.iter().filter(|b| !b.is_degenerate()) {
            let rect =
                Rect::at(bbox.x1() as i32, bbox.y1() as i32).of_size(bbox.width(), bbox.height());
            draw_filled_rect_mut(&mut mask, rect, FILLED);
        }
        Self { mask }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    pub fn is_filled(&self, x: u32, y: u32) -> bool {
        self.mask
            .get_pixel_checked(x, y)
            .map(|p| p.0[0] > 0)
            .unwrap_or(false)
    }

    /// Number of covered cells.
    pub fn filled(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    /// `(|A ∩ B| + 1) / (|A ∪ B| + 1)`.
    ///
    /// Masks of different sizes are compared over the larger extent; cells
    /// outside a mask count as empty.
    pub fn smoothed_iou(&self, other: &ContentMask) -> f64 {
        let (aw, ah) = self.dimensions();
        let (bw, bh) = other.dimensions();
        let (width, height) = (aw.max(bw), ah.max(bh));

        let mut intersection = 0usize;
        let mut union = 0usize;
        for y in 0..height {
            for x in 0..width {
                let a = self.is_filled(x, y);
                let b = other.is_filled(x, y);
                if a && b {
                    intersection += 1;
                }
                if a || b {
                    union += 1;
                }
            }
        }
        (intersection + 1) as f64 / (union + 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CanvasSize {
        CanvasSize::new(10, 10).unwrap()
    }

    #[test]
    fn test_rasterize_is_half_open() {
        let mask = ContentMask::rasterize(&[DiscreteBbox::from_corners(2, 3, 5, 4)], grid());
        assert_eq!(mask.filled(), 3);
        assert!(mask.is_filled(2, 3));
        assert!(mask.is_filled(4, 3));
        assert!(!mask.is_filled(5, 3));
        assert!(!mask.is_filled(2, 4));
    }

    #[test]
    fn test_overlapping_boxes_accumulate_as_union() {
        let boxes = [
            DiscreteBbox::from_corners(0, 0, 4, 4),
            DiscreteBbox::from_corners(2, 2, 6, 6),
        ];
        let mask = ContentMask::rasterize(&boxes, grid());
        assert_eq!(mask.filled(), 16 + 16 - 4);
    }

    #[test]
    fn test_degenerate_box_draws_nothing() {
        let mask = ContentMask::rasterize(&[DiscreteBbox::from_corners(3, 3, 3, 9)], grid());
        assert_eq!(mask.filled(), 0);
    }

    #[test]
    fn test_box_reaching_grid_edge() {
        let mask = ContentMask::rasterize(&[DiscreteBbox::from_corners(8, 8, 10, 10)], grid());
        assert_eq!(mask.filled(), 4);
        assert!(mask.is_filled(9, 9));
    }

    #[test]
    fn test_smoothed_iou_values() {
        let a = ContentMask::rasterize(&[DiscreteBbox::from_corners(0, 0, 4, 2)], grid());
        let b = ContentMask::rasterize(&[DiscreteBbox::from_corners(2, 0, 6, 2)], grid());
        // intersection 4, union 12
        assert!((a.smoothed_iou(&b) - 5.0 / 13.0).abs() < 1e-12);
        assert_eq!(a.smoothed_iou(&a), 1.0);
    }

    #[test]
    fn test_smoothed_iou_of_empty_masks_is_one() {
        let empty = ContentMask::rasterize(&[], grid());
        assert_eq!(empty.smoothed_iou(&empty), 1.0);
    }

    #[test]
    fn test_smoothed_iou_is_symmetric() {
        let a = ContentMask::rasterize(&[DiscreteBbox::from_corners(1, 1, 7, 3)], grid());
        let b = ContentMask::rasterize(&[DiscreteBbox::from_corners(0, 2, 3, 9)], grid());
        assert_eq!(a.smoothed_iou(&b), b.smoothed_iou(&a));
    }
}
