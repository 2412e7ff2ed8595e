//! Saliency map → content bounding boxes.
//!
//! Steps:
//! 1. Binarize: pixels strictly above `threshold` are foreground.
//! 2. Label 8-connected foreground components.
//! 3. Take the bounding rectangle of each component (never empty).
//! 4. Order by `(top, left)` so output is stable for identical input.
//!
//! An empty result means the observation cannot be content-scored; callers exclude it.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::models::bbox::{NormalizedBbox, PixelBbox};

pub const DEFAULT_FILTER_THRESHOLD: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaliencyExtractor {
    pub threshold: u8,
}

impl Default for SaliencyExtractor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FILTER_THRESHOLD,
        }
    }
}

impl SaliencyExtractor {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Pixel-space content boxes, sorted by `(top, left)`.
    pub fn extract(&self, raster: &GrayImage) -> Vec<PixelBbox> {
        let mask = binarize(raster, self.threshold);
        let components = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        // label → (min_x, min_y, max_x, max_y)
        let mut extents: BTreeMap<u32, (u32, u32, u32, u32)> = BTreeMap::new();
        for (x, y, pixel) in components.enumerate_pixels() {
            let label = pixel.0[0];
            if label == 0 {
                continue;
            }
            extents
                .entry(label)
                .and_modify(|e| {
                    e.0 = e.0.min(x);
                    e.1 = e.1.min(y);
                    e.2 = e.2.max(x);
                    e.3 = e.3.max(y);
                })
                .or_insert((x, y, x, y));
        }

        // Extents are inclusive pixel indices, so every component is at least 1x1.
        let mut boxes: Vec<PixelBbox> = extents
            .into_values()
            .map(|(x1, y1, x2, y2)| PixelBbox {
                x: x1,
                y: y1,
                width: x2 - x1 + 1,
                height: y2 - y1 + 1,
            })
            .collect();

        boxes.sort_by_key(|b| (b.y, b.x, b.width, b.height));
        boxes
    }

    /// Content boxes normalized by the saliency map's own dimensions.
    pub fn extract_normalized(&self, raster: &GrayImage) -> Vec<NormalizedBbox> {
        let (width, height) = raster.dimensions();
        self.extract(raster)
            .iter()
            .map(|b| b.normalize(width, height))
            .collect()
    }
}

/// Binary threshold: `v > threshold` → 255, else 0.
pub fn binarize(raster: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = raster.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let v = raster.get_pixel(x, y).0[0];
        Luma([if v > threshold { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([value]));
            }
        }
    }

    #[test]
    fn test_binarize_is_strictly_greater() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([101]));
        img.put_pixel(2, 0, Luma([255]));
        let mask = binarize(&img, 100);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(1, 0).0[0], 255);
        assert_eq!(mask.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn test_empty_map_yields_no_boxes() {
        let img = GrayImage::new(20, 20);
        assert!(SaliencyExtractor::default().extract(&img).is_empty());
    }

    #[test]
    fn test_below_threshold_is_ignored() {
        let mut img = GrayImage::new(20, 20);
        paint(&mut img, 2, 2, 5, 5, 90);
        assert!(SaliencyExtractor::new(100).extract(&img).is_empty());
    }

    #[test]
    fn test_two_components_sorted_by_top_then_left() {
        let mut img = GrayImage::new(40, 40);
        paint(&mut img, 20, 25, 6, 4, 200);
        paint(&mut img, 3, 2, 4, 5, 200);
        let boxes = SaliencyExtractor::default().extract(&img);
        assert_eq!(
            boxes,
            vec![
                PixelBbox {
                    x: 3,
                    y: 2,
                    width: 4,
                    height: 5
                },
                PixelBbox {
                    x: 20,
                    y: 25,
                    width: 6,
                    height: 4
                },
            ]
        );
    }

    #[test]
    fn test_single_pixel_component_is_one_by_one() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(7, 3, Luma([200]));
        let boxes = SaliencyExtractor::default().extract(&img);
        assert_eq!(
            boxes,
            vec![PixelBbox {
                x: 7,
                y: 3,
                width: 1,
                height: 1
            }]
        );
    }

    #[test]
    fn test_diagonal_pixels_are_one_component() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(1, 1, Luma([255]));
        img.put_pixel(2, 2, Luma([255]));
        img.put_pixel(3, 3, Luma([255]));
        let boxes = SaliencyExtractor::default().extract(&img);
        assert_eq!(boxes.len(), 1);
        assert_eq!((boxes[0].width, boxes[0].height), (3, 3));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let mut img = GrayImage::new(30, 30);
        paint(&mut img, 1, 1, 3, 3, 180);
        paint(&mut img, 10, 1, 3, 3, 180);
        paint(&mut img, 5, 20, 8, 2, 180);
        let extractor = SaliencyExtractor::default();
        assert_eq!(extractor.extract(&img), extractor.extract(&img));
    }

    #[test]
    fn test_extract_normalized_uses_map_dimensions() {
        let mut img = GrayImage::new(10, 20);
        paint(&mut img, 5, 10, 5, 10, 255);
        let boxes = SaliencyExtractor::default().extract_normalized(&img);
        assert_eq!(boxes, vec![NormalizedBbox::new(0.5, 0.5, 0.5, 0.5).unwrap()]);
    }
}
