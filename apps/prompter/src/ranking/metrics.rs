//! Layout quality metrics over `[left, top, right, bottom]` boxes in canvas fractions.
//!
//! Lower is better for both metrics. An empty layout scores 0.

/// Alignment (LayoutGAN++ formulation).
///
/// For each element, `d` is the smallest absolute difference between one of its
/// six guide lines (left, x-center, right, top, y-center, bottom) and the same
/// guide line of any other element. The element contributes `-ln(1 - d)`, or
/// nothing when it has no neighbour within the unit range. The total is
/// averaged over elements.
pub fn compute_alignment(boxes: &[[f64; 4]]) -> f64 {
    let n = boxes.len();
    if n == 0 {
        return 0.0;
    }

    let guides: Vec<[f64; 6]> = boxes
        .iter()
        .map(|&[l, t, r, b]| [l, (l + r) / 2.0, r, t, (t + b) / 2.0, b])
        .collect();
    let guides = &guides;

    let total: f64 = (0..n)
        .map(|i| {
            let d = (0..n)
                .filter(|&j| j != i)
                .flat_map(|j| (0..6).map(move |k| (guides[i][k] - guides[j][k]).abs()))
                .fold(1.0f64, f64::min);
            if d >= 1.0 {
                0.0
            } else {
                -(1.0 - d).ln()
            }
        })
        .sum();

    nan_to_zero(total / n as f64)
}

/// Overlap (Attribute-conditioned LayoutGAN formulation).
///
/// Sum over ordered pairs `i != j` of the strict intersection area divided by
/// the area of `i`, averaged over elements. Zero-area elements contribute 0.
pub fn compute_overlap(boxes: &[[f64; 4]]) -> f64 {
    let n = boxes.len();
    if n == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for (i, a) in boxes.iter().enumerate() {
        let area = (a[2] - a[0]) * (a[3] - a[1]);
        if area <= 0.0 {
            continue;
        }
        for (j, b) in boxes.iter().enumerate() {
            if i == j {
                continue;
            }
            total += nan_to_zero(intersection(a, b) / area);
        }
    }
    nan_to_zero(total / n as f64)
}

/// Intersection area; boxes that only touch do not intersect.
fn intersection(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let l = a[0].max(b[0]);
    let t = a[1].max(b[1]);
    let r = a[2].min(b[2]);
    let bt = a[3].min(b[3]);
    if l < r && t < bt {
        (r - l) * (bt - t)
    } else {
        0.0
    }
}

fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Min-max scaling to `[0, 1]`. A constant input maps to all zeros.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|v| nan_to_zero((v - min) / (max - min)))
        .collect()
}
