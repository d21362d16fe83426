//! Morphology on coverage masks: grow (dilate) and shrink (erode).
//!
//! Both use a circular structuring element. The disc is split into one
//! horizontal span per row offset, so each output pixel is the max over
//! `2r + 1` sliding-window maxima instead of the full `(2r + 1)²` area.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::geometry::Rect;
use crate::raster::CoverageMask;

// ============================================================================
// Sliding window
// ============================================================================

/// Max over `[i - half, i + half]` for every `i` of `row`, reading
/// `fill` beyond both ends.
fn sliding_max(row: &[u8], half: usize, fill: u8) -> Vec<u8> {
    let n = row.len();
    let at = |i: isize| -> u8 {
        if i < 0 || i >= n as isize {
            fill
        } else {
            row[i as usize]
        }
    };
    let mut out = Vec::with_capacity(n);
    let mut window: VecDeque<(isize, u8)> = VecDeque::new();
    let half = half as isize;

    // Prime with the left half of the first window
    for j in -half..half {
        let v = at(j);
        while window.back().is_some_and(|&(_, b)| b <= v) {
            window.pop_back();
        }
        window.push_back((j, v));
    }
    for i in 0..n as isize {
        let j = i + half;
        let v = at(j);
        while window.back().is_some_and(|&(_, b)| b <= v) {
            window.pop_back();
        }
        window.push_back((j, v));
        while window.front().is_some_and(|&(k, _)| k < i - half) {
            window.pop_front();
        }
        out.push(window.front().map_or(fill, |&(_, b)| b));
    }
    out
}

/// Half-width of the disc of `radius` at row offset `dy`.
fn span_half_width(radius: usize, dy: usize) -> usize {
    let r = radius as f64;
    let d = dy as f64;
    (r * r - d * d).max(0.0).sqrt().floor() as usize
}

/// Circular max filter. `input` is padded by `radius` on every side of the
/// `(height, width)` output.
fn dilate_padded(input: ArrayView2<u8>, radius: usize, height: usize, width: usize) -> Array2<u8> {
    let mut output = Array2::<u8>::zeros((height, width));
    let spans: Vec<usize> = (0..=radius).map(|dy| span_half_width(radius, dy)).collect();

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut out_row)| {
            let mut acc = vec![0u8; width];
            for dy in -(radius as isize)..=(radius as isize) {
                let src_row = (y as isize + radius as isize + dy) as usize;
                let half = spans[dy.unsigned_abs()];
                let row: Vec<u8> = input.row(src_row).iter().copied().collect();
                let maxes = sliding_max(&row, half, 0);
                for x in 0..width {
                    acc[x] = acc[x].max(maxes[x + radius]);
                }
            }
            for (o, v) in out_row.iter_mut().zip(acc) {
                *o = v;
            }
        });

    output
}

// ============================================================================
// Grow / shrink
// ============================================================================

/// Grow coverage by `radius` pixels inside `rect`.
///
/// # Arguments
/// * `mask` - Mask modified in place
/// * `rect` - Region whose pixels are recomputed
/// * `radius` - Grow radius; values <= 0 do nothing
pub fn grow_selection(mask: &mut CoverageMask, rect: Rect, radius: i32) {
    if radius <= 0 || rect.is_empty() {
        return;
    }
    let r = radius as usize;
    let input = mask.read_region(rect.grown(radius));
    let result = dilate_padded(input.view(), r, rect.height as usize, rect.width as usize);
    mask.write_region(rect.top_left(), result.view());
}

/// Shrink coverage by `radius` pixels inside `rect`.
///
/// Erosion is dilation of the complement: pixels beyond the mask extent
/// count as their default value, so shrinking never eats in from a padded
/// border that is fully covered.
pub fn shrink_selection(mask: &mut CoverageMask, rect: Rect, radius: i32) {
    if radius <= 0 || rect.is_empty() {
        return;
    }
    let r = radius as usize;
    let mut input = mask.read_region(rect.grown(radius));
    input.mapv_inplace(|v| 255 - v);
    let mut result = dilate_padded(input.view(), r, rect.height as usize, rect.width as usize);
    result.mapv_inplace(|v| 255 - v);
    mask.write_region(rect.top_left(), result.view());
}

/// Grow for positive `amount`, shrink for negative.
pub fn resize_selection(mask: &mut CoverageMask, rect: Rect, amount: i32) {
    if amount > 0 {
        grow_selection(mask, rect, amount);
    } else if amount < 0 {
        shrink_selection(mask, rect, -amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sliding_max() {
        let row = [0u8, 5, 0, 0, 9, 0];
        assert_eq!(sliding_max(&row, 1, 0), vec![5, 5, 5, 9, 9, 9]);
        assert_eq!(sliding_max(&row, 0, 0), row.to_vec());
    }

    #[test]
    fn test_grow_single_pixel_is_disc() {
        let mut mask = CoverageMask::new();
        mask.set_pixel(10, 10, 255);
        grow_selection(&mut mask, Rect::new(0, 0, 21, 21), 3);
        assert_eq!(mask.pixel(10, 10), 255);
        assert_eq!(mask.pixel(13, 10), 255);
        assert_eq!(mask.pixel(10, 7), 255);
        assert_eq!(mask.pixel(14, 10), 0);
        // Corner of the bounding square lies outside the disc
        assert_eq!(mask.pixel(13, 13), 0);
    }

    #[test]
    fn test_shrink_square() {
        let mut mask = CoverageMask::new();
        mask.fill(Rect::new(0, 0, 20, 20), 255);
        shrink_selection(&mut mask, Rect::new(-5, -5, 30, 30), 2);
        assert_eq!(mask.pixel(1, 10), 0);
        assert_eq!(mask.pixel(2, 10), 255);
        assert_eq!(mask.pixel(17, 10), 255);
        assert_eq!(mask.pixel(18, 10), 0);
    }

    #[test]
    fn test_resize_selection_direction() {
        let mut grown = CoverageMask::new();
        grown.fill(Rect::new(5, 5, 10, 10), 255);
        let mut shrunk = grown.clone();
        resize_selection(&mut grown, Rect::new(0, 0, 20, 20), 2);
        resize_selection(&mut shrunk, Rect::new(0, 0, 20, 20), -2);
        assert_eq!(grown.pixel(3, 10), 255);
        assert_eq!(shrunk.pixel(6, 10), 0);
        assert_eq!(shrunk.pixel(7, 10), 255);
    }
}
