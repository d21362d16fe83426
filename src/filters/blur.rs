//! Gaussian blur on coverage masks.
//!
//! Separable 2-pass convolution. Input is read from the mask over the
//! target rect padded by half a kernel, so pixels near the rect edges see
//! their real neighbors (or the mask's default pixel beyond its extent).

use ndarray::{Array2, Zip};

use super::core::gaussian_kernel_1d;
use crate::geometry::Rect;
use crate::raster::CoverageMask;

/// Blur `mask` inside `rect` with the Gaussian for `radius`.
///
/// # Arguments
/// * `mask` - Mask to blur in place
/// * `rect` - Region whose pixels are recomputed
/// * `radius` - Blur radius; 0 leaves the mask untouched
pub fn apply_gaussian(mask: &mut CoverageMask, rect: Rect, radius: i32) {
    if radius <= 0 || rect.is_empty() {
        return;
    }
    let kernel = gaussian_kernel_1d(radius as f64);
    let half = kernel.len() / 2;
    let padded = rect.grown(half as i32);
    let input = mask.read_region(padded);

    let (height, width) = (rect.height as usize, rect.width as usize);

    // Horizontal pass over every padded row
    let mut temp = Array2::<f32>::zeros((height + 2 * half, width));
    Zip::indexed(&mut temp).par_for_each(|(r, c), out| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            sum += input[[r, c + ki]] as f32 * kv;
        }
        *out = sum;
    });

    // Vertical pass
    let mut result = Array2::<u8>::zeros((height, width));
    Zip::indexed(&mut result).par_for_each(|(r, c), out| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            sum += temp[[r + ki, c]] * kv;
        }
        *out = sum.round().clamp(0.0, 255.0) as u8;
    });

    mask.write_region(rect.top_left(), result.view());
}
