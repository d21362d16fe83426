//! Core utilities shared by the effect algorithms.
//!
//! This module provides:
//! - Gaussian kernel generation from an integer blur radius
//! - Padding math (`kernel_size_from_radius`, `grow_rect_from_radius`)
//! - Lookup-table helpers

use crate::geometry::Rect;

/// Standard deviation of the Gaussian for a blur radius.
pub fn sigma_from_radius(radius: f64) -> f64 {
    0.3 * radius + 0.3
}

/// Odd kernel size covering ±3 sigma.
pub fn kernel_size_from_radius(radius: f64) -> usize {
    6 * sigma_from_radius(radius).ceil() as usize + 1
}

/// Grow `rect` by half the Gaussian kernel for `radius`. Radius 0 means
/// no blur, so no growth.
pub fn grow_rect_from_radius(rect: Rect, radius: i32) -> Rect {
    if radius <= 0 {
        return rect;
    }
    let half = (kernel_size_from_radius(radius as f64) / 2) as i32;
    rect.grown(half)
}

/// Generate a normalized 1D Gaussian kernel for `radius`.
///
/// # Arguments
/// * `radius` - Blur radius in pixels
///
/// # Returns
/// Kernel of `kernel_size_from_radius(radius)` weights summing to 1.0
pub fn gaussian_kernel_1d(radius: f64) -> Vec<f32> {
    if radius <= 0.0 {
        return vec![1.0];
    }
    let sigma = sigma_from_radius(radius);
    let kernel_size = kernel_size_from_radius(radius);
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half as f64;
            (-x * x / (2.0 * sigma * sigma)).exp() as f32
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Identity lookup table.
pub fn identity_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = i as u8;
    }
    lut
}
