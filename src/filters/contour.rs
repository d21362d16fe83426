//! Coverage remapping: edge sharpening, range adjustment and contour curves.

use crate::geometry::Rect;
use crate::raster::{mul_u8, CoverageMask};

/// A 256-entry coverage remapping curve.
pub type ContourCurve = [u8; 256];

/// Coverage below which `find_edge` treats a pixel as soft edge.
pub const SOFT_EDGE_THRESHOLD: u8 = 24;

/// Sharpen coverage in `rect`.
///
/// With a hidden edge, faint coverage (< 24) is boosted ×10 and the rest
/// becomes fully opaque. A visible edge turns the whole rect opaque.
pub fn find_edge(mask: &mut CoverageMask, rect: Rect, edge_hidden: bool) {
    let mut lut = [255u8; 256];
    if edge_hidden {
        for (i, v) in lut.iter_mut().enumerate().take(SOFT_EDGE_THRESHOLD as usize) {
            *v = (i * 10) as u8;
        }
    }
    mask.map_region(rect, &lut);
}

/// Lookup table stretching coverage so that `range` % maps to full.
pub fn range_lut(range: i32) -> ContourCurve {
    let range = range.clamp(1, 100) as f64;
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = (i as f64 * 100.0 / range).round().min(255.0) as u8;
    }
    lut
}

/// Stretch coverage in `rect` by the range percentage. 100 % is identity.
pub fn adjust_range(mask: &mut CoverageMask, rect: Rect, range: i32) {
    if range >= 100 {
        return;
    }
    mask.map_region(rect, &range_lut(range));
}

/// Built-in curve fading coverage in over the first 24 levels.
fn hidden_edge_contour() -> ContourCurve {
    let mut contour = [0u8; 256];
    for (i, v) in contour.iter_mut().enumerate() {
        *v = (i * 11).min(255) as u8;
    }
    contour
}

/// Index used for a stepped (non anti-aliased) lookup: 17 levels.
#[inline]
fn stepped_index(i: usize) -> usize {
    (((i as f64 / 16.0).round() as usize) * 16).min(255)
}

/// Final lookup table combining the user curve with the edge options.
pub fn contour_lut(curve: &ContourCurve, antialiased: bool, edge_hidden: bool) -> ContourCurve {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let index = if antialiased { i } else { stepped_index(i) };
        *v = curve[index];
    }
    if edge_hidden {
        let edge = hidden_edge_contour();
        for (v, e) in lut.iter_mut().zip(edge) {
            *v = mul_u8(*v, e);
        }
    }
    lut
}

/// Remap coverage in `rect` through the contour curve.
pub fn apply_contour_correction(
    mask: &mut CoverageMask,
    rect: Rect,
    curve: &ContourCurve,
    antialiased: bool,
    edge_hidden: bool,
) {
    mask.map_region(rect, &contour_lut(curve, antialiased, edge_hidden));
}
