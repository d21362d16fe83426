//! Directional-light shading of a height map (GIMP-style bump map).
//!
//! The coverage ramp built by bevel/emboss is treated as a height field.
//! Surface normals come from 3×3 column/row sums, get lit from an
//! azimuth/elevation light, and the shade is normalized so that a flat
//! surface lands on mid-grey (127).

use std::f64::consts::PI;

use ndarray::{Array2, Zip};

use crate::geometry::Rect;
use crate::raster::CoverageMask;

/// Mid-grey level produced by flat areas.
pub const FLAT_LEVEL: u8 = 127;

/// Height profile applied to the map before computing normals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BumpmapProfile {
    #[default]
    Linear,
    Spherical,
    Sinusoidal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BumpmapParams {
    /// Light direction in degrees.
    pub azimuth: f64,
    /// Light elevation in degrees (0-90).
    pub elevation: f64,
    /// Bump depth, >= 1.
    pub depth: i32,
    pub profile: BumpmapProfile,
    /// Invert heights (bump down instead of up).
    pub invert: bool,
    /// Ambient light, 0-255.
    pub ambient: i32,
    /// Divide the shade by the flat-surface brightness.
    pub compensate: bool,
}

impl Default for BumpmapParams {
    fn default() -> Self {
        BumpmapParams {
            azimuth: 135.0,
            elevation: 45.0,
            depth: 3,
            profile: BumpmapProfile::Linear,
            invert: false,
            ambient: 0,
            compensate: true,
        }
    }
}

fn profile_lut(profile: BumpmapProfile, invert: bool) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let n = i as f64 / 255.0;
        let shaped = match profile {
            BumpmapProfile::Linear => n,
            BumpmapProfile::Spherical => {
                let m = 1.0 - n;
                (1.0 - m * m).sqrt()
            }
            BumpmapProfile::Sinusoidal => ((-PI / 2.0 + PI * n).sin() + 1.0) / 2.0,
        };
        let value = (shaped * 255.0).round().clamp(0.0, 255.0) as u8;
        *v = if invert { 255 - value } else { value };
    }
    lut
}

/// Shade the height map in `mask` over `rect`, writing the result back.
///
/// Reads one extra pixel around `rect` for the normal estimate.
pub fn bumpmap(mask: &mut CoverageMask, rect: Rect, params: &BumpmapParams) {
    if rect.is_empty() {
        return;
    }
    let lut = profile_lut(params.profile, params.invert);
    let mut heights = mask.read_region(rect.grown(1));
    heights.mapv_inplace(|v| lut[v as usize]);

    let azimuth = params.azimuth.to_radians();
    let elevation = params.elevation.to_radians();
    let lx = azimuth.cos() * elevation.cos() * 255.0;
    let ly = azimuth.sin() * elevation.cos() * 255.0;
    let lz = elevation.sin() * 255.0;
    let nz = 6.0 * 255.0 / params.depth.max(1) as f64;
    let nz2 = nz * nz;
    let nzlz = nz * lz;
    let background = lz;
    let compensation = elevation.sin().max(1e-6);
    let ambient = params.ambient.clamp(0, 255) as f64;

    let mut result = Array2::<u8>::zeros((rect.height as usize, rect.width as usize));
    Zip::indexed(&mut result).par_for_each(|(r, c), out| {
        // Neighborhood rows r..r+3 / columns c..c+3 of the padded map
        let h = |dr: usize, dc: usize| heights[[r + dr, c + dc]] as f64;
        let nx = h(0, 0) + h(1, 0) + h(2, 0) - h(0, 2) - h(1, 2) - h(2, 2);
        let ny = h(2, 0) + h(2, 1) + h(2, 2) - h(0, 0) - h(0, 1) - h(0, 2);

        let shade = if nx == 0.0 && ny == 0.0 {
            background
        } else {
            let ndotl = nx * lx + ny * ly + nzlz;
            if ndotl < 0.0 {
                compensation * ambient
            } else {
                let s = ndotl / (nx * nx + ny * ny + nz2).sqrt();
                s + (255.0 * compensation - s).max(0.0) * ambient / 255.0
            }
        };

        let shade = if params.compensate { shade / compensation } else { shade };
        *out = (FLAT_LEVEL as f64 * shade / 255.0).round().clamp(0.0, 255.0) as u8;
    });

    mask.write_region(rect.top_left(), result.view());
}
