//! Repeating patterns for overlay fills and bevel textures.

use ndarray::{Array2, Array3};

use crate::error::StyleError;
use crate::geometry::{Point, Rect};
use crate::raster::{Color, CoverageMask, RasterPlane};

/// RGBA pattern tile.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pixels: Array3<u8>,
}

impl Pattern {
    /// Pattern from a flat RGBA buffer of `width × height` pixels.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, StyleError> {
        if width == 0 || height == 0 || data.len() != width * height * 4 {
            return Err(StyleError::InvalidPattern {
                width,
                height,
                len: data.len(),
            });
        }
        let pixels = Array3::from_shape_vec((height, width, 4), data).map_err(|_| StyleError::InvalidPattern {
            width,
            height,
            len: width * height * 4,
        })?;
        Ok(Pattern { pixels })
    }

    /// Pattern from an `(H, W, 4)` array.
    pub fn from_array(pixels: Array3<u8>) -> Result<Self, StyleError> {
        let (height, width, channels) = pixels.dim();
        if channels != 4 {
            return Err(StyleError::InvalidChannels { channels });
        }
        if width == 0 || height == 0 {
            return Err(StyleError::InvalidPattern { width, height, len: 0 });
        }
        Ok(Pattern { pixels })
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    /// Sample a pixel with tiling (modulo wrapping).
    #[inline]
    pub fn sample_tiled(&self, x: i64, y: i64) -> Color {
        let px = x.rem_euclid(self.width() as i64) as usize;
        let py = y.rem_euclid(self.height() as i64) as usize;
        Color::new(
            self.pixels[[py, px, 0]],
            self.pixels[[py, px, 1]],
            self.pixels[[py, px, 2]],
            self.pixels[[py, px, 3]],
        )
    }
}

/// Tile origin for a pattern: phase percentages of the tile size plus the
/// top-left of `bounds`, wrapped into the tile.
pub fn pattern_offset(pattern: &Pattern, bounds: Rect, horizontal_phase: i32, vertical_phase: i32) -> Point {
    let w = pattern.width() as i32;
    let h = pattern.height() as i32;
    let x = (w as f64 * horizontal_phase as f64 / 100.0) as i32 + bounds.x;
    let y = (h as f64 * vertical_phase as f64 / 100.0) as i32 + bounds.y;
    Point::new(x % w, y % h)
}

/// Pattern coordinates of layer pixel `(x, y)`.
#[inline]
fn pattern_coords(x: i32, y: i32, offset: Point, scale: f64) -> (i64, i64) {
    let px = ((x - offset.x) as f64 / scale).floor() as i64;
    let py = ((y - offset.y) as f64 / scale).floor() as i64;
    (px, py)
}

/// Tile `pattern` over `rect` of `device`, replacing its pixels.
///
/// # Arguments
/// * `offset` - Layer position of the tile origin
/// * `scale` - Pattern scale in percent (100 = original size)
pub fn fill_pattern(device: &mut RasterPlane, rect: Rect, pattern: &Pattern, offset: Point, scale: i32) {
    if rect.is_empty() {
        return;
    }
    let scale = scale.max(1) as f64 / 100.0;
    device.ensure_extent(rect);
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            let (px, py) = pattern_coords(x, y, offset, scale);
            device.put_pixel(x, y, pattern.sample_tiled(px, py));
        }
    }
    device.invalidate();
}

/// Coverage mask of pattern luminance × alpha over `rect`.
pub fn pattern_mask(rect: Rect, pattern: &Pattern, offset: Point, scale: i32) -> CoverageMask {
    let scale = scale.max(1) as f64 / 100.0;
    let data = Array2::from_shape_fn(
        (rect.height.max(0) as usize, rect.width.max(0) as usize),
        |(r, c)| {
            let (px, py) = pattern_coords(rect.x + c as i32, rect.y + r as i32, offset, scale);
            let color = pattern.sample_tiled(px, py);
            crate::raster::mul_u8(color.luminance(), color.a)
        },
    );
    CoverageMask::from_array(data, rect.top_left())
}
