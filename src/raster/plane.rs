//! Full-color raster planes.
//!
//! A `RasterPlane` stores 8-bit, non-premultiplied pixels in one of the
//! supported byte orders. Storage covers a layer-space extent; reads outside
//! it return the default pixel and writes outside it grow the storage.

use std::sync::OnceLock;

use ndarray::{s, Array3, ArrayView3};

use crate::error::StyleError;
use crate::geometry::{Point, Rect};

/// Byte order of a raster plane. Alpha is always the last channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub const ALPHA_INDEX: usize = 3;

    /// Convert a color into this format's byte order.
    #[inline]
    pub fn pack(&self, color: Color) -> [u8; 4] {
        match self {
            PixelFormat::Rgba8 => [color.r, color.g, color.b, color.a],
            PixelFormat::Bgra8 => [color.b, color.g, color.r, color.a],
        }
    }

    /// Read a color stored in this format's byte order.
    #[inline]
    pub fn unpack(&self, px: [u8; 4]) -> Color {
        match self {
            PixelFormat::Rgba8 => Color::new(px[0], px[1], px[2], px[3]),
            PixelFormat::Bgra8 => Color::new(px[2], px[1], px[0], px[3]),
        }
    }
}

/// Non-premultiplied 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::new(r, g, b, 255)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    /// BT.709 luma.
    pub fn luminance(&self) -> u8 {
        let l = 0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32;
        l.round().clamp(0.0, 255.0) as u8
    }

    /// Channels in RGBA order.
    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn from_array(v: [u8; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }

    /// Channel-wise linear interpolation, `t` in 0.0-1.0.
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8;
        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Color raster with a layer-space extent.
#[derive(Clone, Debug)]
pub struct RasterPlane {
    format: PixelFormat,
    extent: Rect,
    data: Array3<u8>,
    default_pixel: Color,
    bounds: OnceLock<Rect>,
}

impl Default for RasterPlane {
    fn default() -> Self {
        RasterPlane::new(PixelFormat::default())
    }
}

impl RasterPlane {
    /// Empty, fully transparent plane.
    pub fn new(format: PixelFormat) -> Self {
        RasterPlane {
            format,
            extent: Rect::default(),
            data: Array3::zeros((0, 0, 4)),
            default_pixel: Color::TRANSPARENT,
            bounds: OnceLock::new(),
        }
    }

    /// Wrap an external `(H, W, 4)` RGBA array placed at `origin`.
    pub fn from_rgba(image: ArrayView3<u8>, origin: Point) -> Result<Self, StyleError> {
        let (height, width, channels) = image.dim();
        if channels != 4 {
            return Err(StyleError::InvalidChannels { channels });
        }
        Ok(RasterPlane {
            format: PixelFormat::Rgba8,
            extent: Rect::new(origin.x, origin.y, width as i32, height as i32),
            data: image.to_owned(),
            default_pixel: Color::TRANSPARENT,
            bounds: OnceLock::new(),
        })
    }

    /// Filled plane of `rect` in the given format, mostly for tests.
    pub fn filled(format: PixelFormat, rect: Rect, color: Color) -> Self {
        let mut plane = RasterPlane::new(format);
        plane.fill_rect(rect, color);
        plane
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }

    /// Drop all content and switch to `format`.
    pub fn reinit(&mut self, format: PixelFormat) {
        self.format = format;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.extent = Rect::default();
        self.data = Array3::zeros((0, 0, 4));
        self.default_pixel = Color::TRANSPARENT;
        self.invalidate();
    }

    /// Make every pixel of `rect` fully transparent.
    pub fn clear_rect(&mut self, rect: Rect) {
        let area = rect.intersected(&self.extent);
        if area.is_empty() {
            return;
        }
        let (r0, c0) = self.local(area.x, area.y);
        self.data
            .slice_mut(s![r0..r0 + area.height as usize, c0..c0 + area.width as usize, ..])
            .fill(0);
        self.invalidate();
    }

    #[inline]
    fn local(&self, x: i32, y: i32) -> (usize, usize) {
        ((y - self.extent.y) as usize, (x - self.extent.x) as usize)
    }

    /// Forget the cached bounds after direct pixel writes.
    pub(crate) fn invalidate(&mut self) {
        self.bounds.take();
    }

    /// Pixel at layer coordinates, as RGBA.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        if !self.extent.contains_point(x, y) {
            return self.default_pixel;
        }
        let (r, c) = self.local(x, y);
        self.format.unpack([
            self.data[[r, c, 0]],
            self.data[[r, c, 1]],
            self.data[[r, c, 2]],
            self.data[[r, c, 3]],
        ])
    }

    /// Write a pixel. The caller must have called `ensure_extent` for it.
    #[inline]
    pub(crate) fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        let (r, c) = self.local(x, y);
        let px = self.format.pack(color);
        for (ch, v) in px.iter().enumerate() {
            self.data[[r, c, ch]] = *v;
        }
    }

    /// Grow storage so that `rect` is covered. New pixels take the default.
    pub fn ensure_extent(&mut self, rect: Rect) {
        if rect.is_empty() || self.extent.contains(&rect) {
            return;
        }
        let new_extent = self.extent.united(&rect);
        let fill = self.format.pack(self.default_pixel);
        let mut data = Array3::<u8>::zeros((new_extent.height as usize, new_extent.width as usize, 4));
        for ch in 0..4 {
            data.slice_mut(s![.., .., ch]).fill(fill[ch]);
        }
        if !self.extent.is_empty() {
            let r0 = (self.extent.y - new_extent.y) as usize;
            let c0 = (self.extent.x - new_extent.x) as usize;
            data.slice_mut(s![
                r0..r0 + self.extent.height as usize,
                c0..c0 + self.extent.width as usize,
                ..
            ])
            .assign(&self.data);
        }
        self.data = data;
        self.extent = new_extent;
        self.invalidate();
    }

    /// Set every pixel of `rect` to `color`, ignoring blending.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let px = self.format.pack(color);
        let (r0, c0) = self.local(rect.x, rect.y);
        let mut view = self
            .data
            .slice_mut(s![r0..r0 + rect.height as usize, c0..c0 + rect.width as usize, ..]);
        for ch in 0..4 {
            view.slice_mut(s![.., .., ch]).fill(px[ch]);
        }
        self.invalidate();
    }

    /// Copy `rect` from `src` verbatim, converting byte order if needed.
    pub fn copy_rect_from(&mut self, src: &RasterPlane, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                self.put_pixel(x, y, src.pixel(x, y));
            }
        }
        self.invalidate();
    }

    /// Bounding rect of pixels with non-zero alpha.
    pub fn exact_bounds(&self) -> Rect {
        *self.bounds.get_or_init(|| {
            let alpha = self.data.slice(s![.., .., PixelFormat::ALPHA_INDEX]);
            bounds_of_nonzero(alpha.rows().into_iter().map(|row| row.to_vec()), self.extent)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact_bounds().is_empty()
    }

    /// Alpha channel over `rect` (rows × columns).
    pub fn alpha_region(&self, rect: Rect) -> ndarray::Array2<u8> {
        let mut out = ndarray::Array2::<u8>::zeros((rect.height.max(0) as usize, rect.width.max(0) as usize));
        let area = rect.intersected(&self.extent);
        if !area.is_empty() {
            let (r0, c0) = self.local(area.x, area.y);
            let dr = (area.y - rect.y) as usize;
            let dc = (area.x - rect.x) as usize;
            out.slice_mut(s![dr..dr + area.height as usize, dc..dc + area.width as usize])
                .assign(&self.data.slice(s![
                    r0..r0 + area.height as usize,
                    c0..c0 + area.width as usize,
                    PixelFormat::ALPHA_INDEX
                ]));
        }
        out
    }

    /// RGBA copy of `rect`, `(H, W, 4)`.
    pub fn to_rgba(&self, rect: Rect) -> Array3<u8> {
        let mut out = Array3::<u8>::zeros((rect.height.max(0) as usize, rect.width.max(0) as usize, 4));
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                let px = self.pixel(x, y).to_array();
                let (r, c) = ((y - rect.y) as usize, (x - rect.x) as usize);
                for ch in 0..4 {
                    out[[r, c, ch]] = px[ch];
                }
            }
        }
        out
    }
}

/// Bounding rect of non-zero values in row-major rows laid out over `extent`.
pub(crate) fn bounds_of_nonzero<I>(rows: I, extent: Rect) -> Rect
where
    I: Iterator<Item = Vec<u8>>,
{
    let (mut left, mut top) = (i32::MAX, i32::MAX);
    let (mut right, mut bottom) = (i32::MIN, i32::MIN);
    for (r, row) in rows.enumerate() {
        let first = row.iter().position(|&v| v != 0);
        let last = row.iter().rposition(|&v| v != 0);
        if let (Some(first), Some(last)) = (first, last) {
            let y = extent.y + r as i32;
            top = top.min(y);
            bottom = bottom.max(y + 1);
            left = left.min(extent.x + first as i32);
            right = right.max(extent.x + last as i32 + 1);
        }
    }
    if right <= left {
        return Rect::default();
    }
    Rect::from_edges(left, top, right, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_pack_unpack_bgra() {
        let c = Color::new(10, 20, 30, 40);
        let packed = PixelFormat::Bgra8.pack(c);
        assert_eq!(packed, [30, 20, 10, 40]);
        assert_eq!(PixelFormat::Bgra8.unpack(packed), c);
    }

    #[test]
    fn test_from_rgba_rejects_wrong_channels() {
        let img = Array3::<u8>::zeros((4, 4, 3));
        assert!(matches!(
            RasterPlane::from_rgba(img.view(), Point::default()),
            Err(StyleError::InvalidChannels { channels: 3 })
        ));
    }

    #[test]
    fn test_fill_grows_extent_and_bounds() {
        let mut plane = RasterPlane::new(PixelFormat::Rgba8);
        plane.fill_rect(Rect::new(5, 5, 4, 4), Color::WHITE);
        plane.fill_rect(Rect::new(-2, 0, 2, 2), Color::BLACK);
        assert_eq!(plane.extent(), Rect::from_edges(-2, 0, 9, 9));
        assert_eq!(plane.exact_bounds(), Rect::from_edges(-2, 0, 9, 9));
        assert_eq!(plane.pixel(6, 6), Color::WHITE);
        assert_eq!(plane.pixel(2, 2), Color::TRANSPARENT);
        assert_eq!(plane.pixel(100, 100), Color::TRANSPARENT);

        plane.clear_rect(Rect::new(-2, 0, 2, 2));
        assert_eq!(plane.exact_bounds(), Rect::new(5, 5, 4, 4));
    }

    #[test]
    fn test_copy_rect_converts_format() {
        let src = RasterPlane::filled(PixelFormat::Rgba8, Rect::new(0, 0, 2, 2), Color::rgb(200, 0, 0));
        let mut dst = RasterPlane::new(PixelFormat::Bgra8);
        dst.copy_rect_from(&src, Rect::new(0, 0, 2, 2));
        assert_eq!(dst.pixel(1, 1), Color::rgb(200, 0, 0));
        assert_eq!(dst.to_rgba(Rect::new(0, 0, 1, 1))[[0, 0, 0]], 200);
    }

    #[test]
    fn test_luminance() {
        assert_eq!(Color::WHITE.luminance(), 255);
        assert_eq!(Color::BLACK.luminance(), 0);
    }
}
