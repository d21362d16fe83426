//! Single-channel coverage masks.
//!
//! Coverage masks are the working surface of every effect: alpha gets
//! extracted into one, grown, blurred and remapped, and the result drives
//! the final fill. Storage is an `Array2<u8>` over a layer-space extent with
//! a default value for everything outside it.

use std::sync::OnceLock;

use ndarray::{s, Array2, ArrayView2};

use super::plane::{bounds_of_nonzero, RasterPlane};
use crate::geometry::{Point, Rect};

/// How `CoverageMask::blit` combines source coverage into the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskOp {
    /// `dst + (src - dst) * opacity / 255`
    Copy(u8),
    /// `dst * (255 - src) / 255`
    Erase,
    /// `dst * src / 255`
    Intersect,
    /// `max(dst, src)`
    Union,
}

/// Exact `a * b / 255` with rounding.
#[inline]
pub fn mul_u8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// `a + (b - a) * t / 255` with rounding.
#[inline]
pub fn lerp_u8(a: u8, b: u8, t: u8) -> u8 {
    let diff = b as i32 - a as i32;
    let delta = (diff * t as i32 + if diff >= 0 { 127 } else { -127 }) / 255;
    (a as i32 + delta) as u8
}

#[derive(Clone, Debug)]
pub struct CoverageMask {
    extent: Rect,
    data: Array2<u8>,
    default_pixel: u8,
    bounds: OnceLock<Rect>,
}

impl Default for CoverageMask {
    fn default() -> Self {
        CoverageMask::new()
    }
}

impl CoverageMask {
    /// Empty mask, fully unselected.
    pub fn new() -> Self {
        CoverageMask {
            extent: Rect::default(),
            data: Array2::zeros((0, 0)),
            default_pixel: 0,
            bounds: OnceLock::new(),
        }
    }

    /// Mask holding `data` with its top-left at `origin`.
    pub fn from_array(data: Array2<u8>, origin: Point) -> Self {
        let (h, w) = data.dim();
        CoverageMask {
            extent: Rect::new(origin.x, origin.y, w as i32, h as i32),
            data,
            default_pixel: 0,
            bounds: OnceLock::new(),
        }
    }

    /// Extract the alpha channel of `plane` over `rect`.
    pub fn from_alpha(plane: &RasterPlane, rect: Rect) -> Self {
        CoverageMask::from_array(plane.alpha_region(rect), rect.top_left())
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }

    pub fn default_pixel(&self) -> u8 {
        self.default_pixel
    }

    /// Change the value returned outside the stored extent. Stored pixels
    /// are left alone.
    pub fn set_default_pixel(&mut self, value: u8) {
        self.default_pixel = value;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.bounds.take();
    }

    #[inline]
    fn local(&self, x: i32, y: i32) -> (usize, usize) {
        ((y - self.extent.y) as usize, (x - self.extent.x) as usize)
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        if !self.extent.contains_point(x, y) {
            return self.default_pixel;
        }
        self.data[self.local(x, y)]
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, value: u8) {
        self.ensure_extent(Rect::new(x, y, 1, 1));
        let idx = self.local(x, y);
        self.data[idx] = value;
        self.invalidate();
    }

    /// Grow storage so that `rect` is covered. New pixels take the default.
    pub fn ensure_extent(&mut self, rect: Rect) {
        if rect.is_empty() || self.extent.contains(&rect) {
            return;
        }
        let new_extent = self.extent.united(&rect);
        let mut data = Array2::from_elem(
            (new_extent.height as usize, new_extent.width as usize),
            self.default_pixel,
        );
        if !self.extent.is_empty() {
            let r0 = (self.extent.y - new_extent.y) as usize;
            let c0 = (self.extent.x - new_extent.x) as usize;
            data.slice_mut(s![
                r0..r0 + self.extent.height as usize,
                c0..c0 + self.extent.width as usize
            ])
            .assign(&self.data);
        }
        self.data = data;
        self.extent = new_extent;
    }

    /// Copy of `rect` (rows × columns), default-filled outside the extent.
    pub fn read_region(&self, rect: Rect) -> Array2<u8> {
        let mut out = Array2::from_elem(
            (rect.height.max(0) as usize, rect.width.max(0) as usize),
            self.default_pixel,
        );
        let area = rect.intersected(&self.extent);
        if !area.is_empty() {
            let (r0, c0) = self.local(area.x, area.y);
            let dr = (area.y - rect.y) as usize;
            let dc = (area.x - rect.x) as usize;
            out.slice_mut(s![dr..dr + area.height as usize, dc..dc + area.width as usize])
                .assign(&self.data.slice(s![
                    r0..r0 + area.height as usize,
                    c0..c0 + area.width as usize
                ]));
        }
        out
    }

    /// Overwrite the pixels of `rect` (top-left of `values`) with `values`.
    pub fn write_region(&mut self, origin: Point, values: ArrayView2<u8>) {
        let (h, w) = values.dim();
        let rect = Rect::new(origin.x, origin.y, w as i32, h as i32);
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let (r0, c0) = self.local(rect.x, rect.y);
        self.data
            .slice_mut(s![r0..r0 + h, c0..c0 + w])
            .assign(&values);
        self.invalidate();
    }

    /// Set every pixel of `rect` to `value`.
    pub fn fill(&mut self, rect: Rect, value: u8) {
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let (r0, c0) = self.local(rect.x, rect.y);
        self.data
            .slice_mut(s![r0..r0 + rect.height as usize, c0..c0 + rect.width as usize])
            .fill(value);
        self.invalidate();
    }

    /// Drop all content; the mask becomes empty with default 0.
    pub fn clear(&mut self) {
        self.extent = Rect::default();
        self.data = Array2::zeros((0, 0));
        self.default_pixel = 0;
        self.invalidate();
    }

    /// Zero the stored pixels inside `rect`.
    pub fn clear_rect(&mut self, rect: Rect) {
        let area = rect.intersected(&self.extent);
        if area.is_empty() {
            return;
        }
        let (r0, c0) = self.local(area.x, area.y);
        self.data
            .slice_mut(s![r0..r0 + area.height as usize, c0..c0 + area.width as usize])
            .fill(0);
        self.invalidate();
    }

    /// `v -> 255 - v` everywhere, including the default pixel.
    pub fn invert(&mut self) {
        self.data.mapv_inplace(|v| 255 - v);
        self.default_pixel = 255 - self.default_pixel;
        self.invalidate();
    }

    /// Remap the pixels of `rect` through a lookup table.
    pub fn map_region(&mut self, rect: Rect, lut: &[u8; 256]) {
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let (r0, c0) = self.local(rect.x, rect.y);
        self.data
            .slice_mut(s![r0..r0 + rect.height as usize, c0..c0 + rect.width as usize])
            .mapv_inplace(|v| lut[v as usize]);
        self.invalidate();
    }

    /// Shift the whole mask by `offset`.
    pub fn translate(&mut self, offset: Point) {
        self.extent = self.extent.translated(offset);
        self.invalidate();
    }

    /// Combine `src` into this mask over `rect`.
    pub fn blit(&mut self, src: &CoverageMask, rect: Rect, op: MaskOp) {
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let values = src.read_region(rect);
        let (r0, c0) = self.local(rect.x, rect.y);
        let mut view = self
            .data
            .slice_mut(s![r0..r0 + rect.height as usize, c0..c0 + rect.width as usize]);
        ndarray::Zip::from(&mut view).and(&values).for_each(|d, &s| {
            *d = match op {
                MaskOp::Copy(opacity) => lerp_u8(*d, s, opacity),
                MaskOp::Erase => mul_u8(*d, 255 - s),
                MaskOp::Intersect => mul_u8(*d, s),
                MaskOp::Union => (*d).max(s),
            }
        });
        self.invalidate();
    }

    /// Bounding rect of non-zero coverage. A mask whose default pixel is
    /// non-zero reports its stored extent.
    pub fn exact_bounds(&self) -> Rect {
        if self.default_pixel != 0 {
            return self.extent;
        }
        *self
            .bounds
            .get_or_init(|| bounds_of_nonzero(self.data.rows().into_iter().map(|r| r.to_vec()), self.extent))
    }

    pub fn is_empty(&self) -> bool {
        self.exact_bounds().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_and_lerp_exact() {
        assert_eq!(mul_u8(255, 255), 255);
        assert_eq!(mul_u8(255, 127), 127);
        assert_eq!(mul_u8(0, 200), 0);
        assert_eq!(mul_u8(128, 128), 64);
        assert_eq!(lerp_u8(0, 255, 255), 255);
        assert_eq!(lerp_u8(255, 0, 255), 0);
        assert_eq!(lerp_u8(100, 200, 0), 100);
        assert_eq!(lerp_u8(0, 200, 128), 100);
    }

    #[test]
    fn test_default_pixel_outside_extent() {
        let mut mask = CoverageMask::new();
        mask.fill(Rect::new(0, 0, 4, 4), 200);
        assert_eq!(mask.pixel(1, 1), 200);
        assert_eq!(mask.pixel(10, 10), 0);
        mask.invert();
        assert_eq!(mask.pixel(1, 1), 55);
        assert_eq!(mask.pixel(10, 10), 255);
        assert_eq!(mask.read_region(Rect::new(3, 3, 2, 2))[[1, 1]], 255);
    }

    #[test]
    fn test_exact_bounds_tracks_mutation() {
        let mut mask = CoverageMask::new();
        assert!(mask.is_empty());
        mask.fill(Rect::new(2, 3, 4, 5), 10);
        assert_eq!(mask.exact_bounds(), Rect::new(2, 3, 4, 5));
        mask.clear_rect(Rect::new(2, 3, 4, 4));
        assert_eq!(mask.exact_bounds(), Rect::new(2, 7, 4, 1));
        mask.translate(Point::new(-2, 1));
        assert_eq!(mask.exact_bounds(), Rect::new(0, 8, 4, 1));
    }

    #[test]
    fn test_blit_ops() {
        let mut src = CoverageMask::new();
        src.fill(Rect::new(0, 0, 2, 1), 255);
        let mut dst = CoverageMask::new();
        dst.fill(Rect::new(0, 0, 4, 1), 200);

        let mut erased = dst.clone();
        erased.blit(&src, Rect::new(0, 0, 4, 1), MaskOp::Erase);
        assert_eq!(erased.read_region(Rect::new(0, 0, 4, 1)).iter().copied().collect::<Vec<u8>>(), vec![0, 0, 200, 200]);

        let mut inter = dst.clone();
        inter.blit(&src, Rect::new(0, 0, 4, 1), MaskOp::Intersect);
        assert_eq!(inter.read_region(Rect::new(0, 0, 4, 1)).iter().copied().collect::<Vec<u8>>(), vec![200, 200, 0, 0]);

        let mut copied = dst.clone();
        copied.blit(&src, Rect::new(0, 0, 4, 1), MaskOp::Copy(255));
        assert_eq!(copied.read_region(Rect::new(0, 0, 4, 1)).iter().copied().collect::<Vec<u8>>(), vec![255, 255, 0, 0]);
    }

    #[test]
    fn test_map_region() {
        let mut lut = [0u8; 256];
        for (i, v) in lut.iter_mut().enumerate() {
            *v = 255 - i as u8;
        }
        let mut mask = CoverageMask::new();
        mask.fill(Rect::new(0, 0, 2, 2), 5);
        mask.map_region(Rect::new(0, 0, 1, 2), &lut);
        assert_eq!(mask.pixel(0, 0), 250);
        assert_eq!(mask.pixel(1, 0), 5);
    }
}
