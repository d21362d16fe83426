//! Compositing painter.
//!
//! `Painter` blends pixels into a destination `RasterPlane` with a blend
//! mode, an opacity, a channel mask and an optional coverage selection.
//! Compositing is non-premultiplied source-over (W3C separable blending);
//! `Copy` interpolates premultiplied values towards the source.

use super::blend::{BlendMode, ChannelFlags};
use super::mask::CoverageMask;
use super::plane::{Color, RasterPlane};
use crate::geometry::Rect;

pub struct Painter<'a> {
    device: &'a mut RasterPlane,
    blend_mode: BlendMode,
    opacity: u8,
    channel_flags: ChannelFlags,
    selection: Option<&'a CoverageMask>,
}

impl<'a> Painter<'a> {
    pub fn new(device: &'a mut RasterPlane) -> Self {
        Painter {
            device,
            blend_mode: BlendMode::Normal,
            opacity: 255,
            channel_flags: ChannelFlags::ALL,
            selection: None,
        }
    }

    pub fn set_composite_op(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_channel_flags(&mut self, flags: ChannelFlags) {
        self.channel_flags = flags;
    }

    pub fn channel_flags(&self) -> ChannelFlags {
        self.channel_flags
    }

    pub fn set_selection(&mut self, selection: Option<&'a CoverageMask>) {
        self.selection = selection;
    }

    pub fn device(&self) -> &RasterPlane {
        &*self.device
    }

    /// Composite `src` over the device inside `rect`.
    pub fn bit_blt(&mut self, src: &RasterPlane, rect: Rect) {
        self.paint(rect, |x, y| src.pixel(x, y));
    }

    /// Composite a constant color over the device inside `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.paint(rect, |_, _| color);
    }

    /// Fill `color` through a selection over `rect`.
    pub fn fill_selection(&mut self, selection: &CoverageMask, rect: Rect, color: Color) {
        let mut painter = Painter {
            device: &mut *self.device,
            blend_mode: self.blend_mode,
            opacity: self.opacity,
            channel_flags: self.channel_flags,
            selection: Some(selection),
        };
        painter.fill_rect(rect, color);
    }

    fn paint<F>(&mut self, rect: Rect, source: F)
    where
        F: Fn(i32, i32) -> Color,
    {
        if rect.is_empty() || self.opacity == 0 || self.channel_flags == ChannelFlags::NONE {
            return;
        }
        let paint_rect = match self.selection {
            Some(sel) => rect.intersected(&sel.exact_bounds()),
            None => rect,
        };
        if paint_rect.is_empty() {
            return;
        }
        self.device.ensure_extent(paint_rect);
        let opacity = self.opacity as f32 / 255.0;
        for y in paint_rect.top()..paint_rect.bottom() {
            for x in paint_rect.left()..paint_rect.right() {
                let coverage = match self.selection {
                    Some(sel) => sel.pixel(x, y),
                    None => 255,
                };
                if coverage == 0 {
                    continue;
                }
                let weight = opacity * coverage as f32 / 255.0;
                let dst = self.device.pixel(x, y);
                let out = composite(self.blend_mode, self.channel_flags, dst, source(x, y), weight);
                self.device.put_pixel(x, y, out);
            }
        }
        self.device.invalidate();
    }
}

#[inline]
fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Composite one pixel. `weight` is opacity × selection in 0.0-1.0.
pub(crate) fn composite(mode: BlendMode, flags: ChannelFlags, dst: Color, src: Color, weight: f32) -> Color {
    let d = dst.to_array();
    let s = src.to_array();
    let da = to_unit(d[3]);
    let alpha_locked = !flags.has(3);

    let mut out = [0f32; 4];
    if mode == BlendMode::Copy {
        let sa = to_unit(s[3]);
        let oa = da + (sa - da) * weight;
        out[3] = oa;
        for ch in 0..3 {
            let premul = to_unit(d[ch]) * da + (to_unit(s[ch]) * sa - to_unit(d[ch]) * da) * weight;
            out[ch] = if oa > 0.0 { premul / oa } else { 0.0 };
        }
    } else {
        let sa = to_unit(s[3]) * weight;
        if alpha_locked {
            out[3] = da;
            for ch in 0..3 {
                let dc = to_unit(d[ch]);
                let mixed = mode.blend_channel(dc, to_unit(s[ch]));
                out[ch] = dc + (mixed - dc) * sa;
            }
        } else {
            let oa = sa + da * (1.0 - sa);
            out[3] = oa;
            for ch in 0..3 {
                let dc = to_unit(d[ch]);
                let sc = to_unit(s[ch]);
                let blended = sa * (1.0 - da) * sc + sa * da * mode.blend_channel(dc, sc) + (1.0 - sa) * da * dc;
                out[ch] = if oa > 0.0 { blended / oa } else { 0.0 };
            }
        }
    }

    let mut result = d;
    for ch in 0..4 {
        if flags.has(ch) {
            result[ch] = to_byte(out[ch]);
        }
    }
    if alpha_locked && d[3] == 0 {
        return dst;
    }
    Color::from_array(result)
}
