//! Shared knockout mask.
//!
//! Stroke-like effects accumulate their ring into one mask shared by all
//! tiled invocations of a style pass. The style stack later copies the
//! merged image back into the destination through that mask.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::geometry::Rect;
use crate::raster::{BlendMode, ChannelFlags, CoverageMask, Painter, RasterPlane};

pub type SharedMask = Arc<RwLock<CoverageMask>>;

#[derive(Default)]
pub struct KnockoutMask {
    selection: RwLock<Option<SharedMask>>,
}

impl KnockoutMask {
    pub fn new() -> Self {
        KnockoutMask::default()
    }

    /// The shared mask, created on first use.
    pub fn knockout_selection_lazy(&self) -> SharedMask {
        if let Some(mask) = self.selection.read().as_ref() {
            return Arc::clone(mask);
        }
        let mut slot = self.selection.write();
        match slot.as_ref() {
            Some(mask) => Arc::clone(mask),
            None => {
                debug!("creating knockout selection");
                let mask = Arc::new(RwLock::new(CoverageMask::new()));
                *slot = Some(Arc::clone(&mask));
                mask
            }
        }
    }

    pub fn set_knockout_selection(&self, mask: CoverageMask) {
        *self.selection.write() = Some(Arc::new(RwLock::new(mask)));
    }

    pub fn reset_knockout_selection(&self) {
        *self.selection.write() = None;
    }

    /// Copy `merged` into `dst` inside `rect`, restricted to the mask.
    pub fn apply(&self, dst: &mut RasterPlane, merged: &RasterPlane, rect: Rect) {
        let Some(shared) = self.selection.read().as_ref().map(Arc::clone) else {
            return;
        };
        let mask = shared.read();
        let mut painter = Painter::new(dst);
        painter.set_composite_op(BlendMode::Copy);
        painter.set_opacity(255);
        painter.set_channel_flags(ChannelFlags::ALL);
        painter.set_selection(Some(&*mask));
        painter.bit_blt(merged, rect);
    }

    /// Zero the stored mask inside `rect`, if there is one.
    pub fn clear(&self, rect: Rect) {
        if let Some(shared) = self.selection.read().as_ref() {
            shared.write().clear_rect(rect);
        }
    }

    /// Whether a mask has been created, even an empty one.
    pub fn has_selection(&self) -> bool {
        self.selection.read().is_some()
    }

    pub fn is_empty(&self) -> bool {
        match self.selection.read().as_ref() {
            Some(mask) => mask.read().is_empty(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Color, PixelFormat};

    #[test]
    fn test_lazy_creation_returns_same_instance() {
        let knockout = KnockoutMask::new();
        assert!(knockout.is_empty());
        let a = knockout.knockout_selection_lazy();
        let b = knockout.knockout_selection_lazy();
        assert!(Arc::ptr_eq(&a, &b));
        knockout.reset_knockout_selection();
        let c = knockout.knockout_selection_lazy();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_apply_only_inside_mask() {
        let rect = Rect::new(0, 0, 4, 4);
        let knockout = KnockoutMask::new();
        knockout
            .knockout_selection_lazy()
            .write()
            .fill(Rect::new(0, 0, 2, 4), 255);

        let merged = RasterPlane::filled(PixelFormat::Rgba8, rect, Color::rgb(255, 0, 0));
        let mut dst = RasterPlane::filled(PixelFormat::Rgba8, rect, Color::rgb(0, 255, 0));
        knockout.apply(&mut dst, &merged, rect);
        assert_eq!(dst.pixel(0, 0), Color::rgb(255, 0, 0));
        assert_eq!(dst.pixel(1, 3), Color::rgb(255, 0, 0));
        assert_eq!(dst.pixel(2, 0), Color::rgb(0, 255, 0));
        assert_eq!(dst.pixel(3, 3), Color::rgb(0, 255, 0));
    }
}
