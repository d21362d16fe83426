//! Per-layer context shared by every effect of one style.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{ObjectPool, PoolGuard};
use crate::filters::noise::{generate_random_selection, RANDOM_SEED};
use crate::geometry::Rect;
use crate::raster::{mul_u8, ChannelFlags, CoverageMask, Painter, PixelFormat, RasterPlane};

/// Layer context and scratch caches for one style application.
pub struct LayerStyleEnvironment {
    layer_bounds: Rect,
    default_bounds: Rect,
    lod: u32,
    layer_opacity: u8,
    layer_channel_flags: ChannelFlags,
    masks: ObjectPool<CoverageMask>,
    planes: ObjectPool<RasterPlane>,
    random_selection: Mutex<Option<Arc<CoverageMask>>>,
}

impl LayerStyleEnvironment {
    pub fn new(layer_bounds: Rect, default_bounds: Rect) -> Self {
        LayerStyleEnvironment {
            layer_bounds,
            default_bounds,
            lod: 0,
            layer_opacity: 255,
            layer_channel_flags: ChannelFlags::ALL,
            masks: ObjectPool::default(),
            planes: ObjectPool::default(),
            random_selection: Mutex::new(None),
        }
    }

    /// Environment for a layer whose content is `src`: exact bounds of the
    /// opaque pixels, default bounds from the stored extent.
    pub fn for_layer(src: &RasterPlane) -> Self {
        LayerStyleEnvironment::new(src.exact_bounds(), src.extent())
    }

    pub fn with_lod(mut self, lod: u32) -> Self {
        self.lod = lod;
        self
    }

    pub fn with_layer_opacity(mut self, opacity: u8) -> Self {
        self.layer_opacity = opacity;
        self
    }

    pub fn with_channel_flags(mut self, flags: ChannelFlags) -> Self {
        self.layer_channel_flags = flags;
        self
    }

    pub fn layer_bounds(&self) -> Rect {
        self.layer_bounds
    }

    pub fn default_bounds(&self) -> Rect {
        self.default_bounds
    }

    pub fn current_level_of_detail(&self) -> u32 {
        self.lod
    }

    pub fn layer_opacity(&self) -> u8 {
        self.layer_opacity
    }

    pub fn layer_channel_flags(&self) -> ChannelFlags {
        self.layer_channel_flags
    }

    /// Random mask covering at least `rect`.
    ///
    /// The cached mask only ever grows: a request outside its extent
    /// regenerates it over the union of the old extent and `rect`.
    pub fn cached_random_selection(&self, rect: Rect) -> Arc<CoverageMask> {
        let mut cached = self.random_selection.lock();
        if let Some(mask) = cached.as_ref() {
            if mask.extent().contains(&rect) {
                return Arc::clone(mask);
            }
        }
        let extent = match cached.as_ref() {
            Some(mask) => mask.extent().united(&rect),
            None => rect,
        };
        debug!(extent = ?extent, "regenerating random selection");
        let mask = Arc::new(generate_random_selection(extent, RANDOM_SEED));
        *cached = Some(Arc::clone(&mask));
        mask
    }

    /// Scratch coverage mask, empty on checkout.
    pub fn cached_selection(&self) -> PoolGuard<'_, CoverageMask> {
        self.masks.checkout()
    }

    /// Scratch plane in `format`, empty on checkout.
    pub fn cached_paint_device(&self, format: PixelFormat) -> PoolGuard<'_, RasterPlane> {
        let mut plane = self.planes.checkout();
        plane.reinit(format);
        plane
    }

    /// Merge an effect's opacity and channels with the layer's own.
    pub fn setup_final_painter(&self, painter: &mut Painter<'_>, opacity: u8, flags: ChannelFlags) {
        painter.set_opacity(mul_u8(opacity, self.layer_opacity));
        painter.set_channel_flags(flags.intersect(self.layer_channel_flags));
    }
}
