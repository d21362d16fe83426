//! Named intermediate planes of a layer style.
//!
//! Every effect renders into one or more planes keyed by string id. When
//! the style is applied the planes are flattened onto the destination in
//! ascending id order, each with its own blend mode, opacity and channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::environment::LayerStyleEnvironment;
use crate::error::recover_return;
use crate::geometry::Rect;
use crate::raster::{BlendMode, ChannelFlags, Painter, PixelFormat, RasterPlane};

/// Id used by effects that render into a single plane.
pub const DEFAULT_PLANE_ID: &str = "00_default";

/// A plane plus the parameters it is composited with.
#[derive(Debug)]
pub struct NamedPlane {
    pub raster: RasterPlane,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    pub channel_flags: ChannelFlags,
}

pub type SharedPlane = Arc<Mutex<NamedPlane>>;

#[derive(Default)]
pub struct MultiPlaneCompositor {
    planes: RwLock<BTreeMap<String, SharedPlane>>,
}

impl MultiPlaneCompositor {
    pub fn new() -> Self {
        MultiPlaneCompositor::default()
    }

    /// Plane `id`, created from `prototype`'s format if missing.
    ///
    /// Stored compositing parameters are updated in place when they differ.
    /// A plane whose format no longer matches the prototype is recreated.
    pub fn get_projection(
        &self,
        id: &str,
        blend_mode: BlendMode,
        opacity: u8,
        channel_flags: ChannelFlags,
        prototype: &RasterPlane,
    ) -> SharedPlane {
        let format = prototype.format();
        {
            let planes = self.planes.read();
            if let Some(plane) = planes.get(id) {
                let mut guard = plane.lock();
                if guard.raster.format() == format {
                    guard.blend_mode = blend_mode;
                    guard.opacity = opacity;
                    guard.channel_flags = channel_flags;
                    return Arc::clone(plane);
                }
            }
        }

        let mut planes = self.planes.write();
        if let Some(plane) = planes.get(id) {
            let mut guard = plane.lock();
            if guard.raster.format() != format {
                debug!(plane = id, format = ?format, "recreating plane for new pixel format");
                guard.raster.reinit(format);
            }
            guard.blend_mode = blend_mode;
            guard.opacity = opacity;
            guard.channel_flags = channel_flags;
            return Arc::clone(plane);
        }

        debug!(plane = id, blend = %blend_mode, opacity, "creating plane");
        let plane = Arc::new(Mutex::new(NamedPlane {
            raster: RasterPlane::new(format),
            blend_mode,
            opacity,
            channel_flags,
        }));
        planes.insert(id.to_string(), Arc::clone(&plane));
        plane
    }

    pub fn free_projection(&self, id: &str) {
        self.planes.write().remove(id);
    }

    pub fn free_all_projections(&self) {
        self.planes.write().clear();
    }

    /// Clear `rect` in every plane.
    pub fn clear(&self, rect: Rect) {
        for plane in self.planes.read().values() {
            plane.lock().raster.clear_rect(rect);
        }
    }

    /// Composite every plane over `dst` within `rect`, in ascending id order.
    pub fn apply(&self, dst: &mut RasterPlane, rect: Rect, env: &LayerStyleEnvironment) {
        let planes = self.planes.read();
        for (id, plane) in planes.iter() {
            let plane = plane.lock();
            recover_return!(
                plane.raster.format() == dst.format(),
                (),
                "plane {} has format {:?} but destination is {:?}",
                id,
                plane.raster.format(),
                dst.format()
            );
            let mut painter = Painter::new(dst);
            painter.set_composite_op(plane.blend_mode);
            env.setup_final_painter(&mut painter, plane.opacity, plane.channel_flags);
            painter.bit_blt(&plane.raster, rect);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.planes.read().is_empty()
    }

    /// Ids of the stored planes, in composite order.
    pub fn plane_ids(&self) -> Vec<String> {
        self.planes.read().keys().cloned().collect()
    }

    /// All planes, for level-of-detail synchronization by the host.
    pub fn get_lod_capable_devices(&self) -> Vec<SharedPlane> {
        self.planes.read().values().cloned().collect()
    }

    /// Pixel format of the stored planes, if any.
    pub fn format(&self) -> Option<PixelFormat> {
        self.planes
            .read()
            .values()
            .next()
            .map(|plane| plane.lock().raster.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Color;

    fn env() -> LayerStyleEnvironment {
        LayerStyleEnvironment::new(Rect::new(0, 0, 4, 4), Rect::new(0, 0, 4, 4))
    }

    #[test]
    fn test_get_projection_creates_and_reconfigures() {
        let compositor = MultiPlaneCompositor::new();
        let proto = RasterPlane::new(PixelFormat::Bgra8);
        let a = compositor.get_projection("00_a", BlendMode::Normal, 255, ChannelFlags::ALL, &proto);
        let b = compositor.get_projection("00_a", BlendMode::Multiply, 100, ChannelFlags::COLOR, &proto);
        assert!(Arc::ptr_eq(&a, &b));
        let plane = b.lock();
        assert_eq!(plane.blend_mode, BlendMode::Multiply);
        assert_eq!(plane.opacity, 100);
        assert_eq!(plane.raster.format(), PixelFormat::Bgra8);
    }

    #[test]
    fn test_format_change_recreates_plane() {
        let compositor = MultiPlaneCompositor::new();
        let rgba = RasterPlane::new(PixelFormat::Rgba8);
        let plane = compositor.get_projection("00_a", BlendMode::Normal, 255, ChannelFlags::ALL, &rgba);
        plane.lock().raster.fill_rect(Rect::new(0, 0, 2, 2), Color::WHITE);

        let bgra = RasterPlane::new(PixelFormat::Bgra8);
        let plane = compositor.get_projection("00_a", BlendMode::Normal, 255, ChannelFlags::ALL, &bgra);
        let guard = plane.lock();
        assert_eq!(guard.raster.format(), PixelFormat::Bgra8);
        assert!(guard.raster.is_empty());
    }

    #[test]
    fn test_apply_in_ascending_id_order() {
        let compositor = MultiPlaneCompositor::new();
        let proto = RasterPlane::new(PixelFormat::Rgba8);
        let rect = Rect::new(0, 0, 4, 4);
        // Inserted out of order on purpose.
        let y = compositor.get_projection("01_y", BlendMode::Copy, 255, ChannelFlags::ALL, &proto);
        y.lock().raster.fill_rect(rect, Color::rgb(0, 0, 255));
        let x = compositor.get_projection("00_x", BlendMode::Copy, 255, ChannelFlags::ALL, &proto);
        x.lock().raster.fill_rect(rect, Color::rgb(255, 0, 0));

        let mut dst = RasterPlane::filled(PixelFormat::Rgba8, rect, Color::WHITE);
        compositor.apply(&mut dst, rect, &env());
        assert_eq!(dst.pixel(2, 2), Color::rgb(0, 0, 255));
        assert_eq!(compositor.plane_ids(), vec!["00_x".to_string(), "01_y".to_string()]);
    }

    #[test]
    fn test_clear_and_free() {
        let compositor = MultiPlaneCompositor::new();
        let proto = RasterPlane::new(PixelFormat::Rgba8);
        let plane = compositor.get_projection(DEFAULT_PLANE_ID, BlendMode::Normal, 255, ChannelFlags::ALL, &proto);
        plane.lock().raster.fill_rect(Rect::new(0, 0, 4, 4), Color::WHITE);
        compositor.clear(Rect::new(0, 0, 4, 4));
        assert!(plane.lock().raster.is_empty());
        assert!(!compositor.is_empty());
        compositor.free_projection(DEFAULT_PLANE_ID);
        assert!(compositor.is_empty());
    }
}
