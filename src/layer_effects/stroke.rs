//! Stroke/outline effect.
//!
//! Creates an outline around non-transparent areas by:
//! 1. Growing and/or shrinking the alpha channel per stroke position
//! 2. Taking the ring between the grown and the shrunk coverage
//! 3. Adding the ring to the shared knockout mask
//! 4. Filling the default plane with the stroke fill
//!
//! The plane itself is unmasked; the style stack copies it into the result
//! through the knockout mask, so rings from different tiles merge.

use tracing::debug;

use super::config::{lod_scale, LayerStyle, StrokeConfig, StrokePosition};
use super::{selection_from_alpha, EffectKind, LayerStyleFilter};
use crate::environment::LayerStyleEnvironment;
use crate::filters::fill::{fill_overlay_device, opacity_to_u8};
use crate::filters::morphology::{grow_selection, shrink_selection};
use crate::geometry::Rect;
use crate::knockout::KnockoutMask;
use crate::projection::{MultiPlaneCompositor, DEFAULT_PLANE_ID};
use crate::raster::{BlendMode, ChannelFlags, MaskOp, Painter, RasterPlane};

/// `(grow, shrink)` radii of a stroke position.
fn stroke_radii(position: StrokePosition, size: i32) -> (i32, i32) {
    match position {
        StrokePosition::Outside => (size, 0),
        StrokePosition::Inside => (0, size),
        StrokePosition::Center => {
            let half = (size + 1) / 2;
            (half, half)
        }
    }
}

/// Border the stroke reaches beyond the changed pixels.
fn stroke_border(config: &StrokeConfig) -> i32 {
    match config.position {
        StrokePosition::Center => (config.size + 1) / 2 + 1,
        StrokePosition::Outside | StrokePosition::Inside => config.size + 1,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StrokeEffect;

impl StrokeEffect {
    fn apply_stroke(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        knockout: &KnockoutMask,
        apply_rect: Rect,
        config: &StrokeConfig,
        env: &LayerStyleEnvironment,
    ) {
        if apply_rect.is_empty() {
            return;
        }
        let mut fill = env.cached_paint_device(src.format());
        if !fill_overlay_device(&mut fill, apply_rect, &config.fill, env) {
            return;
        }

        let need_rect = apply_rect.grown(config.size);
        let mut outer = env.cached_selection();
        selection_from_alpha(&mut outer, src, need_rect);
        let mut inner = env.cached_selection();
        inner.clone_from(&outer);

        let (grow, shrink) = stroke_radii(config.position, config.size);
        grow_selection(&mut outer, apply_rect, grow);
        shrink_selection(&mut inner, apply_rect, shrink);
        inner.invert();
        outer.blit(&inner, apply_rect, MaskOp::Intersect);

        {
            let shared = knockout.knockout_selection_lazy();
            let mut ring = shared.write();
            ring.blit(&outer, apply_rect, MaskOp::Union);
        }

        let plane = dst.get_projection(
            DEFAULT_PLANE_ID,
            config.blend_mode,
            opacity_to_u8(config.opacity),
            ChannelFlags::ALL,
            src,
        );
        let mut plane = plane.lock();
        let mut painter = Painter::new(&mut plane.raster);
        painter.set_composite_op(BlendMode::Copy);
        painter.bit_blt(&fill, apply_rect);
    }
}

impl LayerStyleFilter for StrokeEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Stroke
    }

    fn process_directly(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        knockout: &KnockoutMask,
        apply_rect: Rect,
        style: &LayerStyle,
        env: &LayerStyleEnvironment,
    ) {
        if !style.enabled || !style.stroke.enabled {
            dst.free_all_projections();
            knockout.reset_knockout_selection();
            return;
        }
        let config = style.stroke.scaled(lod_scale(env.current_level_of_detail()));
        debug!(effect = %self.kind(), rect = ?apply_rect, size = config.size, position = ?config.position, "processing");
        self.apply_stroke(src, dst, knockout, apply_rect, &config, env);
    }

    fn needed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        if !style.enabled || !style.stroke.enabled {
            return rect;
        }
        let config = style.stroke.scaled(lod_scale(env.current_level_of_detail()));
        rect.grown(stroke_border(&config))
    }

    fn changed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        self.needed_rect(rect, style, env)
    }

    fn clone_box(&self) -> Box<dyn LayerStyleFilter> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Color, PixelFormat};

    const LAYER: Rect = Rect::new(0, 0, 20, 20);
    const APPLY: Rect = Rect::new(-10, -10, 40, 40);

    fn env() -> LayerStyleEnvironment {
        LayerStyleEnvironment::new(LAYER, LAYER)
    }

    fn stroke_style(position: StrokePosition, size: i32) -> LayerStyle {
        let mut style = LayerStyle::default();
        style.stroke.enabled = true;
        style.stroke.position = position;
        style.stroke.size = size;
        style
    }

    fn ring_of(style: &LayerStyle) -> KnockoutMask {
        let src = RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE);
        let knockout = KnockoutMask::new();
        StrokeEffect.process_directly(&src, &MultiPlaneCompositor::new(), &knockout, APPLY, style, &env());
        knockout
    }

    fn ring_pixel(knockout: &KnockoutMask, x: i32, y: i32) -> u8 {
        let shared = knockout.knockout_selection_lazy();
        let value = shared.read().pixel(x, y);
        value
    }

    #[test]
    fn test_outside_ring() {
        let knockout = ring_of(&stroke_style(StrokePosition::Outside, 3));
        assert_eq!(ring_pixel(&knockout, -1, 10), 255);
        assert_eq!(ring_pixel(&knockout, -3, 10), 255);
        assert_eq!(ring_pixel(&knockout, -4, 10), 0);
        assert_eq!(ring_pixel(&knockout, 0, 10), 0);
    }

    #[test]
    fn test_inside_ring() {
        let knockout = ring_of(&stroke_style(StrokePosition::Inside, 3));
        assert_eq!(ring_pixel(&knockout, 0, 10), 255);
        assert_eq!(ring_pixel(&knockout, 2, 10), 255);
        assert_eq!(ring_pixel(&knockout, 3, 10), 0);
        assert_eq!(ring_pixel(&knockout, -1, 10), 0);
    }

    #[test]
    fn test_center_ring_straddles_edge() {
        let knockout = ring_of(&stroke_style(StrokePosition::Center, 4));
        assert_eq!(ring_pixel(&knockout, -2, 10), 255);
        assert_eq!(ring_pixel(&knockout, 1, 10), 255);
        assert_eq!(ring_pixel(&knockout, -3, 10), 0);
        assert_eq!(ring_pixel(&knockout, 2, 10), 0);
        assert_eq!(ring_pixel(&knockout, 10, 10), 0);
    }

    #[test]
    fn test_zero_size_center_ring_is_empty() {
        let knockout = ring_of(&stroke_style(StrokePosition::Center, 0));
        assert!(knockout.is_empty());
    }

    #[test]
    fn test_plane_holds_unmasked_fill() {
        let style = stroke_style(StrokePosition::Outside, 2);
        let src = RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE);
        let dst = MultiPlaneCompositor::new();
        StrokeEffect.process_directly(&src, &dst, &KnockoutMask::new(), APPLY, &style, &env());
        let plane = dst.get_projection(DEFAULT_PLANE_ID, BlendMode::Normal, 255, ChannelFlags::ALL, &src);
        let plane = plane.lock();
        assert_eq!(plane.raster.pixel(10, 10), Color::rgb(255, 0, 0));
        assert_eq!(plane.raster.pixel(-9, -9), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_rects() {
        let rect = Rect::new(0, 0, 10, 10);
        let outside = stroke_style(StrokePosition::Outside, 3);
        assert_eq!(StrokeEffect.needed_rect(rect, &outside, &env()), rect.grown(4));
        let center = stroke_style(StrokePosition::Center, 3);
        assert_eq!(StrokeEffect.changed_rect(rect, &center, &env()), rect.grown(3));
    }

    #[test]
    fn test_tiles_merge_into_one_ring() {
        let style = stroke_style(StrokePosition::Outside, 2);
        let src = RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE);
        let knockout = KnockoutMask::new();
        let dst = MultiPlaneCompositor::new();
        for tile in APPLY.tiles(16) {
            StrokeEffect.process_directly(&src, &dst, &knockout, tile, &style, &env());
        }
        let whole = ring_of(&style);
        for (x, y) in [(-1, 10), (-2, 3), (21, 21), (10, -2), (10, 10)] {
            assert_eq!(ring_pixel(&knockout, x, y), ring_pixel(&whole, x, y));
        }
    }
}
