//! Color, gradient and pattern overlay.
//!
//! The overlay plane holds a copy of the layer with the fill blended over
//! its color channels; alpha stays the layer's own, so the fill only shows
//! where the layer is opaque.

use tracing::debug;

use super::config::{lod_scale, LayerStyle, OverlayConfig};
use super::{EffectKind, LayerStyleFilter};
use crate::environment::LayerStyleEnvironment;
use crate::filters::fill::{fill_overlay_device, opacity_to_u8};
use crate::geometry::Rect;
use crate::knockout::KnockoutMask;
use crate::projection::{MultiPlaneCompositor, DEFAULT_PLANE_ID};
use crate::raster::{BlendMode, ChannelFlags, Painter, RasterPlane};

/// One of the three overlays, selected by `kind`.
#[derive(Clone, Copy, Debug)]
pub struct OverlayEffect {
    kind: EffectKind,
}

impl OverlayEffect {
    pub const fn new(kind: EffectKind) -> Self {
        OverlayEffect { kind }
    }

    fn config<'a>(&self, style: &'a LayerStyle) -> &'a OverlayConfig {
        match self.kind {
            EffectKind::GradientOverlay => &style.gradient_overlay,
            EffectKind::PatternOverlay => &style.pattern_overlay,
            _ => &style.color_overlay,
        }
    }
}

/// Copy `src` into the default plane and blend the overlay fill onto it.
fn apply_overlay(
    src: &RasterPlane,
    dst: &MultiPlaneCompositor,
    apply_rect: Rect,
    config: &OverlayConfig,
    env: &LayerStyleEnvironment,
) {
    if apply_rect.is_empty() {
        return;
    }
    let mut fill = env.cached_paint_device(src.format());
    if !fill_overlay_device(&mut fill, apply_rect, &config.fill, env) {
        return;
    }

    let plane = dst.get_projection(DEFAULT_PLANE_ID, BlendMode::Normal, 255, ChannelFlags::ALL, src);
    let mut plane = plane.lock();
    plane.raster.copy_rect_from(src, apply_rect);

    let mut painter = Painter::new(&mut plane.raster);
    painter.set_composite_op(config.blend_mode);
    painter.set_opacity(opacity_to_u8(config.opacity));
    painter.set_channel_flags(ChannelFlags::COLOR);
    painter.bit_blt(&fill, apply_rect);
}

impl LayerStyleFilter for OverlayEffect {
    fn kind(&self) -> EffectKind {
        self.kind
    }

    fn process_directly(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        _knockout: &KnockoutMask,
        apply_rect: Rect,
        style: &LayerStyle,
        env: &LayerStyleEnvironment,
    ) {
        let config = self.config(style);
        if !style.enabled || !config.enabled {
            dst.free_all_projections();
            return;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        debug!(effect = %self.kind, rect = ?apply_rect, fill = ?config.fill.fill_type(), "processing");
        apply_overlay(src, dst, apply_rect, &config, env);
    }

    fn needed_rect(&self, rect: Rect, _style: &LayerStyle, _env: &LayerStyleEnvironment) -> Rect {
        rect
    }

    fn changed_rect(&self, rect: Rect, _style: &LayerStyle, _env: &LayerStyleEnvironment) -> Rect {
        rect
    }

    fn clone_box(&self) -> Box<dyn LayerStyleFilter> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filters::pattern::Pattern;
    use crate::layer_effects::config::{GradientFill, OverlayFill, PatternFill};
    use crate::raster::{Color, PixelFormat};

    const LAYER: Rect = Rect::new(0, 0, 4, 4);

    fn env() -> LayerStyleEnvironment {
        LayerStyleEnvironment::new(LAYER, LAYER)
    }

    fn half_red() -> RasterPlane {
        RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::new(255, 0, 0, 128))
    }

    fn plane_pixel(dst: &MultiPlaneCompositor, src: &RasterPlane, x: i32, y: i32) -> Color {
        let plane = dst.get_projection(DEFAULT_PLANE_ID, BlendMode::Normal, 255, ChannelFlags::ALL, src);
        let px = plane.lock().raster.pixel(x, y);
        px
    }

    #[test]
    fn test_color_overlay_preserves_alpha() {
        let mut style = LayerStyle::default();
        style.color_overlay = OverlayConfig {
            enabled: true,
            ..OverlayConfig::color(Color::rgb(0, 0, 255))
        };
        let src = half_red();
        let dst = MultiPlaneCompositor::new();
        let effect = OverlayEffect::new(EffectKind::ColorOverlay);
        effect.process_directly(&src, &dst, &KnockoutMask::new(), Rect::new(-2, -2, 8, 8), &style, &env());
        assert_eq!(plane_pixel(&dst, &src, 1, 1), Color::new(0, 0, 255, 128));
        assert_eq!(plane_pixel(&dst, &src, -1, -1).a, 0);
    }

    #[test]
    fn test_overlay_opacity_mixes_with_layer() {
        let mut style = LayerStyle::default();
        style.color_overlay = OverlayConfig {
            enabled: true,
            opacity: 50,
            ..OverlayConfig::color(Color::rgb(0, 0, 255))
        };
        let src = half_red();
        let dst = MultiPlaneCompositor::new();
        let effect = OverlayEffect::new(EffectKind::ColorOverlay);
        effect.process_directly(&src, &dst, &KnockoutMask::new(), LAYER, &style, &env());
        let px = plane_pixel(&dst, &src, 2, 2);
        assert!((px.r as i32 - 127).abs() <= 1);
        assert!((px.b as i32 - 128).abs() <= 1);
        assert_eq!(px.a, 128);
    }

    #[test]
    fn test_gradient_overlay_varies_across_layer() {
        let mut style = LayerStyle::default();
        style.gradient_overlay = OverlayConfig {
            enabled: true,
            ..OverlayConfig::gradient(GradientFill {
                angle: 0,
                ..GradientFill::default()
            })
        };
        let src = RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE);
        let dst = MultiPlaneCompositor::new();
        let effect = OverlayEffect::new(EffectKind::GradientOverlay);
        effect.process_directly(&src, &dst, &KnockoutMask::new(), LAYER, &style, &env());
        let left = plane_pixel(&dst, &src, 0, 1);
        let right = plane_pixel(&dst, &src, 3, 1);
        assert!(left.r < right.r);
        assert_eq!(left.a, 255);
    }

    #[test]
    fn test_pattern_overlay_tiles() {
        let pattern = Pattern::new(1, 1, vec![0, 255, 0, 255]).unwrap();
        let mut style = LayerStyle::default();
        style.pattern_overlay = OverlayConfig {
            enabled: true,
            ..OverlayConfig::pattern(PatternFill {
                pattern: Some(Arc::new(pattern)),
                ..PatternFill::default()
            })
        };
        let src = RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE);
        let dst = MultiPlaneCompositor::new();
        let effect = OverlayEffect::new(EffectKind::PatternOverlay);
        effect.process_directly(&src, &dst, &KnockoutMask::new(), LAYER, &style, &env());
        assert_eq!(plane_pixel(&dst, &src, 3, 3), Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_missing_pattern_leaves_no_plane() {
        let mut style = LayerStyle::default();
        style.pattern_overlay.enabled = true;
        assert!(matches!(style.pattern_overlay.fill, OverlayFill::Pattern(_)));
        let src = half_red();
        let dst = MultiPlaneCompositor::new();
        let effect = OverlayEffect::new(EffectKind::PatternOverlay);
        effect.process_directly(&src, &dst, &KnockoutMask::new(), LAYER, &style, &env());
        assert!(dst.is_empty());
    }

    #[test]
    fn test_rects_are_identity() {
        let mut style = LayerStyle::default();
        style.color_overlay.enabled = true;
        let effect = OverlayEffect::new(EffectKind::ColorOverlay);
        assert_eq!(effect.needed_rect(LAYER, &style, &env()), LAYER);
        assert_eq!(effect.changed_rect(LAYER, &style, &env()), LAYER);
    }
}
