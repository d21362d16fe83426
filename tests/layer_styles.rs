use imagestag_layer_styles::layer_effects::config::{BevelStyle, OverlayConfig, StrokePosition};
use imagestag_layer_styles::layer_effects::filter_for;
use imagestag_layer_styles::style_stack::{EFFECTS_AFTER, EFFECTS_BEFORE};
use imagestag_layer_styles::{
    BlendMode, Color, DirtyPosition, EffectKind, KnockoutMask, LayerStyle, LayerStyleEnvironment,
    MultiPlaneCompositor, PixelFormat, RasterPlane, Rect, StyleStack,
};

const LAYER: Rect = Rect::new(0, 0, 20, 20);

fn white_square() -> RasterPlane {
    RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE)
}

fn env() -> LayerStyleEnvironment {
    LayerStyleEnvironment::new(LAYER, LAYER)
}

fn all_kinds() -> impl Iterator<Item = EffectKind> {
    EFFECTS_BEFORE.into_iter().chain(EFFECTS_AFTER)
}

fn drop_shadow(distance: i32, size: i32, spread: i32, noise: i32) -> LayerStyle {
    let mut style = LayerStyle::default();
    style.context.global_angle = 90;
    style.drop_shadow.enabled = true;
    style.drop_shadow.use_global_light = true;
    style.drop_shadow.distance = distance;
    style.drop_shadow.size = size;
    style.drop_shadow.spread = spread;
    style.drop_shadow.noise = noise;
    style
}

/// Every pixel of every plane inside `rect`, flattened.
fn plane_bytes(planes: &MultiPlaneCompositor, rect: Rect) -> Vec<u8> {
    planes
        .get_lod_capable_devices()
        .iter()
        .flat_map(|plane| plane.lock().raster.to_rgba(rect).into_raw_vec_and_offset().0)
        .collect()
}

#[test]
fn test_disabled_effects_leave_planes_untouched() {
    let style = LayerStyle::default();
    let src = white_square();
    for kind in all_kinds() {
        let filter = filter_for(kind);
        let planes = MultiPlaneCompositor::new();
        let knockout = KnockoutMask::new();
        filter.process_directly(&src, &planes, &knockout, LAYER, &style, &env());
        assert!(planes.is_empty(), "{kind} created planes");
        assert!(knockout.is_empty(), "{kind} touched the knockout");
        assert_eq!(filter.needed_rect(LAYER, &style, &env()), LAYER);
        assert_eq!(filter.changed_rect(LAYER, &style, &env()), LAYER);
    }
}

#[test]
fn test_drop_shadow_offset_rects() {
    let filter = filter_for(EffectKind::DropShadow);
    let rect = Rect::new(10, 10, 10, 10);
    let style = drop_shadow(10, 0, 0, 0);
    assert_eq!(filter.needed_rect(rect, &style, &env()), Rect::new(10, 0, 10, 20));
    assert_eq!(filter.changed_rect(rect, &style, &env()), Rect::new(10, 10, 10, 20));
}

#[test]
fn test_drop_shadow_noise_rects() {
    let filter = filter_for(EffectKind::DropShadow);
    let rect = Rect::new(10, 10, 10, 10);
    let style = drop_shadow(0, 0, 0, 30);
    assert_eq!(filter.needed_rect(rect, &style, &env()), Rect::new(2, 2, 26, 26));
    assert_eq!(filter.changed_rect(rect, &style, &env()), Rect::new(2, 2, 26, 26));
}

#[test]
fn test_drop_shadow_blur_rects_ignore_spread() {
    let filter = filter_for(EffectKind::DropShadow);
    let rect = Rect::new(10, 10, 10, 10);
    for spread in [0, 50, 75] {
        let style = drop_shadow(0, 10, spread, 0);
        assert_eq!(filter.needed_rect(rect, &style, &env()), Rect::new(-2, -2, 34, 34));
        assert_eq!(filter.changed_rect(rect, &style, &env()), Rect::new(-2, -2, 34, 34));
    }
}

#[test]
fn test_process_after_clear_is_bit_identical() {
    let mut style = drop_shadow(6, 8, 25, 20);
    style.inner_glow.enabled = true;
    style.satin.enabled = true;
    style.bevel_emboss.enabled = true;
    let src = white_square();
    let env = LayerStyleEnvironment::for_layer(&src);
    let stack = StyleStack::new(style);
    let rect = stack.change_rect(LAYER, DirtyPosition::Filthy, &env);

    for kind in all_kinds() {
        let filter = filter_for(kind);
        let planes = MultiPlaneCompositor::new();
        let knockout = KnockoutMask::new();
        filter.process_directly(&src, &planes, &knockout, rect, stack.style(), &env);
        let first = plane_bytes(&planes, rect);
        planes.clear(rect);
        filter.process_directly(&src, &planes, &knockout, rect, stack.style(), &env);
        assert_eq!(first, plane_bytes(&planes, rect), "{kind} is not idempotent");
    }
}

#[test]
fn test_center_stroke_ring_straddles_boundary() {
    let src = white_square();
    for half in 0..4 {
        let mut style = LayerStyle::default();
        style.stroke.enabled = true;
        style.stroke.position = StrokePosition::Center;
        style.stroke.size = 2 * half;
        let stack = StyleStack::new(style);
        let env = LayerStyleEnvironment::for_layer(&src);
        stack.recalculate(&src, Rect::new(-10, -10, 40, 40), &env);

        let Some(knockout) = stack.knockout(EffectKind::Stroke) else {
            panic!("stroke has no knockout slot");
        };
        if half == 0 {
            assert!(knockout.is_empty());
            continue;
        }
        let shared = knockout.knockout_selection_lazy();
        let ring = shared.read();
        assert_eq!(ring.pixel(-half, 10), 255);
        assert_eq!(ring.pixel(half - 1, 10), 255);
        assert_eq!(ring.pixel(-half - 1, 10), 0);
        assert_eq!(ring.pixel(half, 10), 0);
    }
}

#[test]
fn test_bevel_on_transparent_layer_is_invisible() {
    let mut style = LayerStyle::default();
    style.bevel_emboss.enabled = true;
    for bevel in [BevelStyle::InnerBevel, BevelStyle::OuterBevel, BevelStyle::Emboss, BevelStyle::PillowEmboss] {
        style.bevel_emboss.style = bevel;
        let src = RasterPlane::new(PixelFormat::Rgba8);
        let stack = StyleStack::new(style.clone());
        let env = LayerStyleEnvironment::new(LAYER, LAYER);
        stack.recalculate(&src, LAYER, &env);
        let mut dst = RasterPlane::new(PixelFormat::Rgba8);
        stack.apply(&src, &mut dst, LAYER, &env);
        assert!(dst.is_empty(), "{bevel:?} produced output");
    }
}

#[test]
fn test_overlay_then_stroke_order() {
    let mut style = LayerStyle::default();
    style.color_overlay.enabled = true;
    style.color_overlay.fill = OverlayConfig::color(Color::rgb(0, 0, 255)).fill;
    style.stroke.enabled = true;
    style.stroke.position = StrokePosition::Inside;
    style.stroke.size = 2;
    let out = StyleStack::new(style).render(&white_square());
    // The stroke sits above the overlay.
    assert_eq!(out.pixel(0, 10), Color::rgb(255, 0, 0));
    assert_eq!(out.pixel(10, 10), Color::rgb(0, 0, 255));
    assert_eq!(out.pixel(-1, 10).a, 0);
}

#[test]
fn test_drop_shadow_multiply_under_layer() {
    let mut style = drop_shadow(4, 0, 0, 0);
    style.drop_shadow.opacity = 100;
    style.drop_shadow.blend_mode = BlendMode::Multiply;
    let out = StyleStack::new(style).render(&white_square());
    assert_eq!(out.pixel(10, 10), Color::WHITE);
    let shadow = out.pixel(10, 22);
    assert_eq!((shadow.r, shadow.g, shadow.b), (0, 0, 0));
    assert_eq!(shadow.a, 255);
}

#[test]
fn test_tiled_render_matches_whole_render() {
    let mut style = drop_shadow(5, 6, 30, 0);
    style.outer_glow.enabled = true;
    style.bevel_emboss.enabled = true;
    style.stroke.enabled = true;
    style.stroke.position = StrokePosition::Center;
    let src = white_square();
    let env = LayerStyleEnvironment::for_layer(&src);
    let whole = StyleStack::new(style.clone());
    let tiled = StyleStack::new(style);
    let rect = whole.change_rect(LAYER, DirtyPosition::Filthy, &env);

    whole.recalculate(&src, rect, &env);
    tiled.recalculate_tiled(&src, rect, &env, 9);
    let mut a = RasterPlane::new(src.format());
    let mut b = RasterPlane::new(src.format());
    whole.apply(&src, &mut a, rect, &env);
    tiled.apply(&src, &mut b, rect, &env);
    assert_eq!(a.to_rgba(rect), b.to_rgba(rect));
}
