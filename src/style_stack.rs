//! Layer style orchestration.
//!
//! A `StyleStack` owns one plane store and one knockout mask per effect and
//! runs the effects in a fixed order around the layer's own pixels: drop
//! shadow first, the layer itself, then everything else.
//!
//! A pass is split in two steps. `recalculate` (or `recalculate_tiled`)
//! refreshes the planes for a region; `apply` flattens them onto a
//! destination. `render` does both for a whole layer.

use rayon::prelude::*;
use tracing::debug;

use crate::environment::LayerStyleEnvironment;
use crate::error::recover_return;
use crate::geometry::Rect;
use crate::knockout::KnockoutMask;
use crate::layer_effects::config::LayerStyle;
use crate::layer_effects::{filter_for, EffectKind, LayerStyleFilter};
use crate::projection::MultiPlaneCompositor;
use crate::raster::{BlendMode, ChannelFlags, Painter, RasterPlane};

/// Effects composited below the layer's own pixels.
pub const EFFECTS_BEFORE: [EffectKind; 1] = [EffectKind::DropShadow];

/// Effects composited above the layer's own pixels, bottom to top.
pub const EFFECTS_AFTER: [EffectKind; 9] = [
    EffectKind::InnerShadow,
    EffectKind::OuterGlow,
    EffectKind::InnerGlow,
    EffectKind::Satin,
    EffectKind::ColorOverlay,
    EffectKind::GradientOverlay,
    EffectKind::PatternOverlay,
    EffectKind::Stroke,
    EffectKind::BevelEmboss,
];

/// Where a node sits relative to the node that triggered an update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirtyPosition {
    /// The node itself changed.
    #[default]
    Filthy,
    /// The node lies above the changed one, e.g. a group over a dirty child.
    AboveFilthy,
    BelowFilthy,
}

impl DirtyPosition {
    fn grows_rects(self) -> bool {
        matches!(self, DirtyPosition::Filthy | DirtyPosition::AboveFilthy)
    }
}

/// Planes and knockout of one effect.
struct EffectProjection {
    filter: &'static dyn LayerStyleFilter,
    planes: MultiPlaneCompositor,
    knockout: KnockoutMask,
}

impl EffectProjection {
    fn new(kind: EffectKind) -> Self {
        EffectProjection {
            filter: filter_for(kind),
            planes: MultiPlaneCompositor::new(),
            knockout: KnockoutMask::new(),
        }
    }

    fn clear(&self, rect: Rect) {
        self.planes.clear(rect);
        self.knockout.clear(rect);
    }

    fn process(&self, src: &RasterPlane, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) {
        self.filter
            .process_directly(src, &self.planes, &self.knockout, rect, style, env);
    }

    /// Composite onto `dst`, through the knockout mask when there is one.
    fn apply(&self, dst: &mut RasterPlane, rect: Rect, env: &LayerStyleEnvironment) {
        if self.planes.is_empty() {
            return;
        }
        if !self.knockout.has_selection() {
            self.planes.apply(dst, rect, env);
            return;
        }
        let mut merged = env.cached_paint_device(dst.format());
        merged.copy_rect_from(dst, rect);
        self.planes.apply(&mut merged, rect, env);
        self.knockout.apply(dst, &merged, rect);
    }

    fn reset(&self) {
        self.planes.free_all_projections();
        self.knockout.reset_knockout_selection();
    }
}

/// A layer style together with the rendered state of its effects.
pub struct StyleStack {
    style: LayerStyle,
    before: Vec<EffectProjection>,
    after: Vec<EffectProjection>,
}

impl StyleStack {
    pub fn new(style: LayerStyle) -> Self {
        StyleStack {
            style,
            before: EFFECTS_BEFORE.iter().copied().map(EffectProjection::new).collect(),
            after: EFFECTS_AFTER.iter().copied().map(EffectProjection::new).collect(),
        }
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    /// Replace the style. Planes of effects that got disabled are freed on
    /// the next recalculation.
    pub fn set_style(&mut self, style: LayerStyle) {
        self.style = style;
    }

    fn effects(&self) -> impl Iterator<Item = &EffectProjection> {
        self.before.iter().chain(self.after.iter())
    }

    /// Planes of `kind`, for inspection.
    pub fn planes(&self, kind: EffectKind) -> Option<&MultiPlaneCompositor> {
        self.effects()
            .find(|effect| effect.filter.kind() == kind)
            .map(|effect| &effect.planes)
    }

    /// Knockout mask of `kind`, for inspection.
    pub fn knockout(&self, kind: EffectKind) -> Option<&KnockoutMask> {
        self.effects()
            .find(|effect| effect.filter.kind() == kind)
            .map(|effect| &effect.knockout)
    }

    /// Refresh every effect's planes inside `rect`.
    pub fn recalculate(&self, src: &RasterPlane, rect: Rect, env: &LayerStyleEnvironment) {
        debug!(rect = ?rect, enabled = self.style.enabled, "recalculating layer style");
        for effect in self.effects() {
            effect.clear(rect);
            effect.process(src, rect, &self.style, env);
        }
    }

    /// Like `recalculate`, with `rect` split into tiles processed in parallel.
    pub fn recalculate_tiled(&self, src: &RasterPlane, rect: Rect, env: &LayerStyleEnvironment, tile_size: i32) {
        recover_return!(tile_size > 0, (), "tile size must be positive, got {}", tile_size);
        let tiles = rect.tiles(tile_size);
        debug!(rect = ?rect, tiles = tiles.len(), "recalculating layer style in tiles");
        for effect in self.effects() {
            effect.clear(rect);
        }
        tiles.par_iter().for_each(|tile| {
            for effect in self.effects() {
                effect.process(src, *tile, &self.style, env);
            }
        });
    }

    /// Composite the effects and, unless disabled by the style context, the
    /// layer's own pixels onto `dst` inside `rect`.
    pub fn apply(&self, src: &RasterPlane, dst: &mut RasterPlane, rect: Rect, env: &LayerStyleEnvironment) {
        recover_return!(
            src.format() == dst.format(),
            (),
            "source format {:?} does not match destination {:?}",
            src.format(),
            dst.format()
        );
        if !self.style.enabled {
            paint_layer(src, dst, rect, env);
            return;
        }
        for effect in &self.before {
            effect.apply(dst, rect, env);
        }
        if self.style.context.keep_original {
            paint_layer(src, dst, rect, env);
        }
        for effect in &self.after {
            effect.apply(dst, rect, env);
        }
    }

    /// Input area needed to produce `rect`.
    pub fn need_rect(&self, rect: Rect, position: DirtyPosition, env: &LayerStyleEnvironment) -> Rect {
        if !self.style.enabled || !position.grows_rects() {
            return rect;
        }
        self.effects().fold(rect, |acc, effect| {
            acc.united(&effect.filter.needed_rect(rect, &self.style, env))
        })
    }

    /// Output area affected by a change of `rect`.
    pub fn change_rect(&self, rect: Rect, position: DirtyPosition, env: &LayerStyleEnvironment) -> Rect {
        if !self.style.enabled || !position.grows_rects() {
            return rect;
        }
        self.effects().fold(rect, |acc, effect| {
            acc.united(&effect.filter.changed_rect(rect, &self.style, env))
        })
    }

    /// Drop all planes and knockout masks, forcing a full recomposition.
    pub fn reset(&self) {
        debug!("resetting layer style planes");
        for effect in self.effects() {
            effect.reset();
        }
    }

    /// Render the whole styled layer into a new plane.
    pub fn render(&self, src: &RasterPlane) -> RasterPlane {
        let env = LayerStyleEnvironment::for_layer(src);
        self.render_with(src, &env)
    }

    pub fn render_with(&self, src: &RasterPlane, env: &LayerStyleEnvironment) -> RasterPlane {
        let mut dst = RasterPlane::new(src.format());
        let bounds = src.exact_bounds();
        if bounds.is_empty() {
            return dst;
        }
        let rect = self.change_rect(bounds, DirtyPosition::Filthy, env);
        self.recalculate(src, rect, env);
        self.apply(src, &mut dst, rect, env);
        dst
    }
}

impl Default for StyleStack {
    fn default() -> Self {
        StyleStack::new(LayerStyle::default())
    }
}

fn paint_layer(src: &RasterPlane, dst: &mut RasterPlane, rect: Rect, env: &LayerStyleEnvironment) {
    let mut painter = Painter::new(dst);
    painter.set_composite_op(BlendMode::Normal);
    env.setup_final_painter(&mut painter, 255, ChannelFlags::ALL);
    painter.bit_blt(src, rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer_effects::config::StrokePosition;
    use crate::raster::{Color, PixelFormat};

    const LAYER: Rect = Rect::new(0, 0, 20, 20);

    fn white_square() -> RasterPlane {
        RasterPlane::filled(PixelFormat::Rgba8, LAYER, Color::WHITE)
    }

    fn hard_shadow_style() -> LayerStyle {
        let mut style = LayerStyle::default();
        style.context.global_angle = 90;
        style.drop_shadow.enabled = true;
        style.drop_shadow.distance = 5;
        style.drop_shadow.size = 0;
        style.drop_shadow.opacity = 100;
        style.drop_shadow.blend_mode = BlendMode::Normal;
        style
    }

    fn stroke_style() -> LayerStyle {
        let mut style = LayerStyle::default();
        style.stroke.enabled = true;
        style.stroke.position = StrokePosition::Outside;
        style.stroke.size = 2;
        style
    }

    #[test]
    fn test_effect_order() {
        assert_eq!(EFFECTS_BEFORE, [EffectKind::DropShadow]);
        assert_eq!(EFFECTS_AFTER.len() + EFFECTS_BEFORE.len(), 10);
        assert_eq!(EFFECTS_AFTER[0], EffectKind::InnerShadow);
        assert_eq!(EFFECTS_AFTER[8], EffectKind::BevelEmboss);
    }

    #[test]
    fn test_disabled_style_is_pass_through() {
        let mut style = stroke_style();
        style.enabled = false;
        let stack = StyleStack::new(style);
        let src = white_square();
        let out = stack.render(&src);
        assert_eq!(out.exact_bounds(), LAYER);
        assert_eq!(out.pixel(5, 5), Color::WHITE);
        assert_eq!(out.pixel(-1, 5).a, 0);
        assert!(stack.planes(EffectKind::Stroke).is_some_and(|p| p.is_empty()));
    }

    #[test]
    fn test_drop_shadow_below_layer() {
        let stack = StyleStack::new(hard_shadow_style());
        let out = stack.render(&white_square());
        assert_eq!(out.pixel(10, 10), Color::WHITE);
        assert_eq!(out.pixel(10, 22), Color::BLACK);
        assert_eq!(out.pixel(10, 26).a, 0);
    }

    #[test]
    fn test_keep_original_off_shows_only_effects() {
        let mut style = hard_shadow_style();
        style.context.keep_original = false;
        let out = StyleStack::new(style).render(&white_square());
        assert_eq!(out.pixel(10, 10), Color::BLACK);
        assert_eq!(out.pixel(10, 2).a, 0);
    }

    #[test]
    fn test_stroke_painted_through_knockout() {
        let stack = StyleStack::new(stroke_style());
        let out = stack.render(&white_square());
        assert_eq!(out.pixel(-1, 10), Color::rgb(255, 0, 0));
        assert_eq!(out.pixel(-2, 10), Color::rgb(255, 0, 0));
        assert_eq!(out.pixel(-3, 10).a, 0);
        assert_eq!(out.pixel(10, 10), Color::WHITE);
    }

    #[test]
    fn test_rects_union_enabled_effects() {
        let stack = StyleStack::new(stroke_style());
        let env = LayerStyleEnvironment::new(LAYER, LAYER);
        assert_eq!(stack.change_rect(LAYER, DirtyPosition::Filthy, &env), LAYER.grown(3));
        assert_eq!(stack.need_rect(LAYER, DirtyPosition::AboveFilthy, &env), LAYER.grown(3));
        assert_eq!(stack.change_rect(LAYER, DirtyPosition::BelowFilthy, &env), LAYER);

        let plain = StyleStack::default();
        assert_eq!(plain.need_rect(LAYER, DirtyPosition::Filthy, &env), LAYER);
    }

    #[test]
    fn test_tiled_matches_whole() {
        let mut style = stroke_style();
        style.drop_shadow.enabled = true;
        style.drop_shadow.distance = 4;
        style.drop_shadow.size = 6;
        let src = white_square();
        let env = LayerStyleEnvironment::for_layer(&src);

        let whole = StyleStack::new(style.clone());
        let tiled = StyleStack::new(style);
        let rect = whole.change_rect(LAYER, DirtyPosition::Filthy, &env);
        whole.recalculate(&src, rect, &env);
        tiled.recalculate_tiled(&src, rect, &env, 7);

        let mut a = RasterPlane::new(src.format());
        let mut b = RasterPlane::new(src.format());
        whole.apply(&src, &mut a, rect, &env);
        tiled.apply(&src, &mut b, rect, &env);
        assert_eq!(a.to_rgba(rect), b.to_rgba(rect));
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let mut style = hard_shadow_style();
        style.drop_shadow.size = 5;
        style.drop_shadow.noise = 40;
        let src = white_square();
        let env = LayerStyleEnvironment::for_layer(&src);
        let stack = StyleStack::new(style);
        let rect = stack.change_rect(LAYER, DirtyPosition::Filthy, &env);

        stack.recalculate(&src, rect, &env);
        let mut first = RasterPlane::new(src.format());
        stack.apply(&src, &mut first, rect, &env);
        stack.recalculate(&src, rect, &env);
        let mut second = RasterPlane::new(src.format());
        stack.apply(&src, &mut second, rect, &env);
        assert_eq!(first.to_rgba(rect), second.to_rgba(rect));
    }

    #[test]
    fn test_reset_frees_planes() {
        let stack = StyleStack::new(stroke_style());
        let src = white_square();
        stack.render(&src);
        assert!(stack.knockout(EffectKind::Stroke).is_some_and(|k| k.has_selection()));
        stack.reset();
        assert!(stack.planes(EffectKind::Stroke).is_some_and(|p| p.is_empty()));
        assert!(stack.knockout(EffectKind::Stroke).is_some_and(|k| !k.has_selection()));
    }

    #[test]
    fn test_empty_layer_renders_nothing() {
        let stack = StyleStack::new(hard_shadow_style());
        let out = stack.render(&RasterPlane::new(PixelFormat::Rgba8));
        assert!(out.is_empty());
    }
}
