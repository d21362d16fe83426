//! Drop shadow, inner shadow, outer glow and inner glow.
//!
//! All four share one pipeline over the layer's alpha:
//! 1. Extract (and for inner variants invert) the coverage
//! 2. Optional precise edge, spread, Gaussian blur
//! 3. Range, contour and noise shaping
//! 4. Move by the light offset, knock out, and fill the default plane

use tracing::debug;

use super::config::{lod_scale, GlowSource, LayerStyle, ShadowConfig, StyleContext, Technique};
use super::{selection_from_alpha, EffectKind, LayerStyleFilter};
use crate::environment::LayerStyleEnvironment;
use crate::filters::blur::apply_gaussian;
use crate::filters::contour::{adjust_range, apply_contour_correction, find_edge};
use crate::filters::core::grow_rect_from_radius;
use crate::filters::fill::apply_final_selection;
use crate::filters::noise::{apply_noise, NOISE_NEED_BORDER};
use crate::geometry::{Point, Rect};
use crate::knockout::KnockoutMask;
use crate::projection::{MultiPlaneCompositor, DEFAULT_PLANE_ID};
use crate::raster::{MaskOp, RasterPlane};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Need,
    Change,
}

/// Rects of every pipeline stage for one applied region.
///
/// `dst_rect` is where the shadow lands; `src_rect` is the source area that
/// casts it. Each stage widens the area the previous one reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ShadowRects {
    spread_size: i32,
    blur_size: i32,
    offset: Point,
    dst_rect: Rect,
    src_rect: Rect,
    noise_need_rect: Rect,
    blur_need_rect: Rect,
    spread_need_rect: Rect,
}

impl ShadowRects {
    fn new(rect: Rect, config: &ShadowConfig, context: &StyleContext, direction: Direction) -> Self {
        let spread_size = config.spread_size();
        let blur_size = config.blur_size();
        let offset = config.calculate_offset(context);

        let dst_rect = rect;
        let src_rect = match direction {
            Direction::Need => dst_rect.translated(Point::new(-offset.x, -offset.y)),
            Direction::Change => dst_rect.translated(offset),
        };
        let noise_need_rect = if config.noise > 0 {
            src_rect.grown(NOISE_NEED_BORDER)
        } else {
            src_rect
        };
        let blur_need_rect = if blur_size > 0 {
            grow_rect_from_radius(noise_need_rect, blur_size)
        } else {
            noise_need_rect
        };
        let spread_need_rect = if spread_size > 0 {
            grow_rect_from_radius(blur_need_rect, spread_size)
        } else {
            blur_need_rect
        };

        ShadowRects {
            spread_size,
            blur_size,
            offset,
            dst_rect,
            src_rect,
            noise_need_rect,
            blur_need_rect,
            spread_need_rect,
        }
    }

    fn final_rect(&self) -> Rect {
        self.spread_need_rect.united(&self.dst_rect)
    }
}

/// One of the four shadow/glow effects, selected by `kind`.
#[derive(Clone, Copy, Debug)]
pub struct ShadowGlowEffect {
    kind: EffectKind,
}

impl ShadowGlowEffect {
    pub const fn new(kind: EffectKind) -> Self {
        ShadowGlowEffect { kind }
    }

    fn config<'a>(&self, style: &'a LayerStyle) -> &'a ShadowConfig {
        match self.kind {
            EffectKind::InnerShadow => &style.inner_shadow,
            EffectKind::OuterGlow => &style.outer_glow,
            EffectKind::InnerGlow => &style.inner_glow,
            _ => &style.drop_shadow,
        }
    }

    fn apply_shadow(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        apply_rect: Rect,
        config: &ShadowConfig,
        context: &StyleContext,
        env: &LayerStyleEnvironment,
    ) {
        if apply_rect.is_empty() {
            return;
        }
        let d = ShadowRects::new(apply_rect, config, context, Direction::Need);

        let mut selection = env.cached_selection();
        selection_from_alpha(&mut selection, src, d.final_rect());
        if config.invert_selection {
            selection.invert();
        }

        let knockout_source = config.knocks_out.then(|| {
            let mut snapshot = env.cached_selection();
            snapshot.clone_from(&selection);
            snapshot
        });

        if config.technique == Technique::Precise {
            find_edge(&mut selection, d.spread_need_rect, true);
        }

        // The spread always sharpens with the hidden-edge rule, whatever the
        // configured edge visibility.
        if d.spread_size > 0 {
            apply_gaussian(&mut selection, d.blur_need_rect, d.spread_size);
            find_edge(&mut selection, d.blur_need_rect, true);
        }

        if d.blur_size > 0 {
            apply_gaussian(&mut selection, d.noise_need_rect, d.blur_size);
        }

        adjust_range(&mut selection, d.noise_need_rect, config.range);

        if self.kind == EffectKind::InnerGlow && config.source == GlowSource::Center {
            selection.invert();
        }

        apply_contour_correction(
            &mut selection,
            d.noise_need_rect,
            &config.contour,
            config.anti_aliased,
            config.edge_hidden,
        );

        if config.noise > 0 {
            let random = env.cached_random_selection(d.src_rect.grown(NOISE_NEED_BORDER));
            apply_noise(&mut selection, d.src_rect, config.noise, &random);
        }

        selection.translate(d.offset);

        if let Some(snapshot) = knockout_source {
            selection.blit(&snapshot, d.dst_rect, MaskOp::Erase);
        }

        apply_final_selection(
            DEFAULT_PLANE_ID,
            &selection,
            src,
            dst,
            d.dst_rect,
            &config.fill_params(),
            env,
        );
    }
}

impl LayerStyleFilter for ShadowGlowEffect {
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
        debug!(effect = %self.kind, rect = ?apply_rect, size = config.size, distance = config.distance, "processing");
        self.apply_shadow(src, dst, apply_rect, &config, &style.context, env);
    }

    fn needed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        let config = self.config(style);
        if !style.enabled || !config.enabled {
            return rect;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        ShadowRects::new(rect, &config, &style.context, Direction::Need).final_rect()
    }

    fn changed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        let config = self.config(style);
        if !style.enabled || !config.enabled {
            return rect;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        ShadowRects::new(rect, &config, &style.context, Direction::Change).final_rect()
    }

    fn clone_box(&self) -> Box<dyn LayerStyleFilter> {
        Box::new(*self)
    }
}
