//! Bevel and emboss.
//!
//! Builds a height ramp from concentric rings of the layer's alpha, shades
//! it with a directional light, and splits the shade into a shadow and a
//! highlight mask filled into two planes. The shadow plane id sorts below
//! the highlight plane id, so highlights composite last.

use ndarray::Zip;
use tracing::{debug, warn};

use super::config::{lod_scale, linear_contour, BevelConfig, BevelDirection, BevelStyle, LayerStyle, StyleContext};
use super::{selection_from_alpha, EffectKind, LayerStyleFilter};
use crate::environment::LayerStyleEnvironment;
use crate::filters::blur::apply_gaussian;
use crate::filters::bumpmap::{bumpmap, BumpmapParams, BumpmapProfile, FLAT_LEVEL};
use crate::filters::contour::{adjust_range, apply_contour_correction};
use crate::filters::core::grow_rect_from_radius;
use crate::filters::fill::apply_final_selection;
use crate::filters::morphology::resize_selection;
use crate::filters::pattern::{pattern_mask, pattern_offset};
use crate::geometry::Rect;
use crate::knockout::KnockoutMask;
use crate::projection::MultiPlaneCompositor;
use crate::raster::{lerp_u8, CoverageMask, MaskOp, RasterPlane};

pub const SHADOW_PLANE_ID: &str = "00_bevel_shadow";
pub const HIGHLIGHT_PLANE_ID: &str = "01_bevel_highlight";

/// Ring layout of a bevel style: `(rings, initial grow, limiting grow)`.
///
/// `None` for styles that are not supported.
fn bevel_geometry(style: BevelStyle, size: i32) -> Option<(i32, i32, i32)> {
    let half_up = (size + 1) / 2;
    match style {
        BevelStyle::OuterBevel => Some((size, size, size)),
        BevelStyle::InnerBevel => Some((size, 0, 0)),
        BevelStyle::Emboss => Some((size, half_up, half_up)),
        BevelStyle::PillowEmboss => Some((half_up, half_up, half_up)),
        BevelStyle::StrokeEmboss => None,
    }
}

/// Rects of every pipeline stage, from the output back to the fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BevelRects {
    apply_rect: Rect,
    gloss_rect: Rect,
    bumpmap_rect: Rect,
    contour_rect: Rect,
    texture_rect: Rect,
    bevel_rect: Rect,
    fetch_rect: Rect,
}

impl BevelRects {
    fn new(apply_rect: Rect, size: i32, soften: i32) -> Self {
        let gloss_rect = grow_rect_from_radius(apply_rect, soften);
        let bumpmap_rect = gloss_rect;
        let contour_rect = bumpmap_rect.grown(1);
        let texture_rect = contour_rect;
        let bevel_rect = texture_rect.grown(size);
        BevelRects {
            apply_rect,
            gloss_rect,
            bumpmap_rect,
            contour_rect,
            texture_rect,
            bevel_rect,
            fetch_rect: bevel_rect.grown(1),
        }
    }
}

/// Paint `size` rings of `src` into a ramp over `rect`.
///
/// Ring `i` is `src` grown by `initial_size - i - 1` (shrunk when negative)
/// and filled with coverage `(i + 1) / size`, or the reverse when `invert`.
/// Later rings overwrite earlier ones through their own coverage.
fn paint_bevel_selection(src: &CoverageMask, rect: Rect, size: i32, initial_size: i32, invert: bool) -> CoverageMask {
    let mut ramp = CoverageMask::new();
    ramp.fill(rect, 0);
    let mut ring = CoverageMask::new();
    for i in 0..size {
        let grow = initial_size - i - 1;
        let step = if invert { size - i - 1 } else { i + 1 };
        let value = (step as f64 / size as f64 * 255.0).round() as u8;

        ring.clone_from(src);
        resize_selection(&mut ring, rect, grow);
        let coverage = ring.read_region(rect);
        let mut values = ramp.read_region(rect);
        Zip::from(&mut values)
            .and(&coverage)
            .par_for_each(|v, &c| *v = lerp_u8(*v, value, c));
        ramp.write_region(rect.top_left(), values.view());
    }
    ramp
}

/// Height ramp of a bevel style over `rect`.
fn bevel_ramp(alpha: &CoverageMask, rect: Rect, style: BevelStyle, size: i32) -> Option<CoverageMask> {
    let (rings, initial, _) = bevel_geometry(style, size)?;
    let mut ramp = paint_bevel_selection(alpha, rect, rings, initial, false);
    if style == BevelStyle::PillowEmboss {
        // Falling inner half: complement of an inner ramp of the other half.
        let mut inner = paint_bevel_selection(alpha, rect, size / 2, 0, false);
        inner.invert();
        let falling = inner.read_region(rect);
        let mut values = ramp.read_region(rect);
        Zip::from(&mut values).and(&falling).for_each(|v, &f| *v = (*v).min(f));
        ramp.write_region(rect.top_left(), values.view());
    }
    Some(ramp)
}

/// Contrast factor of a texture depth: 0-100 % maps to 0-1, 100-1000 % to 1-4.
fn texture_contrast(depth: i32) -> f64 {
    let depth = depth.unsigned_abs().min(1000) as f64;
    if depth <= 100.0 {
        depth / 100.0
    } else {
        1.0 + (depth - 100.0) / 900.0 * 3.0
    }
}

fn texture_lut(depth: i32, invert: bool) -> [u8; 256] {
    let contrast = texture_contrast(depth);
    let invert = invert ^ (depth < 0);
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let value = (if invert { 255 - i } else { i }) as f64;
        *v = ((value - 127.0) * contrast + 127.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn shadow_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let level = i.min(FLAT_LEVEL as usize) as f64;
        *v = 255 - (level * 255.0 / FLAT_LEVEL as f64).round() as u8;
    }
    lut
}

fn highlight_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let level = i.saturating_sub(FLAT_LEVEL as usize) as f64;
        *v = (level * 255.0 / (255 - FLAT_LEVEL) as f64).round() as u8;
    }
    lut
}

/// Map the shaded ramp through `lut` and limit it to `limiting`.
fn split_selection(shaded: &CoverageMask, rect: Rect, lut: &[u8; 256], limiting: &CoverageMask) -> CoverageMask {
    let values = shaded.read_region(rect).mapv(|v| lut[v as usize]);
    let mut mask = CoverageMask::from_array(values, rect.top_left());
    mask.blit(limiting, rect, MaskOp::Intersect);
    mask
}

/// Bump depth of a bevel depth percentage.
fn bump_depth(depth: i32) -> i32 {
    (depth * 3 / 100).max(1)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BevelEmbossEffect;

impl BevelEmbossEffect {
    fn apply_bevel(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        apply_rect: Rect,
        config: &BevelConfig,
        context: &StyleContext,
        env: &LayerStyleEnvironment,
    ) {
        if apply_rect.is_empty() {
            return;
        }
        let Some((_, _, limiting_grow)) = bevel_geometry(config.style, config.size) else {
            warn!(style = ?config.style, "bevel style is not implemented, skipping");
            return;
        };
        let d = BevelRects::new(apply_rect, config.size, config.soften);

        let mut alpha = env.cached_selection();
        selection_from_alpha(&mut alpha, src, d.fetch_rect);

        let Some(mut ramp) = bevel_ramp(&alpha, d.texture_rect, config.style, config.size) else {
            return;
        };

        if config.texture_enabled {
            match config.texture_pattern.as_ref() {
                Some(pattern) => {
                    let bounds = if config.texture_align_with_layer {
                        env.layer_bounds()
                    } else {
                        env.default_bounds()
                    };
                    let offset = pattern_offset(pattern, bounds, config.texture_phase.x, config.texture_phase.y);
                    let mut texture = pattern_mask(d.texture_rect, pattern, offset, config.texture_scale);
                    texture.map_region(d.texture_rect, &texture_lut(config.texture_depth, config.texture_invert));
                    ramp.blit(&texture, d.texture_rect, MaskOp::Intersect);
                }
                None => warn!("bevel texture has no pattern, skipping texture"),
            }
        }

        if config.contour_enabled {
            adjust_range(&mut ramp, d.contour_rect, config.contour_range);
            apply_contour_correction(&mut ramp, d.contour_rect, &config.contour, config.contour_anti_aliased, false);
        }

        let params = BumpmapParams {
            azimuth: config.light_angle(context) as f64,
            elevation: config.altitude as f64,
            depth: bump_depth(config.depth),
            profile: BumpmapProfile::Linear,
            invert: config.direction == BevelDirection::Down,
            ambient: 0,
            compensate: true,
        };
        bumpmap(&mut ramp, d.bumpmap_rect, &params);

        // A linear gloss curve is the identity; skip it so flat areas stay flat
        if config.gloss_contour != linear_contour() {
            apply_contour_correction(&mut ramp, d.gloss_rect, &config.gloss_contour, config.gloss_anti_aliased, false);
        }

        if config.soften > 0 {
            apply_gaussian(&mut ramp, d.apply_rect, config.soften);
        }

        let mut limiting = env.cached_selection();
        limiting.clone_from(&alpha);
        resize_selection(&mut limiting, d.apply_rect, limiting_grow);

        let shadows = split_selection(&ramp, d.apply_rect, &shadow_lut(), &limiting);
        let highlights = split_selection(&ramp, d.apply_rect, &highlight_lut(), &limiting);

        apply_final_selection(SHADOW_PLANE_ID, &shadows, src, dst, d.apply_rect, &config.shadow_fill(), env);
        apply_final_selection(
            HIGHLIGHT_PLANE_ID,
            &highlights,
            src,
            dst,
            d.apply_rect,
            &config.highlight_fill(),
            env,
        );
    }
}

impl LayerStyleFilter for BevelEmbossEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::BevelEmboss
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
        let config = &style.bevel_emboss;
        if !style.enabled || !config.enabled {
            dst.free_all_projections();
            return;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        debug!(effect = %self.kind(), rect = ?apply_rect, style = ?config.style, size = config.size, "processing");
        self.apply_bevel(src, dst, apply_rect, &config, &style.context, env);
    }

    fn needed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        let config = &style.bevel_emboss;
        if !style.enabled || !config.enabled || bevel_geometry(config.style, config.size).is_none() {
            return rect;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        BevelRects::new(rect, config.size, config.soften).bevel_rect
    }

    fn changed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        let config = &style.bevel_emboss;
        if !style.enabled || !config.enabled {
            return rect;
        }
        let config = config.scaled(lod_scale(env.current_level_of_detail()));
        let Some((_, _, limiting_grow)) = bevel_geometry(config.style, config.size) else {
            return rect;
        };
        grow_rect_from_radius(rect.grown(limiting_grow + 1), config.soften)
    }

    fn clone_box(&self) -> Box<dyn LayerStyleFilter> {
        Box::new(*self)
    }
}
