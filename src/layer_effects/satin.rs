//! Satin: interior shading from two offset copies of the blurred alpha.

use ndarray::{s, Array2, Zip};
use tracing::debug;

use super::config::{lod_scale, LayerStyle, SatinConfig};
use super::{selection_from_alpha, EffectKind, LayerStyleFilter};
use crate::environment::LayerStyleEnvironment;
use crate::filters::blur::apply_gaussian;
use crate::filters::contour::apply_contour_correction;
use crate::filters::core::grow_rect_from_radius;
use crate::filters::fill::apply_final_selection;
use crate::geometry::{Point, Rect};
use crate::knockout::KnockoutMask;
use crate::projection::{MultiPlaneCompositor, DEFAULT_PLANE_ID};
use crate::raster::{CoverageMask, RasterPlane};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SatinRects {
    offset: Point,
    /// Area of blurred coverage both offset copies read from.
    blur_rect: Rect,
    /// Alpha needed to blur `blur_rect`.
    fetch_rect: Rect,
}

impl SatinRects {
    fn new(rect: Rect, config: &SatinConfig) -> Self {
        let offset = config.calculate_offset();
        let blur_rect = rect.grown_xy(offset.x.abs(), offset.y.abs());
        SatinRects {
            offset,
            blur_rect,
            fetch_rect: grow_rect_from_radius(blur_rect, config.size),
        }
    }
}

/// `|m(p - offset) - m(p + offset)|` over `rect`, complemented when `invert`,
/// then limited by the layer's own coverage.
fn blend_and_offset(blurred: &CoverageMask, alpha: &CoverageMask, rect: Rect, offset: Point, invert: bool) -> CoverageMask {
    let (dx, dy) = (offset.x.abs(), offset.y.abs());
    let area = blurred.read_region(rect.grown_xy(dx, dy));
    let (h, w) = (rect.height as usize, rect.width as usize);

    // Window origins inside `area` of the two shifted copies
    let minus = ((dy - offset.y) as usize, (dx - offset.x) as usize);
    let plus = ((dy + offset.y) as usize, (dx + offset.x) as usize);
    let a = area.slice(s![minus.0..minus.0 + h, minus.1..minus.1 + w]);
    let b = area.slice(s![plus.0..plus.0 + h, plus.1..plus.1 + w]);
    let limit = alpha.read_region(rect);

    let mut out = Array2::<u8>::zeros((h, w));
    Zip::from(&mut out)
        .and(&a)
        .and(&b)
        .and(&limit)
        .par_for_each(|o, &m, &p, &l| {
            let diff = m.abs_diff(p);
            let value = if invert { 255 - diff } else { diff };
            *o = value.min(l);
        });
    CoverageMask::from_array(out, rect.top_left())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SatinEffect;

impl SatinEffect {
    fn apply_satin(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        apply_rect: Rect,
        config: &SatinConfig,
        env: &LayerStyleEnvironment,
    ) {
        if apply_rect.is_empty() {
            return;
        }
        let d = SatinRects::new(apply_rect, config);

        let mut alpha = env.cached_selection();
        selection_from_alpha(&mut alpha, src, d.fetch_rect);

        let mut blurred = env.cached_selection();
        blurred.clone_from(&alpha);
        if config.size > 0 {
            apply_gaussian(&mut blurred, d.blur_rect, config.size);
        }
        apply_contour_correction(&mut blurred, d.blur_rect, &config.contour, config.anti_aliased, false);

        let selection = blend_and_offset(&blurred, &alpha, apply_rect, d.offset, config.invert);
        apply_final_selection(
            DEFAULT_PLANE_ID,
            &selection,
            src,
            dst,
            apply_rect,
            &config.fill_params(),
            env,
        );
    }
}

impl LayerStyleFilter for SatinEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Satin
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
        if !style.enabled || !style.satin.enabled {
            dst.free_all_projections();
            return;
        }
        let config = style.satin.scaled(lod_scale(env.current_level_of_detail()));
        debug!(effect = %self.kind(), rect = ?apply_rect, size = config.size, distance = config.distance, "processing");
        self.apply_satin(src, dst, apply_rect, &config, env);
    }

    fn needed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        if !style.enabled || !style.satin.enabled {
            return rect;
        }
        let config = style.satin.scaled(lod_scale(env.current_level_of_detail()));
        SatinRects::new(rect, &config).fetch_rect
    }

    fn changed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect {
        self.needed_rect(rect, style, env)
    }

    fn clone_box(&self) -> Box<dyn LayerStyleFilter> {
        Box::new(*self)
    }
}
