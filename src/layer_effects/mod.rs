//! Layer effects (Photoshop-style layer styles).
//!
//! Each effect is a stateless filter that reads the layer's pixels and
//! writes its contribution into named planes of a `MultiPlaneCompositor`.
//!
//! ## Shadow and Glow Effects
//! - **Drop Shadow** - Shadow cast behind the layer (`shadow_glow.rs`)
//! - **Inner Shadow** - Shadow inside the layer edges (`shadow_glow.rs`)
//! - **Outer Glow** - Glow radiating outward from edges (`shadow_glow.rs`)
//! - **Inner Glow** - Glow radiating inward from edges (`shadow_glow.rs`)
//!
//! ## Bevel & Emboss
//! - **Bevel & Emboss** - 3D raised/sunken appearance (`bevel_emboss.rs`)
//!
//! ## Overlay Effects
//! - **Satin** - Silky interior shading (`satin.rs`)
//! - **Color / Gradient / Pattern Overlay** - Fill preserving alpha (`overlay.rs`)
//!
//! ## Stroke
//! - **Stroke** - Outline around layer content (`stroke.rs`)
//!
//! ## Layer Effects vs Filters
//!
//! Layer effects differ from filters in that they:
//! - Work primarily with the alpha channel
//! - May expand the affected area (`changed_rect` grows the input rect)
//! - Never write into the source layer
//! - Carry their own blend mode and opacity through the plane they fill

pub mod config;

pub mod bevel_emboss;
pub mod overlay;
pub mod satin;
pub mod shadow_glow;
pub mod stroke;

use std::fmt;

use crate::environment::LayerStyleEnvironment;
use crate::geometry::Rect;
use crate::knockout::KnockoutMask;
use crate::projection::MultiPlaneCompositor;
use crate::raster::{CoverageMask, RasterPlane};

use self::bevel_emboss::BevelEmbossEffect;
use self::config::LayerStyle;
use self::overlay::OverlayEffect;
use self::satin::SatinEffect;
use self::shadow_glow::ShadowGlowEffect;
use self::stroke::StrokeEffect;

/// The effects a layer style can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    DropShadow,
    InnerShadow,
    OuterGlow,
    InnerGlow,
    Satin,
    ColorOverlay,
    GradientOverlay,
    PatternOverlay,
    Stroke,
    BevelEmboss,
}

impl EffectKind {
    /// Whether the effect is switched on in `style`.
    pub fn is_enabled(&self, style: &LayerStyle) -> bool {
        match self {
            EffectKind::DropShadow => style.drop_shadow.enabled,
            EffectKind::InnerShadow => style.inner_shadow.enabled,
            EffectKind::OuterGlow => style.outer_glow.enabled,
            EffectKind::InnerGlow => style.inner_glow.enabled,
            EffectKind::Satin => style.satin.enabled,
            EffectKind::ColorOverlay => style.color_overlay.enabled,
            EffectKind::GradientOverlay => style.gradient_overlay.enabled,
            EffectKind::PatternOverlay => style.pattern_overlay.enabled,
            EffectKind::Stroke => style.stroke.enabled,
            EffectKind::BevelEmboss => style.bevel_emboss.enabled,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::DropShadow => "drop_shadow",
            EffectKind::InnerShadow => "inner_shadow",
            EffectKind::OuterGlow => "outer_glow",
            EffectKind::InnerGlow => "inner_glow",
            EffectKind::Satin => "satin",
            EffectKind::ColorOverlay => "color_overlay",
            EffectKind::GradientOverlay => "gradient_overlay",
            EffectKind::PatternOverlay => "pattern_overlay",
            EffectKind::Stroke => "stroke",
            EffectKind::BevelEmboss => "bevel_emboss",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A layer effect.
///
/// Implementations hold no per-call state: the configuration is looked up
/// in `style` on every call, so one instance can serve any number of layers
/// and concurrent tiles.
pub trait LayerStyleFilter: Send + Sync {
    fn kind(&self) -> EffectKind;

    /// Render the effect for `apply_rect` into planes of `dst`.
    ///
    /// A disabled effect frees its planes and returns.
    fn process_directly(
        &self,
        src: &RasterPlane,
        dst: &MultiPlaneCompositor,
        knockout: &KnockoutMask,
        apply_rect: Rect,
        style: &LayerStyle,
        env: &LayerStyleEnvironment,
    );

    /// Source region needed to render `rect`.
    fn needed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect;

    /// Output region affected by a change of the source inside `rect`.
    fn changed_rect(&self, rect: Rect, style: &LayerStyle, env: &LayerStyleEnvironment) -> Rect;

    fn clone_box(&self) -> Box<dyn LayerStyleFilter>;
}

impl Clone for Box<dyn LayerStyleFilter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Load the alpha channel of `src` over `rect` into a scratch mask.
pub(crate) fn selection_from_alpha(mask: &mut CoverageMask, src: &RasterPlane, rect: Rect) {
    mask.write_region(rect.top_left(), src.alpha_region(rect).view());
}

static DROP_SHADOW: ShadowGlowEffect = ShadowGlowEffect::new(EffectKind::DropShadow);
static INNER_SHADOW: ShadowGlowEffect = ShadowGlowEffect::new(EffectKind::InnerShadow);
static OUTER_GLOW: ShadowGlowEffect = ShadowGlowEffect::new(EffectKind::OuterGlow);
static INNER_GLOW: ShadowGlowEffect = ShadowGlowEffect::new(EffectKind::InnerGlow);
static SATIN: SatinEffect = SatinEffect;
static COLOR_OVERLAY: OverlayEffect = OverlayEffect::new(EffectKind::ColorOverlay);
static GRADIENT_OVERLAY: OverlayEffect = OverlayEffect::new(EffectKind::GradientOverlay);
static PATTERN_OVERLAY: OverlayEffect = OverlayEffect::new(EffectKind::PatternOverlay);
static STROKE: StrokeEffect = StrokeEffect;
static BEVEL_EMBOSS: BevelEmbossEffect = BevelEmbossEffect;

/// The filter implementing `kind`.
pub fn filter_for(kind: EffectKind) -> &'static dyn LayerStyleFilter {
    match kind {
        EffectKind::DropShadow => &DROP_SHADOW,
        EffectKind::InnerShadow => &INNER_SHADOW,
        EffectKind::OuterGlow => &OUTER_GLOW,
        EffectKind::InnerGlow => &INNER_GLOW,
        EffectKind::Satin => &SATIN,
        EffectKind::ColorOverlay => &COLOR_OVERLAY,
        EffectKind::GradientOverlay => &GRADIENT_OVERLAY,
        EffectKind::PatternOverlay => &PATTERN_OVERLAY,
        EffectKind::Stroke => &STROKE,
        EffectKind::BevelEmboss => &BEVEL_EMBOSS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [EffectKind; 10] = [
        EffectKind::DropShadow,
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

    #[test]
    fn test_filter_for_matches_kind() {
        for kind in KINDS {
            assert_eq!(filter_for(kind).kind(), kind);
            assert_eq!(filter_for(kind).clone_box().kind(), kind);
        }
    }

    #[test]
    fn test_disabled_effects_have_identity_rects() {
        let style = LayerStyle::default();
        let env = LayerStyleEnvironment::new(Rect::new(0, 0, 10, 10), Rect::new(0, 0, 10, 10));
        let rect = Rect::new(3, 4, 5, 6);
        for kind in KINDS {
            assert!(!kind.is_enabled(&style));
            assert_eq!(filter_for(kind).needed_rect(rect, &style, &env), rect);
            assert_eq!(filter_for(kind).changed_rect(rect, &style, &env), rect);
        }
    }

    #[test]
    fn test_disabled_effect_leaves_compositor_empty() {
        let style = LayerStyle::default();
        let env = LayerStyleEnvironment::new(Rect::new(0, 0, 10, 10), Rect::new(0, 0, 10, 10));
        let src = RasterPlane::filled(
            crate::raster::PixelFormat::Rgba8,
            Rect::new(0, 0, 10, 10),
            crate::raster::Color::WHITE,
        );
        for kind in KINDS {
            let dst = MultiPlaneCompositor::new();
            let knockout = KnockoutMask::new();
            filter_for(kind).process_directly(&src, &dst, &knockout, Rect::new(0, 0, 10, 10), &style, &env);
            assert!(dst.is_empty());
            assert!(knockout.is_empty());
        }
    }
}
