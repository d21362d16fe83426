//! Layer style configuration.
//!
//! One typed config per effect family with Photoshop-compatible defaults.
//! Linear sizes (distance, size, soften...) are in pixels at full
//! resolution; `scaled` produces the level-of-detail copy effects run with.

use std::sync::Arc;

use crate::filters::contour::ContourCurve;
use crate::filters::core::identity_lut;
use crate::filters::fill::{opacity_to_u8, FillParams, FillSource};
use crate::filters::gradient::Gradient;
use crate::filters::pattern::Pattern;
use crate::geometry::Point;
use crate::raster::{BlendMode, Color};

/// Scale factor for a level of detail: `2^-lod`.
pub fn lod_scale(lod: u32) -> f64 {
    1.0 / (1u64 << lod.min(31)) as f64
}

/// Scale an integer size the way `int *= double` does: truncating.
#[inline]
fn scale_size(value: i32, factor: f64) -> i32 {
    (value as f64 * factor) as i32
}

/// Linear (identity) contour curve.
pub fn linear_contour() -> ContourCurve {
    identity_lut()
}

/// Direction/distance offset: `(-round(d·cos a), round(d·sin a))`.
pub fn offset_from_angle(angle_degrees: i32, distance: i32) -> Point {
    let a = (angle_degrees as f64).to_radians();
    let d = distance as f64;
    Point::new(-(d * a.cos()).round() as i32, (d * a.sin()).round() as i32)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Technique {
    #[default]
    Softer,
    Precise,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillType {
    #[default]
    SolidColor,
    Gradient,
    Pattern,
}

/// Where an inner glow starts from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlowSource {
    Center,
    #[default]
    Edge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BevelStyle {
    OuterBevel,
    #[default]
    InnerBevel,
    Emboss,
    PillowEmboss,
    StrokeEmboss,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BevelDirection {
    #[default]
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokePosition {
    #[default]
    Outside,
    Inside,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientStyle {
    #[default]
    Linear,
    Radial,
    Angle,
    Reflected,
    Diamond,
}

/// Style-wide settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleContext {
    /// Light angle used by effects with `use_global_light`.
    pub global_angle: i32,
    /// Paint the layer's own pixels between the before/after effects.
    pub keep_original: bool,
}

impl Default for StyleContext {
    fn default() -> Self {
        StyleContext {
            global_angle: 120,
            keep_original: true,
        }
    }
}

// ============================================================================
// Shadows and glows
// ============================================================================

/// Drop shadow, inner shadow, outer glow and inner glow.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowConfig {
    pub enabled: bool,
    pub blend_mode: BlendMode,
    pub color: Color,
    /// 0-100 %.
    pub opacity: i32,
    pub angle: i32,
    pub use_global_light: bool,
    pub distance: i32,
    /// 0-100 % of `size` spent growing before the blur.
    pub spread: i32,
    pub size: i32,
    /// 0-100 %.
    pub noise: i32,
    pub knocks_out: bool,
    /// Work on the transparent area (inner variants).
    pub invert_selection: bool,
    pub edge_hidden: bool,
    pub contour: ContourCurve,
    pub anti_aliased: bool,
    pub technique: Technique,
    /// 1-100 %.
    pub range: i32,
    /// Gradient index jitter, 0-100 %.
    pub jitter: i32,
    pub fill_type: FillType,
    pub gradient: Option<Arc<Gradient>>,
    /// Inner glow only.
    pub source: GlowSource,
}

impl ShadowConfig {
    pub fn drop_shadow() -> Self {
        ShadowConfig {
            enabled: false,
            blend_mode: BlendMode::Multiply,
            color: Color::BLACK,
            opacity: 75,
            angle: 120,
            use_global_light: true,
            distance: 21,
            spread: 0,
            size: 21,
            noise: 0,
            knocks_out: false,
            invert_selection: false,
            edge_hidden: true,
            contour: linear_contour(),
            anti_aliased: false,
            technique: Technique::Softer,
            range: 100,
            jitter: 0,
            fill_type: FillType::SolidColor,
            gradient: None,
            source: GlowSource::Edge,
        }
    }

    /// Inner variants knock out their inverted source, which confines them
    /// to the layer's opaque area.
    pub fn inner_shadow() -> Self {
        ShadowConfig {
            invert_selection: true,
            knocks_out: true,
            edge_hidden: false,
            ..ShadowConfig::drop_shadow()
        }
    }

    pub fn outer_glow() -> Self {
        ShadowConfig {
            blend_mode: BlendMode::Screen,
            color: Color::rgb(255, 255, 190),
            distance: 0,
            size: 5,
            ..ShadowConfig::drop_shadow()
        }
    }

    pub fn inner_glow() -> Self {
        ShadowConfig {
            invert_selection: true,
            knocks_out: true,
            edge_hidden: false,
            ..ShadowConfig::outer_glow()
        }
    }

    /// Offset the shadow is moved by.
    pub fn calculate_offset(&self, context: &StyleContext) -> Point {
        let angle = if self.use_global_light {
            context.global_angle
        } else {
            self.angle
        };
        offset_from_angle(angle, self.distance)
    }

    /// Pixels of `size` spent on spreading.
    pub fn spread_size(&self) -> i32 {
        (self.spread * self.size + 50) / 100
    }

    /// Pixels of `size` spent on blurring.
    pub fn blur_size(&self) -> i32 {
        self.size - self.spread_size()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        ShadowConfig {
            distance: scale_size(self.distance, factor),
            size: scale_size(self.size, factor),
            ..self.clone()
        }
    }

    pub fn fill_params(&self) -> FillParams {
        let source = match (&self.fill_type, &self.gradient) {
            (FillType::Gradient, Some(gradient)) => FillSource::Gradient {
                gradient: Arc::clone(gradient),
                jitter: self.jitter,
            },
            _ => FillSource::Solid(self.color),
        };
        FillParams {
            source,
            blend_mode: self.blend_mode,
            opacity: opacity_to_u8(self.opacity),
        }
    }
}

// ============================================================================
// Satin
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SatinConfig {
    pub enabled: bool,
    pub blend_mode: BlendMode,
    pub color: Color,
    pub opacity: i32,
    pub angle: i32,
    pub distance: i32,
    pub size: i32,
    pub contour: ContourCurve,
    pub anti_aliased: bool,
    pub invert: bool,
    pub fill_type: FillType,
    pub gradient: Option<Arc<Gradient>>,
}

impl Default for SatinConfig {
    fn default() -> Self {
        SatinConfig {
            enabled: false,
            blend_mode: BlendMode::Multiply,
            color: Color::BLACK,
            opacity: 50,
            angle: 19,
            distance: 11,
            size: 14,
            contour: linear_contour(),
            anti_aliased: false,
            invert: true,
            fill_type: FillType::SolidColor,
            gradient: None,
        }
    }
}

impl SatinConfig {
    pub fn calculate_offset(&self) -> Point {
        offset_from_angle(self.angle, self.distance)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        SatinConfig {
            distance: scale_size(self.distance, factor),
            size: scale_size(self.size, factor),
            ..self.clone()
        }
    }

    pub fn fill_params(&self) -> FillParams {
        let source = match (&self.fill_type, &self.gradient) {
            (FillType::Gradient, Some(gradient)) => FillSource::Gradient {
                gradient: Arc::clone(gradient),
                jitter: 0,
            },
            _ => FillSource::Solid(self.color),
        };
        FillParams {
            source,
            blend_mode: self.blend_mode,
            opacity: opacity_to_u8(self.opacity),
        }
    }
}

// ============================================================================
// Bevel and emboss
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct BevelConfig {
    pub enabled: bool,
    pub style: BevelStyle,
    pub direction: BevelDirection,
    /// 1-1000 %.
    pub depth: i32,
    pub size: i32,
    pub soften: i32,
    pub angle: i32,
    pub use_global_light: bool,
    pub altitude: i32,
    pub gloss_contour: ContourCurve,
    pub gloss_anti_aliased: bool,
    pub contour_enabled: bool,
    pub contour: ContourCurve,
    pub contour_anti_aliased: bool,
    pub contour_range: i32,
    pub texture_enabled: bool,
    pub texture_pattern: Option<Arc<Pattern>>,
    pub texture_scale: i32,
    /// -1000 to 1000 %.
    pub texture_depth: i32,
    pub texture_invert: bool,
    pub texture_align_with_layer: bool,
    pub texture_phase: Point,
    pub highlight_blend_mode: BlendMode,
    pub highlight_color: Color,
    pub highlight_opacity: i32,
    pub shadow_blend_mode: BlendMode,
    pub shadow_color: Color,
    pub shadow_opacity: i32,
}

impl Default for BevelConfig {
    fn default() -> Self {
        BevelConfig {
            enabled: false,
            style: BevelStyle::InnerBevel,
            direction: BevelDirection::Up,
            depth: 100,
            size: 5,
            soften: 0,
            angle: 120,
            use_global_light: true,
            altitude: 30,
            gloss_contour: linear_contour(),
            gloss_anti_aliased: false,
            contour_enabled: false,
            contour: linear_contour(),
            contour_anti_aliased: false,
            contour_range: 100,
            texture_enabled: false,
            texture_pattern: None,
            texture_scale: 100,
            texture_depth: 100,
            texture_invert: false,
            texture_align_with_layer: true,
            texture_phase: Point::default(),
            highlight_blend_mode: BlendMode::Screen,
            highlight_color: Color::WHITE,
            highlight_opacity: 75,
            shadow_blend_mode: BlendMode::Multiply,
            shadow_color: Color::BLACK,
            shadow_opacity: 75,
        }
    }
}

impl BevelConfig {
    /// Light azimuth in degrees.
    pub fn light_angle(&self, context: &StyleContext) -> i32 {
        if self.use_global_light {
            context.global_angle
        } else {
            self.angle
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        BevelConfig {
            size: scale_size(self.size, factor),
            soften: scale_size(self.soften, factor),
            texture_scale: scale_size(self.texture_scale, factor).max(1),
            ..self.clone()
        }
    }

    pub fn highlight_fill(&self) -> FillParams {
        FillParams {
            source: FillSource::Solid(self.highlight_color),
            blend_mode: self.highlight_blend_mode,
            opacity: opacity_to_u8(self.highlight_opacity),
        }
    }

    pub fn shadow_fill(&self) -> FillParams {
        FillParams {
            source: FillSource::Solid(self.shadow_color),
            blend_mode: self.shadow_blend_mode,
            opacity: opacity_to_u8(self.shadow_opacity),
        }
    }
}

// ============================================================================
// Overlays and stroke
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct GradientFill {
    pub gradient: Arc<Gradient>,
    pub style: GradientStyle,
    pub angle: i32,
    /// Percent of the bounds (10-150 typical).
    pub scale: i32,
    /// Center offset in percent of the bounds.
    pub offset: Point,
    pub reverse: bool,
    pub align_with_layer: bool,
}

impl Default for GradientFill {
    fn default() -> Self {
        GradientFill {
            gradient: Arc::new(Gradient::two_color(Color::BLACK, Color::WHITE)),
            style: GradientStyle::Linear,
            angle: 90,
            scale: 100,
            offset: Point::default(),
            reverse: false,
            align_with_layer: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternFill {
    pub pattern: Option<Arc<Pattern>>,
    /// Percent.
    pub scale: i32,
    /// Phase in percent of the tile size.
    pub phase: Point,
    pub align_with_layer: bool,
}

impl Default for PatternFill {
    fn default() -> Self {
        PatternFill {
            pattern: None,
            scale: 100,
            phase: Point::default(),
            align_with_layer: true,
        }
    }
}

/// What an overlay or stroke paints.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayFill {
    Color(Color),
    Gradient(GradientFill),
    Pattern(PatternFill),
}

impl OverlayFill {
    pub fn fill_type(&self) -> FillType {
        match self {
            OverlayFill::Color(_) => FillType::SolidColor,
            OverlayFill::Gradient(_) => FillType::Gradient,
            OverlayFill::Pattern(_) => FillType::Pattern,
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        match self {
            OverlayFill::Pattern(fill) => OverlayFill::Pattern(PatternFill {
                scale: scale_size(fill.scale, factor).max(1),
                ..fill.clone()
            }),
            other => other.clone(),
        }
    }
}

/// Color, gradient and pattern overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub blend_mode: BlendMode,
    pub opacity: i32,
    pub fill: OverlayFill,
}

impl OverlayConfig {
    pub fn color(color: Color) -> Self {
        OverlayConfig {
            enabled: false,
            blend_mode: BlendMode::Normal,
            opacity: 100,
            fill: OverlayFill::Color(color),
        }
    }

    pub fn gradient(fill: GradientFill) -> Self {
        OverlayConfig {
            fill: OverlayFill::Gradient(fill),
            ..OverlayConfig::color(Color::BLACK)
        }
    }

    pub fn pattern(fill: PatternFill) -> Self {
        OverlayConfig {
            fill: OverlayFill::Pattern(fill),
            ..OverlayConfig::color(Color::BLACK)
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        OverlayConfig {
            fill: self.fill.scaled(factor),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeConfig {
    pub enabled: bool,
    pub position: StrokePosition,
    pub size: i32,
    pub blend_mode: BlendMode,
    pub opacity: i32,
    pub fill: OverlayFill,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        StrokeConfig {
            enabled: false,
            position: StrokePosition::Outside,
            size: 3,
            blend_mode: BlendMode::Normal,
            opacity: 100,
            fill: OverlayFill::Color(Color::rgb(255, 0, 0)),
        }
    }
}

impl StrokeConfig {
    pub fn scaled(&self, factor: f64) -> Self {
        StrokeConfig {
            size: scale_size(self.size, factor),
            fill: self.fill.scaled(factor),
            ..self.clone()
        }
    }
}

// ============================================================================
// Style
// ============================================================================

/// All effects of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStyle {
    pub enabled: bool,
    pub context: StyleContext,
    pub drop_shadow: ShadowConfig,
    pub inner_shadow: ShadowConfig,
    pub outer_glow: ShadowConfig,
    pub inner_glow: ShadowConfig,
    pub satin: SatinConfig,
    pub color_overlay: OverlayConfig,
    pub gradient_overlay: OverlayConfig,
    pub pattern_overlay: OverlayConfig,
    pub stroke: StrokeConfig,
    pub bevel_emboss: BevelConfig,
}

impl Default for LayerStyle {
    fn default() -> Self {
        LayerStyle {
            enabled: true,
            context: StyleContext::default(),
            drop_shadow: ShadowConfig::drop_shadow(),
            inner_shadow: ShadowConfig::inner_shadow(),
            outer_glow: ShadowConfig::outer_glow(),
            inner_glow: ShadowConfig::inner_glow(),
            satin: SatinConfig::default(),
            color_overlay: OverlayConfig::color(Color::rgb(255, 0, 0)),
            gradient_overlay: OverlayConfig::gradient(GradientFill::default()),
            pattern_overlay: OverlayConfig::pattern(PatternFill::default()),
            stroke: StrokeConfig::default(),
            bevel_emboss: BevelConfig::default(),
        }
    }
}
