//! ImageStag Layer Styles
//!
//! Photoshop-compatible layer styles rendered on the CPU, with optional
//! Python bindings via PyO3.
//!
//! ## Image Format
//! Layers are RGBA `u8` planes placed in layer space: a plane's origin may be
//! negative, and effects like drop shadows render outside the layer's own
//! bounds.
//!
//! ## Architecture
//! - `environment`: per-layer context plus scratch pools
//! - `projection`: named planes each effect renders into
//! - `knockout`: shared cutout mask for stroke-like effects
//! - `filters`: alpha-channel algorithms (blur, contour, bump map, fills)
//! - `layer_effects`: the effect filters and their configuration
//! - `style_stack`: fixed-order orchestration around the layer's pixels
//!
//! Effect filters may be called concurrently for disjoint regions of one
//! layer; the shared state they write to is lock-protected.

pub mod cache;
pub mod environment;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod knockout;
pub mod layer_effects;
pub mod projection;
pub mod raster;
pub mod style_stack;

pub use environment::LayerStyleEnvironment;
pub use error::StyleError;
pub use geometry::{Point, Rect};
pub use knockout::KnockoutMask;
pub use layer_effects::config::LayerStyle;
pub use layer_effects::{EffectKind, LayerStyleFilter};
pub use projection::MultiPlaneCompositor;
pub use raster::{BlendMode, ChannelFlags, Color, CoverageMask, PixelFormat, RasterPlane};
pub use style_stack::{DirtyPosition, StyleStack};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use std::str::FromStr;

    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::geometry::Point;
    use crate::layer_effects::config::{
        BevelStyle, GlowSource, LayerStyle, OverlayConfig, ShadowConfig, StrokePosition,
    };
    use crate::raster::{BlendMode, Color, RasterPlane};
    use crate::style_stack::StyleStack;

    /// Styled image plus the layer-space position of its top-left pixel.
    type Rendered<'py> = (Bound<'py, PyArray3<u8>>, i32, i32);

    fn value_error(err: impl std::fmt::Display) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    fn blend_mode(id: &str) -> PyResult<BlendMode> {
        BlendMode::from_str(id).map_err(value_error)
    }

    fn rgb((r, g, b): (u8, u8, u8)) -> Color {
        Color::rgb(r, g, b)
    }

    fn render<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        style: LayerStyle,
    ) -> PyResult<Rendered<'py>> {
        let src = RasterPlane::from_rgba(image.as_array(), Point::new(0, 0)).map_err(value_error)?;
        let out = py.allow_threads(|| StyleStack::new(style).render(&src));
        let rect = out.exact_bounds().united(&src.extent());
        Ok((out.to_rgba(rect).into_pyarray(py), rect.x, rect.y))
    }

    #[allow(clippy::too_many_arguments)]
    fn shadow(
        base: ShadowConfig,
        color: (u8, u8, u8),
        opacity: i32,
        angle: i32,
        distance: i32,
        spread: i32,
        size: i32,
        noise: i32,
        blend: &str,
    ) -> PyResult<ShadowConfig> {
        Ok(ShadowConfig {
            enabled: true,
            blend_mode: blend_mode(blend)?,
            color: rgb(color),
            opacity,
            angle,
            use_global_light: false,
            distance,
            spread,
            size,
            noise,
            ..base
        })
    }

    // ========================================================================
    // Shadows and glows
    // ========================================================================

    /// Drop shadow behind the layer.
    ///
    /// Returns `(image, x, y)`: the expanded RGBA image and the position of
    /// its top-left pixel relative to the input.
    #[pyfunction]
    #[pyo3(signature = (image, color=(0, 0, 0), opacity=75, angle=120, distance=21, spread=0, size=21, noise=0, blend_mode="multiply"))]
    #[allow(clippy::too_many_arguments)]
    pub fn drop_shadow_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        angle: i32,
        distance: i32,
        spread: i32,
        size: i32,
        noise: i32,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let mut style = LayerStyle::default();
        style.drop_shadow = shadow(ShadowConfig::drop_shadow(), color, opacity, angle, distance, spread, size, noise, blend_mode)?;
        render(py, image, style)
    }

    /// Shadow inside the layer edges.
    #[pyfunction]
    #[pyo3(signature = (image, color=(0, 0, 0), opacity=75, angle=120, distance=21, choke=0, size=21, noise=0, blend_mode="multiply"))]
    #[allow(clippy::too_many_arguments)]
    pub fn inner_shadow_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        angle: i32,
        distance: i32,
        choke: i32,
        size: i32,
        noise: i32,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let mut style = LayerStyle::default();
        style.inner_shadow = shadow(ShadowConfig::inner_shadow(), color, opacity, angle, distance, choke, size, noise, blend_mode)?;
        render(py, image, style)
    }

    #[pyfunction]
    #[pyo3(signature = (image, color=(255, 255, 190), opacity=75, spread=0, size=5, noise=0, blend_mode="screen"))]
    #[allow(clippy::too_many_arguments)]
    pub fn outer_glow_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        spread: i32,
        size: i32,
        noise: i32,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let mut style = LayerStyle::default();
        style.outer_glow = shadow(ShadowConfig::outer_glow(), color, opacity, 0, 0, spread, size, noise, blend_mode)?;
        render(py, image, style)
    }

    /// Glow inside the layer; `source` is "edge" or "center".
    #[pyfunction]
    #[pyo3(signature = (image, color=(255, 255, 190), opacity=75, choke=0, size=5, noise=0, source="edge", blend_mode="screen"))]
    #[allow(clippy::too_many_arguments)]
    pub fn inner_glow_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        choke: i32,
        size: i32,
        noise: i32,
        source: &str,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let source = match source {
            "edge" => GlowSource::Edge,
            "center" => GlowSource::Center,
            other => return Err(value_error(format!("Unknown glow source: {other}"))),
        };
        let mut style = LayerStyle::default();
        style.inner_glow = ShadowConfig {
            source,
            ..shadow(ShadowConfig::inner_glow(), color, opacity, 0, 0, choke, size, noise, blend_mode)?
        };
        render(py, image, style)
    }

    // ========================================================================
    // Interior effects
    // ========================================================================

    #[pyfunction]
    #[pyo3(signature = (image, color=(0, 0, 0), opacity=50, angle=19, distance=11, size=14, invert=true, blend_mode="multiply"))]
    #[allow(clippy::too_many_arguments)]
    pub fn satin_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        angle: i32,
        distance: i32,
        size: i32,
        invert: bool,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let mut style = LayerStyle::default();
        style.satin.enabled = true;
        style.satin.color = rgb(color);
        style.satin.opacity = opacity;
        style.satin.angle = angle;
        style.satin.distance = distance;
        style.satin.size = size;
        style.satin.invert = invert;
        style.satin.blend_mode = self::blend_mode(blend_mode)?;
        render(py, image, style)
    }

    /// Bevel and emboss; `style` is one of "outer_bevel", "inner_bevel",
    /// "emboss", "pillow_emboss".
    #[pyfunction]
    #[pyo3(signature = (image, depth=100, size=5, soften=0, angle=120, altitude=30, highlight_color=(255, 255, 255), highlight_opacity=75, shadow_color=(0, 0, 0), shadow_opacity=75, style="inner_bevel"))]
    #[allow(clippy::too_many_arguments)]
    pub fn bevel_emboss_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        depth: i32,
        size: i32,
        soften: i32,
        angle: i32,
        altitude: i32,
        highlight_color: (u8, u8, u8),
        highlight_opacity: i32,
        shadow_color: (u8, u8, u8),
        shadow_opacity: i32,
        style: &str,
    ) -> PyResult<Rendered<'py>> {
        let bevel_style = match style {
            "outer_bevel" => BevelStyle::OuterBevel,
            "inner_bevel" => BevelStyle::InnerBevel,
            "emboss" => BevelStyle::Emboss,
            "pillow_emboss" => BevelStyle::PillowEmboss,
            "stroke_emboss" => BevelStyle::StrokeEmboss,
            other => return Err(value_error(format!("Unknown bevel style: {other}"))),
        };
        let mut layer_style = LayerStyle::default();
        let bevel = &mut layer_style.bevel_emboss;
        bevel.enabled = true;
        bevel.style = bevel_style;
        bevel.depth = depth;
        bevel.size = size;
        bevel.soften = soften;
        bevel.angle = angle;
        bevel.use_global_light = false;
        bevel.altitude = altitude;
        bevel.highlight_color = rgb(highlight_color);
        bevel.highlight_opacity = highlight_opacity;
        bevel.shadow_color = rgb(shadow_color);
        bevel.shadow_opacity = shadow_opacity;
        render(py, image, layer_style)
    }

    #[pyfunction]
    #[pyo3(signature = (image, color=(255, 0, 0), opacity=100, blend_mode="normal"))]
    pub fn color_overlay_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        color: (u8, u8, u8),
        opacity: i32,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let mut style = LayerStyle::default();
        style.color_overlay = OverlayConfig {
            enabled: true,
            opacity,
            blend_mode: self::blend_mode(blend_mode)?,
            ..OverlayConfig::color(rgb(color))
        };
        render(py, image, style)
    }

    /// Outline; `position` is "outside", "inside" or "center".
    #[pyfunction]
    #[pyo3(signature = (image, size=3, color=(255, 0, 0), opacity=100, position="outside", blend_mode="normal"))]
    pub fn stroke_rgba<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        size: i32,
        color: (u8, u8, u8),
        opacity: i32,
        position: &str,
        blend_mode: &str,
    ) -> PyResult<Rendered<'py>> {
        let position = match position {
            "outside" => StrokePosition::Outside,
            "inside" => StrokePosition::Inside,
            "center" => StrokePosition::Center,
            other => return Err(value_error(format!("Unknown stroke position: {other}"))),
        };
        let mut style = LayerStyle::default();
        style.stroke.enabled = true;
        style.stroke.size = size;
        style.stroke.position = position;
        style.stroke.opacity = opacity;
        style.stroke.blend_mode = self::blend_mode(blend_mode)?;
        style.stroke.fill = OverlayConfig::color(rgb(color)).fill;
        render(py, image, style)
    }

    /// Python module definition
    #[pymodule]
    pub fn imagestag_layer_styles(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Shadows and glows
        m.add_function(wrap_pyfunction!(drop_shadow_rgba, m)?)?;
        m.add_function(wrap_pyfunction!(inner_shadow_rgba, m)?)?;
        m.add_function(wrap_pyfunction!(outer_glow_rgba, m)?)?;
        m.add_function(wrap_pyfunction!(inner_glow_rgba, m)?)?;

        // Interior effects
        m.add_function(wrap_pyfunction!(satin_rgba, m)?)?;
        m.add_function(wrap_pyfunction!(bevel_emboss_rgba, m)?)?;
        m.add_function(wrap_pyfunction!(color_overlay_rgba, m)?)?;

        // Outline
        m.add_function(wrap_pyfunction!(stroke_rgba, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::imagestag_layer_styles;
