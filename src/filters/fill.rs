//! Final fills: turning an effect's coverage mask into colored pixels.
//!
//! - `apply_final_selection` writes solid or gradient-mapped color through
//!   the mask into a named plane.
//! - `fill_overlay_device` paints an overlay/stroke fill (color, gradient or
//!   pattern) into a scratch plane.

use std::sync::Arc;

use tracing::warn;

use super::contour::SOFT_EDGE_THRESHOLD;
use super::gradient::{paint_gradient, Gradient, GradientGeometry, GradientRepeat, GradientShape};
use super::pattern::{fill_pattern, pattern_offset};
use crate::environment::LayerStyleEnvironment;
use crate::geometry::Rect;
use crate::layer_effects::config::{GradientFill, GradientStyle, OverlayFill};
use crate::projection::MultiPlaneCompositor;
use crate::raster::{BlendMode, ChannelFlags, Color, CoverageMask, Painter, RasterPlane};

/// Percent opacity (0-100) as a byte.
pub fn opacity_to_u8(percent: i32) -> u8 {
    (255.0 / 100.0 * percent.clamp(0, 100) as f64).round() as u8
}

/// Color source of a mask-driven fill.
#[derive(Clone, Debug, PartialEq)]
pub enum FillSource {
    Solid(Color),
    /// Coverage indexes the gradient (full coverage = start color).
    Gradient { gradient: Arc<Gradient>, jitter: i32 },
}

/// Fill color plus the compositing parameters of the target plane.
#[derive(Clone, Debug, PartialEq)]
pub struct FillParams {
    pub source: FillSource,
    pub blend_mode: BlendMode,
    pub opacity: u8,
}

/// Gradient table index for a coverage value, optionally jittered.
#[inline]
fn gradient_index(coverage: u8, jitter: i32, noise: u8) -> usize {
    let jitter = jitter.clamp(0, 100) * 255 / 100;
    ((255 - coverage as i32 + ((jitter * noise as i32) >> 8)) & 0xFF) as usize
}

/// Write the effect color through `selection` into plane `plane_id`.
///
/// # Arguments
/// * `plane_id` - Named plane of `dst` receiving the pixels
/// * `selection` - Final coverage of the effect
/// * `src` - Layer content; provides the plane's pixel format
/// * `dst_rect` - Region to fill
pub fn apply_final_selection(
    plane_id: &str,
    selection: &CoverageMask,
    src: &RasterPlane,
    dst: &MultiPlaneCompositor,
    dst_rect: Rect,
    params: &FillParams,
    env: &LayerStyleEnvironment,
) {
    let plane = dst.get_projection(plane_id, params.blend_mode, params.opacity, ChannelFlags::ALL, src);
    let mut plane = plane.lock();

    match &params.source {
        FillSource::Solid(color) => {
            let mut painter = Painter::new(&mut plane.raster);
            painter.set_composite_op(BlendMode::Copy);
            painter.fill_selection(selection, dst_rect, *color);
        }
        FillSource::Gradient { gradient, jitter } => {
            let table = gradient.color_table();
            let random = (*jitter > 0).then(|| env.cached_random_selection(dst_rect));
            plane.raster.ensure_extent(dst_rect);
            for y in dst_rect.top()..dst_rect.bottom() {
                for x in dst_rect.left()..dst_rect.right() {
                    let coverage = selection.pixel(x, y);
                    if coverage == 0 {
                        continue;
                    }
                    let noise = random.as_ref().map_or(0, |r| r.pixel(x, y));
                    let mut color = table[gradient_index(coverage, *jitter, noise)];
                    if coverage < SOFT_EDGE_THRESHOLD && color.a == 255 {
                        color.a = ((coverage as u32 * 10 * color.a as u32) >> 8) as u8;
                    }
                    plane.raster.put_pixel(x, y, color);
                }
            }
            plane.raster.invalidate();
        }
    }
}

/// Start/end vector of an overlay gradient inside `bounds`.
///
/// Uses the legacy quadrant normalization: the angle is folded into the
/// first quadrant, the vector reaches the bounds edge that the folded angle
/// hits first, and the signs are restored afterwards.
pub fn overlay_gradient_geometry(bounds: Rect, fill: &GradientFill) -> GradientGeometry {
    let mut center = bounds.center();
    center.x += bounds.width * fill.offset.x / 100;
    center.y += bounds.height * fill.offset.y / 100;
    let width = (bounds.width * fill.scale + 100) / 200;
    let height = (bounds.height * fill.scale + 100) / 200;

    let mut angle = fill.angle;
    let corner_angle = ((bounds.height as f64 / bounds.width.max(1) as f64).atan().to_degrees() + 0.5) as i32;
    let mut sign_x = 1;
    let mut sign_y = 1;
    if angle < 0 {
        angle += 360;
    }
    if (90..180).contains(&angle) {
        angle = 180 - angle;
        sign_x = -1;
    } else if (180..270).contains(&angle) {
        angle -= 180;
        sign_x = -1;
        sign_y = -1;
    } else if (270..=360).contains(&angle) {
        angle = 360 - angle;
        sign_y = -1;
    }

    let tan = (angle as f64).to_radians().tan();
    let (radius_x, radius_y) = if angle <= corner_angle {
        (width, (width as f64 * tan + 0.5) as i32)
    } else {
        let rx = if tan.abs() < f64::EPSILON {
            0
        } else {
            (height as f64 / tan + 0.5) as i32
        };
        (rx, height)
    };
    let radius_corner = (((radius_x * radius_x + radius_y * radius_y) as f64).sqrt() + 0.5) as i32;

    let c = (center.x as f64, center.y as f64);
    let off = ((sign_x * radius_x) as f64, (-sign_y * radius_y) as f64);
    let plus = (c.0 + off.0, c.1 + off.1);
    let minus = (c.0 - off.0, c.1 - off.1);

    let (shape, repeat, start, end) = match fill.style {
        GradientStyle::Linear => (GradientShape::Linear, GradientRepeat::None, minus, plus),
        GradientStyle::Radial => (
            GradientShape::Radial,
            GradientRepeat::None,
            c,
            (c.0 + radius_corner as f64, c.1),
        ),
        GradientStyle::Angle => (GradientShape::Conical, GradientRepeat::None, c, plus),
        GradientStyle::Reflected => (GradientShape::BiLinear, GradientRepeat::Alternate, minus, c),
        GradientStyle::Diamond => (GradientShape::Square, GradientRepeat::Alternate, c, plus),
    };
    GradientGeometry {
        shape,
        repeat,
        start,
        end,
    }
}

/// Paint an overlay fill into `device` over `rect`.
///
/// Returns false when the fill references a missing resource; the device
/// is left untouched in that case.
pub fn fill_overlay_device(
    device: &mut RasterPlane,
    rect: Rect,
    fill: &OverlayFill,
    env: &LayerStyleEnvironment,
) -> bool {
    match fill {
        OverlayFill::Color(color) => {
            device.fill_rect(rect, *color);
            true
        }
        OverlayFill::Gradient(gradient_fill) => {
            let bounds = if gradient_fill.align_with_layer {
                env.layer_bounds()
            } else {
                env.default_bounds()
            };
            let geometry = overlay_gradient_geometry(bounds, gradient_fill);
            paint_gradient(device, rect, &gradient_fill.gradient, &geometry, gradient_fill.reverse);
            true
        }
        OverlayFill::Pattern(pattern_fill) => {
            let Some(pattern) = pattern_fill.pattern.as_ref() else {
                warn!("pattern fill has no pattern, skipping");
                return false;
            };
            let bounds = if pattern_fill.align_with_layer {
                env.layer_bounds()
            } else {
                env.default_bounds()
            };
            let offset = pattern_offset(pattern, bounds, pattern_fill.phase.x, pattern_fill.phase.y);
            fill_pattern(device, rect, pattern, offset, pattern_fill.scale);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::DEFAULT_PLANE_ID;
    use crate::raster::PixelFormat;

    fn env() -> LayerStyleEnvironment {
        LayerStyleEnvironment::new(Rect::new(0, 0, 100, 50), Rect::new(0, 0, 100, 50))
    }

    #[test]
    fn test_opacity_to_u8() {
        assert_eq!(opacity_to_u8(100), 255);
        assert_eq!(opacity_to_u8(75), 191);
        assert_eq!(opacity_to_u8(0), 0);
    }

    #[test]
    fn test_gradient_index() {
        assert_eq!(gradient_index(255, 0, 200), 0);
        assert_eq!(gradient_index(0, 0, 200), 255);
        assert_eq!(gradient_index(255, 100, 255), 254);
    }

    #[test]
    fn test_solid_final_selection_uses_coverage_as_alpha() {
        let env = env();
        let src = RasterPlane::new(PixelFormat::Rgba8);
        let dst = MultiPlaneCompositor::new();
        let mut sel = CoverageMask::new();
        sel.fill(Rect::new(0, 0, 2, 1), 100);
        let params = FillParams {
            source: FillSource::Solid(Color::rgb(10, 20, 30)),
            blend_mode: BlendMode::Multiply,
            opacity: 191,
        };
        apply_final_selection(DEFAULT_PLANE_ID, &sel, &src, &dst, Rect::new(0, 0, 4, 1), &params, &env);
        let plane = dst.get_projection(DEFAULT_PLANE_ID, BlendMode::Multiply, 191, ChannelFlags::ALL, &src);
        let plane = plane.lock();
        assert_eq!(plane.raster.pixel(0, 0), Color::new(10, 20, 30, 100));
        assert_eq!(plane.raster.pixel(3, 0).a, 0);
        assert_eq!(plane.blend_mode, BlendMode::Multiply);
    }

    #[test]
    fn test_gradient_final_selection_soft_edge() {
        let env = env();
        let src = RasterPlane::new(PixelFormat::Rgba8);
        let dst = MultiPlaneCompositor::new();
        let mut sel = CoverageMask::new();
        sel.set_pixel(0, 0, 255);
        sel.set_pixel(1, 0, 10);
        let params = FillParams {
            source: FillSource::Gradient {
                gradient: Arc::new(Gradient::two_color(Color::rgb(255, 0, 0), Color::rgb(0, 0, 255))),
                jitter: 0,
            },
            blend_mode: BlendMode::Normal,
            opacity: 255,
        };
        apply_final_selection(DEFAULT_PLANE_ID, &sel, &src, &dst, Rect::new(0, 0, 2, 1), &params, &env);
        let plane = dst.get_projection(DEFAULT_PLANE_ID, BlendMode::Normal, 255, ChannelFlags::ALL, &src);
        let plane = plane.lock();
        assert_eq!(plane.raster.pixel(0, 0), Color::rgb(255, 0, 0));
        assert_eq!(plane.raster.pixel(1, 0).a, 99);
    }

    #[test]
    fn test_linear_gradient_geometry_horizontal() {
        let fill = GradientFill {
            angle: 0,
            ..GradientFill::default()
        };
        let g = overlay_gradient_geometry(Rect::new(0, 0, 100, 50), &fill);
        assert_eq!(g.shape, GradientShape::Linear);
        assert_eq!(g.start, (-1.0, 24.0));
        assert_eq!(g.end, (99.0, 24.0));
    }

    #[test]
    fn test_vertical_gradient_geometry_points_up() {
        let fill = GradientFill::default();
        let g = overlay_gradient_geometry(Rect::new(0, 0, 100, 50), &fill);
        assert_eq!(g.start.0, g.end.0);
        assert!(g.start.1 > g.end.1);
    }

    #[test]
    fn test_missing_pattern_is_skipped() {
        let mut device = RasterPlane::new(PixelFormat::Rgba8);
        let fill = OverlayFill::Pattern(Default::default());
        assert!(!fill_overlay_device(&mut device, Rect::new(0, 0, 4, 4), &fill, &env()));
        assert!(device.is_empty());
    }
}
