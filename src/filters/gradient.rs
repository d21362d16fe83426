//! Gradients: color stops, shape strategies and painting.
//!
//! Supports 5 shapes: linear, bi-linear (reflected), radial, square
//! (diamond) and conical (angle). Shapes map a pixel to a parameter `t`
//! relative to a start/end vector; the repeat strategy folds `t` into
//! 0.0-1.0 before the color lookup.

use std::f64::consts::PI;

use crate::error::StyleError;
use crate::geometry::Rect;
use crate::raster::{Color, RasterPlane};

/// Gradient stop definition: position (0.0-1.0) and color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub position: f64,
    pub color: Color,
}

impl GradientStop {
    pub fn new(position: f64, color: Color) -> Self {
        GradientStop { position, color }
    }
}

/// Piecewise-linear color gradient.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    stops: Vec<GradientStop>,
}

impl Gradient {
    /// Build a gradient. Stops are sorted by position.
    pub fn new(mut stops: Vec<GradientStop>) -> Result<Self, StyleError> {
        if stops.is_empty() {
            return Err(StyleError::EmptyGradient);
        }
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(Gradient { stops })
    }

    /// Two-stop gradient from `start` to `end`.
    pub fn two_color(start: Color, end: Color) -> Self {
        Gradient {
            stops: vec![GradientStop::new(0.0, start), GradientStop::new(1.0, end)],
        }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Interpolate the color at position `t`.
    pub fn color_at(&self, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let first = &self.stops[0];
        let last = &self.stops[self.stops.len() - 1];
        if self.stops.len() == 1 || t <= first.position {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }

        // Find the two stops we're between
        let next_idx = self
            .stops
            .iter()
            .position(|stop| stop.position >= t)
            .unwrap_or(self.stops.len() - 1);
        let prev = &self.stops[next_idx.saturating_sub(1)];
        let next = &self.stops[next_idx];

        if (next.position - prev.position).abs() < 1e-4 {
            return next.color;
        }
        let local_t = ((t - prev.position) / (next.position - prev.position)).clamp(0.0, 1.0);
        prev.color.lerp(&next.color, local_t as f32)
    }

    /// 256-entry lookup table, entry `i` sampled at `i / 255`.
    pub fn color_table(&self) -> [Color; 256] {
        let mut table = [Color::TRANSPARENT; 256];
        for (i, c) in table.iter_mut().enumerate() {
            *c = self.color_at(i as f64 / 255.0);
        }
        table
    }
}

/// How a pixel position maps to the gradient parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientShape {
    #[default]
    Linear,
    BiLinear,
    Radial,
    Square,
    Conical,
}

/// How parameters outside 0.0-1.0 are folded back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientRepeat {
    /// Clamp to the end colors.
    #[default]
    None,
    /// Mirror every other period.
    Alternate,
}

impl GradientRepeat {
    fn fold(&self, t: f64) -> f64 {
        match self {
            GradientRepeat::None => t.clamp(0.0, 1.0),
            GradientRepeat::Alternate => {
                let t = t.abs() % 2.0;
                if t > 1.0 {
                    2.0 - t
                } else {
                    t
                }
            }
        }
    }
}

/// Start/end vector plus shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientGeometry {
    pub shape: GradientShape,
    pub repeat: GradientRepeat,
    pub start: (f64, f64),
    pub end: (f64, f64),
}

impl GradientGeometry {
    /// Unfolded gradient parameter at `(x, y)`.
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        let (sx, sy) = self.start;
        let dx = self.end.0 - sx;
        let dy = self.end.1 - sy;
        let length = (dx * dx + dy * dy).sqrt();
        let px = x - sx;
        let py = y - sy;

        match self.shape {
            GradientShape::Linear | GradientShape::BiLinear => {
                if length < f64::EPSILON {
                    return 0.0;
                }
                // Project onto the normalized gradient vector
                let t = (px * dx + py * dy) / (length * length);
                if self.shape == GradientShape::BiLinear {
                    t.abs()
                } else {
                    t
                }
            }
            GradientShape::Radial => {
                if length < f64::EPSILON {
                    return 0.0;
                }
                (px * px + py * py).sqrt() / length
            }
            GradientShape::Square => {
                if length < f64::EPSILON {
                    return 0.0;
                }
                let (nx, ny) = (dx / length, dy / length);
                let distance1 = (-ny * px + nx * py).abs();
                let distance2 = (ny * py + nx * px).abs();
                distance1.max(distance2) / length
            }
            GradientShape::Conical => {
                let vector_angle = dy.atan2(dx) + PI;
                let mut angle = py.atan2(px) + PI - vector_angle;
                if angle < 0.0 {
                    angle += 2.0 * PI;
                }
                angle / (2.0 * PI)
            }
        }
    }
}

/// Paint `gradient` into `device` over `rect`, replacing its pixels.
///
/// # Arguments
/// * `device` - Destination plane
/// * `rect` - Region to paint
/// * `gradient` - Color stops
/// * `geometry` - Shape, repeat and start/end vector in layer coordinates
/// * `reverse` - Flip the parameter (`t -> 1 - t`)
pub fn paint_gradient(
    device: &mut RasterPlane,
    rect: Rect,
    gradient: &Gradient,
    geometry: &GradientGeometry,
    reverse: bool,
) {
    if rect.is_empty() {
        return;
    }
    device.ensure_extent(rect);
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            let mut t = geometry.repeat.fold(geometry.value_at(x as f64, y as f64));
            if reverse {
                t = 1.0 - t;
            }
            device.put_pixel(x, y, gradient.color_at(t));
        }
    }
    device.invalidate();
}
