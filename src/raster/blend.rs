//! Blend modes and channel flags.
//!
//! Blend functions operate on normalized (0.0-1.0) color channels.
//! Alpha is composited separately by the painter (source-over for the
//! separable modes, linear interpolation for `Copy`).

use std::fmt;
use std::str::FromStr;

use crate::error::StyleError;

/// Compositing operation used when painting one raster over another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Replace destination pixels (weighted by opacity and selection).
    Copy,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    LinearDodge,
    LinearBurn,
    Difference,
    HardLight,
    SoftLight,
}

impl BlendMode {
    /// All supported modes, in id order of the legacy composite op table.
    pub const ALL: [BlendMode; 14] = [
        BlendMode::Normal,
        BlendMode::Copy,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::LinearDodge,
        BlendMode::LinearBurn,
        BlendMode::Difference,
        BlendMode::HardLight,
        BlendMode::SoftLight,
    ];

    /// Stable string id of the mode.
    pub fn id(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Copy => "copy",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "dodge",
            BlendMode::ColorBurn => "burn",
            BlendMode::LinearDodge => "linear_dodge",
            BlendMode::LinearBurn => "linear_burn",
            BlendMode::Difference => "diff",
            BlendMode::HardLight => "hard_light",
            BlendMode::SoftLight => "soft_light",
        }
    }

    /// Blend a single normalized channel: `dst` is the backdrop, `src` the
    /// painted color.
    #[inline]
    pub fn blend_channel(&self, dst: f32, src: f32) -> f32 {
        match self {
            BlendMode::Normal | BlendMode::Copy => src,
            BlendMode::Multiply => dst * src,
            BlendMode::Screen => dst + src - dst * src,
            BlendMode::Overlay => BlendMode::HardLight.blend_channel(src, dst),
            BlendMode::Darken => dst.min(src),
            BlendMode::Lighten => dst.max(src),
            BlendMode::ColorDodge => {
                if dst <= 0.0 {
                    0.0
                } else if src >= 1.0 {
                    1.0
                } else {
                    (dst / (1.0 - src)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if dst >= 1.0 {
                    1.0
                } else if src <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - dst) / src).min(1.0)
                }
            }
            BlendMode::LinearDodge => (dst + src).min(1.0),
            BlendMode::LinearBurn => (dst + src - 1.0).max(0.0),
            BlendMode::Difference => (dst - src).abs(),
            BlendMode::HardLight => {
                if src <= 0.5 {
                    dst * 2.0 * src
                } else {
                    let s = 2.0 * src - 1.0;
                    dst + s - dst * s
                }
            }
            BlendMode::SoftLight => {
                if src <= 0.5 {
                    dst - (1.0 - 2.0 * src) * dst * (1.0 - dst)
                } else {
                    let d = if dst <= 0.25 {
                        ((16.0 * dst - 12.0) * dst + 4.0) * dst
                    } else {
                        dst.sqrt()
                    };
                    dst + (2.0 * src - 1.0) * (d - dst)
                }
            }
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BlendMode {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlendMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.id() == s)
            .ok_or_else(|| StyleError::UnknownBlendMode(s.to_string()))
    }
}

/// Bit set of the channels a painter may modify, indexed by pixel position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelFlags(u8);

impl ChannelFlags {
    pub const ALL: ChannelFlags = ChannelFlags(0b1111);
    /// Color channels only; alpha stays untouched.
    pub const COLOR: ChannelFlags = ChannelFlags(0b0111);
    pub const NONE: ChannelFlags = ChannelFlags(0);

    pub const fn from_bits(bits: u8) -> Self {
        ChannelFlags(bits & 0b1111)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn has(&self, channel: usize) -> bool {
        channel < 4 && self.0 & (1 << channel) != 0
    }

    pub fn intersect(&self, other: ChannelFlags) -> ChannelFlags {
        ChannelFlags(self.0 & other.0)
    }
}

impl Default for ChannelFlags {
    fn default() -> Self {
        ChannelFlags::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_mode_ids_round_trip() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.id().parse::<BlendMode>().unwrap(), mode);
        }
        assert!("nope".parse::<BlendMode>().is_err());
    }

    #[test]
    fn test_multiply_and_screen() {
        assert!((BlendMode::Multiply.blend_channel(0.5, 0.5) - 0.25).abs() < 1e-6);
        assert!((BlendMode::Screen.blend_channel(0.5, 0.5) - 0.75).abs() < 1e-6);
        assert_eq!(BlendMode::LinearDodge.blend_channel(0.8, 0.8), 1.0);
        assert_eq!(BlendMode::LinearBurn.blend_channel(0.2, 0.2), 0.0);
    }

    #[test]
    fn test_channel_flags_intersect() {
        let flags = ChannelFlags::ALL.intersect(ChannelFlags::COLOR);
        assert!(flags.has(0) && flags.has(1) && flags.has(2));
        assert!(!flags.has(3));
        assert_eq!(ChannelFlags::default(), ChannelFlags::ALL);
    }
}
