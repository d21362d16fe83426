//! Raster primitives: coverage masks, color planes, blend modes and the
//! compositing painter that stands in for the host engine's storage.

pub mod blend;
pub mod mask;
pub mod painter;
pub mod plane;

pub use blend::{BlendMode, ChannelFlags};
pub use mask::{lerp_u8, mul_u8, CoverageMask, MaskOp};
pub use painter::Painter;
pub use plane::{Color, PixelFormat, RasterPlane};
