//! Algorithm library shared by the layer effects.
//!
//! All algorithms work on `CoverageMask`/`RasterPlane` regions in layer
//! coordinates and take the region to recompute explicitly, so they can run
//! on disjoint tiles.
//!
//! ## Categories
//!
//! - **Kernel math**: Gaussian kernels and padding (`core`)
//! - **Blur**: separable Gaussian (`blur`)
//! - **Morphology**: circular grow / shrink (`morphology`)
//! - **Remapping**: edge sharpening, range, contour curves (`contour`)
//! - **Noise**: deterministic jitter masks (`noise`)
//! - **Shading**: bump mapping (`bumpmap`)
//! - **Fills**: gradients, patterns and final color fills (`gradient`, `pattern`, `fill`)

pub mod blur;
pub mod bumpmap;
pub mod contour;
pub mod core;
pub mod fill;
pub mod gradient;
pub mod morphology;
pub mod noise;
pub mod pattern;
