//! Noise for shadow and glow masks.
//!
//! Noise is applied as a jitter: every pixel of the mask is pushed a few
//! pixels in a random direction, and the displaced copy is blended back
//! over the original at the noise percentage.

use ndarray::Array2;

use crate::geometry::{Point, Rect};
use crate::raster::{CoverageMask, MaskOp};

/// Border the jitter may displace coverage by, in pixels.
pub const NOISE_NEED_BORDER: i32 = 8;

/// Seed of the shared random mask.
pub const RANDOM_SEED: u64 = 1;

// ============================================================================
// Simple RNG (deterministic)
// ============================================================================

/// Linear congruential generator with MINSTD parameters.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        SimpleRng {
            state: seed.wrapping_add(1), // Avoid zero
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(48271).wrapping_add(1) % 2147483647;
        self.state as u32
    }
}

/// Random byte for one pixel. Depends only on seed and position, so masks
/// regenerated over a larger area keep their old values.
#[inline]
pub fn random_byte(seed: u64, x: i32, y: i32) -> u8 {
    let mixed = seed
        ^ (x as u32 as u64).wrapping_mul(0x9E37_79B9)
        ^ (y as u32 as u64).wrapping_mul(0x85EB_CA6B).rotate_left(17);
    let mut rng = SimpleRng::new(mixed);
    rng.next_u32();
    (rng.next_u32() >> 7) as u8
}

/// Random mask covering `rect`.
pub fn generate_random_selection(rect: Rect, seed: u64) -> CoverageMask {
    let data = Array2::from_shape_fn(
        (rect.height.max(0) as usize, rect.width.max(0) as usize),
        |(r, c)| random_byte(seed, rect.x + c as i32, rect.y + r as i32),
    );
    CoverageMask::from_array(data, rect.top_left())
}

/// Displacement encoded in a random byte: half of each nibble minus 8.
#[inline]
fn displacement(noise: u8) -> Point {
    Point::new(((noise >> 4) as i32 - 8) >> 1, ((noise & 0x0f) as i32 - 8) >> 1)
}

/// Jitter `mask` inside `src_rect` and blend the result back at `noise` %.
///
/// `random` must cover `src_rect` grown by `NOISE_NEED_BORDER`.
pub fn apply_noise(mask: &mut CoverageMask, src_rect: Rect, noise: i32, random: &CoverageMask) {
    if noise <= 0 || src_rect.is_empty() {
        return;
    }
    let noise = noise.min(100);
    let overlay_rect = src_rect.grown(NOISE_NEED_BORDER);
    let mut overlay = Array2::<u8>::zeros((overlay_rect.height as usize, overlay_rect.width as usize));

    for y in src_rect.top()..src_rect.bottom() {
        for x in src_rect.left()..src_rect.right() {
            let value = mask.pixel(x, y);
            if value == 0 {
                continue;
            }
            let d = displacement(random.pixel(x, y));
            let (tx, ty) = (x + d.x, y + d.y);
            let r = (ty - overlay_rect.y) as usize;
            let c = (tx - overlay_rect.x) as usize;
            overlay[[r, c]] = overlay[[r, c]].saturating_add(value);
        }
    }

    let overlay = CoverageMask::from_array(overlay, overlay_rect.top_left());
    let opacity = (noise * 255 / 100) as u8;
    mask.blit(&overlay, src_rect, MaskOp::Copy(opacity));
}
