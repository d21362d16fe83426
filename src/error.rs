//! Error types and invariant guards.
//!
//! Effect processing itself never fails: disabled effects are no-ops and
//! broken invariants recover by returning the untouched value. Errors only
//! surface when constructing resources from external data.

use thiserror::Error;

/// Errors raised when building style resources from external data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// Pattern pixel buffer does not match its declared size.
    #[error("Pattern buffer of {len} bytes does not match {width}x{height} RGBA")]
    InvalidPattern { width: usize, height: usize, len: usize },

    /// A gradient needs at least one color stop.
    #[error("Gradient has no color stops")]
    EmptyGradient,

    /// Blend mode id is not known to the compositor.
    #[error("Unknown blend mode: {0}")]
    UnknownBlendMode(String),

    /// External image array has an unsupported channel count.
    #[error("Expected 4 channels, got {channels}")]
    InvalidChannels { channels: usize },
}

/// Guard for programming-error invariants.
///
/// Panics in debug builds; in release builds logs the violation and returns
/// `$ret` from the enclosing function.
macro_rules! recover_return {
    ($cond:expr, $ret:expr, $($msg:tt)+) => {
        if !($cond) {
            debug_assert!($cond, $($msg)+);
            tracing::error!($($msg)+);
            return $ret;
        }
    };
}

pub(crate) use recover_return;
