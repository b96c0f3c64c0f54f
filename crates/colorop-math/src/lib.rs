//! # colorop-math
//!
//! Color transformation matrices (CTMs) for display color pipelines.
//!
//! - [`Mat3`] - 3x3 CTM, `out = M * in`
//! - [`Mat3x4`] - 3x4 CTM, `out = M * in + offset`
//! - [`multiply`] - scalar multiplier colorop
//!
//! All matrices are stored **row-major**, which is also the coefficient
//! order of the hardware CTM blobs.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod mat3;
mod mat3x4;

pub use mat3::*;
pub use mat3x4::*;

use colorop_core::Pixel;

/// Multiplies all three channels by `factor`.
///
/// ```rust
/// use colorop_core::Pixel;
///
/// let p = colorop_math::multiply(Pixel::gray(0.008), 125.0);
/// assert!((p.r - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn multiply(p: Pixel, factor: f32) -> Pixel {
    p.scale(factor)
}
