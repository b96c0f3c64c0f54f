//! sRGB transfer function (IEC 61966-2-1).
//!
//! ```rust
//! use colorop_transfer::srgb;
//!
//! let linear = srgb::eotf(0.5);
//! assert!((srgb::inv_eotf(linear) - 0.5).abs() < 1e-4);
//! ```

use crate::TransferFunction;
use std::sync::LazyLock;

/// sRGB EOTF: encoded -> linear.
pub const SRGB_EOTF: TransferFunction = TransferFunction::new(
    2.4,
    (1.0 / 1.055) as f32,
    (0.055 / 1.055) as f32,
    (1.0 / 12.92) as f32,
    0.04045,
    0.0,
    0.0,
);

/// sRGB inverse EOTF: linear -> encoded.
pub static SRGB_INV_EOTF: LazyLock<TransferFunction> = LazyLock::new(|| SRGB_EOTF.inverse());

/// Decodes an sRGB value to linear light.
#[inline]
pub fn eotf(v: f32) -> f32 {
    SRGB_EOTF.eval(v)
}

/// Encodes linear light to sRGB.
#[inline]
pub fn inv_eotf(v: f32) -> f32 {
    SRGB_INV_EOTF.eval(v)
}
