//! ITU-R BT.2020 transfer function.
//!
//! The display pipeline exposes the curve in the decoding direction
//! ("BT.2020 Inverse OETF"); the OETF is its analytic inverse.

use crate::TransferFunction;
use std::sync::LazyLock;

/// BT.2020 inverse OETF: encoded -> linear.
pub const BT2020_INV_OETF: TransferFunction = TransferFunction::new(
    (1.0 / 0.45) as f32,
    (1.0 / 1.0993) as f32,
    (0.0993 / 1.0993) as f32,
    (1.0 / 4.5) as f32,
    0.081,
    0.0,
    0.0,
);

/// BT.2020 OETF: linear -> encoded.
pub static BT2020_OETF: LazyLock<TransferFunction> = LazyLock::new(|| BT2020_INV_OETF.inverse());

/// Decodes a BT.2020 value to linear light.
#[inline]
pub fn inv_oetf(v: f32) -> f32 {
    BT2020_INV_OETF.eval(v)
}

/// Encodes linear light to BT.2020.
#[inline]
pub fn oetf(v: f32) -> f32 {
    BT2020_OETF.eval(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_segment() {
        assert_abs_diff_eq!(inv_oetf(0.045), 0.01, epsilon = 1e-6);
        assert_abs_diff_eq!(oetf(0.01), 0.045, epsilon = 1e-6);
    }

    #[test]
    fn test_roundtrip() {
        for i in 0..=1000 {
            let x = i as f32 / 1000.0;
            assert_abs_diff_eq!(oetf(inv_oetf(x)), x, epsilon = 1e-4);
            assert_abs_diff_eq!(inv_oetf(oetf(x)), x, epsilon = 1e-4);
        }
    }
}
