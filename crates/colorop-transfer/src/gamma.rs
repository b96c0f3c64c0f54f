//! Pure power-law gamma 2.2.

use crate::TransferFunction;
use std::sync::LazyLock;

/// Gamma 2.2 decode: `x^2.2`.
pub const GAMMA22: TransferFunction = TransferFunction::gamma(2.2);

/// Gamma 2.2 encode: `x^(1/2.2)`.
pub static GAMMA22_INV: LazyLock<TransferFunction> = LazyLock::new(|| GAMMA22.inverse());

/// Applies gamma 2.2 decode.
#[inline]
pub fn gamma22(v: f32) -> f32 {
    GAMMA22.eval(v)
}

/// Applies gamma 2.2 encode.
#[inline]
pub fn gamma22_inv(v: f32) -> f32 {
    GAMMA22_INV.eval(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_roundtrip() {
        for i in 0..=100 {
            let x = i as f32 / 100.0;
            assert_abs_diff_eq!(gamma22_inv(gamma22(x)), x, epsilon = 1e-4);
        }
        assert_eq!(gamma22(-0.5), 0.0);
    }
}
