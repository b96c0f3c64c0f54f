//! Piecewise linear + power-law transfer functions.
//!
//! A [`TransferFunction`] is the seven-parameter curve
//!
//! ```text
//! f(x) = c*x + f              if x < d
//! f(x) = (a*x + b)^g + e      otherwise
//! ```
//!
//! which covers sRGB, BT.2020 and pure gamma curves. The inverse of such a
//! curve is again of the same form and is derived analytically by
//! [`TransferFunction::inverse`].

use colorop_core::Pixel;

/// Parameter record of a piecewise transfer function.
///
/// # Example
///
/// ```rust
/// use colorop_transfer::SRGB_EOTF;
///
/// let linear = SRGB_EOTF.eval(0.5);
/// assert!((linear - 0.214).abs() < 1e-3);
///
/// let encoded = SRGB_EOTF.inverse().eval(linear);
/// assert!((encoded - 0.5).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferFunction {
    /// Exponent
    pub g: f32,
    /// Power segment scale
    pub a: f32,
    /// Power segment bias
    pub b: f32,
    /// Linear segment slope
    pub c: f32,
    /// Segment break point
    pub d: f32,
    /// Power segment offset
    pub e: f32,
    /// Linear segment offset
    pub f: f32,
}

impl TransferFunction {
    /// Identity curve.
    pub const IDENTITY: Self = Self::new(1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    /// Creates a transfer function from its seven coefficients.
    #[inline]
    pub const fn new(g: f32, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { g, a, b, c, d, e, f }
    }

    /// Pure power curve `x^gamma`.
    #[inline]
    pub const fn gamma(gamma: f32) -> Self {
        Self::new(gamma, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Evaluates the curve without clamping the result.
    ///
    /// NaN input evaluates as 0. A negative power-segment base is treated
    /// as 0 rather than producing NaN.
    #[inline]
    pub fn eval_unclamped(&self, x: f32) -> f32 {
        let x = if x.is_nan() { 0.0 } else { x };
        if x < self.d {
            return self.c * x + self.f;
        }
        (self.a * x + self.b).max(0.0).powf(self.g) + self.e
    }

    /// Evaluates the curve and clamps the result to [0, 1].
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let y = self.eval_unclamped(x);
        if y.is_nan() { 0.0 } else { y.clamp(0.0, 1.0) }
    }

    /// Applies [`eval`](Self::eval) to every channel.
    #[inline]
    pub fn apply(&self, p: Pixel) -> Pixel {
        p.map(|c| self.eval(c))
    }

    /// Analytic inverse.
    ///
    /// The power segment is inverted only when `a > 0` and `g > 0`, the
    /// linear segment only when `c != 0`; the other coefficients of a
    /// non-invertible segment stay 0.
    pub fn inverse(&self) -> Self {
        let mut inv = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        if self.a > 0.0 && self.g > 0.0 {
            let a_to_the_g = (self.a as f64).powf(self.g as f64);
            inv.a = (1.0 / a_to_the_g) as f32;
            inv.b = (-self.e as f64 / a_to_the_g) as f32;
            inv.g = 1.0 / self.g;
        }

        inv.d = self.c * self.d + self.f;
        if self.a != 0.0 {
            inv.e = -self.b / self.a;
        }
        if self.c != 0.0 {
            inv.c = 1.0 / self.c;
            inv.f = -self.f / self.c;
        }
        inv
    }
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::IDENTITY
    }
}
