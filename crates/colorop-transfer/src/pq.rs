//! SMPTE ST 2084 Perceptual Quantizer (PQ).
//!
//! PQ is expressed in the rational power-law form
//!
//! ```text
//! pq(x) = (max(A + B*x^C, 0) / (D + E*x^C))^F
//! ```
//!
//! whose inverse has the same shape with coefficients
//! `(-A, D, 1/F, B, -E, 1/C)`. Evaluation is done in `f64` and the result
//! is not clamped.
//!
//! # Range
//!
//! - Encoded: [0, 1]
//! - Linear: [0, 1] relative to 10000 cd/m2, or [0, 125] for the
//!   125-scaled variants (80 cd/m2 = 1.0)
//!
//! # Usage
//!
//! ```rust
//! use colorop_transfer::pq;
//!
//! let linear = pq::eotf_125(0.5);
//! assert!((pq::inv_eotf_125(linear) - 0.5).abs() < 1e-4);
//! ```

/// Scale of the 125 variants: 10000 cd/m2 peak over 80 cd/m2 reference.
pub const PQ_125_SCALE: f64 = 125.0;

/// Coefficients of a PQ-style rational power-law curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PqFunction {
    /// Numerator offset
    pub a: f64,
    /// Numerator scale
    pub b: f64,
    /// Inner exponent
    pub c: f64,
    /// Denominator offset
    pub d: f64,
    /// Denominator scale
    pub e: f64,
    /// Outer exponent
    pub f: f64,
}

/// PQ EOTF: encoded -> linear (1.0 = 10000 cd/m2).
pub const PQ_EOTF: PqFunction = PqFunction {
    a: -107.0 / 128.0,
    b: 1.0,
    c: 32.0 / 2523.0,
    d: 2413.0 / 128.0,
    e: -2392.0 / 128.0,
    f: 8192.0 / 1305.0,
};

/// PQ inverse EOTF: linear -> encoded.
pub const PQ_INV_EOTF: PqFunction = PqFunction {
    a: 107.0 / 128.0,
    b: 2413.0 / 128.0,
    c: 1305.0 / 8192.0,
    d: 1.0,
    e: 2392.0 / 128.0,
    f: 2523.0 / 32.0,
};

impl PqFunction {
    /// Evaluates the curve.
    ///
    /// Negative and NaN inputs evaluate as 0.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let x = if x > 0.0 { x as f64 } else { 0.0 };
        let xc = x.powf(self.c);
        let num = (self.a + self.b * xc).max(0.0);
        let den = self.d + self.e * xc;
        let y = (num / den).powf(self.f);
        if y.is_nan() { 0.0 } else { y as f32 }
    }

    /// Analytic inverse.
    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            a: -self.a,
            b: self.d,
            c: 1.0 / self.f,
            d: self.b,
            e: -self.e,
            f: 1.0 / self.c,
        }
    }
}

/// PQ EOTF, normalized to 10000 cd/m2.
#[inline]
pub fn eotf(v: f32) -> f32 {
    PQ_EOTF.eval(v)
}

/// PQ inverse EOTF, normalized to 10000 cd/m2.
#[inline]
pub fn inv_eotf(v: f32) -> f32 {
    PQ_INV_EOTF.eval(v)
}

/// PQ EOTF scaled so that 80 cd/m2 maps to 1.0 (peak = 125.0).
#[inline]
pub fn eotf_125(v: f32) -> f32 {
    (PQ_EOTF.eval(v) as f64 * PQ_125_SCALE) as f32
}

/// Inverse of [`eotf_125`].
#[inline]
pub fn inv_eotf_125(v: f32) -> f32 {
    PQ_INV_EOTF.eval((v as f64 / PQ_125_SCALE) as f32)
}
