//! 3x4 color transformation matrix with offset column.
//!
//! A `3x4 Matrix` colorop computes `out = M * in + offset`, where the fourth
//! column of each row is the constant offset for that output channel.

use colorop_core::Pixel;
use std::ops::Mul;

/// A 3x4 matrix: a 3x3 linear part plus a per-row offset.
///
/// # Example
///
/// ```rust
/// use colorop_core::Pixel;
/// use colorop_math::Mat3x4;
///
/// let m = Mat3x4::from_rows([
///     [1.0, 0.0, 0.0, 0.5],
///     [0.0, 1.0, 0.0, 0.0],
///     [0.0, 0.0, 1.0, 0.0],
/// ]);
/// assert_eq!(m * Pixel::BLACK, Pixel::new(0.5, 0.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat3x4 {
    /// Rows: three coefficients followed by the offset.
    pub m: [[f32; 4]; 3],
}

impl Mat3x4 {
    /// Identity with zero offsets.
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    /// Creates a matrix from row arrays.
    #[inline]
    pub const fn from_rows(rows: [[f32; 4]; 3]) -> Self {
        Self { m: rows }
    }

    /// The offset column.
    #[inline]
    pub fn offset(&self) -> [f32; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }

    /// Coefficients in row-major order, as laid out in a CTM blob.
    #[inline]
    pub fn to_row_major(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        for (dst, src) in out.iter_mut().zip(self.m.iter().flatten()) {
            *dst = *src;
        }
        out
    }

    /// Builds a matrix from twelve row-major coefficients.
    #[inline]
    pub fn from_row_major(v: [f32; 12]) -> Self {
        Self::from_rows([
            [v[0], v[1], v[2], v[3]],
            [v[4], v[5], v[6], v[7]],
            [v[8], v[9], v[10], v[11]],
        ])
    }

    /// Applies the matrix to a pixel.
    #[inline]
    pub fn apply(&self, p: Pixel) -> Pixel {
        let m = &self.m;
        Pixel::new(
            m[0][0] * p.r + m[0][1] * p.g + m[0][2] * p.b + m[0][3],
            m[1][0] * p.r + m[1][1] * p.g + m[1][2] * p.b + m[1][3],
            m[2][0] * p.r + m[2][1] * p.g + m[2][2] * p.b + m[2][3],
        )
    }
}

impl Default for Mat3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Pixel> for Mat3x4 {
    type Output = Pixel;

    #[inline]
    fn mul(self, rhs: Pixel) -> Pixel {
        self.apply(rhs)
    }
}
