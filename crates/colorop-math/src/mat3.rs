//! 3x3 color transformation matrix.
//!
//! [`Mat3`] is the software model of a `3x3 Matrix` colorop. It is stored
//! **row-major** and applied to **column vectors**:
//!
//! ```text
//! | m00 m01 m02 |   | r |   | m00*r + m01*g + m02*b |
//! | m10 m11 m12 | * | g | = | m10*r + m11*g + m12*b |
//! | m20 m21 m22 |   | b |   | m20*r + m21*g + m22*b |
//! ```
//!
//! # Usage
//!
//! ```rust
//! use colorop_core::Pixel;
//! use colorop_math::Mat3;
//!
//! let desat = Mat3::from_rows([
//!     [0.5, 0.25, 0.25],
//!     [0.25, 0.5, 0.25],
//!     [0.25, 0.25, 0.5],
//! ]);
//! let out = desat * Pixel::new(1.0, 0.0, 0.0);
//! assert_eq!(out, Pixel::new(0.5, 0.25, 0.25));
//! ```

use colorop_core::Pixel;
use std::ops::Mul;

/// A 3x3 matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat3 {
    /// Matrix elements in row-major order: [row0, row1, row2]
    pub m: [[f32; 3]; 3],
}

impl Mat3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Creates a matrix from row arrays.
    #[inline]
    pub const fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self { m: rows }
    }

    /// Creates a diagonal matrix.
    #[inline]
    pub const fn diagonal(d0: f32, d1: f32, d2: f32) -> Self {
        Self::from_rows([[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]])
    }

    /// Coefficients in row-major order, as laid out in a CTM blob.
    #[inline]
    pub fn to_row_major(&self) -> [f32; 9] {
        let m = &self.m;
        [
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
        ]
    }

    /// Builds a matrix from nine row-major coefficients.
    #[inline]
    pub fn from_row_major(v: [f32; 9]) -> Self {
        Self::from_rows([[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]])
    }

    /// Applies the matrix to a pixel.
    #[inline]
    pub fn apply(&self, p: Pixel) -> Pixel {
        let m = &self.m;
        Pixel::new(
            m[0][0] * p.r + m[0][1] * p.g + m[0][2] * p.b,
            m[1][0] * p.r + m[1][1] * p.g + m[1][2] * p.b,
            m[2][0] * p.r + m[2][1] * p.g + m[2][2] * p.b,
        )
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Pixel> for Mat3 {
    type Output = Pixel;

    #[inline]
    fn mul(self, rhs: Pixel) -> Pixel {
        self.apply(rhs)
    }
}
