//! 3-dimensional lookup table.
//!
//! A 3D LUT maps RGB input to RGB output through a cube of `size^3`
//! lattice entries. Display hardware samples the cube with tetrahedral
//! interpolation, and so does [`Lut3D::apply`] by default.
//!
//! # Lattice addressing
//!
//! A channel value `v` becomes the continuous coordinate
//! `idx = clamp(v, 0, 1) * (size - 1)`, bracketed by `floor(idx)` and
//! `ceil(idx)`. On a lattice point both brackets coincide and the entry is
//! returned unchanged.

use crate::interp::bracket;
use crate::{Interpolation, LutError, LutResult};
use colorop_core::Pixel;

/// A 3-dimensional lookup table.
///
/// # Structure
///
/// - `size^3` entries, each an RGB output triple
/// - Stored with red varying fastest, then green, then blue
///
/// # Example
///
/// ```rust
/// use colorop_lut::Lut3D;
///
/// let lut = Lut3D::identity(17).unwrap();
/// let out = lut.apply([0.5, 0.3, 0.2]);
/// assert!((out[1] - 0.3).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    data: Vec<[f32; 3]>,
    size: usize,
    interpolation: Interpolation,
}

impl Lut3D {
    /// Creates an identity (pass-through) LUT.
    pub fn identity(size: usize) -> LutResult<Self> {
        Self::from_fn(size, |rgb| rgb)
    }

    /// Samples `f` at every lattice point.
    ///
    /// ```rust
    /// use colorop_lut::Lut3D;
    ///
    /// let invert = Lut3D::from_fn(2, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]).unwrap();
    /// assert_eq!(invert.get(0, 0, 0), [1.0, 1.0, 1.0]);
    /// ```
    pub fn from_fn(size: usize, f: impl Fn([f32; 3]) -> [f32; 3]) -> LutResult<Self> {
        check_size(size)?;
        let max = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push(f([r as f32 / max, g as f32 / max, b as f32 / max]));
                }
            }
        }
        Ok(Self {
            data,
            size,
            interpolation: Interpolation::default(),
        })
    }

    /// Creates a LUT from raw data in red-fastest order.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        check_size(size)?;
        let expected = size * size * size;
        if data.len() != expected {
            return Err(LutError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            size,
            interpolation: Interpolation::default(),
        })
    }

    /// Sets the interpolation method.
    pub fn with_interpolation(mut self, interp: Interpolation) -> Self {
        self.interpolation = interp;
        self
    }

    /// Cube side length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Interpolation method.
    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Total number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn index(&self, r: usize, g: usize, b: usize) -> usize {
        b * self.size * self.size + g * self.size + r
    }

    /// Lattice entry at grid position (r, g, b).
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= size`.
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// Applies the LUT to an RGB value.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.interpolation {
            Interpolation::Trilinear => self.apply_trilinear(rgb),
            Interpolation::Tetrahedral => self.apply_tetrahedral(rgb),
        }
    }

    /// Applies the LUT to a pixel.
    #[inline]
    pub fn apply_pixel(&self, p: Pixel) -> Pixel {
        Pixel::from_array(self.apply(p.to_array()))
    }

    /// Trilinear interpolation.
    pub fn apply_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r0, r1, rf) = bracket(rgb[0], self.size);
        let (g0, g1, gf) = bracket(rgb[1], self.size);
        let (b0, b1, bf) = bracket(rgb[2], self.size);

        let c000 = self.get(r0, g0, b0);
        let c100 = self.get(r1, g0, b0);
        let c010 = self.get(r0, g1, b0);
        let c110 = self.get(r1, g1, b0);
        let c001 = self.get(r0, g0, b1);
        let c101 = self.get(r1, g0, b1);
        let c011 = self.get(r0, g1, b1);
        let c111 = self.get(r1, g1, b1);

        let mut result = [0.0f32; 3];
        for i in 0..3 {
            let c00 = c000[i] + (c100[i] - c000[i]) * rf;
            let c01 = c001[i] + (c101[i] - c001[i]) * rf;
            let c10 = c010[i] + (c110[i] - c010[i]) * rf;
            let c11 = c011[i] + (c111[i] - c011[i]) * rf;

            let c0 = c00 + (c10 - c00) * gf;
            let c1 = c01 + (c11 - c01) * gf;

            result[i] = c0 + (c1 - c0) * bf;
        }
        result
    }

    /// Tetrahedral interpolation.
    ///
    /// The unit cell is split into six tetrahedra along the black-white
    /// diagonal; the fractional coordinates select one of them. Ties are
    /// resolved by strict comparisons in this order:
    ///
    /// ```text
    /// rf > gf:  gf > bf -> T1   rf > bf -> T2   else -> T3
    /// else:     bf > gf -> T6   bf > rf -> T5   else -> T4
    /// ```
    pub fn apply_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r0, r1, rf) = bracket(rgb[0], self.size);
        let (g0, g1, gf) = bracket(rgb[1], self.size);
        let (b0, b1, bf) = bracket(rgb[2], self.size);

        let c000 = self.get(r0, g0, b0);
        let c111 = self.get(r1, g1, b1);

        let mut result = [0.0f32; 3];
        if rf > gf {
            if gf > bf {
                // T1: rf > gf > bf
                let c100 = self.get(r1, g0, b0);
                let c110 = self.get(r1, g1, b0);
                for i in 0..3 {
                    result[i] = c000[i]
                        + rf * (c100[i] - c000[i])
                        + gf * (c110[i] - c100[i])
                        + bf * (c111[i] - c110[i]);
                }
            } else if rf > bf {
                // T2: rf > bf >= gf
                let c100 = self.get(r1, g0, b0);
                let c101 = self.get(r1, g0, b1);
                for i in 0..3 {
                    result[i] = c000[i]
                        + rf * (c100[i] - c000[i])
                        + gf * (c111[i] - c101[i])
                        + bf * (c101[i] - c100[i]);
                }
            } else {
                // T3: bf >= rf > gf
                let c001 = self.get(r0, g0, b1);
                let c101 = self.get(r1, g0, b1);
                for i in 0..3 {
                    result[i] = c000[i]
                        + rf * (c101[i] - c001[i])
                        + gf * (c111[i] - c101[i])
                        + bf * (c001[i] - c000[i]);
                }
            }
        } else if bf > gf {
            // T6: bf > gf >= rf
            let c001 = self.get(r0, g0, b1);
            let c011 = self.get(r0, g1, b1);
            for i in 0..3 {
                result[i] = c000[i]
                    + rf * (c111[i] - c011[i])
                    + gf * (c011[i] - c001[i])
                    + bf * (c001[i] - c000[i]);
            }
        } else if bf > rf {
            // T5: gf >= bf > rf
            let c010 = self.get(r0, g1, b0);
            let c011 = self.get(r0, g1, b1);
            for i in 0..3 {
                result[i] = c000[i]
                    + rf * (c111[i] - c011[i])
                    + gf * (c010[i] - c000[i])
                    + bf * (c011[i] - c010[i]);
            }
        } else {
            // T4: gf >= rf >= bf
            let c010 = self.get(r0, g1, b0);
            let c110 = self.get(r1, g1, b0);
            for i in 0..3 {
                result[i] = c000[i]
                    + rf * (c110[i] - c010[i])
                    + gf * (c010[i] - c000[i])
                    + bf * (c111[i] - c110[i]);
            }
        }
        result
    }

    /// Iterates over `(r, g, b, entry)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize, [f32; 3])> + '_ {
        let n = self.size;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, e)| (i % n, (i / n) % n, i / (n * n), *e))
    }
}

fn check_size(size: usize) -> LutResult<()> {
    if size < 2 {
        return Err(LutError::InvalidSize(format!(
            "3D LUT size must be at least 2, got {}",
            size
        )));
    }
    Ok(())
}
