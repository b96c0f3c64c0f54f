//! 1-dimensional lookup table.
//!
//! Used to emulate LUT-based hardware stages: a custom 1D LUT colorop is
//! uploaded as `size` RGB entries of 16 bits, and enumerated curves are
//! realized by hardware as dense tables. Entries are spaced evenly over
//! [0, 1] and evaluated with linear interpolation.

use crate::interp::unit;
use crate::{LutError, LutResult};
use colorop_core::Pixel;

/// A per-channel 1D LUT.
///
/// # Example
///
/// ```rust
/// use colorop_lut::Lut1D;
///
/// let lut = Lut1D::from_fn(1024, |x| [x * x; 3]).unwrap();
/// let out = lut.apply([0.5, 0.5, 0.5]);
/// assert!((out[0] - 0.25).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    entries: Vec<[f32; 3]>,
}

impl Lut1D {
    /// Creates a LUT from entries. At least two entries are required.
    pub fn new(entries: Vec<[f32; 3]>) -> LutResult<Self> {
        if entries.len() < 2 {
            return Err(LutError::InvalidSize(format!(
                "1D LUT needs at least 2 entries, got {}",
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    /// Creates an identity LUT.
    pub fn identity(size: usize) -> LutResult<Self> {
        Self::from_fn(size, |x| [x; 3])
    }

    /// Samples `f` at `size` evenly spaced points over [0, 1].
    pub fn from_fn(size: usize, f: impl Fn(f32) -> [f32; 3]) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize(format!("1D LUT size {}", size)));
        }
        let max = (size - 1) as f32;
        Self::new((0..size).map(|i| f(i as f32 / max)).collect())
    }

    /// Builds a LUT from 16-bit hardware entries (0xffff = 1.0).
    pub fn from_u16(entries: &[[u16; 3]]) -> LutResult<Self> {
        Self::new(
            entries
                .iter()
                .map(|e| e.map(|v| v as f32 / u16::MAX as f32))
                .collect(),
        )
    }

    /// Number of entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Entry `i`.
    #[inline]
    pub fn entry(&self, i: usize) -> Option<[f32; 3]> {
        self.entries.get(i).copied()
    }

    /// Evaluates channel `ch` at `v`. Input is clamped to [0, 1].
    #[inline]
    pub fn apply_channel(&self, v: f32, ch: usize) -> f32 {
        let max = (self.size() - 1) as f32;
        let idx = unit(v) * max;
        let lo = (idx.floor() as usize).min(self.size() - 1);
        let hi = (lo + 1).min(self.size() - 1);
        let t = idx - lo as f32;
        let a = self.entries[lo][ch];
        let b = self.entries[hi][ch];
        a + (b - a) * t
    }

    /// Evaluates all three channels.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            self.apply_channel(rgb[0], 0),
            self.apply_channel(rgb[1], 1),
            self.apply_channel(rgb[2], 2),
        ]
    }

    /// Evaluates a pixel.
    #[inline]
    pub fn apply_pixel(&self, p: Pixel) -> Pixel {
        Pixel::from_array(self.apply(p.to_array()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity() {
        let lut = Lut1D::identity(256).unwrap();
        for i in 0..=20 {
            let x = i as f32 / 20.0;
            assert_abs_diff_eq!(lut.apply_channel(x, 1), x, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_endpoints_exact() {
        let lut = Lut1D::from_fn(4096, |x| [x.powf(2.4), x, 1.0 - x]).unwrap();
        assert_eq!(lut.apply([1.0, 1.0, 1.0]), [1.0, 1.0, 0.0]);
        assert_eq!(lut.apply([0.0, 0.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_clamps_input() {
        let lut = Lut1D::identity(16).unwrap();
        assert_eq!(lut.apply_channel(-1.0, 0), 0.0);
        assert_eq!(lut.apply_channel(3.0, 0), 1.0);
        assert_eq!(lut.apply_channel(f32::NAN, 0), 0.0);
    }

    #[test]
    fn test_from_u16() {
        let lut = Lut1D::from_u16(&[[0, 0, 0], [0xffff, 0x8000, 0]]).unwrap();
        assert_eq!(lut.entry(1).unwrap()[0], 1.0);
        assert_abs_diff_eq!(lut.apply_channel(1.0, 1), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_too_small() {
        assert!(Lut1D::new(vec![[0.0; 3]]).is_err());
        assert!(Lut1D::identity(1).is_err());
    }
}
