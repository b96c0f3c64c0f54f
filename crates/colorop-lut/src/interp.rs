//! Interpolation methods for LUT evaluation.

/// Interpolation method for 3D LUT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Trilinear: blends all eight corners of the enclosing cell.
    Trilinear,

    /// Tetrahedral: blends four corners of one of six tetrahedra.
    ///
    /// This is what display hardware implements.
    #[default]
    Tetrahedral,
}

/// Clamps a channel to [0, 1], mapping NaN to 0.
#[inline]
pub(crate) fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Splits a normalized coordinate into floor/ceil lattice indices and the
/// fractional remainder.
#[inline]
pub(crate) fn bracket(v: f32, size: usize) -> (usize, usize, f32) {
    let max = (size - 1) as f32;
    let idx = (unit(v) * max).clamp(0.0, max);
    let lo = idx.floor();
    let hi = idx.ceil();
    (lo as usize, hi as usize, idx - lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket() {
        assert_eq!(bracket(0.0, 17), (0, 0, 0.0));
        assert_eq!(bracket(1.0, 17), (16, 16, 0.0));
        assert_eq!(bracket(0.5, 17), (8, 8, 0.0));
        let (lo, hi, f) = bracket(0.53125, 17);
        assert_eq!((lo, hi), (8, 9));
        assert!((f - 0.5).abs() < 1e-6);
        assert_eq!(bracket(f32::NAN, 17), (0, 0, 0.0));
        assert_eq!(bracket(7.0, 17), (16, 16, 0.0));
    }
}
