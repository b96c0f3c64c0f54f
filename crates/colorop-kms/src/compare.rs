//! Tolerance-bounded buffer comparison.
//!
//! Components are compared as integers in the buffer's native channel
//! width. For a reference component `c1` and a produced component `c2` the
//! difference `c2 - c1` must lie in `[-down, up]`. X / alpha bits are
//! never compared.

use crate::{KmsError, KmsResult};
use colorop_core::PixelBuffer;
use std::fmt;

/// Maximum number of differences kept in a [`KmsError::Mismatch`].
pub const MAX_REPORTED_DIFFS: usize = 16;

const CHANNELS: [(u32, char); 3] = [(2, 'r'), (1, 'g'), (0, 'b')];

/// One component outside the tolerance bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDiff {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// `r`, `g` or `b`
    pub channel: char,
    /// Reference value
    pub expected: u16,
    /// Produced value
    pub actual: u16,
}

impl fmt::Display for PixelDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {}: expected {}, got {}",
            self.x, self.y, self.channel, self.expected, self.actual
        )
    }
}

/// Accepted deviation, in integer channel steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tolerance {
    /// Largest accepted positive deviation
    pub up: u8,
    /// Largest accepted negative deviation
    pub down: u8,
}

impl Tolerance {
    /// Exact match.
    pub const EXACT: Self = Self { up: 0, down: 0 };

    /// Creates a tolerance bracket.
    pub const fn new(up: u8, down: u8) -> Self {
        Self { up, down }
    }

    /// Returns `true` if `actual` is within the bracket around `expected`.
    #[inline]
    pub fn accepts(&self, expected: u16, actual: u16) -> bool {
        let diff = actual as i32 - expected as i32;
        !(diff < -(self.down as i32) || diff > self.up as i32)
    }
}

impl From<[u8; 2]> for Tolerance {
    fn from([up, down]: [u8; 2]) -> Self {
        Self { up, down }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[+{}, -{}]", self.up, self.down)
    }
}

/// Lists every component of `actual` outside the bracket around `expected`.
///
/// Fails if the buffers differ in format or dimensions.
pub fn diff_buffers(
    expected: &PixelBuffer,
    actual: &PixelBuffer,
    tolerance: Tolerance,
) -> KmsResult<Vec<PixelDiff>> {
    expected.check_compatible(actual)?;
    let format = expected.format();
    let mut diffs = Vec::new();
    for y in 0..expected.height() {
        for x in 0..expected.width() {
            let raw1 = expected.raw(x, y)?;
            let raw2 = actual.raw(x, y)?;
            if raw1 & format.color_mask() == raw2 & format.color_mask() {
                continue;
            }
            for (index, channel) in CHANNELS {
                let c1 = format.component(raw1, index);
                let c2 = format.component(raw2, index);
                if !tolerance.accepts(c1, c2) {
                    diffs.push(PixelDiff {
                        x,
                        y,
                        channel,
                        expected: c1,
                        actual: c2,
                    });
                }
            }
        }
    }
    Ok(diffs)
}

/// Returns `true` if every component of `b` lies within `[-down, up]` of
/// the matching component of `a`.
pub fn compare_buffers(a: &PixelBuffer, b: &PixelBuffer, up: u8, down: u8) -> KmsResult<bool> {
    Ok(diff_buffers(a, b, Tolerance::new(up, down))?.is_empty())
}

/// Like [`compare_buffers`], but fails with [`KmsError::Mismatch`]
/// carrying the leading differences.
pub fn assert_match(expected: &PixelBuffer, actual: &PixelBuffer, tolerance: Tolerance) -> KmsResult<()> {
    let mut diffs = diff_buffers(expected, actual, tolerance)?;
    let Some(&first) = diffs.first() else {
        return Ok(());
    };
    let count = diffs.len();
    diffs.truncate(MAX_REPORTED_DIFFS);
    Err(KmsError::Mismatch {
        count,
        up: tolerance.up,
        down: tolerance.down,
        first,
        diffs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorop_core::{DrmFormat, Error};

    fn buf(format: DrmFormat, raw: u32) -> PixelBuffer {
        let mut b = PixelBuffer::new(2, 2, format).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                b.set_raw(x, y, raw).unwrap();
            }
        }
        b
    }

    #[test]
    fn test_bracket_is_asymmetric() {
        let t = Tolerance::new(1, 0);
        assert!(t.accepts(10, 11));
        assert!(!t.accepts(10, 9));
        assert!(!t.accepts(10, 12));
        assert!(Tolerance::EXACT.accepts(7, 7));
    }

    #[test]
    fn test_x_bits_ignored() {
        let a = buf(DrmFormat::Xrgb8888, 0x0012_3456);
        let b = buf(DrmFormat::Xrgb8888, 0xff12_3456);
        assert!(compare_buffers(&a, &b, 0, 0).unwrap());
    }

    #[test]
    fn test_within_tolerance() {
        let a = buf(DrmFormat::Xrgb8888, 0x0010_1010);
        let b = buf(DrmFormat::Xrgb8888, 0x0011_0f10);
        assert!(compare_buffers(&a, &b, 1, 1).unwrap());
        assert!(!compare_buffers(&a, &b, 0, 0).unwrap());
        assert!(!compare_buffers(&a, &b, 1, 0).unwrap());
    }

    #[test]
    fn test_ten_bit_components() {
        let a = buf(DrmFormat::Xrgb2101010, 1000 << 20);
        let b = buf(DrmFormat::Xrgb2101010, 1002 << 20);
        let diffs = diff_buffers(&a, &b, Tolerance::new(1, 1)).unwrap();
        assert_eq!(diffs.len(), 4);
        assert_eq!(diffs[0].channel, 'r');
        assert_eq!((diffs[0].expected, diffs[0].actual), (1000, 1002));
    }

    #[test]
    fn test_mismatch_report() {
        let a = PixelBuffer::new(8, 8, DrmFormat::Xrgb8888).unwrap();
        let b = buf_like(&a, 0x0000_00ff);
        let err = assert_match(&a, &b, Tolerance::EXACT).unwrap_err();
        match err {
            KmsError::Mismatch { count, first, diffs, .. } => {
                assert_eq!(count, 64);
                assert_eq!(diffs.len(), MAX_REPORTED_DIFFS);
                assert_eq!((first.x, first.y, first.channel), (0, 0, 'b'));
            }
            other => panic!("unexpected {other}"),
        }
    }

    fn buf_like(a: &PixelBuffer, raw: u32) -> PixelBuffer {
        let mut b = a.clone();
        for y in 0..b.height() {
            for x in 0..b.width() {
                b.set_raw(x, y, raw).unwrap();
            }
        }
        b
    }

    #[test]
    fn test_geometry_mismatch() {
        let a = PixelBuffer::new(2, 2, DrmFormat::Xrgb8888).unwrap();
        let b = PixelBuffer::new(2, 3, DrmFormat::Xrgb8888).unwrap();
        let err = compare_buffers(&a, &b, 1, 1).unwrap_err();
        assert!(matches!(err, KmsError::Core(Error::DimensionMismatch { .. })));
    }
}
