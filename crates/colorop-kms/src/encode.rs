//! Hardware parameter encoding.
//!
//! Bit-exact layouts of the colorop property values and blobs:
//!
//! | Parameter | Encoding |
//! |-----------|----------|
//! | CTM coefficient | S31.32 sign-magnitude, sign in bit 63, little-endian `u64` |
//! | Multiplier | unsigned 32.32 fixed point |
//! | 1D / 3D LUT entry | [`DrmColorLut`]: `red, green, blue, reserved` as little-endian `u16` |
//! | 3D LUT mode | [`Lut3dMode`], 20 bytes |

use crate::{Errno, KmsError, KmsResult};
use colorop_core::{FOURCC_XRGB8888, Pixel, PixelTransform, fourcc_code};
use colorop_lut::Lut3D;
use colorop_math::{Mat3, Mat3x4};
use std::fmt;

const ONE_32_32: f64 = (1u64 << 32) as f64;
const SIGN_BIT: u64 = 1 << 63;

/// Encodes a CTM coefficient as S31.32 sign-magnitude.
///
/// ```rust
/// use colorop_kms::encode::ctm_s31_32;
///
/// assert_eq!(ctm_s31_32(1.0), 1 << 32);
/// assert_eq!(ctm_s31_32(-0.5), (1 << 63) | (1 << 31));
/// ```
#[inline]
pub fn ctm_s31_32(v: f64) -> u64 {
    if v < 0.0 {
        ((-v * ONE_32_32) as i64 as u64) | SIGN_BIT
    } else {
        (v * ONE_32_32) as i64 as u64
    }
}

/// Decodes an S31.32 sign-magnitude coefficient.
#[inline]
pub fn decode_s31_32(raw: u64) -> f64 {
    let magnitude = (raw & !SIGN_BIT) as f64 / ONE_32_32;
    if raw & SIGN_BIT != 0 { -magnitude } else { magnitude }
}

/// Encodes a multiplier as unsigned 32.32 fixed point.
///
/// Negative and NaN factors encode as 0.
#[inline]
pub fn multiplier_32_32(v: f64) -> u64 {
    (v * ONE_32_32) as u64
}

/// Decodes an unsigned 32.32 multiplier.
#[inline]
pub fn decode_32_32(raw: u64) -> f64 {
    raw as f64 / ONE_32_32
}

fn ctm_blob(coefficients: impl IntoIterator<Item = f32>) -> Vec<u8> {
    coefficients
        .into_iter()
        .flat_map(|c| ctm_s31_32(c as f64).to_le_bytes())
        .collect()
}

/// `struct drm_color_ctm` blob: 9 coefficients, 72 bytes.
pub fn ctm_3x3_blob(m: &Mat3) -> Vec<u8> {
    ctm_blob(m.to_row_major())
}

/// `struct drm_color_ctm_3x4` blob: 12 coefficients, 96 bytes.
pub fn ctm_3x4_blob(m: &Mat3x4) -> Vec<u8> {
    ctm_blob(m.to_row_major())
}

/// Decodes a CTM blob into `N` coefficients.
pub fn parse_ctm_blob<const N: usize>(bytes: &[u8]) -> KmsResult<[f32; N]> {
    if bytes.len() != N * 8 {
        return Err(KmsError::invalid(
            "parse_ctm_blob",
            Errno::Einval,
            format!("CTM blob of {} bytes, expected {}", bytes.len(), N * 8),
        ));
    }
    let mut out = [0.0f32; N];
    for (dst, chunk) in out.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *dst = decode_s31_32(u64::from_le_bytes(raw)) as f32;
    }
    Ok(out)
}

/// One `struct drm_color_lut` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrmColorLut {
    /// Red, 0xffff = 1.0
    pub red: u16,
    /// Green
    pub green: u16,
    /// Blue
    pub blue: u16,
    /// Must be 0
    pub reserved: u16,
}

impl DrmColorLut {
    /// Size of one entry in bytes.
    pub const SIZE: usize = 8;

    /// Quantizes a pixel with rounding.
    #[inline]
    pub fn from_pixel_rounded(p: Pixel) -> Self {
        let q = |c: f32| (c * u16::MAX as f32).round() as u16;
        let p = p.clamp01();
        Self {
            red: q(p.r),
            green: q(p.g),
            blue: q(p.b),
            reserved: 0,
        }
    }

    /// Quantizes a pixel with truncation.
    #[inline]
    pub fn from_pixel_truncated(p: Pixel) -> Self {
        let q = |c: f32| (c * u16::MAX as f32) as u16;
        let p = p.clamp01();
        Self {
            red: q(p.r),
            green: q(p.g),
            blue: q(p.b),
            reserved: 0,
        }
    }

    /// Entry as `[r, g, b]`.
    #[inline]
    pub fn rgb(&self) -> [u16; 3] {
        [self.red, self.green, self.blue]
    }

    /// Little-endian bytes.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..2].copy_from_slice(&self.red.to_le_bytes());
        out[2..4].copy_from_slice(&self.green.to_le_bytes());
        out[4..6].copy_from_slice(&self.blue.to_le_bytes());
        out[6..8].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    /// Parses little-endian bytes.
    pub fn from_bytes(b: [u8; 8]) -> Self {
        Self {
            red: u16::from_le_bytes([b[0], b[1]]),
            green: u16::from_le_bytes([b[2], b[3]]),
            blue: u16::from_le_bytes([b[4], b[5]]),
            reserved: u16::from_le_bytes([b[6], b[7]]),
        }
    }
}

/// Serializes LUT entries into a blob.
pub fn lut_blob(entries: &[DrmColorLut]) -> Vec<u8> {
    entries.iter().flat_map(|e| e.to_bytes()).collect()
}

/// Parses a LUT blob.
pub fn parse_lut_blob(bytes: &[u8]) -> KmsResult<Vec<DrmColorLut>> {
    if bytes.len() % DrmColorLut::SIZE != 0 {
        return Err(KmsError::invalid(
            "parse_lut_blob",
            Errno::Einval,
            format!("LUT blob of {} bytes is not a multiple of 8", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(DrmColorLut::SIZE)
        .map(|c| DrmColorLut::from_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

/// Samples `transform` on the gray ramp `i / size` for a custom 1D LUT.
///
/// Channels are scaled by 0xffff and truncated.
pub fn custom_lut1d_entries(transform: PixelTransform, size: usize) -> Vec<DrmColorLut> {
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            DrmColorLut::from_pixel_truncated(transform(Pixel::gray(x)))
        })
        .collect()
}

/// 3D LUT interpolation: tetrahedral.
pub const LUT3D_INTERPOLATION_TETRAHEDRAL: u16 = 0;
/// 3D LUT interpolation: trilinear.
pub const LUT3D_INTERPOLATION_TRILINEAR: u16 = 1;

/// 3D LUT entry format: 16 bits per channel.
pub const LUT3D_FORMAT_XRGB16161616: u32 = fourcc_code(b'X', b'R', b'4', b'8');
/// 3D LUT entry format: 8 bits per channel.
pub const LUT3D_FORMAT_XRGB8888: u32 = FOURCC_XRGB8888;

/// Blob traversal order of a 3D LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// Red index varies slowest, blue fastest.
    #[default]
    Rgb,
    /// Blue index varies slowest, red fastest.
    Bgr,
}

impl Traversal {
    /// Wire value.
    pub const fn value(self) -> u16 {
        match self {
            Self::Rgb => 0,
            Self::Bgr => 1,
        }
    }

    /// Parses a wire value.
    pub const fn from_value(v: u16) -> Option<Self> {
        match v {
            0 => Some(Self::Rgb),
            1 => Some(Self::Bgr),
            _ => None,
        }
    }
}

/// A 3D LUT hardware mode, one record of the `LUT3D_MODES` blob.
///
/// Layout (little-endian, 20 bytes): `lut_size: u16, lut_stride: [u16; 3],
/// interpolation: u16, color_depth: u16, color_format: u32,
/// traversal_order: u16, pad: u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Lut3dMode {
    /// Cube side length
    pub lut_size: u16,
    /// Allocated extent per dimension (r, g, b), each `>= lut_size`
    pub lut_stride: [u16; 3],
    /// Interpolation method
    pub interpolation: u16,
    /// Bits per channel the hardware keeps
    pub color_depth: u16,
    /// Entry format fourcc
    pub color_format: u32,
    /// Blob traversal order
    pub traversal: Traversal,
}

impl Lut3dMode {
    /// Size of one record in bytes.
    pub const SIZE: usize = 20;

    /// Tightly packed, tetrahedral, 12-bit, 16-bit entries, RGB order.
    pub const fn packed(lut_size: u16) -> Self {
        Self {
            lut_size,
            lut_stride: [lut_size; 3],
            interpolation: LUT3D_INTERPOLATION_TETRAHEDRAL,
            color_depth: 12,
            color_format: LUT3D_FORMAT_XRGB16161616,
            traversal: Traversal::Rgb,
        }
    }

    /// Number of entries in a DATA blob for this mode.
    pub fn entry_count(&self) -> usize {
        self.lut_stride.iter().map(|&s| s as usize).product()
    }

    /// Blob index of lattice point (r, g, b).
    pub fn entry_index(&self, r: usize, g: usize, b: usize) -> usize {
        let [sr, sg, sb] = self.lut_stride.map(|s| s as usize);
        match self.traversal {
            Traversal::Rgb => (r * sg + g) * sb + b,
            Traversal::Bgr => (b * sg + g) * sr + r,
        }
    }

    /// Serializes the record.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.lut_size.to_le_bytes());
        for (i, s) in self.lut_stride.iter().enumerate() {
            out[2 + 2 * i..4 + 2 * i].copy_from_slice(&s.to_le_bytes());
        }
        out[8..10].copy_from_slice(&self.interpolation.to_le_bytes());
        out[10..12].copy_from_slice(&self.color_depth.to_le_bytes());
        out[12..16].copy_from_slice(&self.color_format.to_le_bytes());
        out[16..18].copy_from_slice(&self.traversal.value().to_le_bytes());
        out
    }

    /// Parses one record.
    pub fn from_bytes(b: &[u8]) -> KmsResult<Self> {
        if b.len() != Self::SIZE {
            return Err(KmsError::invalid(
                "Lut3dMode::from_bytes",
                Errno::Einval,
                format!("mode record of {} bytes", b.len()),
            ));
        }
        let u16_at = |o: usize| u16::from_le_bytes([b[o], b[o + 1]]);
        let traversal = Traversal::from_value(u16_at(16)).ok_or_else(|| {
            KmsError::invalid(
                "Lut3dMode::from_bytes",
                Errno::Einval,
                format!("traversal order {}", u16_at(16)),
            )
        })?;
        Ok(Self {
            lut_size: u16_at(0),
            lut_stride: [u16_at(2), u16_at(4), u16_at(6)],
            interpolation: u16_at(8),
            color_depth: u16_at(10),
            color_format: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
            traversal,
        })
    }
}

impl fmt::Display for Lut3dMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}^3 stride {:?} interp {} depth {} format {:#010x} {:?}",
            self.lut_size,
            self.lut_stride,
            self.interpolation,
            self.color_depth,
            self.color_format,
            self.traversal
        )
    }
}

/// Serializes a list of modes into a `LUT3D_MODES` blob.
pub fn lut3d_modes_blob(modes: &[Lut3dMode]) -> Vec<u8> {
    modes.iter().flat_map(|m| m.to_bytes()).collect()
}

/// Parses a `LUT3D_MODES` blob.
pub fn parse_lut3d_modes(bytes: &[u8]) -> KmsResult<Vec<Lut3dMode>> {
    if bytes.len() % Lut3dMode::SIZE != 0 {
        return Err(KmsError::invalid(
            "parse_lut3d_modes",
            Errno::Einval,
            format!("modes blob of {} bytes", bytes.len()),
        ));
    }
    bytes.chunks_exact(Lut3dMode::SIZE).map(Lut3dMode::from_bytes).collect()
}

/// Index of the advertised mode equal to `wanted`.
pub fn find_lut3d_mode(advertised: &[Lut3dMode], wanted: &Lut3dMode) -> Option<usize> {
    advertised.iter().position(|m| m == wanted)
}

/// Encodes a 3D LUT for `mode`: entries rounded to 16 bits, laid out in the
/// mode's traversal order, stride padding filled with zero entries.
pub fn lut3d_blob(lut: &Lut3D, mode: &Lut3dMode) -> KmsResult<Vec<u8>> {
    let size = mode.lut_size as usize;
    if size != lut.size() || mode.lut_stride.iter().any(|&s| (s as usize) < size) {
        return Err(KmsError::invalid(
            "lut3d_blob",
            Errno::Einval,
            format!("cube of {} does not fit mode {}", lut.size(), mode),
        ));
    }
    let mut entries = vec![DrmColorLut::default(); mode.entry_count()];
    for (r, g, b, rgb) in lut.iter() {
        entries[mode.entry_index(r, g, b)] = DrmColorLut::from_pixel_rounded(Pixel::from_array(rgb));
    }
    Ok(lut_blob(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s31_32() {
        assert_eq!(ctm_s31_32(0.0), 0);
        assert_eq!(ctm_s31_32(0.25), 0x4000_0000);
        assert_eq!(ctm_s31_32(-1.5), SIGN_BIT | 0x1_8000_0000);
        for v in [0.2126, -0.4542, 1.8556, -0.9278, 0.5] {
            assert!((decode_s31_32(ctm_s31_32(v)) - v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ctm_blob_layout() {
        let blob = ctm_3x4_blob(&Mat3x4::IDENTITY);
        assert_eq!(blob.len(), 96);
        assert_eq!(&blob[0..8], &(1u64 << 32).to_le_bytes());
        assert_eq!(&blob[8..16], &[0u8; 8]);
        let parsed: [f32; 12] = parse_ctm_blob(&blob).unwrap();
        assert_eq!(parsed, Mat3x4::IDENTITY.to_row_major());
        assert_eq!(ctm_3x3_blob(&Mat3::IDENTITY).len(), 72);
        assert!(parse_ctm_blob::<9>(&blob).is_err());
    }

    #[test]
    fn test_multiplier() {
        assert_eq!(multiplier_32_32(125.0), 125u64 << 32);
        assert_eq!(multiplier_32_32(-2.0), 0);
        assert!((decode_32_32(multiplier_32_32(1.0 / 125.0)) - 0.008).abs() < 1e-9);
    }

    #[test]
    fn test_color_lut_entry() {
        let e = DrmColorLut::from_pixel_rounded(Pixel::new(1.0, 0.5, -1.0));
        assert_eq!(e.rgb(), [0xffff, 0x8000, 0]);
        let t = DrmColorLut::from_pixel_truncated(Pixel::new(1.0, 0.5, 0.0));
        assert_eq!(t.rgb(), [0xffff, 0x7fff, 0]);
        assert_eq!(e.to_bytes(), [0xff, 0xff, 0x00, 0x80, 0, 0, 0, 0]);
        assert_eq!(parse_lut_blob(&lut_blob(&[e, t])).unwrap(), vec![e, t]);
        assert!(parse_lut_blob(&[0; 7]).is_err());
    }

    #[test]
    fn test_custom_lut1d_sampling() {
        fn double(p: Pixel) -> Pixel {
            p.scale(2.0)
        }
        let lut = custom_lut1d_entries(double, 4);
        // samples at 0, 1/4, 2/4, 3/4
        assert_eq!(lut[0].red, 0);
        assert_eq!(lut[1].red, 0x7fff);
        assert_eq!(lut[2].red, 0xffff);
        assert_eq!(lut[3].red, 0xffff);
    }

    #[test]
    fn test_mode_record() {
        let mode = Lut3dMode::packed(17);
        let bytes = mode.to_bytes();
        assert_eq!(&bytes[0..2], &[17, 0]);
        assert_eq!(&bytes[18..20], &[0, 0]);
        assert_eq!(Lut3dMode::from_bytes(&bytes).unwrap(), mode);

        let modes = [Lut3dMode { lut_size: 9, ..Lut3dMode::packed(9) }, mode];
        let parsed = parse_lut3d_modes(&lut3d_modes_blob(&modes)).unwrap();
        assert_eq!(find_lut3d_mode(&parsed, &mode), Some(1));
        let bgr = Lut3dMode { traversal: Traversal::Bgr, ..mode };
        assert_eq!(find_lut3d_mode(&parsed, &bgr), None);
    }

    #[test]
    fn test_lut3d_blob_order_and_padding() {
        let lut = Lut3D::from_fn(2, |rgb| rgb).unwrap();
        let rgb = Lut3dMode::packed(2);
        let entries = parse_lut_blob(&lut3d_blob(&lut, &rgb).unwrap()).unwrap();
        assert_eq!(entries.len(), 8);
        // red slowest: index 4 is (r=1, g=0, b=0)
        assert_eq!(entries[4].rgb(), [0xffff, 0, 0]);
        assert_eq!(entries[1].rgb(), [0, 0, 0xffff]);

        let bgr = Lut3dMode { traversal: Traversal::Bgr, ..rgb };
        let entries = parse_lut_blob(&lut3d_blob(&lut, &bgr).unwrap()).unwrap();
        assert_eq!(entries[4].rgb(), [0, 0, 0xffff]);
        assert_eq!(entries[1].rgb(), [0xffff, 0, 0]);

        let padded = Lut3dMode { lut_stride: [2, 2, 3], ..rgb };
        let entries = parse_lut_blob(&lut3d_blob(&lut, &padded).unwrap()).unwrap();
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[2], DrmColorLut::default());
        assert_eq!(entries[3].rgb(), [0, 0xffff, 0]);

        assert!(lut3d_blob(&lut, &Lut3dMode::packed(17)).is_err());
    }
}
