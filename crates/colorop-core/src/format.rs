//! DRM pixel formats.
//!
//! Framebuffers handed to the display are packed 32-bit pixels identified by
//! a DRM fourcc code. Only two layouts are decoded by the transform engine:
//!
//! | Format | Layout (MSB..LSB) | Channel scale |
//! |--------|-------------------|---------------|
//! | `XRGB8888` | `x:8 r:8 g:8 b:8` | 255 |
//! | `XRGB2101010` | `x:2 r:10 g:10 b:10` | 1023 |
//!
//! Other 32-bit formats can back a buffer but are rejected with
//! [`Error::UnsupportedFormat`] when decoded.
//!
//! # Usage
//!
//! ```rust
//! use colorop_core::{DrmFormat, Pixel};
//!
//! let fmt = DrmFormat::Xrgb8888;
//! let raw = fmt.encode(Pixel::new(1.0, 0.5, 0.0)).unwrap();
//! assert_eq!(raw, 0x00ff_8000);
//! ```

use crate::{Error, Pixel, Result};
use std::fmt;

/// Builds a DRM fourcc code from four ASCII bytes.
#[inline]
pub const fn fourcc_code(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

/// `DRM_FORMAT_XRGB8888`
pub const FOURCC_XRGB8888: u32 = fourcc_code(b'X', b'R', b'2', b'4');
/// `DRM_FORMAT_ARGB8888`
pub const FOURCC_ARGB8888: u32 = fourcc_code(b'A', b'R', b'2', b'4');
/// `DRM_FORMAT_XBGR8888`
pub const FOURCC_XBGR8888: u32 = fourcc_code(b'X', b'B', b'2', b'4');
/// `DRM_FORMAT_XRGB2101010`
pub const FOURCC_XRGB2101010: u32 = fourcc_code(b'X', b'R', b'3', b'0');

/// `DRM_FORMAT_MOD_LINEAR`
pub const MOD_LINEAR: u64 = 0;

/// A packed 32-bit DRM pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrmFormat {
    /// 8 bits per channel, top byte ignored.
    #[default]
    Xrgb8888,
    /// 10 bits per channel, top two bits ignored.
    Xrgb2101010,
    /// 8 bits per channel with alpha. Storage only.
    Argb8888,
    /// 8 bits per channel, BGR order. Storage only.
    Xbgr8888,
}

impl DrmFormat {
    /// Looks up a format by fourcc code.
    pub fn from_fourcc(code: u32) -> Result<Self> {
        match code {
            FOURCC_XRGB8888 => Ok(Self::Xrgb8888),
            FOURCC_XRGB2101010 => Ok(Self::Xrgb2101010),
            FOURCC_ARGB8888 => Ok(Self::Argb8888),
            FOURCC_XBGR8888 => Ok(Self::Xbgr8888),
            other => Err(Error::unsupported_format(format!("fourcc {:#010x}", other))),
        }
    }

    /// Parses a format name such as `XRGB8888` or a fourcc like `XR24`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "XRGB8888" | "XR24" => Ok(Self::Xrgb8888),
            "XRGB2101010" | "XR30" => Ok(Self::Xrgb2101010),
            "ARGB8888" | "AR24" => Ok(Self::Argb8888),
            "XBGR8888" | "XB24" => Ok(Self::Xbgr8888),
            _ => Err(Error::unsupported_format(name)),
        }
    }

    /// DRM fourcc code.
    #[inline]
    pub const fn fourcc(&self) -> u32 {
        match self {
            Self::Xrgb8888 => FOURCC_XRGB8888,
            Self::Xrgb2101010 => FOURCC_XRGB2101010,
            Self::Argb8888 => FOURCC_ARGB8888,
            Self::Xbgr8888 => FOURCC_XBGR8888,
        }
    }

    /// Canonical name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Xrgb8888 => "XRGB8888",
            Self::Xrgb2101010 => "XRGB2101010",
            Self::Argb8888 => "ARGB8888",
            Self::Xbgr8888 => "XBGR8888",
        }
    }

    /// Bytes per pixel. All supported formats are 32-bit packed.
    #[inline]
    pub const fn bytes_per_pixel(&self) -> usize {
        4
    }

    /// Bits per color channel.
    #[inline]
    pub const fn channel_bits(&self) -> u32 {
        match self {
            Self::Xrgb2101010 => 10,
            _ => 8,
        }
    }

    /// Maximum integer channel value.
    #[inline]
    pub const fn channel_max(&self) -> u32 {
        (1 << self.channel_bits()) - 1
    }

    /// Mask of the bits carrying color (alpha / X bits cleared).
    #[inline]
    pub const fn color_mask(&self) -> u32 {
        match self {
            Self::Xrgb2101010 => 0x3fff_ffff,
            _ => 0x00ff_ffff,
        }
    }

    /// Returns true if the transform engine can decode this format.
    #[inline]
    pub const fn is_decodable(&self) -> bool {
        matches!(self, Self::Xrgb8888 | Self::Xrgb2101010)
    }

    /// Decodes a raw pixel into normalized RGB, stripping the X channel.
    pub fn decode(&self, raw: u32) -> Result<Pixel> {
        let (shift, max) = match self {
            Self::Xrgb8888 => (8, 0xff),
            Self::Xrgb2101010 => (10, 0x3ff),
            _ => return Err(Error::unsupported_format(self.name())),
        };
        let raw = raw & self.color_mask();
        let scale = max as f32;
        Ok(Pixel::new(
            ((raw >> (2 * shift)) & max) as f32 / scale,
            ((raw >> shift) & max) as f32 / scale,
            (raw & max) as f32 / scale,
        ))
    }

    /// Encodes normalized RGB into a raw pixel.
    ///
    /// Channels are clamped to [0, 1] and rounded to the nearest integer
    /// code. The X bits are written as zero.
    pub fn encode(&self, pixel: Pixel) -> Result<u32> {
        let (shift, max) = match self {
            Self::Xrgb8888 => (8u32, 0xffu32),
            Self::Xrgb2101010 => (10, 0x3ff),
            _ => return Err(Error::unsupported_format(self.name())),
        };
        let p = pixel.clamp01();
        let q = |c: f32| ((c * max as f32).round() as u32) & max;
        Ok((q(p.r) << (2 * shift)) | (q(p.g) << shift) | q(p.b))
    }

    /// Extracts integer component `index` (0 = blue, 1 = green, 2 = red)
    /// from a raw pixel for comparison.
    #[inline]
    pub const fn component(&self, raw: u32, index: u32) -> u16 {
        let bits = self.channel_bits();
        ((raw >> (bits * index)) & self.channel_max()) as u16
    }
}

impl fmt::Display for DrmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc() {
        assert_eq!(FOURCC_XRGB8888, 0x3432_5258);
        assert_eq!(FOURCC_XRGB2101010, 0x3033_5258);
        assert_eq!(DrmFormat::from_fourcc(FOURCC_XRGB8888).unwrap(), DrmFormat::Xrgb8888);
        assert!(DrmFormat::from_fourcc(0).is_err());
    }

    #[test]
    fn test_decode_strips_x() {
        let p = DrmFormat::Xrgb8888.decode(0xff00_ff00).unwrap();
        assert_eq!(p, Pixel::new(0.0, 1.0, 0.0));
        let p = DrmFormat::Xrgb2101010.decode(0xc000_0000 | (1023 << 20)).unwrap();
        assert_eq!(p, Pixel::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_encode_clamps_and_rounds() {
        let raw = DrmFormat::Xrgb8888
            .encode(Pixel::new(2.0, -1.0, 0.5))
            .unwrap();
        // 0.5 * 255 = 127.5 rounds away from zero
        assert_eq!(raw, 0x00ff_0080);
    }

    #[test]
    fn test_roundtrip_within_one_step() {
        for fmt in [DrmFormat::Xrgb8888, DrmFormat::Xrgb2101010] {
            let step = 1.0 / fmt.channel_max() as f32;
            for i in 0..=200 {
                let v = i as f32 / 200.0;
                let p = Pixel::new(v, 1.0 - v, v * 0.5);
                let back = fmt.decode(fmt.encode(p).unwrap()).unwrap();
                assert!(back.max_abs_diff(&p) <= step, "{} v={}", fmt, v);
            }
        }
    }

    #[test]
    fn test_unsupported_decode() {
        let err = DrmFormat::Argb8888.decode(0).unwrap_err();
        assert!(err.is_unsupported());
        assert!(DrmFormat::Xbgr8888.encode(Pixel::BLACK).is_err());
    }

    #[test]
    fn test_component() {
        let raw = DrmFormat::Xrgb2101010.encode(Pixel::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(DrmFormat::Xrgb2101010.component(raw, 2), 1023);
        assert_eq!(DrmFormat::Xrgb2101010.component(raw, 0), 0);
    }
}
