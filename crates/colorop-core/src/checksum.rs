//! Buffer fingerprints.
//!
//! A [`Fingerprint`] is a cheap equality pre-check between two buffers: a
//! SHA-256 digest over the format, the dimensions and the color bits of
//! every visible pixel. X/alpha bits and stride padding do not contribute.

use crate::PixelBuffer;
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest identifying the visible color content of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of `buffer`.
    pub fn of(buffer: &PixelBuffer) -> Self {
        let format = buffer.format();
        let mask = format.color_mask();
        let mut hasher = Sha256::new();
        hasher.update(format.fourcc().to_le_bytes());
        hasher.update(buffer.width().to_le_bytes());
        hasher.update(buffer.height().to_le_bytes());
        for y in 0..buffer.height() {
            for px in buffer.row(y).chunks_exact(4) {
                let raw = u32::from_le_bytes([px[0], px[1], px[2], px[3]]) & mask;
                hasher.update(raw.to_le_bytes());
            }
        }
        Self(hasher.finalize().into())
    }

    /// Hex representation.
    pub fn to_hex(&self) -> String {
        format!("{:x}", sha2::digest::Output::<Sha256>::from(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..16])
    }
}

impl PixelBuffer {
    /// Computes the [`Fingerprint`] of this buffer.
    #[inline]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}
