//! Pixel-plane transform engine.
//!
//! Applies an ordered list of [`PixelTransform`]s to every pixel of a
//! [`PixelBuffer`]. Each row is copied into a scratch line, decoded to
//! normalized floats, run through all transforms in sequence, re-encoded
//! (clamp + round) and copied back. Intermediate values are never
//! quantized between transforms.

use crate::{Error, PixelBuffer, PixelTransform, Result, apply_transforms};

/// Applies `transforms`, in order, to every pixel of `buffer` in place.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] if the buffer format cannot be decoded.
///   The buffer is left untouched.
/// - [`Error::AllocationFailed`] if the scratch line cannot be reserved.
///
/// # Example
///
/// ```rust
/// use colorop_core::{transform_buffer, DrmFormat, Pixel, PixelBuffer};
///
/// fn invert(p: Pixel) -> Pixel {
///     p.map(|c| 1.0 - c)
/// }
///
/// let mut buf = PixelBuffer::from_fn(2, 1, DrmFormat::Xrgb8888, |_, _| Pixel::BLACK).unwrap();
/// transform_buffer(&mut buf, &[invert]).unwrap();
/// assert_eq!(buf.pixel(0, 0).unwrap(), Pixel::WHITE);
/// ```
pub fn transform_buffer(buffer: &mut PixelBuffer, transforms: &[PixelTransform]) -> Result<()> {
    let format = buffer.format();
    if !format.is_decodable() {
        return Err(Error::unsupported_format(format.name()));
    }

    let width = buffer.width() as usize;
    let mut line = reserve_line(width)?;

    for y in 0..buffer.height() {
        line.clear();
        line.extend(
            buffer
                .row(y)
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );

        for raw in line.iter_mut() {
            let pixel = apply_transforms(format.decode(*raw)?, transforms);
            *raw = format.encode(pixel)?;
        }

        for (dst, raw) in buffer.row_mut(y).chunks_exact_mut(4).zip(&line) {
            dst.copy_from_slice(&raw.to_le_bytes());
        }
    }

    Ok(())
}

/// Reserves a scratch line of `len` pixels without aborting on failure.
pub(crate) fn reserve_line(len: usize) -> Result<Vec<u32>> {
    let mut line = Vec::new();
    line.try_reserve_exact(len).map_err(|e| {
        Error::allocation_failed(len.saturating_mul(std::mem::size_of::<u32>()), e.to_string())
    })?;
    Ok(line)
}
