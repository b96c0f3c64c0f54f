//! CPU-visible framebuffer contents.
//!
//! A [`PixelBuffer`] is the CPU-side view of a mapped framebuffer: rows of
//! little-endian packed 32-bit pixels separated by `stride` bytes. It is the
//! only buffer representation the transform engine and comparator operate on.

use crate::{DrmFormat, Error, Pixel, Result};

/// A linear, single-plane, packed 32-bit pixel buffer.
///
/// # Example
///
/// ```rust
/// use colorop_core::{DrmFormat, Pixel, PixelBuffer};
///
/// let mut buf = PixelBuffer::new(4, 2, DrmFormat::Xrgb8888).unwrap();
/// buf.set_pixel(1, 1, Pixel::WHITE).unwrap();
/// assert_eq!(buf.raw(1, 1).unwrap(), 0x00ff_ffff);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    format: DrmFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a zeroed buffer with a tightly packed stride.
    pub fn new(width: u32, height: u32, format: DrmFormat) -> Result<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, stride, format)
    }

    /// Creates a zeroed buffer with an explicit stride in bytes.
    pub fn with_stride(width: u32, height: u32, stride: usize, format: DrmFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero size"));
        }
        let min_stride = width as usize * format.bytes_per_pixel();
        if stride < min_stride {
            return Err(Error::InvalidStride {
                stride,
                min_stride,
                width,
            });
        }
        let size = stride
            .checked_mul(height as usize)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "size overflows usize"))?;
        Ok(Self {
            width,
            height,
            stride,
            format,
            data: vec![0; size],
        })
    }

    /// Creates a buffer whose pixels are produced by `f(x, y)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        format: DrmFormat,
        f: impl Fn(u32, u32) -> Pixel,
    ) -> Result<Self> {
        let mut buf = Self::new(width, height, format)?;
        for y in 0..height {
            for x in 0..width {
                buf.set_pixel(x, y, f(x, y))?;
            }
        }
        Ok(buf)
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel format.
    #[inline]
    pub fn format(&self) -> DrmFormat {
        self.format
    }

    /// Total size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of the visible part of row `y` (stride padding excluded).
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    /// Mutable bytes of the visible part of row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Number of visible bytes per row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    fn offset(&self, x: u32, y: u32) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(y as usize * self.stride + x as usize * self.format.bytes_per_pixel())
    }

    /// Reads the raw packed pixel at (x, y).
    pub fn raw(&self, x: u32, y: u32) -> Result<u32> {
        let o = self.offset(x, y)?;
        let bytes = [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]];
        Ok(u32::from_le_bytes(bytes))
    }

    /// Writes the raw packed pixel at (x, y).
    pub fn set_raw(&mut self, x: u32, y: u32, raw: u32) -> Result<()> {
        let o = self.offset(x, y)?;
        self.data[o..o + 4].copy_from_slice(&raw.to_le_bytes());
        Ok(())
    }

    /// Decodes the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Result<Pixel> {
        self.format.decode(self.raw(x, y)?)
    }

    /// Encodes and stores the pixel at (x, y).
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) -> Result<()> {
        let raw = self.format.encode(pixel)?;
        self.set_raw(x, y, raw)
    }

    /// Overwrites this buffer with the contents of `other`.
    ///
    /// Both buffers must share dimensions and format.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> Result<()> {
        self.check_compatible(other)?;
        for y in 0..self.height {
            let src = other.row(y);
            self.row_mut(y).copy_from_slice(src);
        }
        Ok(())
    }

    /// Checks that `other` has the same dimensions and format.
    pub fn check_compatible(&self, other: &PixelBuffer) -> Result<()> {
        if self.format != other.format {
            return Err(Error::format_mismatch(self.format.name(), other.format.name()));
        }
        if self.width != other.width || self.height != other.height {
            return Err(Error::dimension_mismatch(
                (self.width, self.height),
                (other.width, other.height),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_rejected() {
        let err = PixelBuffer::new(0, 4, DrmFormat::Xrgb8888).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));
    }

    #[test]
    fn test_stride_too_small() {
        let err = PixelBuffer::with_stride(8, 2, 16, DrmFormat::Xrgb8888).unwrap_err();
        assert!(matches!(err, Error::InvalidStride { min_stride: 32, .. }));
    }

    #[test]
    fn test_padded_stride_rows() {
        let mut buf = PixelBuffer::with_stride(2, 2, 16, DrmFormat::Xrgb8888).unwrap();
        buf.set_raw(1, 1, 0x0012_3456).unwrap();
        assert_eq!(buf.row(1).len(), 8);
        assert_eq!(buf.raw(1, 1).unwrap(), 0x0012_3456);
        assert_eq!(&buf.as_bytes()[20..24], &0x0012_3456u32.to_le_bytes());
    }

    #[test]
    fn test_out_of_bounds() {
        let buf = PixelBuffer::new(2, 2, DrmFormat::Xrgb8888).unwrap();
        assert!(buf.raw(2, 0).unwrap_err().is_bounds_error());
    }

    #[test]
    fn test_copy_from_mismatch() {
        let mut a = PixelBuffer::new(2, 2, DrmFormat::Xrgb8888).unwrap();
        let b = PixelBuffer::new(2, 2, DrmFormat::Xrgb2101010).unwrap();
        assert!(matches!(a.copy_from(&b), Err(Error::FormatMismatch { .. })));
    }
}
