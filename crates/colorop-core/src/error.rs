//! Error types for colorop-core operations.
//!
//! The [`Error`] enum covers the failure modes of pixel buffers and the
//! pixel-plane transform engine:
//! - Buffer geometry (dimensions, stride, bounds)
//! - Pixel format support
//! - Scratch memory allocation
//!
//! # Usage
//!
//! ```rust
//! use colorop_core::{Error, Result};
//!
//! fn check(x: u32, y: u32, width: u32, height: u32) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling pixel buffers.
///
/// # Categories
///
/// - **Bounds errors**: [`OutOfBounds`](Error::OutOfBounds)
/// - **Allocation errors**: [`AllocationFailed`](Error::AllocationFailed)
/// - **Format errors**: [`UnsupportedFormat`](Error::UnsupportedFormat), [`FormatMismatch`](Error::FormatMismatch)
/// - **Geometry errors**: [`DimensionMismatch`](Error::DimensionMismatch),
///   [`InvalidDimensions`](Error::InvalidDimensions), [`InvalidStride`](Error::InvalidStride)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Pixel coordinates are outside buffer bounds.
    #[error("pixel ({x}, {y}) out of bounds for buffer {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: u32,
        /// Y coordinate that was out of bounds
        y: u32,
        /// Buffer width
        width: u32,
        /// Buffer height
        height: u32,
    },

    /// Memory allocation failed.
    ///
    /// Returned when the transform engine cannot reserve its scratch
    /// line buffer.
    #[error("failed to allocate {requested} bytes: {reason}")]
    AllocationFailed {
        /// Bytes requested
        requested: usize,
        /// Failure reason
        reason: String,
    },

    /// Pixel format is not supported for this operation.
    ///
    /// The transform engine only decodes XRGB8888 and XRGB2101010.
    #[error("unsupported pixel format: {format}")]
    UnsupportedFormat {
        /// Format name or fourcc
        format: String,
    },

    /// Two buffers that must share a format do not.
    #[error("format mismatch: {a} vs {b}")]
    FormatMismatch {
        /// First buffer format
        a: String,
        /// Second buffer format
        b: String,
    },

    /// Buffer dimensions don't match for the operation.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First buffer width
        a_width: u32,
        /// First buffer height
        a_height: u32,
        /// Second buffer width
        b_width: u32,
        /// Second buffer height
        b_height: u32,
    },

    /// Invalid buffer dimensions.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Stride is too small for the given width and pixel size.
    #[error("stride {stride} is less than minimum {min_stride} for width {width}")]
    InvalidStride {
        /// Provided stride
        stride: usize,
        /// Minimum required stride
        min_stride: usize,
        /// Buffer width
        width: u32,
    },
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::AllocationFailed`] error.
    #[inline]
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::DimensionMismatch`] error.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Creates an [`Error::UnsupportedFormat`] error.
    #[inline]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an [`Error::FormatMismatch`] error.
    #[inline]
    pub fn format_mismatch(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self::FormatMismatch {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// Returns `true` if this is an allocation error.
    #[inline]
    pub fn is_allocation_error(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Returns `true` if the operation is not applicable to this format.
    #[inline]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds() {
        let err = Error::out_of_bounds(100, 50, 80, 60);
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("80x60"));
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_allocation_failed() {
        let err = Error::allocation_failed(1 << 40, "out of memory");
        assert!(err.to_string().contains("out of memory"));
        assert!(err.is_allocation_error());
    }

    #[test]
    fn test_unsupported_format() {
        let err = Error::unsupported_format("AR24");
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "unsupported pixel format: AR24");
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Error::dimension_mismatch((100, 100), (200, 200));
        let msg = err.to_string();
        assert!(msg.contains("100x100"));
        assert!(msg.contains("200x200"));
    }
}
