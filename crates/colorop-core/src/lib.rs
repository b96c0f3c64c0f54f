//! # colorop-core
//!
//! Core types for validating display color pipelines.
//!
//! - [`Pixel`] - normalized RGB triple, the unit of every color transform
//! - [`DrmFormat`] - packed 32-bit DRM pixel formats and their codecs
//! - [`PixelBuffer`] - CPU view of a single-plane framebuffer
//! - [`transform_buffer`] - the pixel-plane transform engine
//! - [`Fingerprint`] - content digest for cheap buffer equality checks
//!
//! ## Crate Structure
//!
//! ```text
//! colorop-core (this crate)
//!    ^
//!    +-- colorop-math (CTM matrices)
//!    +-- colorop-transfer (transfer functions)
//!    +-- colorop-lut (1D / 3D LUTs)
//!    +-- colorop-kms (pipeline mapping, encoders, virtual display)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod checksum;
pub mod error;
pub mod format;
pub mod pixel;
pub mod transform;

pub use buffer::PixelBuffer;
pub use checksum::Fingerprint;
pub use error::{Error, Result};
pub use format::{
    DrmFormat, FOURCC_ARGB8888, FOURCC_XBGR8888, FOURCC_XRGB2101010, FOURCC_XRGB8888, MOD_LINEAR,
    fourcc_code,
};
pub use pixel::{Pixel, PixelTransform, apply_transforms};
pub use transform::transform_buffer;
