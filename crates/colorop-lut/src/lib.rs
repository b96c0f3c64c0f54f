//! # colorop-lut
//!
//! Lookup tables used by display color pipelines.
//!
//! - [`Lut1D`] - per-channel curve with linear interpolation, used to model
//!   custom 1D LUT and enumerated-curve hardware stages
//! - [`Lut3D`] - RGB cube with tetrahedral (default) or trilinear sampling
//!
//! # Usage
//!
//! ```rust
//! use colorop_lut::{Interpolation, Lut3D};
//!
//! let lut = Lut3D::from_fn(17, |[r, g, b]| {
//!     let y = (r + g + b) / 3.0;
//!     [y, y, y]
//! })
//! .unwrap();
//! assert_eq!(lut.interpolation(), Interpolation::Tetrahedral);
//! let gray = lut.apply([1.0, 0.0, 0.0]);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod interp;
mod lut1d;
mod lut3d;

pub use error::{LutError, LutResult};
pub use interp::Interpolation;
pub use lut1d::Lut1D;
pub use lut3d::Lut3D;
