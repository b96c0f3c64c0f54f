//! # colorop-transfer
//!
//! Closed-form transfer functions used by display color pipelines.
//!
//! Two parametric families cover every curve in the catalog:
//!
//! | Family | Curves | Clamped |
//! |--------|--------|---------|
//! | [`TransferFunction`] (piecewise linear + power) | [`srgb`], [`bt2020`], [`gamma`] | yes, to [0, 1] |
//! | [`PqFunction`] (rational power law) | [`pq`] | no |
//!
//! Each family has an analytic inverse in the same form, so the inverse
//! curves are derived from the forward coefficients rather than tabulated.
//!
//! # Usage
//!
//! ```rust
//! use colorop_transfer::{srgb, pq};
//!
//! let linear = srgb::eotf(0.5);
//! let encoded = srgb::inv_eotf(linear);
//! assert!((encoded - 0.5).abs() < 1e-4);
//!
//! let nits_over_80 = pq::eotf_125(0.5);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bt2020;
pub mod gamma;
mod piecewise;
pub mod pq;
pub mod srgb;

pub use bt2020::{BT2020_INV_OETF, BT2020_OETF};
pub use gamma::{GAMMA22, GAMMA22_INV};
pub use piecewise::TransferFunction;
pub use pq::{PQ_EOTF, PQ_INV_EOTF, PqFunction};
pub use srgb::{SRGB_EOTF, SRGB_INV_EOTF};
