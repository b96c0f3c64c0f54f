//! # colorop-kms
//!
//! Maps abstract color operations onto a display's hardware color
//! pipeline, programs it, and verifies the result against the software
//! color model.
//!
//! ## Flow
//!
//! ```text
//! catalog names --> ColorOpDescriptor list
//!                     |                 |
//!   apply_software_transform      map_hardware_pipeline
//!                     |                 |
//!                     |          configure_pipeline (encode)
//!                     |                 |
//!              reference buffer   commit + writeback
//!                     \                 /
//!                      compare_buffers
//! ```
//!
//! The display is reached through the [`DisplayControl`] trait;
//! [`VirtualDisplay`] implements it in-process.
//!
//! # Example
//!
//! ```rust
//! use colorop_kms::{PlaneTestOptions, Tolerance, VirtualDisplay, catalog, run_plane_test};
//!
//! let mut display = VirtualDisplay::new().with_mode(32, 8);
//! let mut ops = catalog::descriptors(&["srgb_eotf", "srgb_inv_eotf"]).unwrap();
//! let opts = PlaneTestOptions {
//!     tolerance: Tolerance::new(1, 1),
//!     ..Default::default()
//! };
//! run_plane_test(&mut display, &mut ops, &opts).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod catalog;
pub mod compare;
pub mod config;
pub mod configure;
pub mod descriptor;
pub mod display;
pub mod dump;
pub mod encode;
mod error;
pub mod harness;
pub mod mapper;
pub mod transform;
pub mod virtual_display;

pub use compare::{PixelDiff, Tolerance, assert_match, compare_buffers, diff_buffers};
pub use config::{PlanTest, TestPlan};
pub use configure::{configure_pipeline, reset_pipeline_to_bypass};
pub use descriptor::{ColorOpDescriptor, ColoropKind, ColoropParams, Curve};
pub use display::{
    BufferHandle, ColoropId, ColoropProperty, ColoropType, CommitFlags, ConnectorId, DisplayControl,
    FENCE_TIMEOUT, Fence, PlaneId, WritebackOutput,
};
pub use encode::{DrmColorLut, Lut3dMode, Traversal};
pub use error::{Errno, KmsError, KmsResult};
pub use harness::{PlaneTestOptions, TestOutcome, TestReport, run_plan, run_plane_test};
pub use mapper::{ColoropNode, PipelineGraph, map_hardware_pipeline};
pub use transform::apply_software_transform;
pub use virtual_display::{NodeSpec, PlaneSpec, Topology, VirtualDisplay};
