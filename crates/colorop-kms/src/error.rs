//! Error types for pipeline mapping, configuration and verification.
//!
//! Errors fall in two classes:
//!
//! - **Skips** ([`KmsError::is_skip`]): the display cannot run the requested
//!   test at all (no writeback output, no capable pipeline, no matching
//!   3D LUT mode, unsupported pixel format, empty colorop list).
//! - **Failures**: everything else, including output mismatches, fence
//!   timeouts, invalid input at the display boundary and allocation
//!   failures.

use crate::compare::PixelDiff;
use crate::display::{ColoropId, PlaneId};
use colorop_core::Fingerprint;
use colorop_lut::LutError;
use std::fmt;
use thiserror::Error;

/// Result type for display operations.
pub type KmsResult<T> = Result<T, KmsError>;

/// Error codes reported by the display boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errno {
    /// No such object
    Enoent,
    /// Out of memory
    Enomem,
    /// Object busy
    Ebusy,
    /// Invalid argument
    Einval,
}

impl Errno {
    /// Numeric errno value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Enoent => 2,
            Self::Enomem => 12,
            Self::Ebusy => 16,
            Self::Einval => 22,
        }
    }

    /// Symbolic name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Enoent => "ENOENT",
            Self::Enomem => "ENOMEM",
            Self::Ebusy => "EBUSY",
            Self::Einval => "EINVAL",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Errors produced by this crate.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Pixel buffer or transform engine error.
    #[error(transparent)]
    Core(#[from] colorop_core::Error),

    /// LUT construction error.
    #[error(transparent)]
    Lut(#[from] LutError),

    /// The colorop list to map or run is empty.
    #[error("empty colorop list")]
    EmptyColoropList,

    /// No candidate pipeline of the plane can realize the colorop list.
    #[error("no color pipeline on plane {plane} can realize [{ops}]")]
    NoPipeline {
        /// Plane searched
        plane: PlaneId,
        /// Requested colorop names
        ops: String,
    },

    /// The plane has no COLOR_PIPELINE property.
    #[error("plane {0} has no COLOR_PIPELINE property")]
    NoColorPipeline(PlaneId),

    /// None of the modes advertised by a 3D LUT colorop matches.
    #[error("colorop {colorop} advertises no 3D LUT mode matching {wanted}")]
    NoLut3dMode {
        /// Colorop searched
        colorop: ColoropId,
        /// Description of the wanted mode
        wanted: String,
    },

    /// No writeback connector is available.
    #[error("no writeback connector available")]
    NoWriteback,

    /// Hardware output differs from the software reference.
    #[error("{count} component(s) outside tolerance [+{up}, -{down}], first at {first}")]
    Mismatch {
        /// Number of differing components
        count: usize,
        /// Upper tolerance
        up: u8,
        /// Lower tolerance
        down: u8,
        /// First differing component
        first: PixelDiff,
        /// Leading differences, for diagnostics
        diffs: Vec<PixelDiff>,
    },

    /// Two buffers expected to be identical have different fingerprints.
    #[error("fingerprint mismatch: {expected} vs {actual}")]
    FingerprintMismatch {
        /// Fingerprint of the reference buffer
        expected: Fingerprint,
        /// Fingerprint of the produced buffer
        actual: Fingerprint,
    },

    /// A completion fence did not signal in time.
    #[error("fence {fence} did not signal within {timeout_ms} ms")]
    FenceTimeout {
        /// Fence id
        fence: u64,
        /// Timeout used
        timeout_ms: u64,
    },

    /// The display rejected an operation.
    #[error("{op}: {errno}: {detail}")]
    InvalidInput {
        /// Operation that failed
        op: &'static str,
        /// Error code
        errno: Errno,
        /// Description
        detail: String,
    },

    /// Invalid test plan.
    #[error("invalid test plan: {0}")]
    Config(String),

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding error while dumping a buffer.
    #[error("PNG encode error: {0}")]
    Png(#[from] png::EncodingError),
}

impl KmsError {
    /// Creates an [`KmsError::InvalidInput`] error.
    #[inline]
    pub fn invalid(op: &'static str, errno: Errno, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            op,
            errno,
            detail: detail.into(),
        }
    }

    /// Returns `true` if the test should be skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        match self {
            Self::Core(e) => e.is_unsupported(),
            Self::EmptyColoropList
            | Self::NoPipeline { .. }
            | Self::NoColorPipeline(_)
            | Self::NoLut3dMode { .. }
            | Self::NoWriteback => true,
            _ => false,
        }
    }

    /// Returns the error code if this is an invalid-input error.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::InvalidInput { errno, .. } => Some(*errno),
            Self::Core(e) if e.is_allocation_error() => Some(Errno::Enomem),
            _ => None,
        }
    }

    /// Returns `true` if a scratch or buffer allocation failed.
    pub fn is_out_of_memory(&self) -> bool {
        self.errno() == Some(Errno::Enomem)
    }

    /// Returns `true` if a completion fence timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FenceTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_classification() {
        assert!(KmsError::NoWriteback.is_skip());
        assert!(KmsError::EmptyColoropList.is_skip());
        assert!(KmsError::from(colorop_core::Error::unsupported_format("AR24")).is_skip());
        assert!(!KmsError::FenceTimeout { fence: 1, timeout_ms: 1000 }.is_skip());
        assert!(!KmsError::invalid("map", Errno::Ebusy, "mapped").is_skip());
    }

    #[test]
    fn test_errno() {
        let err = KmsError::invalid("destroy", Errno::Enoent, "no buffer 7");
        assert_eq!(err.errno(), Some(Errno::Enoent));
        assert_eq!(Errno::Einval.code(), 22);
        assert!(err.to_string().contains("ENOENT (2)"));

        let oom = KmsError::from(colorop_core::Error::allocation_failed(64, "capacity overflow"));
        assert!(oom.is_out_of_memory());
    }
}
