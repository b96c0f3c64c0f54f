//! Display-control interface.
//!
//! [`DisplayControl`] is the boundary between the verification core and a
//! display driver: framebuffer allocation and CPU mapping, colorop property
//! access, plane/writeback state, atomic commits and completion fences.
//! [`VirtualDisplay`](crate::VirtualDisplay) implements it in-process.

use crate::{Errno, KmsError, KmsResult};
use colorop_core::{DrmFormat, Fingerprint, PixelBuffer};
use std::fmt;
use std::time::Duration;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

object_id!(
    /// Id of a hardware colorop node.
    ColoropId
);
object_id!(
    /// Id of a display plane.
    PlaneId
);
object_id!(
    /// Id of a writeback connector.
    ConnectorId
);
object_id!(
    /// Handle of a framebuffer.
    BufferHandle
);

/// Completion fence returned by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fence(pub u64);

/// Default time to wait for a writeback fence.
pub const FENCE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Hardware colorop type, the value of the `TYPE` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ColoropType {
    /// Named 1D curve
    #[serde(rename = "1D Curve")]
    Curve1D,
    /// Custom 1D LUT
    #[serde(rename = "1D LUT")]
    Lut1D,
    /// 3x3 matrix
    #[serde(rename = "3x3 Matrix")]
    Ctm3x3,
    /// 3x4 matrix
    #[serde(rename = "3x4 Matrix")]
    Ctm3x4,
    /// Scalar multiplier
    #[serde(rename = "Multiplier")]
    Multiplier,
    /// 3D LUT
    #[serde(rename = "3D LUT")]
    Lut3D,
}

impl ColoropType {
    /// All types, in `TYPE` enum order.
    pub const ALL: [Self; 6] = [
        Self::Curve1D,
        Self::Lut1D,
        Self::Ctm3x3,
        Self::Ctm3x4,
        Self::Multiplier,
        Self::Lut3D,
    ];

    /// Enum name as exposed by the driver.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Curve1D => "1D Curve",
            Self::Lut1D => "1D LUT",
            Self::Ctm3x3 => "3x3 Matrix",
            Self::Ctm3x4 => "3x4 Matrix",
            Self::Multiplier => "Multiplier",
            Self::Lut3D => "3D LUT",
        }
    }

    /// Looks a type up by enum name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Properties carried by a node of this type, besides `TYPE`,
    /// `BYPASS` and `NEXT`.
    pub const fn properties(self) -> &'static [ColoropProperty] {
        use ColoropProperty::*;
        match self {
            Self::Curve1D => &[Curve1DType],
            Self::Lut1D => &[Size, Data],
            Self::Ctm3x3 | Self::Ctm3x4 => &[Data],
            Self::Multiplier => &[Multiplier],
            Self::Lut3D => &[Lut3dModes, Lut3dModeIndex, Data],
        }
    }
}

impl fmt::Display for ColoropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Colorop node properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColoropProperty {
    /// Node type (enum, immutable)
    Type,
    /// Bypass flag (0 or 1)
    Bypass,
    /// Id of the next node, 0 at the end of the chain (immutable)
    Next,
    /// Selected curve (enum)
    Curve1DType,
    /// Number of 1D LUT entries (immutable)
    Size,
    /// Parameter blob: CTM, 1D LUT or 3D LUT entries
    Data,
    /// Multiplier, unsigned 32.32 fixed point
    Multiplier,
    /// Blob of supported 3D LUT modes (immutable)
    Lut3dModes,
    /// Index of the selected 3D LUT mode
    Lut3dModeIndex,
}

impl ColoropProperty {
    /// Property name as exposed by the driver.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Type => "TYPE",
            Self::Bypass => "BYPASS",
            Self::Next => "NEXT",
            Self::Curve1DType => "CURVE_1D_TYPE",
            Self::Size => "SIZE",
            Self::Data => "DATA",
            Self::Multiplier => "MULTIPLIER",
            Self::Lut3dModes => "LUT3D_MODES",
            Self::Lut3dModeIndex => "LUT3D_MODE_INDEX",
        }
    }

    /// Returns `true` for blob-valued properties.
    pub const fn is_blob(self) -> bool {
        matches!(self, Self::Data | Self::Lut3dModes)
    }

    /// Returns `true` for properties userspace may not change.
    pub const fn is_immutable(self) -> bool {
        matches!(self, Self::Type | Self::Next | Self::Size | Self::Lut3dModes)
    }
}

impl fmt::Display for ColoropProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Atomic commit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitFlags {
    /// Allow a full modeset
    pub allow_modeset: bool,
    /// Validate only, do not apply
    pub test_only: bool,
}

impl CommitFlags {
    /// `DRM_MODE_ATOMIC_ALLOW_MODESET`
    pub const ALLOW_MODESET: Self = Self {
        allow_modeset: true,
        test_only: false,
    };
}

/// A writeback connector and the primary plane feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritebackOutput {
    /// Writeback connector
    pub connector: ConnectorId,
    /// Primary plane on the same CRTC
    pub plane: PlaneId,
    /// Mode width
    pub width: u32,
    /// Mode height
    pub height: u32,
}

/// Operations the verification core needs from a display driver.
///
/// Methods mirror the atomic KMS API: property writes are staged and
/// only take effect at [`commit_display_state`](Self::commit_display_state).
pub trait DisplayControl {
    /// Driver name, used to select the comparison tolerance.
    fn driver_name(&self) -> &str;

    /// Allocates a framebuffer.
    fn create_pixel_buffer(
        &mut self,
        width: u32,
        height: u32,
        format: DrmFormat,
        modifier: u64,
    ) -> KmsResult<BufferHandle>;

    /// Frees a framebuffer. Fails with `EBUSY` while it is mapped.
    fn destroy_pixel_buffer(&mut self, handle: BufferHandle) -> KmsResult<()>;

    /// Maps a framebuffer for CPU access, returning its current contents.
    ///
    /// Fails with `EBUSY` if already mapped and `ENOENT` for an unknown
    /// handle.
    fn map_buffer(&mut self, handle: BufferHandle) -> KmsResult<PixelBuffer>;

    /// Unmaps a framebuffer, storing `contents` back.
    ///
    /// Fails with `EINVAL` if the buffer is not mapped or `contents` has a
    /// different geometry.
    fn unmap_buffer(&mut self, handle: BufferHandle, contents: PixelBuffer) -> KmsResult<()>;

    /// The first writeback output that accepts a commit, if any.
    fn writeback_output(&self) -> Option<WritebackOutput>;

    /// Returns `true` if the plane exposes a COLOR_PIPELINE property.
    fn plane_has_color_pipeline(&self, plane: PlaneId) -> bool;

    /// Heads of the candidate color pipelines of `plane`, in driver order.
    fn enumerate_color_pipelines(&self, plane: PlaneId) -> KmsResult<Vec<ColoropId>>;

    /// Reads a scalar or enum property.
    fn get_node_property(&self, node: ColoropId, prop: ColoropProperty) -> KmsResult<u64>;

    /// Enum value names of an enum property, indexed by value.
    fn node_property_enum_names(&self, node: ColoropId, prop: ColoropProperty)
    -> KmsResult<Vec<String>>;

    /// Stages a scalar or enum property write.
    fn set_node_property(&mut self, node: ColoropId, prop: ColoropProperty, value: u64)
    -> KmsResult<()>;

    /// Reads a blob property. An unset blob reads as empty.
    fn get_node_blob_property(&self, node: ColoropId, prop: ColoropProperty)
    -> KmsResult<Vec<u8>>;

    /// Stages a blob property replacement. An empty slice clears the blob.
    fn replace_node_blob_property(
        &mut self,
        node: ColoropId,
        prop: ColoropProperty,
        bytes: &[u8],
    ) -> KmsResult<()>;

    /// Stages the framebuffer scanned out by `plane`.
    fn set_plane_fb(&mut self, plane: PlaneId, fb: Option<BufferHandle>) -> KmsResult<()>;

    /// Stages the plane's COLOR_PIPELINE; `None` selects `Bypass`.
    fn set_plane_color_pipeline(&mut self, plane: PlaneId, head: Option<ColoropId>)
    -> KmsResult<()>;

    /// Stages the writeback target of `connector`.
    fn set_writeback_fb(&mut self, connector: ConnectorId, fb: Option<BufferHandle>)
    -> KmsResult<()>;

    /// Commits staged state. Returns the writeback fence if a writeback
    /// framebuffer was attached.
    fn commit_display_state(&mut self, flags: CommitFlags) -> KmsResult<Option<Fence>>;

    /// Blocks until `fence` signals or `timeout` expires.
    fn wait_fence(&mut self, fence: Fence, timeout: Duration) -> KmsResult<()>;

    /// Stages an enum property write by value name.
    fn set_node_property_enum(
        &mut self,
        node: ColoropId,
        prop: ColoropProperty,
        name: &str,
    ) -> KmsResult<()> {
        let names = self.node_property_enum_names(node, prop)?;
        let value = names.iter().position(|n| n == name).ok_or_else(|| {
            KmsError::invalid(
                "set_node_property_enum",
                Errno::Einval,
                format!("colorop {} {} has no value {:?}", node, prop, name),
            )
        })?;
        self.set_node_property(node, prop, value as u64)
    }

    /// Reads an enum property as its value name.
    fn get_node_property_enum(&self, node: ColoropId, prop: ColoropProperty) -> KmsResult<String> {
        let value = self.get_node_property(node, prop)?;
        let names = self.node_property_enum_names(node, prop)?;
        names.get(value as usize).cloned().ok_or_else(|| {
            KmsError::invalid(
                "get_node_property_enum",
                Errno::Einval,
                format!("colorop {} {} value {} out of range", node, prop, value),
            )
        })
    }

    /// Fingerprint of a framebuffer's visible color content.
    fn checksum_buffer(&mut self, handle: BufferHandle) -> KmsResult<Fingerprint> {
        with_mapped(self, handle, |buf| Ok(buf.fingerprint()))
    }
}

/// Runs `f` on the CPU mapping of `handle`, unmapping on every path.
///
/// An error from `f` takes precedence over an unmap error.
pub fn with_mapped<D, T>(
    display: &mut D,
    handle: BufferHandle,
    f: impl FnOnce(&mut PixelBuffer) -> KmsResult<T>,
) -> KmsResult<T>
where
    D: DisplayControl + ?Sized,
{
    let mut buf = display.map_buffer(handle)?;
    let result = f(&mut buf);
    let unmapped = display.unmap_buffer(handle, buf);
    let value = result?;
    unmapped?;
    Ok(value)
}

/// Reads the `NEXT` property as an optional id.
pub fn next_colorop<D>(display: &D, node: ColoropId) -> KmsResult<Option<ColoropId>>
where
    D: DisplayControl + ?Sized,
{
    let next = display.get_node_property(node, ColoropProperty::Next)?;
    Ok(match next {
        0 => None,
        id => Some(ColoropId(id as u32)),
    })
}

/// Reads the `TYPE` property.
pub fn colorop_type<D>(display: &D, node: ColoropId) -> KmsResult<ColoropType>
where
    D: DisplayControl + ?Sized,
{
    let name = display.get_node_property_enum(node, ColoropProperty::Type)?;
    ColoropType::from_name(&name).ok_or_else(|| {
        KmsError::invalid(
            "colorop_type",
            Errno::Einval,
            format!("colorop {} has unknown type {:?}", node, name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        for t in ColoropType::ALL {
            assert_eq!(ColoropType::from_name(t.name()), Some(t));
        }
        assert_eq!(ColoropType::from_name("2D LUT"), None);
    }

    #[test]
    fn test_property_traits() {
        assert!(ColoropProperty::Data.is_blob());
        assert!(ColoropProperty::Next.is_immutable());
        assert!(!ColoropProperty::Bypass.is_immutable());
        assert_eq!(ColoropProperty::Curve1DType.name(), "CURVE_1D_TYPE");
    }
}
