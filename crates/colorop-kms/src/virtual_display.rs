//! In-process display driver.
//!
//! [`VirtualDisplay`] implements [`DisplayControl`] without hardware. It
//! keeps an arena of colorop nodes, planes with their candidate pipelines,
//! one writeback connector, framebuffers and fences. A commit with a
//! writeback framebuffer attached renders the primary plane's framebuffer
//! through the enabled nodes of its selected pipeline into the writeback
//! framebuffer.
//!
//! Rendering decodes the programmed properties and blobs on its own:
//!
//! | Node | Model |
//! |------|-------|
//! | `1D Curve` | closed-form curve selected by `CURVE_1D_TYPE` |
//! | `1D LUT` | `DATA` entries, linear interpolation over `[0, 1]` |
//! | `3x3 Matrix`, `3x4 Matrix` | S31.32 `DATA` coefficients |
//! | `Multiplier` | 32.32 `MULTIPLIER` |
//! | `3D LUT` | `DATA` entries laid out per the selected mode |
//!
//! An empty `DATA` blob leaves the node's input unchanged. Values are not
//! clamped between nodes, only when written to the writeback framebuffer.

use crate::descriptor::Curve;
use crate::display::{
    BufferHandle, ColoropId, ColoropProperty, ColoropType, CommitFlags, ConnectorId,
    DisplayControl, Fence, PlaneId, WritebackOutput,
};
use crate::encode::{
    LUT3D_INTERPOLATION_TRILINEAR, Lut3dMode, Traversal, decode_32_32, lut3d_modes_blob,
    parse_ctm_blob, parse_lut_blob,
};
use crate::{Errno, KmsError, KmsResult};
use colorop_core::{DrmFormat, MOD_LINEAR, Pixel, PixelBuffer};
use colorop_lut::{Interpolation, Lut1D, Lut3D};
use colorop_math::{Mat3, Mat3x4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

/// Default number of entries of a `1D LUT` node.
pub const DEFAULT_LUT1D_SIZE: u32 = 4096;

const FIRST_PLANE_ID: u32 = 40;
const WRITEBACK_CONNECTOR: ConnectorId = ConnectorId(90);

/// One node of a pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Hardware type
    #[serde(rename = "type")]
    pub node_type: ColoropType,
    /// Curve enum of a `1D Curve` node; empty selects every known curve
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curves: Vec<String>,
    /// Entry count of a `1D LUT` node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Modes advertised by a `3D LUT` node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lut3d_modes: Option<Vec<Lut3dMode>>,
}

impl NodeSpec {
    /// A node of `node_type` with default properties.
    pub fn new(node_type: ColoropType) -> Self {
        Self {
            node_type,
            curves: Vec::new(),
            size: None,
            lut3d_modes: None,
        }
    }

    /// A `1D Curve` node offering only `curves`.
    pub fn curve(curves: &[Curve]) -> Self {
        Self {
            curves: curves.iter().map(|c| c.hw_name().to_string()).collect(),
            ..Self::new(ColoropType::Curve1D)
        }
    }

    /// A `3D LUT` node advertising `modes`.
    pub fn lut3d(modes: Vec<Lut3dMode>) -> Self {
        Self {
            lut3d_modes: Some(modes),
            ..Self::new(ColoropType::Lut3D)
        }
    }
}

/// Candidate pipelines of one plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneSpec {
    /// Pipelines, each an ordered list of nodes
    pub pipelines: Vec<Vec<NodeSpec>>,
    /// Whether the plane exposes COLOR_PIPELINE at all
    #[serde(default = "default_true")]
    pub color_pipeline: bool,
}

fn default_true() -> bool {
    true
}

/// Hardware layout of a [`VirtualDisplay`].
///
/// The first plane is the primary plane feeding the writeback connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Planes
    pub planes: Vec<PlaneSpec>,
}

impl Topology {
    /// Single plane with one pipeline of the given node types.
    pub fn single(types: &[ColoropType]) -> Self {
        Self::single_pipeline(types.iter().map(|&t| NodeSpec::new(t)).collect())
    }

    /// Single plane with one pipeline.
    pub fn single_pipeline(nodes: Vec<NodeSpec>) -> Self {
        Self {
            planes: vec![PlaneSpec {
                pipelines: vec![nodes],
                color_pipeline: true,
            }],
        }
    }

    fn validate(&self) -> KmsResult<()> {
        let bad = |detail: String| Err(KmsError::Config(detail));
        if self.planes.is_empty() {
            return bad("topology has no planes".into());
        }
        for (p, plane) in self.planes.iter().enumerate() {
            for (i, pipeline) in plane.pipelines.iter().enumerate() {
                if pipeline.is_empty() {
                    return bad(format!("plane {} pipeline {} is empty", p, i));
                }
                for node in pipeline {
                    if node.size.is_some_and(|s| s < 2) {
                        return bad(format!("plane {} pipeline {}: 1D LUT size below 2", p, i));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for Topology {
    /// One plane whose single pipeline is
    /// `1D Curve, 1D LUT, 3x4, 3x4, 3x3, Multiplier, 3D LUT, 1D Curve`.
    fn default() -> Self {
        let modes = vec![
            Lut3dMode {
                traversal: Traversal::Bgr,
                ..Lut3dMode::packed(17)
            },
            Lut3dMode::packed(17),
        ];
        Self::single_pipeline(vec![
            NodeSpec::new(ColoropType::Curve1D),
            NodeSpec::new(ColoropType::Lut1D),
            NodeSpec::new(ColoropType::Ctm3x4),
            NodeSpec::new(ColoropType::Ctm3x4),
            NodeSpec::new(ColoropType::Ctm3x3),
            NodeSpec::new(ColoropType::Multiplier),
            NodeSpec::lut3d(modes),
            NodeSpec::new(ColoropType::Curve1D),
        ])
    }
}

#[derive(Debug, Clone)]
struct NodeState {
    node_type: ColoropType,
    curves: Vec<String>,
    next: Option<ColoropId>,
    size: u32,
    modes: Vec<Lut3dMode>,
    bypass: bool,
    curve: u64,
    data: Vec<u8>,
    multiplier: u64,
    mode_index: u64,
}

impl NodeState {
    fn new(spec: &NodeSpec, next: Option<ColoropId>) -> Self {
        let curves = if spec.curves.is_empty() && spec.node_type == ColoropType::Curve1D {
            Curve::ALL.iter().map(|c| c.hw_name().to_string()).collect()
        } else {
            spec.curves.clone()
        };
        Self {
            node_type: spec.node_type,
            curves,
            next,
            size: spec.size.unwrap_or(DEFAULT_LUT1D_SIZE),
            modes: spec.lut3d_modes.clone().unwrap_or_default(),
            bypass: true,
            curve: 0,
            data: Vec::new(),
            multiplier: 1 << 32,
            mode_index: 0,
        }
    }

    fn has_property(&self, prop: ColoropProperty) -> bool {
        matches!(
            prop,
            ColoropProperty::Type | ColoropProperty::Bypass | ColoropProperty::Next
        ) || self.node_type.properties().contains(&prop)
    }
}

#[derive(Debug, Clone, Default)]
struct PlaneState {
    pipelines: Vec<ColoropId>,
    has_color_pipeline: bool,
    color_pipeline: Option<ColoropId>,
    fb: Option<BufferHandle>,
}

#[derive(Debug)]
struct BufferSlot {
    /// `None` while mapped
    contents: Option<PixelBuffer>,
}

/// One enabled node, decoded for rendering.
#[derive(Debug)]
enum Stage {
    Curve(Curve),
    Lut1D(Lut1D),
    Ctm3x3(Mat3),
    Ctm3x4(Mat3x4),
    Multiplier(f32),
    Lut3D(Lut3D),
}

impl Stage {
    fn apply(&self, p: Pixel) -> Pixel {
        match self {
            Self::Curve(c) => p.map(|v| c.eval(v)),
            Self::Lut1D(lut) => lut.apply_pixel(p),
            Self::Ctm3x3(m) => m.apply(p),
            Self::Ctm3x4(m) => m.apply(p),
            Self::Multiplier(f) => p.scale(*f),
            Self::Lut3D(lut) => lut.apply_pixel(p),
        }
    }
}

/// In-process [`DisplayControl`] implementation.
///
/// # Example
///
/// ```rust
/// use colorop_kms::{DisplayControl, VirtualDisplay};
///
/// let display = VirtualDisplay::new();
/// let output = display.writeback_output().unwrap();
/// let heads = display.enumerate_color_pipelines(output.plane).unwrap();
/// assert_eq!(heads.len(), 1);
/// ```
#[derive(Debug)]
pub struct VirtualDisplay {
    driver: String,
    nodes: BTreeMap<ColoropId, NodeState>,
    planes: BTreeMap<PlaneId, PlaneState>,
    writeback: bool,
    writeback_fb: Option<BufferHandle>,
    mode: (u32, u32),
    buffers: HashMap<BufferHandle, BufferSlot>,
    next_buffer: u32,
    next_fence: u64,
    pending_fences: BTreeSet<u64>,
    stall_after: Option<u64>,
    modeset_done: bool,
}

impl Default for VirtualDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDisplay {
    /// Driver `vkms`, 640x480, default topology.
    pub fn new() -> Self {
        let mut display = Self {
            driver: "vkms".to_string(),
            nodes: BTreeMap::new(),
            planes: BTreeMap::new(),
            writeback: true,
            writeback_fb: None,
            mode: (640, 480),
            buffers: HashMap::new(),
            next_buffer: 1,
            next_fence: 1,
            pending_fences: BTreeSet::new(),
            stall_after: None,
            modeset_done: false,
        };
        display.build(&Topology::default());
        display
    }

    /// Replaces the hardware layout.
    pub fn with_topology(mut self, topology: &Topology) -> KmsResult<Self> {
        topology.validate()?;
        self.build(topology);
        Ok(self)
    }

    /// Sets the reported driver name.
    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver = name.into();
        self
    }

    /// Sets the writeback mode size.
    pub fn with_mode(mut self, width: u32, height: u32) -> Self {
        self.mode = (width, height);
        self
    }

    /// Removes the writeback connector.
    pub fn without_writeback(mut self) -> Self {
        self.writeback = false;
        self
    }

    /// Makes fences never signal.
    pub fn stall_fences(mut self, stall: bool) -> Self {
        self.stall_after = stall.then_some(0);
        self
    }

    /// Lets the first `count` fences signal; later ones never do.
    pub fn stall_fences_after(mut self, count: u64) -> Self {
        self.stall_after = Some(count);
        self
    }

    fn build(&mut self, topology: &Topology) {
        self.nodes.clear();
        self.planes.clear();
        let mut next_id = 1u32;
        for (p, plane_spec) in topology.planes.iter().enumerate() {
            let mut plane = PlaneState {
                has_color_pipeline: plane_spec.color_pipeline,
                ..PlaneState::default()
            };
            if plane_spec.color_pipeline {
                for pipeline in &plane_spec.pipelines {
                    let first = next_id;
                    let last = first + pipeline.len() as u32 - 1;
                    for spec in pipeline {
                        let id = next_id;
                        let next = (id < last).then_some(ColoropId(id + 1));
                        self.nodes.insert(ColoropId(id), NodeState::new(spec, next));
                        next_id += 1;
                    }
                    plane.pipelines.push(ColoropId(first));
                }
            }
            self.planes.insert(PlaneId(FIRST_PLANE_ID + p as u32), plane);
        }
    }

    /// The primary plane.
    pub fn primary_plane(&self) -> PlaneId {
        PlaneId(FIRST_PLANE_ID)
    }

    /// Number of live framebuffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of fences not yet waited on.
    pub fn pending_fence_count(&self) -> usize {
        self.pending_fences.len()
    }

    /// Bypass flag of a node.
    pub fn node_bypass(&self, id: ColoropId) -> Option<bool> {
        self.nodes.get(&id).map(|n| n.bypass)
    }

    /// Length of a node's `DATA` blob.
    pub fn node_data_len(&self, id: ColoropId) -> Option<usize> {
        self.nodes.get(&id).map(|n| n.data.len())
    }

    /// Selected pipeline of a plane.
    pub fn plane_color_pipeline(&self, plane: PlaneId) -> Option<ColoropId> {
        self.planes.get(&plane).and_then(|p| p.color_pipeline)
    }

    fn node(&self, op: &'static str, id: ColoropId) -> KmsResult<&NodeState> {
        self.nodes
            .get(&id)
            .ok_or_else(|| KmsError::invalid(op, Errno::Enoent, format!("no colorop {}", id)))
    }

    fn node_with(
        &self,
        op: &'static str,
        id: ColoropId,
        prop: ColoropProperty,
    ) -> KmsResult<&NodeState> {
        let node = self.node(op, id)?;
        if !node.has_property(prop) {
            return Err(KmsError::invalid(
                op,
                Errno::Enoent,
                format!("colorop {} ({}) has no {}", id, node.node_type, prop),
            ));
        }
        Ok(node)
    }

    fn plane_mut(&mut self, op: &'static str, plane: PlaneId) -> KmsResult<&mut PlaneState> {
        self.planes
            .get_mut(&plane)
            .ok_or_else(|| KmsError::invalid(op, Errno::Enoent, format!("no plane {}", plane)))
    }

    fn check_buffer(&self, op: &'static str, handle: BufferHandle) -> KmsResult<()> {
        if self.buffers.contains_key(&handle) {
            Ok(())
        } else {
            Err(KmsError::invalid(op, Errno::Enoent, format!("no framebuffer {}", handle)))
        }
    }

    fn unmapped(&self, op: &'static str, handle: BufferHandle) -> KmsResult<&PixelBuffer> {
        let slot = self
            .buffers
            .get(&handle)
            .ok_or_else(|| KmsError::invalid(op, Errno::Enoent, format!("no framebuffer {}", handle)))?;
        slot.contents
            .as_ref()
            .ok_or_else(|| KmsError::invalid(op, Errno::Ebusy, format!("framebuffer {} is mapped", handle)))
    }

    fn compile_stage(&self, id: ColoropId, node: &NodeState) -> KmsResult<Option<Stage>> {
        let bad = |detail: String| KmsError::invalid("commit", Errno::Einval, detail);
        let stage = match node.node_type {
            ColoropType::Curve1D => {
                let name = node
                    .curves
                    .get(node.curve as usize)
                    .ok_or_else(|| bad(format!("colorop {} curve {} out of range", id, node.curve)))?;
                let curve = Curve::from_hw_name(name)
                    .ok_or_else(|| bad(format!("colorop {} has unknown curve {:?}", id, name)))?;
                Stage::Curve(curve)
            }
            _ if node.data.is_empty() && node.node_type != ColoropType::Multiplier => return Ok(None),
            ColoropType::Lut1D => {
                let entries = parse_lut_blob(&node.data)?;
                if entries.len() != node.size as usize {
                    return Err(bad(format!(
                        "colorop {} LUT has {} entries, SIZE is {}",
                        id,
                        entries.len(),
                        node.size
                    )));
                }
                let rgb: Vec<[u16; 3]> = entries.iter().map(|e| e.rgb()).collect();
                Stage::Lut1D(Lut1D::from_u16(&rgb)?)
            }
            ColoropType::Ctm3x3 => Stage::Ctm3x3(Mat3::from_row_major(parse_ctm_blob::<9>(&node.data)?)),
            ColoropType::Ctm3x4 => {
                Stage::Ctm3x4(Mat3x4::from_row_major(parse_ctm_blob::<12>(&node.data)?))
            }
            ColoropType::Multiplier => Stage::Multiplier(decode_32_32(node.multiplier) as f32),
            ColoropType::Lut3D => {
                let mode = node
                    .modes
                    .get(node.mode_index as usize)
                    .ok_or_else(|| bad(format!("colorop {} mode index {} out of range", id, node.mode_index)))?;
                Stage::Lut3D(decode_lut3d(id, mode, &node.data)?)
            }
        };
        Ok(Some(stage))
    }

    fn compile_pipeline(&self, head: Option<ColoropId>) -> KmsResult<Vec<Stage>> {
        let mut stages = Vec::new();
        let mut cursor = head;
        let mut remaining = self.nodes.len();
        while let Some(id) = cursor {
            if remaining == 0 {
                return Err(KmsError::invalid("commit", Errno::Einval, "pipeline loops"));
            }
            remaining -= 1;
            let node = self.node("commit", id)?;
            if !node.bypass {
                if let Some(stage) = self.compile_stage(id, node)? {
                    trace!(colorop = %id, stage = ?node.node_type, "enabled");
                    stages.push(stage);
                }
            }
            cursor = node.next;
        }
        Ok(stages)
    }
}

fn decode_lut3d(id: ColoropId, mode: &Lut3dMode, data: &[u8]) -> KmsResult<Lut3D> {
    let entries = parse_lut_blob(data)?;
    if entries.len() != mode.entry_count() {
        return Err(KmsError::invalid(
            "commit",
            Errno::Einval,
            format!(
                "colorop {} 3D LUT has {} entries, mode {} needs {}",
                id,
                entries.len(),
                mode,
                mode.entry_count()
            ),
        ));
    }
    let size = mode.lut_size as usize;
    let mut cube = Vec::with_capacity(size * size * size);
    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                let e = entries[mode.entry_index(r, g, b)];
                cube.push(e.rgb().map(|v| v as f32 / u16::MAX as f32));
            }
        }
    }
    let interpolation = if mode.interpolation == LUT3D_INTERPOLATION_TRILINEAR {
        Interpolation::Trilinear
    } else {
        Interpolation::Tetrahedral
    };
    Ok(Lut3D::from_data(cube, size)?.with_interpolation(interpolation))
}

fn render(input: &PixelBuffer, output: &mut PixelBuffer, stages: &[Stage]) -> KmsResult<()> {
    let stride = output.stride();
    let format = output.format();
    let bpp = format.bytes_per_pixel();
    let width = output.width() as usize;
    output
        .as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .try_for_each(|(y, row)| -> KmsResult<()> {
            for x in 0..width {
                let p = input.pixel(x as u32, y as u32)?;
                let p = stages.iter().fold(p, |p, s| s.apply(p));
                let raw = format.encode(p)?;
                row[x * bpp..x * bpp + 4].copy_from_slice(&raw.to_le_bytes());
            }
            Ok(())
        })
}

impl DisplayControl for VirtualDisplay {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn create_pixel_buffer(
        &mut self,
        width: u32,
        height: u32,
        format: DrmFormat,
        modifier: u64,
    ) -> KmsResult<BufferHandle> {
        const OP: &str = "create_pixel_buffer";
        if modifier != MOD_LINEAR {
            return Err(KmsError::invalid(
                OP,
                Errno::Einval,
                format!("modifier {:#x} not supported", modifier),
            ));
        }
        let buffer = PixelBuffer::new(width, height, format)
            .map_err(|e| KmsError::invalid(OP, Errno::Einval, e.to_string()))?;
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(handle, BufferSlot { contents: Some(buffer) });
        debug!(fb = %handle, width, height, format = %format, "created framebuffer");
        Ok(handle)
    }

    fn destroy_pixel_buffer(&mut self, handle: BufferHandle) -> KmsResult<()> {
        self.unmapped("destroy_pixel_buffer", handle)?;
        self.buffers.remove(&handle);
        for plane in self.planes.values_mut() {
            if plane.fb == Some(handle) {
                plane.fb = None;
            }
        }
        if self.writeback_fb == Some(handle) {
            self.writeback_fb = None;
        }
        debug!(fb = %handle, "destroyed framebuffer");
        Ok(())
    }

    fn map_buffer(&mut self, handle: BufferHandle) -> KmsResult<PixelBuffer> {
        const OP: &str = "map_buffer";
        let slot = self
            .buffers
            .get_mut(&handle)
            .ok_or_else(|| KmsError::invalid(OP, Errno::Enoent, format!("no framebuffer {}", handle)))?;
        slot.contents
            .take()
            .ok_or_else(|| KmsError::invalid(OP, Errno::Ebusy, format!("framebuffer {} already mapped", handle)))
    }

    fn unmap_buffer(&mut self, handle: BufferHandle, contents: PixelBuffer) -> KmsResult<()> {
        const OP: &str = "unmap_buffer";
        let slot = self
            .buffers
            .get_mut(&handle)
            .ok_or_else(|| KmsError::invalid(OP, Errno::Enoent, format!("no framebuffer {}", handle)))?;
        if slot.contents.is_some() {
            return Err(KmsError::invalid(
                OP,
                Errno::Einval,
                format!("framebuffer {} is not mapped", handle),
            ));
        }
        slot.contents = Some(contents);
        Ok(())
    }

    fn writeback_output(&self) -> Option<WritebackOutput> {
        if !self.writeback {
            return None;
        }
        Some(WritebackOutput {
            connector: WRITEBACK_CONNECTOR,
            plane: self.primary_plane(),
            width: self.mode.0,
            height: self.mode.1,
        })
    }

    fn plane_has_color_pipeline(&self, plane: PlaneId) -> bool {
        self.planes.get(&plane).is_some_and(|p| p.has_color_pipeline)
    }

    fn enumerate_color_pipelines(&self, plane: PlaneId) -> KmsResult<Vec<ColoropId>> {
        self.planes
            .get(&plane)
            .map(|p| p.pipelines.clone())
            .ok_or_else(|| {
                KmsError::invalid("enumerate_color_pipelines", Errno::Enoent, format!("no plane {}", plane))
            })
    }

    fn get_node_property(&self, id: ColoropId, prop: ColoropProperty) -> KmsResult<u64> {
        const OP: &str = "get_node_property";
        let node = self.node_with(OP, id, prop)?;
        Ok(match prop {
            ColoropProperty::Type => ColoropType::ALL
                .iter()
                .position(|&t| t == node.node_type)
                .unwrap_or_default() as u64,
            ColoropProperty::Bypass => node.bypass as u64,
            ColoropProperty::Next => node.next.map_or(0, |n| n.0 as u64),
            ColoropProperty::Curve1DType => node.curve,
            ColoropProperty::Size => node.size as u64,
            ColoropProperty::Multiplier => node.multiplier,
            ColoropProperty::Lut3dModeIndex => node.mode_index,
            ColoropProperty::Data | ColoropProperty::Lut3dModes => {
                return Err(KmsError::invalid(OP, Errno::Einval, format!("{} is a blob", prop)));
            }
        })
    }

    fn node_property_enum_names(
        &self,
        id: ColoropId,
        prop: ColoropProperty,
    ) -> KmsResult<Vec<String>> {
        const OP: &str = "node_property_enum_names";
        let node = self.node_with(OP, id, prop)?;
        match prop {
            ColoropProperty::Type => Ok(ColoropType::ALL.iter().map(|t| t.name().to_string()).collect()),
            ColoropProperty::Curve1DType => Ok(node.curves.clone()),
            _ => Err(KmsError::invalid(OP, Errno::Einval, format!("{} is not an enum", prop))),
        }
    }

    fn set_node_property(&mut self, id: ColoropId, prop: ColoropProperty, value: u64) -> KmsResult<()> {
        const OP: &str = "set_node_property";
        let node = self.node_with(OP, id, prop)?;
        let reject = |detail: String| Err(KmsError::invalid(OP, Errno::Einval, detail));
        if prop.is_immutable() {
            return reject(format!("{} is immutable", prop));
        }
        if prop.is_blob() {
            return reject(format!("{} is a blob", prop));
        }
        match prop {
            ColoropProperty::Bypass if value > 1 => return reject(format!("BYPASS {}", value)),
            ColoropProperty::Curve1DType if value as usize >= node.curves.len() => {
                return reject(format!("colorop {} has no curve {}", id, value));
            }
            ColoropProperty::Lut3dModeIndex if value as usize >= node.modes.len() => {
                return reject(format!("colorop {} has no 3D LUT mode {}", id, value));
            }
            _ => {}
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(KmsError::invalid(OP, Errno::Enoent, format!("no colorop {}", id)));
        };
        match prop {
            ColoropProperty::Bypass => node.bypass = value != 0,
            ColoropProperty::Curve1DType => node.curve = value,
            ColoropProperty::Multiplier => node.multiplier = value,
            ColoropProperty::Lut3dModeIndex => node.mode_index = value,
            _ => {}
        }
        trace!(colorop = %id, property = %prop, value, "set");
        Ok(())
    }

    fn get_node_blob_property(&self, id: ColoropId, prop: ColoropProperty) -> KmsResult<Vec<u8>> {
        const OP: &str = "get_node_blob_property";
        let node = self.node_with(OP, id, prop)?;
        match prop {
            ColoropProperty::Data => Ok(node.data.clone()),
            ColoropProperty::Lut3dModes => Ok(lut3d_modes_blob(&node.modes)),
            _ => Err(KmsError::invalid(OP, Errno::Einval, format!("{} is not a blob", prop))),
        }
    }

    fn replace_node_blob_property(
        &mut self,
        id: ColoropId,
        prop: ColoropProperty,
        bytes: &[u8],
    ) -> KmsResult<()> {
        const OP: &str = "replace_node_blob_property";
        self.node_with(OP, id, prop)?;
        if prop != ColoropProperty::Data {
            return Err(KmsError::invalid(OP, Errno::Einval, format!("{} is not writable", prop)));
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.data = bytes.to_vec();
        }
        trace!(colorop = %id, property = %prop, len = bytes.len(), "replaced blob");
        Ok(())
    }

    fn set_plane_fb(&mut self, plane: PlaneId, fb: Option<BufferHandle>) -> KmsResult<()> {
        if let Some(handle) = fb {
            self.check_buffer("set_plane_fb", handle)?;
        }
        self.plane_mut("set_plane_fb", plane)?.fb = fb;
        Ok(())
    }

    fn set_plane_color_pipeline(&mut self, plane: PlaneId, head: Option<ColoropId>) -> KmsResult<()> {
        const OP: &str = "set_plane_color_pipeline";
        let state = self.plane_mut(OP, plane)?;
        if let Some(head) = head {
            if !state.has_color_pipeline {
                return Err(KmsError::invalid(
                    OP,
                    Errno::Einval,
                    format!("plane {} has no COLOR_PIPELINE", plane),
                ));
            }
            if !state.pipelines.contains(&head) {
                return Err(KmsError::invalid(
                    OP,
                    Errno::Einval,
                    format!("colorop {} is not a pipeline of plane {}", head, plane),
                ));
            }
        }
        state.color_pipeline = head;
        Ok(())
    }

    fn set_writeback_fb(&mut self, connector: ConnectorId, fb: Option<BufferHandle>) -> KmsResult<()> {
        const OP: &str = "set_writeback_fb";
        if !self.writeback || connector != WRITEBACK_CONNECTOR {
            return Err(KmsError::invalid(
                OP,
                Errno::Enoent,
                format!("no writeback connector {}", connector),
            ));
        }
        if let Some(handle) = fb {
            self.check_buffer(OP, handle)?;
        }
        self.writeback_fb = fb;
        Ok(())
    }

    fn commit_display_state(&mut self, flags: CommitFlags) -> KmsResult<Option<Fence>> {
        const OP: &str = "commit_display_state";
        if !self.modeset_done && !flags.allow_modeset {
            return Err(KmsError::invalid(OP, Errno::Einval, "first commit needs ALLOW_MODESET"));
        }
        let plane = self.primary_plane();
        let (plane_fb, head) = self
            .planes
            .get(&plane)
            .map(|p| (p.fb, p.color_pipeline))
            .unwrap_or_default();
        let stages = self.compile_pipeline(head)?;

        let Some(wb_handle) = self.writeback_fb else {
            if !flags.test_only {
                self.modeset_done = true;
            }
            return Ok(None);
        };
        let Some(in_handle) = plane_fb else {
            return Err(KmsError::invalid(OP, Errno::Einval, "writeback without a plane framebuffer"));
        };
        let input = self.unmapped(OP, in_handle)?;
        let output = self.unmapped(OP, wb_handle)?;
        if (input.width(), input.height()) != (output.width(), output.height()) {
            return Err(KmsError::invalid(
                OP,
                Errno::Einval,
                format!(
                    "writeback {}x{} does not match plane {}x{}",
                    output.width(),
                    output.height(),
                    input.width(),
                    input.height()
                ),
            ));
        }
        for fb in [input, output] {
            if !fb.format().is_decodable() {
                return Err(KmsError::invalid(
                    OP,
                    Errno::Einval,
                    format!("format {} not supported for writeback", fb.format()),
                ));
            }
        }
        if flags.test_only {
            return Ok(None);
        }

        let mut rendered = output.clone();
        render(input, &mut rendered, &stages)?;
        if let Some(slot) = self.buffers.get_mut(&wb_handle) {
            slot.contents = Some(rendered);
        }
        self.modeset_done = true;
        self.writeback_fb = None;

        let fence = Fence(self.next_fence);
        self.next_fence += 1;
        self.pending_fences.insert(fence.0);
        debug!(fence = fence.0, stages = stages.len(), "committed writeback");
        Ok(Some(fence))
    }

    fn wait_fence(&mut self, fence: Fence, timeout: Duration) -> KmsResult<()> {
        // A fence is consumed by its first wait, signaled or not.
        if !self.pending_fences.remove(&fence.0) {
            return Err(KmsError::invalid(
                "wait_fence",
                Errno::Enoent,
                format!("no pending fence {}", fence.0),
            ));
        }
        if self.stall_after.is_some_and(|n| fence.0 > n) {
            return Err(KmsError::FenceTimeout {
                fence: fence.0,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }
}
