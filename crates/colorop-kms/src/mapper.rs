//! Pipeline mapper.
//!
//! A plane exposes one or more candidate color pipelines, each a chain of
//! hardware colorop nodes linked through `NEXT`. The mapper walks a chain
//! once, binding each requested colorop to the first node able to realize
//! it and skipping the nodes in between. Requests are never reordered and
//! a binding is never revisited, so a chain where a different assignment
//! would have worked can still fail to map.
//!
//! Discovery snapshots the driver state into a [`PipelineGraph`], an arena
//! of [`ColoropNode`]s keyed by id, so the walk never holds references
//! into the driver.

use crate::descriptor::{ColorOpDescriptor, ColoropParams, Curve, clear_bindings, op_names};
use crate::display::{
    ColoropId, ColoropProperty, ColoropType, DisplayControl, PlaneId, colorop_type, next_colorop,
};
use crate::{Errno, KmsError, KmsResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Snapshot of one hardware colorop node.
#[derive(Debug, Clone, PartialEq)]
pub struct ColoropNode {
    /// Node id
    pub id: ColoropId,
    /// Hardware type
    pub node_type: ColoropType,
    /// Curves selectable on a `1D Curve` node
    pub curves: BTreeSet<String>,
    /// Following node
    pub next: Option<ColoropId>,
    /// Bypass flag at discovery time
    pub bypass: bool,
}

impl ColoropNode {
    /// Returns `true` if this node can realize `desc`.
    pub fn can_realize(&self, desc: &ColorOpDescriptor) -> bool {
        if desc.kind().hardware_type() != self.node_type {
            return false;
        }
        match desc.params {
            ColoropParams::Curve(curve) => self.supports_curve(curve),
            _ => true,
        }
    }

    /// Returns `true` if the curve enum of this node lists `curve`.
    pub fn supports_curve(&self, curve: Curve) -> bool {
        self.node_type == ColoropType::Curve1D && self.curves.contains(curve.hw_name())
    }
}

/// Arena of the colorop nodes reachable from a plane.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    nodes: BTreeMap<ColoropId, ColoropNode>,
    heads: Vec<ColoropId>,
}

impl PipelineGraph {
    /// Reads every candidate pipeline of `plane` from the driver.
    ///
    /// Fails with `EINVAL` if a chain loops back on itself.
    pub fn discover<D>(display: &D, plane: PlaneId) -> KmsResult<Self>
    where
        D: DisplayControl + ?Sized,
    {
        if !display.plane_has_color_pipeline(plane) {
            return Err(KmsError::NoColorPipeline(plane));
        }
        let mut graph = Self {
            heads: display.enumerate_color_pipelines(plane)?,
            ..Self::default()
        };
        for head in graph.heads.clone() {
            let mut seen = BTreeSet::new();
            let mut cursor = Some(head);
            while let Some(id) = cursor {
                if !seen.insert(id) {
                    return Err(KmsError::invalid(
                        "discover",
                        Errno::Einval,
                        format!("pipeline {} loops at colorop {}", head, id),
                    ));
                }
                let node = match graph.nodes.get(&id) {
                    Some(node) => node.clone(),
                    None => {
                        let node = read_node(display, id)?;
                        graph.nodes.insert(id, node.clone());
                        node
                    }
                };
                trace!(pipeline = %head, colorop = %id, node_type = %node.node_type, "discovered");
                cursor = node.next;
            }
        }
        Ok(graph)
    }

    /// Builds a graph from nodes and heads directly.
    pub fn from_nodes(nodes: impl IntoIterator<Item = ColoropNode>, heads: Vec<ColoropId>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            heads,
        }
    }

    /// Candidate pipeline heads in driver order.
    pub fn heads(&self) -> &[ColoropId] {
        &self.heads
    }

    /// Node by id.
    pub fn node(&self, id: ColoropId) -> Option<&ColoropNode> {
        self.nodes.get(&id)
    }

    /// Nodes of the chain starting at `head`, in order.
    pub fn chain(&self, head: ColoropId) -> impl Iterator<Item = &ColoropNode> + '_ {
        let mut cursor = Some(head);
        let mut remaining = self.nodes.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let node = self.nodes.get(&cursor?)?;
            cursor = node.next;
            Some(node)
        })
    }

    /// Greedily binds `ops` along the chain at `head`.
    ///
    /// Returns `true` on success. On failure every binding in `ops` is
    /// cleared.
    pub fn map_chain(&self, head: ColoropId, ops: &mut [ColorOpDescriptor]) -> bool {
        let mut cursor = 0;
        for node in self.chain(head) {
            let Some(op) = ops.get_mut(cursor) else {
                break;
            };
            if node.can_realize(op) {
                trace!(colorop = %node.id, op = op.name, "bound");
                op.bound = Some(node.id);
                cursor += 1;
            } else {
                trace!(colorop = %node.id, op = op.name, "skipped");
            }
        }
        if cursor == ops.len() {
            return true;
        }
        clear_bindings(ops);
        false
    }

    /// Tries every candidate pipeline in order; the first that maps wins.
    pub fn map(&self, plane: PlaneId, ops: &mut [ColorOpDescriptor]) -> KmsResult<ColoropId> {
        if ops.is_empty() {
            return Err(KmsError::EmptyColoropList);
        }
        clear_bindings(ops);
        for &head in &self.heads {
            if self.map_chain(head, ops) {
                debug!(plane = %plane, pipeline = %head, ops = %op_names(ops), "mapped");
                return Ok(head);
            }
            debug!(plane = %plane, pipeline = %head, "pipeline cannot realize colorops");
        }
        Err(KmsError::NoPipeline {
            plane,
            ops: op_names(ops),
        })
    }
}

fn read_node<D>(display: &D, id: ColoropId) -> KmsResult<ColoropNode>
where
    D: DisplayControl + ?Sized,
{
    let node_type = colorop_type(display, id)?;
    let curves = if node_type == ColoropType::Curve1D {
        display
            .node_property_enum_names(id, ColoropProperty::Curve1DType)?
            .into_iter()
            .collect()
    } else {
        BTreeSet::new()
    };
    Ok(ColoropNode {
        id,
        node_type,
        curves,
        next: next_colorop(display, id)?,
        bypass: display.get_node_property(id, ColoropProperty::Bypass)? != 0,
    })
}

/// Finds a pipeline of `plane` able to realize `ops`, in order, and binds
/// each descriptor to its node.
///
/// Fails with [`KmsError::EmptyColoropList`] for an empty list and
/// [`KmsError::NoPipeline`] when no candidate maps. Both are skips.
pub fn map_hardware_pipeline<D>(
    display: &D,
    plane: PlaneId,
    ops: &mut [ColorOpDescriptor],
) -> KmsResult<ColoropId>
where
    D: DisplayControl + ?Sized,
{
    if ops.is_empty() {
        return Err(KmsError::EmptyColoropList);
    }
    let graph = PipelineGraph::discover(display, plane)?;
    graph.map(plane, ops)
}

/// Kinds of a chain's nodes, for diagnostics.
pub fn chain_kinds(graph: &PipelineGraph, head: ColoropId) -> Vec<ColoropType> {
    graph.chain(head).map(|n| n.node_type).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptors;

    fn node(id: u32, node_type: ColoropType, next: u32) -> ColoropNode {
        let curves = match node_type {
            ColoropType::Curve1D => Curve::ALL.iter().map(|c| c.hw_name().to_string()).collect(),
            _ => BTreeSet::new(),
        };
        ColoropNode {
            id: ColoropId(id),
            node_type,
            curves,
            next: (next != 0).then_some(ColoropId(next)),
            bypass: true,
        }
    }

    fn graph(types: &[ColoropType]) -> PipelineGraph {
        let n = types.len() as u32;
        let nodes = types
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let id = i as u32 + 1;
                node(id, t, if id < n { id + 1 } else { 0 })
            });
        PipelineGraph::from_nodes(nodes, vec![ColoropId(1)])
    }

    #[test]
    fn test_order_respected() {
        let g = graph(&[ColoropType::Lut1D, ColoropType::Ctm3x3]);
        let mut ops = descriptors(&["ctm_3x3_50_desat", "lut1d_srgb_eotf"]).unwrap();
        assert!(g.map(PlaneId(1), &mut ops).unwrap_err().is_skip());
        assert!(ops.iter().all(|op| op.bound.is_none()));

        let mut ops = descriptors(&["lut1d_srgb_eotf", "ctm_3x3_50_desat"]).unwrap();
        assert_eq!(g.map(PlaneId(1), &mut ops).unwrap(), ColoropId(1));
        assert_eq!(ops[0].bound, Some(ColoropId(1)));
        assert_eq!(ops[1].bound, Some(ColoropId(2)));
    }

    #[test]
    fn test_skips_incapable_nodes() {
        let g = graph(&[
            ColoropType::Curve1D,
            ColoropType::Ctm3x4,
            ColoropType::Multiplier,
            ColoropType::Curve1D,
        ]);
        let mut ops = descriptors(&["srgb_eotf", "srgb_inv_eotf"]).unwrap();
        g.map(PlaneId(1), &mut ops).unwrap();
        assert_eq!(ops[0].bound, Some(ColoropId(1)));
        assert_eq!(ops[1].bound, Some(ColoropId(4)));
    }

    #[test]
    fn test_greedy_first_capable_node() {
        let g = graph(&[ColoropType::Ctm3x4, ColoropType::Ctm3x4]);
        let mut ops = descriptors(&["ctm_3x4_overdrive"]).unwrap();
        g.map(PlaneId(1), &mut ops).unwrap();
        assert_eq!(ops[0].bound, Some(ColoropId(1)));
    }

    #[test]
    fn test_curve_name_must_match() {
        let mut nodes = vec![node(1, ColoropType::Curve1D, 0)];
        nodes[0].curves = ["sRGB EOTF".to_string()].into();
        let g = PipelineGraph::from_nodes(nodes, vec![ColoropId(1)]);
        let mut ops = descriptors(&["srgb_inv_eotf"]).unwrap();
        assert!(g.map(PlaneId(1), &mut ops).is_err());
        let mut ops = descriptors(&["srgb_eotf"]).unwrap();
        assert!(g.map(PlaneId(1), &mut ops).is_ok());
    }

    #[test]
    fn test_second_pipeline_wins() {
        let nodes = vec![
            node(1, ColoropType::Ctm3x3, 0),
            node(10, ColoropType::Lut3D, 0),
        ];
        let g = PipelineGraph::from_nodes(nodes, vec![ColoropId(1), ColoropId(10)]);
        let mut ops = descriptors(&["lut3d_17_desat"]).unwrap();
        assert_eq!(g.map(PlaneId(1), &mut ops).unwrap(), ColoropId(10));
        assert_eq!(ops[0].bound, Some(ColoropId(10)));
    }

    #[test]
    fn test_empty_list() {
        let g = graph(&[ColoropType::Ctm3x3]);
        let err = g.map(PlaneId(1), &mut []).unwrap_err();
        assert!(matches!(err, KmsError::EmptyColoropList));
    }

    #[test]
    fn test_deterministic() {
        let g = graph(&[
            ColoropType::Curve1D,
            ColoropType::Ctm3x4,
            ColoropType::Ctm3x4,
            ColoropType::Curve1D,
        ]);
        let names = ["srgb_eotf", "ctm_3x4_bt709_enc", "ctm_3x4_bt709_dec", "srgb_inv_eotf"];
        let mut first = descriptors(&names).unwrap();
        g.map(PlaneId(1), &mut first).unwrap();
        for _ in 0..8 {
            let mut again = descriptors(&names).unwrap();
            g.map(PlaneId(1), &mut again).unwrap();
            let a: Vec<_> = first.iter().map(|d| d.bound).collect();
            let b: Vec<_> = again.iter().map(|d| d.bound).collect();
            assert_eq!(a, b);
        }
        assert_eq!(chain_kinds(&g, ColoropId(1)).len(), 4);
    }
}
