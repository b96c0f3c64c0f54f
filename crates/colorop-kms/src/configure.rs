//! Programming and tearing down a mapped pipeline.

use crate::catalog::cube;
use crate::descriptor::{ColorOpDescriptor, ColoropParams, clear_bindings};
use crate::display::{ColoropId, ColoropProperty, ColoropType, DisplayControl, PlaneId, colorop_type, next_colorop};
use crate::encode::{
    ctm_3x3_blob, ctm_3x4_blob, custom_lut1d_entries, find_lut3d_mode, lut_blob, lut3d_blob,
    multiplier_32_32, parse_lut3d_modes,
};
use crate::{Errno, KmsError, KmsResult};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Nodes of the chain at `head`, in order.
fn chain_nodes<D>(display: &D, head: ColoropId) -> KmsResult<Vec<ColoropId>>
where
    D: DisplayControl + ?Sized,
{
    let mut nodes = Vec::new();
    let mut seen = BTreeSet::new();
    let mut cursor = Some(head);
    while let Some(id) = cursor {
        if !seen.insert(id) {
            return Err(KmsError::invalid(
                "chain_nodes",
                Errno::Einval,
                format!("pipeline {} loops at colorop {}", head, id),
            ));
        }
        nodes.push(id);
        cursor = next_colorop(display, id)?;
    }
    Ok(nodes)
}

/// Selects the pipeline at `head` on `plane` and programs every bound
/// colorop. Every node of the chain is set to bypass first; bound nodes
/// are then enabled with their encoded parameters.
///
/// A descriptor without a binding fails with `EINVAL`. A 3D LUT whose mode
/// is not advertised by its node fails with [`KmsError::NoLut3dMode`].
pub fn configure_pipeline<D>(
    display: &mut D,
    plane: PlaneId,
    head: ColoropId,
    ops: &[ColorOpDescriptor],
) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    display.set_plane_color_pipeline(plane, Some(head))?;
    for id in chain_nodes(display, head)? {
        display.set_node_property(id, ColoropProperty::Bypass, 1)?;
    }
    for op in ops {
        let id = op.bound.ok_or_else(|| {
            KmsError::invalid(
                "configure_pipeline",
                Errno::Einval,
                format!("colorop {} is not bound", op.name),
            )
        })?;
        program_colorop(display, id, op)?;
        display.set_node_property(id, ColoropProperty::Bypass, 0)?;
        debug!(colorop = %id, op = op.name, "programmed");
    }
    Ok(())
}

fn program_colorop<D>(display: &mut D, id: ColoropId, op: &ColorOpDescriptor) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    match op.params {
        ColoropParams::Curve(curve) => {
            display.set_node_property_enum(id, ColoropProperty::Curve1DType, curve.hw_name())
        }
        ColoropParams::CustomLut1D => {
            let size = display.get_node_property(id, ColoropProperty::Size)? as usize;
            let entries = custom_lut1d_entries(op.transform, size);
            display.replace_node_blob_property(id, ColoropProperty::Data, &lut_blob(&entries))
        }
        ColoropParams::Ctm3x3(m) => {
            display.replace_node_blob_property(id, ColoropProperty::Data, &ctm_3x3_blob(m))
        }
        ColoropParams::Ctm3x4(m) => {
            display.replace_node_blob_property(id, ColoropProperty::Data, &ctm_3x4_blob(m))
        }
        ColoropParams::Multiplier(v) => {
            display.set_node_property(id, ColoropProperty::Multiplier, multiplier_32_32(v))
        }
        ColoropParams::Lut3D { lut, mode } => {
            let modes = parse_lut3d_modes(
                &display.get_node_blob_property(id, ColoropProperty::Lut3dModes)?,
            )?;
            let index = find_lut3d_mode(&modes, &mode).ok_or_else(|| KmsError::NoLut3dMode {
                colorop: id,
                wanted: mode.to_string(),
            })?;
            let blob = lut3d_blob(cube(lut)?, &mode)?;
            display.set_node_property(id, ColoropProperty::Lut3dModeIndex, index as u64)?;
            display.replace_node_blob_property(id, ColoropProperty::Data, &blob)
        }
    }
}

/// Returns the pipeline at `head` to its idle state: every node bypassed,
/// parameter blobs cleared, the plane's COLOR_PIPELINE set to `Bypass` and
/// every binding in `ops` cleared.
///
/// Teardown continues past individual failures, which are logged; the
/// first one is returned.
pub fn reset_pipeline_to_bypass<D>(
    display: &mut D,
    plane: PlaneId,
    head: ColoropId,
    ops: &mut [ColorOpDescriptor],
) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    let mut first_err = None;
    let mut note = |result: KmsResult<()>, what: &str| {
        if let Err(e) = result {
            warn!(error = %e, "reset: {}", what);
            first_err.get_or_insert(e);
        }
    };

    match chain_nodes(display, head) {
        Ok(nodes) => {
            for id in nodes {
                note(
                    display.set_node_property(id, ColoropProperty::Bypass, 1),
                    "bypass",
                );
                match colorop_type(display, id) {
                    Ok(ColoropType::Lut1D | ColoropType::Ctm3x3 | ColoropType::Ctm3x4 | ColoropType::Lut3D) => {
                        note(
                            display.replace_node_blob_property(id, ColoropProperty::Data, &[]),
                            "clear data",
                        );
                    }
                    Ok(_) => {}
                    Err(e) => note(Err(e), "read type"),
                }
            }
        }
        Err(e) => note(Err(e), "walk pipeline"),
    }
    note(display.set_plane_color_pipeline(plane, None), "plane bypass");
    clear_bindings(ops);

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
