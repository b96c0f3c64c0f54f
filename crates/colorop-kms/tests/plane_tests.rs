//! End-to-end plane tests on the virtual display.

use approx::assert_abs_diff_eq;
use colorop_core::{DrmFormat, Pixel, PixelBuffer};
use colorop_kms::catalog::descriptors;
use colorop_kms::{
    ColoropId, ColoropType, DisplayControl, KmsError, Lut3dMode, NodeSpec, PlaneTestOptions,
    TestOutcome, TestPlan, Tolerance, Topology, VirtualDisplay, apply_software_transform,
    run_plan, run_plane_test,
};

fn vkms_opts() -> PlaneTestOptions {
    PlaneTestOptions {
        tolerance: Tolerance::new(1, 1),
        size: Some((48, 16)),
        ..Default::default()
    }
}

fn run(display: &mut VirtualDisplay, names: &[&str]) -> Result<(), KmsError> {
    let mut ops = descriptors(names).unwrap();
    let result = run_plane_test(display, &mut ops, &vkms_opts());
    assert!(ops.iter().all(|op| op.bound.is_none()), "bindings left after test");
    result
}

fn assert_idle(display: &VirtualDisplay) {
    assert_eq!(display.buffer_count(), 0, "framebuffers leaked");
    assert_eq!(display.plane_color_pipeline(display.primary_plane()), None);
    let heads = display.enumerate_color_pipelines(display.primary_plane()).unwrap();
    for head in heads {
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            assert_eq!(display.node_bypass(id), Some(true), "colorop {} enabled", id);
            cursor = colorop_kms::display::next_colorop(display, id).unwrap();
        }
    }
}

#[test]
fn srgb_eotf_midgray() {
    let input = PixelBuffer::from_fn(2, 2, DrmFormat::Xrgb2101010, |_, _| Pixel::gray(0.5)).unwrap();
    let ops = descriptors(&["srgb_eotf"]).unwrap();
    let out = apply_software_transform(&input, &ops).unwrap();
    // 0.5 -> 512/1023, whose EOTF is about 0.2143
    let p = out.pixel(1, 1).unwrap();
    assert_abs_diff_eq!(p.r, 0.214, epsilon = 2e-3);
    assert_eq!(p.r, p.b);

    let mut display = VirtualDisplay::new();
    run(&mut display, &["srgb_eotf"]).unwrap();
    assert_idle(&display);
}

#[test]
fn srgb_eotf_inverse_is_identity() {
    let input = PixelBuffer::from_fn(16, 4, DrmFormat::Xrgb8888, |x, y| {
        Pixel::new(x as f32 / 15.0, y as f32 / 3.0, 0.5)
    })
    .unwrap();
    let ops = descriptors(&["srgb_eotf", "srgb_inv_eotf"]).unwrap();
    let out = apply_software_transform(&input, &ops).unwrap();
    assert!(colorop_kms::compare_buffers(&input, &out, 0, 0).unwrap());

    let mut display = VirtualDisplay::new();
    run(&mut display, &["srgb_eotf", "srgb_inv_eotf"]).unwrap();
}

#[test]
fn bt709_encode_decode_red() {
    let input = PixelBuffer::from_fn(1, 1, DrmFormat::Xrgb8888, |_, _| Pixel::new(1.0, 0.0, 0.0)).unwrap();
    let ops = descriptors(&["ctm_3x4_bt709_enc", "ctm_3x4_bt709_dec"]).unwrap();
    let out = apply_software_transform(&input, &ops).unwrap();
    assert_eq!(out.raw(0, 0).unwrap(), 0x00ff_0000);

    let mut display = VirtualDisplay::new();
    run(&mut display, &["ctm_3x4_bt709_enc", "ctm_3x4_bt709_dec"]).unwrap();
}

#[test]
fn default_plan_passes_on_virtual_display() {
    let plan = TestPlan {
        width: 34,
        height: 18,
        ..TestPlan::default()
    };
    let mut display = plan.virtual_display().unwrap();
    let reports = run_plan(&mut display, &plan, None).unwrap();
    assert_eq!(reports.len(), plan.tests.len());
    for report in &reports {
        assert_eq!(report.outcome, TestOutcome::Pass, "{}", report.name);
    }
    assert_idle(&display);
}

#[test]
fn ten_bit_framebuffers() {
    let mut display = VirtualDisplay::new();
    let mut ops = descriptors(&["srgb_eotf", "ctm_3x4_50_desat", "srgb_inv_eotf"]).unwrap();
    let opts = PlaneTestOptions {
        format: DrmFormat::Xrgb2101010,
        ..vkms_opts()
    };
    run_plane_test(&mut display, &mut ops, &opts).unwrap();
}

#[test]
fn plan_filter_selects_tests() {
    let plan = TestPlan {
        width: 8,
        height: 8,
        ..TestPlan::default()
    };
    let mut display = plan.virtual_display().unwrap();
    let reports = run_plan(&mut display, &plan, Some("ctm_3x4")).unwrap();
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|r| r.name.contains("ctm_3x4")));
}

#[test]
fn exact_tolerance_reports_lut_rounding() {
    // The custom LUT is sampled at i/size but read back at i/(size-1), so a
    // short LUT drifts visibly from the closed-form curve.
    let topology = Topology::single_pipeline(vec![NodeSpec {
        size: Some(16),
        ..NodeSpec::new(ColoropType::Lut1D)
    }]);
    let mut display = VirtualDisplay::new().with_topology(&topology).unwrap();
    let mut ops = descriptors(&["lut1d_srgb_eotf"]).unwrap();
    let opts = PlaneTestOptions {
        tolerance: Tolerance::EXACT,
        size: Some((64, 4)),
        ..Default::default()
    };
    let err = run_plane_test(&mut display, &mut ops, &opts).unwrap_err();
    match err {
        KmsError::Mismatch { count, diffs, .. } => {
            assert!(count > 0);
            assert!(!diffs.is_empty());
        }
        other => panic!("expected mismatch, got {other}"),
    }
    assert_idle(&display);
}

#[test]
fn mismatch_dumps_buffers_to_png() {
    let topology = Topology::single_pipeline(vec![NodeSpec {
        size: Some(16),
        ..NodeSpec::new(ColoropType::Lut1D)
    }]);
    let mut display = VirtualDisplay::new().with_topology(&topology).unwrap();
    let mut ops = descriptors(&["lut1d_srgb_eotf"]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let opts = PlaneTestOptions {
        size: Some((64, 4)),
        dump_dir: Some(dir.path().join("dumps")),
        ..Default::default()
    };
    let err = run_plane_test(&mut display, &mut ops, &opts).unwrap_err();
    assert!(matches!(err, KmsError::Mismatch { .. }), "{err}");
    assert_idle(&display);

    for kind in ["input", "output", "reference"] {
        let path = dir.path().join("dumps").join(format!("lut1d_srgb_eotf-{kind}.png"));
        let file = std::fs::File::open(&path).unwrap();
        let reader = png::Decoder::new(std::io::BufReader::new(file)).read_info().unwrap();
        assert_eq!((reader.info().width, reader.info().height), (64, 4), "{}", path.display());
    }
}

#[test]
fn passing_test_writes_no_dump() {
    let mut display = VirtualDisplay::new();
    let mut ops = descriptors(&["srgb_eotf", "srgb_inv_eotf"]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let opts = PlaneTestOptions {
        dump_dir: Some(dir.path().to_path_buf()),
        ..vkms_opts()
    };
    run_plane_test(&mut display, &mut ops, &opts).unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn skip_without_writeback() {
    let mut display = VirtualDisplay::new().without_writeback();
    let err = run(&mut display, &["srgb_eotf"]).unwrap_err();
    assert!(matches!(err, KmsError::NoWriteback));
    assert!(err.is_skip());
}

#[test]
fn skip_unsupported_format() {
    let mut display = VirtualDisplay::new();
    let mut ops = descriptors(&["srgb_eotf"]).unwrap();
    let opts = PlaneTestOptions {
        format: DrmFormat::Argb8888,
        ..vkms_opts()
    };
    let err = run_plane_test(&mut display, &mut ops, &opts).unwrap_err();
    assert!(err.is_skip());
    assert_eq!(display.buffer_count(), 0);
}

#[test]
fn skip_when_no_pipeline_matches() {
    let topology = Topology::single(&[ColoropType::Lut1D, ColoropType::Ctm3x3]);
    let mut display = VirtualDisplay::new().with_topology(&topology).unwrap();
    let err = run(&mut display, &["ctm_3x3_50_desat", "lut1d_srgb_eotf"]).unwrap_err();
    assert!(matches!(err, KmsError::NoPipeline { .. }), "{err}");
    assert_idle(&display);

    run(&mut display, &["lut1d_srgb_eotf", "ctm_3x3_50_desat"]).unwrap();
    assert_idle(&display);
}

#[test]
fn skip_when_lut3d_mode_missing() {
    let topology = Topology::single_pipeline(vec![NodeSpec::lut3d(vec![Lut3dMode::packed(9)])]);
    let mut display = VirtualDisplay::new().with_topology(&topology).unwrap();
    let err = run(&mut display, &["lut3d_17_desat"]).unwrap_err();
    assert!(matches!(err, KmsError::NoLut3dMode { .. }), "{err}");
    assert!(err.is_skip());
    assert_idle(&display);
}

#[test]
fn skip_when_plane_has_no_color_pipeline() {
    let mut topology = Topology::default();
    topology.planes[0].color_pipeline = false;
    let mut display = VirtualDisplay::new().with_topology(&topology).unwrap();
    let err = run(&mut display, &["srgb_eotf"]).unwrap_err();
    assert!(matches!(err, KmsError::NoColorPipeline(_)));
    assert_eq!(display.buffer_count(), 0);
}

#[test]
fn fence_timeout_before_mapping_releases_buffers() {
    let mut display = VirtualDisplay::new().stall_fences(true);
    let err = run(&mut display, &["srgb_eotf"]).unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_skip());
    assert_idle(&display);
    assert_eq!(display.pending_fence_count(), 0);
}

#[test]
fn fence_timeout_after_configure_resets_pipeline() {
    let mut display = VirtualDisplay::new().stall_fences_after(1);
    let err = run(&mut display, &["ctm_3x4_overdrive", "lut3d_17_desat"]).unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert_idle(&display);
    assert_eq!(display.node_data_len(ColoropId(3)), Some(0));
    assert_eq!(display.node_data_len(ColoropId(7)), Some(0));
}

#[test]
fn empty_colorop_list_is_skipped() {
    let mut display = VirtualDisplay::new();
    let err = run_plane_test(&mut display, &mut [], &vkms_opts()).unwrap_err();
    assert!(matches!(err, KmsError::EmptyColoropList));
}
