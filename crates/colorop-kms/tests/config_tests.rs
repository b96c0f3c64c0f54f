//! Integration tests for YAML test plans.

use colorop_kms::{
    ColoropType, KmsError, NodeSpec, PlanTest, TestOutcome, TestPlan, Tolerance, Topology,
    run_plan,
};
use std::collections::BTreeMap;
use std::io::Write;

const PLAN: &str = r#"
driver: vkms
width: 24
height: 12
format: XRGB2101010
tolerances:
  vkms: [1, 1]
topology:
  planes:
    - pipelines:
        - - type: 1D Curve
            curves: [sRGB EOTF, sRGB Inverse EOTF]
          - type: 3x4 Matrix
          - type: 1D Curve
tests:
  - name: srgb-roundtrip
    colorops: [srgb_eotf, srgb_inv_eotf]
  - name: desat
    colorops: [srgb_eotf, ctm_3x4_50_desat, srgb_inv_eotf]
  - name: lut3d
    colorops: [lut3d_17_desat]
"#;

#[test]
fn plan_file_runs_with_custom_topology() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PLAN.as_bytes()).unwrap();

    let plan = TestPlan::from_file(file.path()).unwrap();
    assert_eq!(plan.tests.len(), 3);
    assert_eq!(plan.tolerance_for("vkms"), Tolerance::new(1, 1));
    let topology = plan.topology.as_ref().unwrap();
    assert_eq!(topology.planes[0].pipelines[0][1].node_type, ColoropType::Ctm3x4);

    let mut display = plan.virtual_display().unwrap();
    let reports = run_plan(&mut display, &plan, None).unwrap();
    let outcomes: Vec<_> = reports.iter().map(|r| &r.outcome).collect();
    assert_eq!(outcomes[0], &TestOutcome::Pass);
    assert_eq!(outcomes[1], &TestOutcome::Pass);
    // No 3D LUT node in this topology.
    assert!(matches!(outcomes[2], TestOutcome::Skip(_)));
}

#[test]
fn plan_round_trips_through_yaml() {
    let plan = TestPlan::from_yaml_str(PLAN).unwrap();
    let text = plan.to_yaml().unwrap();
    assert_eq!(TestPlan::from_yaml_str(&text).unwrap(), plan);
}

#[test]
fn omitted_fields_take_defaults() {
    let plan = TestPlan::from_yaml_str("width: 16\nheight: 16\n").unwrap();
    assert_eq!(plan.driver, "vkms");
    assert_eq!(plan.tests, TestPlan::default().tests);
    assert!(plan.topology.is_none());
}

#[test]
fn plan_dump_dir_collects_failing_tests() {
    let dir = tempfile::tempdir().unwrap();
    let plan = TestPlan::from_yaml_str(&format!("dump_dir: {}\n", dir.path().display())).unwrap();
    assert_eq!(plan.dump_dir.as_deref(), Some(dir.path()));

    let plan = TestPlan {
        width: 64,
        height: 4,
        tolerances: BTreeMap::new(),
        topology: Some(Topology::single_pipeline(vec![NodeSpec {
            size: Some(16),
            ..NodeSpec::new(ColoropType::Lut1D)
        }])),
        tests: vec![PlanTest {
            name: "short-lut".to_string(),
            colorops: vec!["lut1d_srgb_eotf".to_string()],
        }],
        ..plan
    };
    let mut display = plan.virtual_display().unwrap();
    let reports = run_plan(&mut display, &plan, None).unwrap();
    assert!(reports[0].outcome.is_failure());
    let mut names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            "lut1d_srgb_eotf-input.png",
            "lut1d_srgb_eotf-output.png",
            "lut1d_srgb_eotf-reference.png"
        ]
    );
}

#[test]
fn unknown_driver_is_compared_exactly() {
    let plan = TestPlan::default();
    assert_eq!(plan.tolerance_for("amdgpu"), Tolerance::EXACT);
}

#[test]
fn invalid_plans_are_rejected() {
    let bad = [
        "width: 0\n",
        "format: NV12\n",
        "tests:\n  - {name: a, colorops: [srgb_eotf]}\n  - {name: a, colorops: [srgb_eotf]}\n",
        "tests:\n  - {name: a, colorops: [no_such_op]}\n",
    ];
    for text in bad {
        let err = TestPlan::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, KmsError::Config(_)), "{text}: {err}");
    }
}

#[test]
fn missing_plan_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TestPlan::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, KmsError::Io(_)));
}
