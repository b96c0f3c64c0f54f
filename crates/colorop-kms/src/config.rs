//! YAML test plans.
//!
//! ```yaml
//! driver: vkms
//! width: 64
//! height: 32
//! format: XRGB8888
//! tolerances:
//!   vkms: [1, 1]
//! tests:
//!   - name: srgb_eotf-srgb_inv_eotf
//!     colorops: [srgb_eotf, srgb_inv_eotf]
//! ```
//!
//! Omitted fields take their [`TestPlan::default`] values. Drivers without
//! a tolerance entry are compared exactly.

use crate::catalog::{DEFAULT_TESTS, descriptor};
use crate::compare::Tolerance;
use crate::virtual_display::{Topology, VirtualDisplay};
use crate::{KmsError, KmsResult};
use colorop_core::DrmFormat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One test of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTest {
    /// Test name
    pub name: String,
    /// Catalog names, in pipeline order
    pub colorops: Vec<String>,
}

/// A test plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPlan {
    /// Driver name of the virtual display
    pub driver: String,
    /// Framebuffer width
    pub width: u32,
    /// Framebuffer height
    pub height: u32,
    /// Framebuffer format name
    pub format: String,
    /// Tolerance bracket `[up, down]` per driver
    pub tolerances: BTreeMap<String, [u8; 2]>,
    /// Hardware layout of the virtual display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<Topology>,
    /// Tests, run in order
    pub tests: Vec<PlanTest>,
    /// Directory receiving PNG dumps of mismatching tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            driver: "vkms".to_string(),
            width: 640,
            height: 480,
            format: DrmFormat::Xrgb8888.name().to_string(),
            tolerances: BTreeMap::from([("vkms".to_string(), [1, 1])]),
            topology: None,
            tests: DEFAULT_TESTS
                .iter()
                .map(|(name, ops)| PlanTest {
                    name: name.to_string(),
                    colorops: ops.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
            dump_dir: None,
        }
    }
}

impl TestPlan {
    /// Loads and validates a plan file.
    pub fn from_file(path: impl AsRef<Path>) -> KmsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parses and validates a plan.
    pub fn from_yaml_str(text: &str) -> KmsResult<Self> {
        let plan: Self = serde_yaml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Serializes the plan.
    pub fn to_yaml(&self) -> KmsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks sizes, format, test names and colorop names.
    pub fn validate(&self) -> KmsResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(KmsError::Config(format!("framebuffer size {}x{}", self.width, self.height)));
        }
        self.pixel_format()?;
        let mut names = BTreeSet::new();
        for test in &self.tests {
            if !names.insert(test.name.as_str()) {
                return Err(KmsError::Config(format!("duplicate test {:?}", test.name)));
            }
            if let Some(unknown) = test.colorops.iter().find(|op| descriptor(op).is_none()) {
                return Err(KmsError::Config(format!(
                    "test {:?}: unknown colorop {:?}",
                    test.name, unknown
                )));
            }
        }
        Ok(())
    }

    /// Parsed framebuffer format.
    pub fn pixel_format(&self) -> KmsResult<DrmFormat> {
        DrmFormat::from_name(&self.format).map_err(|e| KmsError::Config(e.to_string()))
    }

    /// Tolerance bracket for `driver`; exact when not listed.
    pub fn tolerance_for(&self, driver: &str) -> Tolerance {
        self.tolerances.get(driver).map(|&t| t.into()).unwrap_or_default()
    }

    /// A virtual display configured from this plan.
    pub fn virtual_display(&self) -> KmsResult<VirtualDisplay> {
        let display = VirtualDisplay::new()
            .with_driver_name(&self.driver)
            .with_mode(self.width, self.height);
        match &self.topology {
            Some(topology) => display.with_topology(topology),
            None => Ok(display),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_valid() {
        let plan = TestPlan::default();
        plan.validate().unwrap();
        assert_eq!(plan.tolerance_for("vkms"), Tolerance::new(1, 1));
        assert_eq!(plan.tolerance_for("amdgpu"), Tolerance::EXACT);
        assert_eq!(plan.tests.len(), DEFAULT_TESTS.len());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let plan = TestPlan::from_yaml_str("width: 32\nheight: 8\n").unwrap();
        assert_eq!((plan.width, plan.height), (32, 8));
        assert_eq!(plan.driver, "vkms");
        assert!(!plan.tests.is_empty());
    }

    #[test]
    fn test_unknown_colorop_rejected() {
        let yaml = "tests:\n  - name: bad\n    colorops: [srgb_eotf, sepia]\n";
        let err = TestPlan::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("sepia"));
    }

    #[test]
    fn test_bad_format_rejected() {
        assert!(matches!(
            TestPlan::from_yaml_str("format: NV12\n"),
            Err(KmsError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let plan = TestPlan::default();
        let back = TestPlan::from_yaml_str(&plan.to_yaml().unwrap()).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_topology_from_yaml() {
        let yaml = "\
topology:
  planes:
    - pipelines:
        - - type: 1D LUT
            size: 256
          - type: 3x3 Matrix
tests:
  - name: ctm
    colorops: [ctm_3x3_50_desat]
";
        let plan = TestPlan::from_yaml_str(yaml).unwrap();
        let topology = plan.topology.as_ref().unwrap();
        assert_eq!(topology.planes[0].pipelines[0].len(), 2);
        assert_eq!(topology.planes[0].pipelines[0][0].size, Some(256));
        assert!(plan.virtual_display().is_ok());
    }
}
