//! CLI command implementations

pub mod eval;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use colorop_kms::TestPlan;
use std::path::Path;

/// Loads a plan file, or the default plan.
pub fn load_plan(path: Option<&Path>) -> Result<TestPlan> {
    match path {
        Some(path) => TestPlan::from_file(path)
            .with_context(|| format!("Failed to load plan: {}", path.display())),
        None => Ok(TestPlan::default()),
    }
}
