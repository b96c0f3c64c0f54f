//! Test plan runner

use crate::RunArgs;
use anyhow::{Result, bail};
use colorop_kms::{DisplayControl, TestOutcome, TestReport, run_plan};
use tracing::{info, warn};

/// Outcome counts of a plan run.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    pass: usize,
    skip: usize,
    fail: usize,
}

impl Summary {
    fn of(reports: &[TestReport]) -> Self {
        let mut s = Self::default();
        for report in reports {
            match report.outcome {
                TestOutcome::Pass => s.pass += 1,
                TestOutcome::Skip(_) => s.skip += 1,
                TestOutcome::Fail(_) => s.fail += 1,
            }
        }
        s
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut plan = super::load_plan(args.config.as_deref())?;
    if let Some(w) = args.width {
        plan.width = w;
    }
    if let Some(h) = args.height {
        plan.height = h;
    }
    if args.dump_dir.is_some() {
        plan.dump_dir = args.dump_dir;
    }
    plan.validate()?;

    let mut vdisplay = plan.virtual_display()?;
    info!(
        driver = vdisplay.driver_name(),
        size = %format!("{}x{}", plan.width, plan.height),
        format = %plan.format,
        tests = plan.tests.len(),
        filter = args.filter.as_deref().unwrap_or("*"),
        "running plan"
    );
    let reports = run_plan(&mut vdisplay, &plan, args.filter.as_deref())?;

    for report in &reports {
        println!("{:<48} {}", report.name, report.outcome);
    }
    let summary = Summary::of(&reports);
    println!("\n{} passed, {} skipped, {} failed", summary.pass, summary.skip, summary.fail);

    if reports.is_empty() {
        warn!(filter = args.filter.as_deref().unwrap_or("*"), "no test matched");
    }
    if summary.fail > 0 {
        bail!("{} test(s) failed", summary.fail);
    }
    info!(pass = summary.pass, skip = summary.skip, "plan finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: TestOutcome) -> TestReport {
        TestReport {
            name: name.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let reports = [
            report("a", TestOutcome::Pass),
            report("b", TestOutcome::Skip("no writeback".into())),
            report("c", TestOutcome::Pass),
            report("d", TestOutcome::Fail("mismatch".into())),
        ];
        assert_eq!(Summary::of(&reports), Summary { pass: 2, skip: 1, fail: 1 });
        assert_eq!(Summary::of(&[]), Summary::default());
    }
}
