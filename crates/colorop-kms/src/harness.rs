//! Plane color-pipeline test flow.
//!
//! One test paints a pattern into a framebuffer, checks that the plane
//! passes it through unchanged in bypass, then programs the hardware
//! pipeline for a colorop list and compares the writeback output with the
//! software reference. Every framebuffer and pipeline binding acquired on
//! the way is released before returning, whatever the outcome.

use crate::compare::{Tolerance, assert_match};
use crate::config::TestPlan;
use crate::configure::{configure_pipeline, reset_pipeline_to_bypass};
use crate::descriptor::{ColorOpDescriptor, op_names};
use crate::display::{
    BufferHandle, ColoropId, CommitFlags, DisplayControl, FENCE_TIMEOUT, WritebackOutput, with_mapped,
};
use crate::dump::dump_mismatch;
use crate::mapper::map_hardware_pipeline;
use crate::transform::apply_software_transform;
use crate::{Errno, KmsError, KmsResult, catalog};
use colorop_core::{DrmFormat, MOD_LINEAR, Pixel, PixelBuffer};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Parameters of one plane test.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneTestOptions {
    /// Framebuffer format
    pub format: DrmFormat,
    /// Accepted hardware deviation
    pub tolerance: Tolerance,
    /// Framebuffer size; the writeback mode size when `None`
    pub size: Option<(u32, u32)>,
    /// Directory receiving PNG dumps of mismatching tests
    pub dump_dir: Option<PathBuf>,
}

impl Default for PlaneTestOptions {
    fn default() -> Self {
        Self {
            format: DrmFormat::Xrgb8888,
            tolerance: Tolerance::EXACT,
            size: None,
            dump_dir: None,
        }
    }
}

/// Result of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// Hardware matched the software reference
    Pass,
    /// Not applicable on this display
    Skip(String),
    /// Hard failure
    Fail(String),
}

impl TestOutcome {
    /// Classifies a test result.
    pub fn from_result(result: &KmsResult<()>) -> Self {
        match result {
            Ok(()) => Self::Pass,
            Err(e) if e.is_skip() => Self::Skip(e.to_string()),
            Err(e) => Self::Fail(e.to_string()),
        }
    }

    /// Returns `true` for [`TestOutcome::Fail`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Skip(why) => write!(f, "SKIP ({})", why),
            Self::Fail(why) => write!(f, "FAIL ({})", why),
        }
    }
}

/// Named outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Test name
    pub name: String,
    /// Outcome
    pub outcome: TestOutcome,
}

/// Deterministic test pattern: horizontal red ramp, vertical green ramp
/// and a blue sawtooth.
pub fn test_pattern(x: u32, y: u32, width: u32, height: u32) -> Pixel {
    let ramp = |v: u32, n: u32| v as f32 / n.saturating_sub(1).max(1) as f32;
    Pixel::new(ramp(x, width), ramp(y, height), ((x + y) % 17) as f32 / 16.0)
}

#[derive(Debug, Default)]
struct Resources {
    input: Option<BufferHandle>,
    output: Option<BufferHandle>,
    pipeline: Option<ColoropId>,
}

/// Runs one plane test of `ops` on the writeback output of `display`.
///
/// Skips (see [`KmsError::is_skip`]) are returned as errors like failures;
/// [`TestOutcome::from_result`] tells them apart.
pub fn run_plane_test<D>(
    display: &mut D,
    ops: &mut [ColorOpDescriptor],
    opts: &PlaneTestOptions,
) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    let output = display.writeback_output().ok_or(KmsError::NoWriteback)?;
    if ops.is_empty() {
        return Err(KmsError::EmptyColoropList);
    }
    if !opts.format.is_decodable() {
        return Err(colorop_core::Error::unsupported_format(opts.format.name()).into());
    }
    let mut res = Resources::default();
    let result = run_steps(display, &output, ops, opts, &mut res);
    let cleanup = release(display, &output, ops, &mut res);
    result.and(cleanup)
}

fn commit_and_wait<D>(display: &mut D) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    let fence = display
        .commit_display_state(CommitFlags::ALLOW_MODESET)?
        .ok_or_else(|| KmsError::invalid("commit", Errno::Einval, "writeback commit returned no fence"))?;
    display.wait_fence(fence, FENCE_TIMEOUT)
}

fn run_steps<D>(
    display: &mut D,
    output: &WritebackOutput,
    ops: &mut [ColorOpDescriptor],
    opts: &PlaneTestOptions,
    res: &mut Resources,
) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    let (width, height) = opts.size.unwrap_or((output.width, output.height));
    let input = display.create_pixel_buffer(width, height, opts.format, MOD_LINEAR)?;
    res.input = Some(input);
    let out = display.create_pixel_buffer(width, height, opts.format, MOD_LINEAR)?;
    res.output = Some(out);

    with_mapped(display, input, |buf| {
        for y in 0..height {
            for x in 0..width {
                buf.set_pixel(x, y, test_pattern(x, y, width, height))?;
            }
        }
        Ok(())
    })?;

    // Pass-through check with the pipeline in bypass.
    if display.plane_has_color_pipeline(output.plane) {
        display.set_plane_color_pipeline(output.plane, None)?;
    }
    display.set_plane_fb(output.plane, Some(input))?;
    display.set_writeback_fb(output.connector, Some(out))?;
    commit_and_wait(display)?;
    let expected = display.checksum_buffer(input)?;
    let actual = display.checksum_buffer(out)?;
    if expected != actual {
        return Err(KmsError::FingerprintMismatch { expected, actual });
    }
    debug!(fingerprint = %expected, "bypass output matches input");

    let source: PixelBuffer = with_mapped(display, input, |buf| Ok(buf.clone()))?;
    let reference = apply_software_transform(&source, ops)?;

    let head = map_hardware_pipeline(display, output.plane, ops)?;
    res.pipeline = Some(head);
    configure_pipeline(display, output.plane, head, ops)?;

    display.set_writeback_fb(output.connector, Some(out))?;
    commit_and_wait(display)?;
    let produced = with_mapped(display, out, |buf| Ok(buf.clone()))?;
    let result = assert_match(&reference, &produced, opts.tolerance);
    if let (Err(KmsError::Mismatch { .. }), Some(dir)) = (&result, &opts.dump_dir) {
        let stem = ops.iter().map(|op| op.name).collect::<Vec<_>>().join("-");
        match dump_mismatch(dir, &stem, &source, &produced, &reference) {
            Ok(paths) => info!(dir = %dir.display(), files = paths.len(), "dumped mismatch"),
            Err(e) => warn!(error = %e, dir = %dir.display(), "mismatch dump failed"),
        }
    }
    result
}

fn release<D>(
    display: &mut D,
    output: &WritebackOutput,
    ops: &mut [ColorOpDescriptor],
    res: &mut Resources,
) -> KmsResult<()>
where
    D: DisplayControl + ?Sized,
{
    let mut first_err: Option<KmsError> = None;
    let mut note = |result: KmsResult<()>, what: &str| {
        if let Err(e) = result {
            warn!(error = %e, "cleanup: {}", what);
            first_err.get_or_insert(e);
        }
    };

    if let Some(head) = res.pipeline.take() {
        note(reset_pipeline_to_bypass(display, output.plane, head, ops), "reset pipeline");
    }
    if res.input.is_some() || res.output.is_some() {
        note(display.set_plane_fb(output.plane, None), "detach plane");
        note(display.set_writeback_fb(output.connector, None), "detach writeback");
        note(
            display.commit_display_state(CommitFlags::ALLOW_MODESET).map(|_| ()),
            "commit",
        );
    }
    for handle in [res.output.take(), res.input.take()].into_iter().flatten() {
        note(display.destroy_pixel_buffer(handle), "destroy framebuffer");
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs every test of `plan` whose name contains `filter`.
pub fn run_plan<D>(display: &mut D, plan: &TestPlan, filter: Option<&str>) -> KmsResult<Vec<TestReport>>
where
    D: DisplayControl + ?Sized,
{
    let opts = PlaneTestOptions {
        format: plan.pixel_format()?,
        tolerance: plan.tolerance_for(display.driver_name()),
        size: Some((plan.width, plan.height)),
        dump_dir: plan.dump_dir.clone(),
    };
    let mut reports = Vec::new();
    for test in plan.tests.iter().filter(|t| filter.is_none_or(|f| t.name.contains(f))) {
        let mut ops = catalog::descriptors(&test.colorops)?;
        let result = run_plane_test(display, &mut ops, &opts);
        if let Err(KmsError::Mismatch { diffs, .. }) = &result {
            for diff in diffs {
                debug!(test = %test.name, "{}", diff);
            }
        }
        let outcome = TestOutcome::from_result(&result);
        match &outcome {
            TestOutcome::Pass => info!(test = %test.name, ops = %op_names(&ops), "pass"),
            TestOutcome::Skip(why) => warn!(test = %test.name, "skip: {}", why),
            TestOutcome::Fail(why) => warn!(test = %test.name, "fail: {}", why),
        }
        reports.push(TestReport {
            name: test.name.clone(),
            outcome,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_corners() {
        assert_eq!(test_pattern(0, 0, 8, 4), Pixel::new(0.0, 0.0, 0.0));
        assert_eq!(test_pattern(7, 3, 8, 4).r, 1.0);
        assert_eq!(test_pattern(7, 3, 8, 4).g, 1.0);
        assert_eq!(test_pattern(0, 0, 1, 1), Pixel::BLACK);
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(TestOutcome::from_result(&Ok(())), TestOutcome::Pass);
        assert!(matches!(
            TestOutcome::from_result(&Err(KmsError::NoWriteback)),
            TestOutcome::Skip(_)
        ));
        let timeout = Err(KmsError::FenceTimeout { fence: 1, timeout_ms: 1000 });
        assert!(TestOutcome::from_result(&timeout).is_failure());
        assert_eq!(TestOutcome::Pass.to_string(), "PASS");
    }
}
