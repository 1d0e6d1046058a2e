//! Coverage-gated test runs
//!
//! Tests run under branch instrumentation once per target, in the order given, with
//! measurements appended into one data file. The aggregate percentage then decides the
//! outcome: a clean test run below the threshold is still a failure. The report artifact
//! is written whatever the verdict.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::configs::workspace::CoverageConfig;
use crate::execution::process::{Invocation, ProcessRunner};
use crate::text::trim_long_text;
use crate::types::{DroverError, DroverResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Aggregate percentage; absent when it could not be measured
    pub measured: Option<f64>,
    pub threshold: f64,
}

impl CoverageResult {
    pub fn passed(&self) -> bool {
        matches!(self.measured, Some(measured) if measured >= self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: PathBuf,
    pub status: Option<i32>,
}

impl TargetOutcome {
    pub fn passed(&self) -> bool {
        self.status == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub targets: Vec<TargetOutcome>,
    pub coverage: CoverageResult,
    /// Why the aggregate could not be measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_error: Option<String>,
}

impl TestReport {
    pub fn tests_passed(&self) -> bool {
        self.targets.iter().all(TargetOutcome::passed)
    }

    pub fn passed(&self) -> bool {
        self.tests_passed() && self.coverage.passed()
    }

    /// Turn a failing report into the error describing why it failed.
    ///
    /// Test failures take precedence over a failed measurement, which takes precedence
    /// over the coverage gate.
    pub fn into_result(self, task_name: &str) -> DroverResult<TestReport> {
        if let Some(failed) = self.targets.iter().find(|t| !t.passed()) {
            return Err(DroverError::TaskExecution {
                task: format!("{} ({})", task_name, failed.target.display()),
                status: failed.status,
            });
        }
        let Some(measured) = self.coverage.measured else {
            return Err(DroverError::Coverage(
                self.measurement_error
                    .unwrap_or_else(|| "no coverage total was measured".to_string()),
            ));
        };
        if !self.coverage.passed() {
            return Err(DroverError::CoverageThreshold {
                measured,
                threshold: self.coverage.threshold,
            });
        }
        Ok(self)
    }
}

/// Parse a coverage total such as `87`, `87.5` or `87.50%`
pub fn parse_percentage(raw: &str) -> DroverResult<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let value: f64 = number.parse().map_err(|_| {
        DroverError::Coverage(format!(
            "Expected a coverage percentage, got:\n{}",
            trim_long_text(trimmed, 20)
        ))
    })?;
    if !(0.0..=100.0).contains(&value) {
        return Err(DroverError::Coverage(format!(
            "Coverage percentage {} is outside 0..=100",
            value
        )));
    }
    Ok(value)
}

pub struct CoverageRunner<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    config: &'a CoverageConfig,
}

impl<'a> CoverageRunner<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, config: &'a CoverageConfig) -> Self {
        Self {
            root,
            runner,
            config,
        }
    }

    /// Run every target under instrumentation and measure aggregate coverage.
    ///
    /// Returns the report even when it fails the gate; use [`TestReport::into_result`]
    /// to turn the verdict into an error.
    pub fn run_tests(&self, targets: &[PathBuf], threshold: f64) -> DroverResult<TestReport> {
        if !self.config.erase_command.is_empty() {
            let erase = Invocation::from_argv(&self.config.erase_command)?.current_dir(self.root);
            let status = self.runner.run(&erase)?;
            if !status.success() {
                return Err(DroverError::Coverage(format!(
                    "`{}` exited with {:?}",
                    erase.command_line(),
                    status.code()
                )));
            }
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let mut invocation = Invocation::from_argv(&self.config.command)?;
            if self.config.doctests && !self.config.doctest_flag.is_empty() {
                invocation = invocation.arg(self.config.doctest_flag.as_str());
            }
            let invocation = invocation
                .arg(target.to_string_lossy())
                .current_dir(self.root);

            info!(target = %target.display(), "running instrumented tests");
            let status = self.runner.run(&invocation)?;
            debug!(target = %target.display(), status = ?status.code(), "target finished");
            outcomes.push(TargetOutcome {
                target: target.clone(),
                status: status.code(),
            });
        }

        // A failed measurement is recorded, not raised, so target failures and the
        // report artifact survive it
        let (measured, measurement_error) = match self.measure() {
            Ok(measured) => (Some(measured), None),
            Err(DroverError::Coverage(reason)) => (None, Some(reason)),
            Err(err) => (None, Some(err.to_string())),
        };
        if let Some(reason) = &measurement_error {
            warn!(reason = %reason, "coverage could not be measured");
        }

        let report = TestReport {
            targets: outcomes,
            coverage: CoverageResult {
                measured,
                threshold,
            },
            measurement_error,
        };
        self.persist(&report)?;
        info!(
            measured = ?report.coverage.measured,
            threshold = report.coverage.threshold,
            "coverage measured"
        );
        Ok(report)
    }

    fn measure(&self) -> DroverResult<f64> {
        let total = Invocation::from_argv(&self.config.total_command)?.current_dir(self.root);
        let output = self.runner.capture(&total)?;
        if !output.status.success() {
            return Err(DroverError::Coverage(format!(
                "`{}` exited with {:?}",
                total.command_line(),
                output.status.code()
            )));
        }
        parse_percentage(&output.stdout)
    }

    fn persist(&self, report: &TestReport) -> DroverResult<()> {
        let path = if self.config.report.is_absolute() {
            self.config.report.clone()
        } else {
            self.root.join(&self.config.report)
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        debug!(path = %path.display(), "coverage report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::process::testing::RecordingRunner;

    fn targets() -> Vec<PathBuf> {
        vec![PathBuf::from("tests"), PathBuf::from("src")]
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("87\n").unwrap(), 87.0);
        assert_eq!(parse_percentage(" 87.50% ").unwrap(), 87.5);
        assert!(parse_percentage("TOTAL 87%").is_err());
        assert!(parse_percentage("101").is_err());
    }

    #[test]
    fn test_gate_boundary() {
        let result = |measured| CoverageResult {
            measured,
            threshold: 10.0,
        };
        assert!(!result(Some(9.0)).passed());
        assert!(result(Some(10.0)).passed());
        assert!(!result(None).passed());
    }

    #[test]
    fn test_below_threshold_fails_even_when_tests_pass() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--format=total", "9");
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();
        assert!(report.tests_passed());
        assert!(!report.passed());

        let err = report.into_result("unit").unwrap_err();
        match err {
            DroverError::CoverageThreshold {
                measured,
                threshold,
            } => {
                assert_eq!(measured, 9.0);
                assert_eq!(threshold, 10.0);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_at_threshold_passes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--format=total", "10");
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();
        assert!(report.passed());
        assert!(report.into_result("unit").is_ok());
    }

    #[test]
    fn test_targets_run_in_order_with_doctests() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--format=total", "55.5");
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        coverage.run_tests(&targets(), 10.0).unwrap();

        let lines = runner.command_lines();
        assert_eq!(
            lines,
            vec![
                "coverage erase",
                "coverage run --branch --append -m pytest --doctest-modules tests",
                "coverage run --branch --append -m pytest --doctest-modules src",
                "coverage report --format=total",
            ]
        );
    }

    #[test]
    fn test_failing_target_is_reported_before_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new()
            .fail_on("pytest --doctest-modules tests", 1)
            .respond("--format=total", "95");
        let config = CoverageConfig {
            doctests: true,
            ..CoverageConfig::default()
        };
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();
        // The remaining target still runs so the aggregate is complete
        assert_eq!(report.targets.len(), 2);
        assert!(report.coverage.passed());

        let err = report.into_result("unit").unwrap_err();
        assert!(matches!(err, DroverError::TaskExecution { status: Some(1), .. }));
        assert!(err.to_string().contains("unit (tests)"));
    }

    #[test]
    fn test_report_is_persisted_even_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--format=total", "3.25");
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();
        assert!(!report.passed());

        let written = std::fs::read_to_string(dir.path().join(".drover/coverage.json")).unwrap();
        let parsed: TestReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_unreadable_total_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--format=total", "No data to report.");
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();
        assert_eq!(report.coverage.measured, None);
        assert!(matches!(
            report.into_result("unit"),
            Err(DroverError::Coverage(_))
        ));
    }

    #[test]
    fn test_failed_measurement_keeps_target_failure_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new()
            .fail_on("pytest --doctest-modules tests", 2)
            .fail_on("--format=total", 1);
        let config = CoverageConfig::default();
        let coverage = CoverageRunner::new(dir.path(), &runner, &config);

        let report = coverage.run_tests(&targets(), 10.0).unwrap();

        let written = std::fs::read_to_string(dir.path().join(".drover/coverage.json")).unwrap();
        let parsed: TestReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.coverage.measured, None);
        assert!(parsed
            .measurement_error
            .as_deref()
            .unwrap()
            .contains("--format=total"));

        match report.into_result("unit").unwrap_err() {
            DroverError::TaskExecution { task, status } => {
                assert_eq!(task, "unit (tests)");
                assert_eq!(status, Some(2));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
