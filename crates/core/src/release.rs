//! Release pipeline
//!
//! A release walks a fixed sequence of checkpoints, each entered only after the previous
//! one succeeded:
//!
//! 1. `tests-passed` - the test matrix passed on every runtime
//! 2. `environment-ready` - the release environment holds the release groups
//! 3. `version-bumped` - the package version was updated
//! 4. `package-built` - artifacts were built into a freshly emptied directory
//! 5. `inspection-gate` - a human confirmed the artifacts
//! 6. `uploaded` - artifacts were published
//!
//! With the manual gate the pipeline stops after packaging and records a checkpoint file.
//! A confirmed run that finds that checkpoint, with its artifacts still in place, resumes
//! at the upload without bumping or building again. Nothing is rolled back on failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::configs::workspace::{BumpConfig, GateMode, WorkspaceConfig};
use crate::environment::{Environment, EnvironmentManager};
use crate::execution::process::{Invocation, ProcessRunner};
use crate::matrix::TestMatrix;
use crate::platform::PlatformInfo;
use crate::types::{DroverError, DroverResult};
use crate::versioning::GitTagBumper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseState {
    TestsPassed,
    EnvironmentReady,
    VersionBumped,
    PackageBuilt,
    InspectionGate,
    Uploaded,
}

impl ReleaseState {
    pub fn label(&self) -> &'static str {
        match self {
            ReleaseState::TestsPassed => "tests-passed",
            ReleaseState::EnvironmentReady => "environment-ready",
            ReleaseState::VersionBumped => "version-bumped",
            ReleaseState::PackageBuilt => "package-built",
            ReleaseState::InspectionGate => "inspection-gate",
            ReleaseState::Uploaded => "uploaded",
        }
    }
}

/// Persisted when the pipeline halts at the inspection gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseCheckpoint {
    pub state: ReleaseState,
    pub version: Option<String>,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseReport {
    pub reached: Vec<ReleaseState>,
    pub version: Option<String>,
    pub artifacts: Vec<PathBuf>,
    pub resumed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions {
    /// Confirmation to pass the inspection gate
    pub confirmed: bool,
    /// The test matrix already passed earlier in the same plan
    pub tests_already_passed: bool,
}

pub struct ReleasePipeline<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    config: &'a WorkspaceConfig,
    platform: PlatformInfo,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, config: &'a WorkspaceConfig) -> Self {
        Self {
            root,
            runner,
            config,
            platform: PlatformInfo::current(),
        }
    }

    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn state_path(&self) -> PathBuf {
        self.absolute(&self.config.release.state_file)
    }

    pub fn load_checkpoint(&self) -> DroverResult<Option<ReleaseCheckpoint>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_checkpoint(&self, checkpoint: &ReleaseCheckpoint) -> DroverResult<()> {
        let path = self.state_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(checkpoint)?)?;
        debug!(path = %path.display(), state = checkpoint.state.label(), "release checkpoint saved");
        Ok(())
    }

    fn clear_checkpoint(&self) -> DroverResult<()> {
        let path = self.state_path();
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn enter(report: &mut ReleaseReport, state: ReleaseState) {
        info!(checkpoint = state.label(), "release checkpoint reached");
        report.reached.push(state);
    }

    fn stage_error(stage: &str, status: Option<i32>) -> DroverError {
        DroverError::TaskExecution {
            task: format!("release ({})", stage),
            status,
        }
    }

    fn run_stage(&self, stage: &str, invocation: Invocation, env: &Environment) -> DroverResult<()> {
        let invocation = env.activate(invocation.current_dir(self.root))?;
        let status = self.runner.run(&invocation)?;
        if !status.success() {
            return Err(Self::stage_error(stage, status.code()));
        }
        Ok(())
    }

    fn provision(&self) -> DroverResult<Environment> {
        let groups = self.config.release.groups.iter().cloned().collect();
        EnvironmentManager::new(self.root, self.runner, &self.config.environment)
            .with_platform(self.platform)
            .ensure(&self.config.environment.path, &groups)
    }

    /// Drive the pipeline as far as the gate allows
    pub fn run(&self, options: &ReleaseOptions) -> DroverResult<ReleaseReport> {
        if let Some(checkpoint) = self.load_checkpoint()? {
            let resumable = checkpoint.state == ReleaseState::InspectionGate
                && !checkpoint.artifacts.is_empty()
                && checkpoint.artifacts.iter().all(|a| a.exists());
            if resumable && options.confirmed {
                return self.resume(checkpoint);
            }
            if !resumable {
                warn!("discarding stale release checkpoint");
            }
            self.clear_checkpoint()?;
        }

        let mut report = ReleaseReport::default();

        if options.tests_already_passed {
            debug!("test matrix already passed in this plan");
        } else {
            TestMatrix::new(self.root, self.runner, &self.config.matrix).run("release")?;
        }
        Self::enter(&mut report, ReleaseState::TestsPassed);

        let env = self.provision()?;
        Self::enter(&mut report, ReleaseState::EnvironmentReady);

        report.version = self.bump_version(&env)?;
        Self::enter(&mut report, ReleaseState::VersionBumped);

        report.artifacts = self.build_package(&env)?;
        Self::enter(&mut report, ReleaseState::PackageBuilt);

        if self.config.release.gate == GateMode::Manual && !options.confirmed {
            self.save_checkpoint(&ReleaseCheckpoint {
                state: ReleaseState::InspectionGate,
                version: report.version.clone(),
                artifacts: report.artifacts.clone(),
            })?;
            return Err(DroverError::InspectionGate {
                artifacts_dir: self.absolute(&self.config.release.dist_dir),
            });
        }
        Self::enter(&mut report, ReleaseState::InspectionGate);

        self.upload(&env, &report.artifacts)?;
        Self::enter(&mut report, ReleaseState::Uploaded);
        Ok(report)
    }

    fn resume(&self, checkpoint: ReleaseCheckpoint) -> DroverResult<ReleaseReport> {
        info!(
            version = ?checkpoint.version,
            artifacts = checkpoint.artifacts.len(),
            "resuming release after inspection"
        );
        let env = self.provision()?;
        let mut report = ReleaseReport {
            reached: Vec::new(),
            version: checkpoint.version,
            artifacts: checkpoint.artifacts,
            resumed: true,
        };
        Self::enter(&mut report, ReleaseState::InspectionGate);

        self.upload(&env, &report.artifacts)?;
        Self::enter(&mut report, ReleaseState::Uploaded);
        Ok(report)
    }

    fn bump_version(&self, env: &Environment) -> DroverResult<Option<String>> {
        match &self.config.release.bump {
            BumpConfig::Command(argv) => {
                self.run_stage("version bump", Invocation::from_argv(argv)?, env)?;
                Ok(None)
            }
            BumpConfig::GitTags(git) => {
                let outcome = GitTagBumper::new(self.root, self.runner, git).bump()?;
                Ok(Some(outcome.version().to_string()))
            }
        }
    }

    fn build_package(&self, env: &Environment) -> DroverResult<Vec<PathBuf>> {
        let dist = self.absolute(&self.config.release.dist_dir);
        if dist.exists() {
            debug!(path = %dist.display(), "removing previous artifacts");
            std::fs::remove_dir_all(&dist)?;
        }
        std::fs::create_dir_all(&dist)?;

        let build = Invocation::from_argv(&self.config.release.build)?
            .arg("--outdir")
            .arg(dist.to_string_lossy());
        self.run_stage("build", build, env)?;

        let mut artifacts = Vec::new();
        for entry in std::fs::read_dir(&dist)? {
            let path = entry?.path();
            if path.is_file() {
                artifacts.push(path);
            }
        }
        artifacts.sort();

        if artifacts.is_empty() {
            return Err(DroverError::Release(format!(
                "Build produced no artifacts in {}",
                dist.display()
            )));
        }
        Ok(artifacts)
    }

    fn upload(&self, env: &Environment, artifacts: &[PathBuf]) -> DroverResult<()> {
        let invocation = Invocation::from_argv(&self.config.release.upload)?
            .args(artifacts.iter().map(|a| a.to_string_lossy().to_string()));
        self.run_stage("upload", invocation, env)?;
        self.clear_checkpoint()
    }
}
