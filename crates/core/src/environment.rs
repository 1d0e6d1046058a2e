//! Isolated environment management
//!
//! An environment is a directory holding installed dependencies. It is created lazily the
//! first time it is needed and never removed by drover. Presence is decided by a single
//! directory-existence check, so a damaged environment is not rebuilt automatically.
//! Group installation is always re-issued; the installer leaves satisfied
//! requirements untouched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::configs::workspace::{EnvironmentConfig, SetupConfig};
use crate::execution::process::{Invocation, ProcessRunner};
use crate::platform::PlatformInfo;
use crate::types::{DroverError, DroverResult};

/// A provisioned environment and the groups installed into it by this invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub path: PathBuf,
    pub groups: BTreeSet<String>,
    /// Whether this call created the directory
    pub created: bool,
    pub platform: PlatformInfo,
}

impl Environment {
    /// Point an invocation at this environment's executables
    pub fn activate(&self, invocation: Invocation) -> DroverResult<Invocation> {
        let bin_dir = self.platform.bin_dir(&self.path);
        let mut search_path = vec![bin_dir];
        if let Some(existing) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&existing));
        }
        let joined = std::env::join_paths(search_path).map_err(|e| {
            DroverError::Config(format!(
                "Environment path {} cannot be placed on PATH: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(invocation
            .env("VIRTUAL_ENV", self.path.to_string_lossy())
            .env("PATH", joined.to_string_lossy()))
    }
}

/// Render the editable install requirement, e.g. `.[core,docs]`
pub fn requirement_spec(target: &str, groups: &BTreeSet<String>) -> String {
    if groups.is_empty() {
        return target.to_string();
    }
    let extras = groups.iter().cloned().collect::<Vec<_>>().join(",");
    format!("{}[{}]", target, extras)
}

/// Creates environments and installs dependency groups into them
pub struct EnvironmentManager<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    config: &'a EnvironmentConfig,
    platform: PlatformInfo,
}

impl<'a> EnvironmentManager<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, config: &'a EnvironmentConfig) -> Self {
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

    fn provisioning_error(path: &Path, reason: String) -> DroverError {
        DroverError::EnvironmentProvisioning {
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Make sure an environment exists at `path` and install `groups` into it
    pub fn ensure(&self, path: &Path, groups: &BTreeSet<String>) -> DroverResult<Environment> {
        let env_path = self.absolute(path);

        let created = if env_path.is_dir() {
            debug!(path = %env_path.display(), "environment already present, skipping creation");
            false
        } else {
            info!(path = %env_path.display(), "creating environment");
            let invocation = Invocation::from_argv(&self.config.create)?
                .arg(env_path.to_string_lossy())
                .current_dir(self.root);
            let status = self.runner.run(&invocation).map_err(|e| {
                Self::provisioning_error(&env_path, format!("could not run creation command: {}", e))
            })?;
            if !status.success() {
                return Err(Self::provisioning_error(
                    &env_path,
                    format!(
                        "`{}` exited with {:?}",
                        invocation.command_line(),
                        status.code()
                    ),
                ));
            }
            true
        };

        let environment = Environment {
            path: env_path,
            groups: groups.clone(),
            created,
            platform: self.platform,
        };
        self.install_groups(&environment)?;
        Ok(environment)
    }

    fn install_groups(&self, environment: &Environment) -> DroverResult<()> {
        let (program, args) = self.config.installer.split_first().ok_or_else(|| {
            DroverError::Config("environment.installer must not be empty".to_string())
        })?;
        let installer = self.platform.executable(&environment.path, program);
        let invocation = Invocation::new(installer.to_string_lossy())
            .args(args.iter().cloned())
            .arg("-e")
            .arg(requirement_spec(
                &self.config.editable_target,
                &environment.groups,
            ))
            .current_dir(self.root);

        info!(
            path = %environment.path.display(),
            groups = ?environment.groups,
            "installing dependency groups"
        );
        let invocation = environment.activate(invocation)?;
        let status = self.runner.run(&invocation).map_err(|e| {
            Self::provisioning_error(&environment.path, format!("could not run installer: {}", e))
        })?;
        if !status.success() {
            return Err(Self::provisioning_error(
                &environment.path,
                format!(
                    "installing groups {:?} exited with {:?}",
                    environment.groups,
                    status.code()
                ),
            ));
        }
        Ok(())
    }

    /// Install the setup groups into whatever environment is currently active
    pub fn install_active(&self, setup: &SetupConfig) -> DroverResult<()> {
        let groups: BTreeSet<String> = setup.groups.iter().cloned().collect();
        let invocation = Invocation::from_argv(&setup.installer)?
            .arg("-e")
            .arg(requirement_spec(&self.config.editable_target, &groups))
            .current_dir(self.root);

        info!(groups = ?groups, "installing dependency groups into the active environment");
        let status = self.runner.run(&invocation).map_err(|e| {
            Self::provisioning_error(self.root, format!("could not run installer: {}", e))
        })?;
        if !status.success() {
            return Err(Self::provisioning_error(
                self.root,
                format!("`{}` exited with {:?}", invocation.command_line(), status.code()),
            ));
        }
        Ok(())
    }
}
