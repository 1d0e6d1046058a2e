//! Test runs across every supported runtime version

use std::path::Path;

use tracing::{info, warn};

use crate::configs::workspace::MatrixConfig;
use crate::execution::process::{Invocation, ProcessRunner};
use crate::types::{DroverError, DroverResult};

pub struct TestMatrix<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    config: &'a MatrixConfig,
}

impl<'a> TestMatrix<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, config: &'a MatrixConfig) -> Self {
        Self {
            root,
            runner,
            config,
        }
    }

    /// Run the suite once per runtime, stopping at the first runtime that fails
    pub fn run(&self, task_name: &str) -> DroverResult<Vec<String>> {
        if self.config.runtimes.is_empty() {
            warn!("no runtimes declared, the test matrix is empty");
        }

        let mut passed = Vec::with_capacity(self.config.runtimes.len());
        for runtime in &self.config.runtimes {
            let invocation = Invocation::from_argv(&self.config.command)?
                .arg(runtime.as_str())
                .current_dir(self.root);

            info!(runtime = %runtime, "running test suite");
            let status = self.runner.run(&invocation)?;
            if !status.success() {
                return Err(DroverError::TaskExecution {
                    task: format!("{} ({})", task_name, runtime),
                    status: status.code(),
                });
            }
            passed.push(runtime.clone());
        }

        Ok(passed)
    }
}
