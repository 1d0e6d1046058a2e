//! Command execution utilities
//!
//! This module provides a unified interface for executing the different kinds of task
//! commands (shell commands, scripts, executables with args) with consistent error
//! handling and environment setup.

use std::path::{Path, PathBuf};

use crate::configs::tasks::Command as TaskCommand;
use crate::environment::Environment;
use crate::execution::process::{Invocation, ProcessRunner};
use crate::types::{DroverError, DroverResult};

/// Unified command executor that handles common setup and execution patterns
pub struct CommandExecutor<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    task_name: &'a str,
    environment: Option<&'a Environment>,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, task_name: &'a str) -> Self {
        Self {
            root,
            runner,
            task_name,
            environment: None,
        }
    }

    /// Run commands with the given environment's executables first on `PATH`
    pub fn with_environment(mut self, environment: &'a Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Execute an invocation with common setup and error handling
    pub fn execute(&self, invocation: Invocation) -> DroverResult<()> {
        let mut invocation = invocation
            .current_dir(self.root)
            .env("DROVER_TASK", self.task_name);
        if let Some(environment) = self.environment {
            invocation = environment.activate(invocation)?;
        }

        let status = self.runner.run(&invocation)?;
        if !status.success() {
            return Err(DroverError::TaskExecution {
                task: self.task_name.to_string(),
                status: status.code(),
            });
        }

        Ok(())
    }

    /// Execute a task's declared command
    pub fn execute_task_command(&self, command: &TaskCommand) -> DroverResult<()> {
        match command {
            TaskCommand::Single(cmd) => self.execute_shell_command(cmd),
            TaskCommand::Multiple(cmds) => {
                if cmds.is_empty() {
                    return Ok(());
                }
                self.execute(Invocation::from_argv(cmds)?)
            }
        }
    }

    /// Execute a script file
    pub fn execute_script(&self, script_path: &str) -> DroverResult<()> {
        let script_path_buf = PathBuf::from(script_path);

        // Relative scripts live under the workspace root
        let full_script_path = if script_path_buf.is_relative() {
            self.root.join(script_path_buf)
        } else {
            script_path_buf
        };

        if !full_script_path.exists() {
            return Err(DroverError::Config(format!(
                "Script file '{}' for task '{}' not found",
                full_script_path.display(),
                self.task_name
            )));
        }

        self.execute(Invocation::new(full_script_path.to_string_lossy()))
    }

    /// Execute a single shell command
    pub fn execute_shell_command(&self, cmd: &str) -> DroverResult<()> {
        self.execute(Invocation::new("sh").arg("-c").arg(cmd))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::execution::process::testing::RecordingRunner;
    use crate::platform::PlatformInfo;

    #[test]
    fn test_shell_command_runs_in_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let executor = CommandExecutor::new(dir.path(), &runner, "lint");

        executor
            .execute_task_command(&TaskCommand::Single("flake8 src".to_string()))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sh");
        assert_eq!(calls[0].args, vec!["-c", "flake8 src"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.path()));
        assert!(calls[0]
            .env
            .contains(&("DROVER_TASK".to_string(), "lint".to_string())));
    }

    #[test]
    fn test_non_zero_exit_names_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().fail_on("sphinx-build", 2);
        let executor = CommandExecutor::new(dir.path(), &runner, "docs");

        let err = executor
            .execute_task_command(&TaskCommand::Multiple(vec![
                "sphinx-build".to_string(),
                "docs".to_string(),
            ]))
            .unwrap_err();

        match err {
            DroverError::TaskExecution { task, status } => {
                assert_eq!(task, "docs");
                assert_eq!(status, Some(2));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_script_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let executor = CommandExecutor::new(dir.path(), &runner, "gen");

        let err = executor.execute_script("scripts/gen.sh").unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_environment_is_activated() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let environment = Environment {
            path: dir.path().join("venv"),
            groups: BTreeSet::new(),
            created: false,
            platform: PlatformInfo::from_os("linux"),
        };
        let executor = CommandExecutor::new(dir.path(), &runner, "docs").with_environment(&environment);

        executor.execute_shell_command("make html").unwrap();

        let calls = runner.calls();
        let virtual_env = calls[0]
            .env
            .iter()
            .find(|(key, _)| key == "VIRTUAL_ENV")
            .map(|(_, value)| value.clone());
        assert_eq!(
            virtual_env,
            Some(dir.path().join("venv").to_string_lossy().to_string())
        );
        assert!(calls[0].env.iter().any(|(key, value)| key == "PATH"
            && value.starts_with(&dir.path().join("venv").join("bin").to_string_lossy().to_string())));
    }
}
