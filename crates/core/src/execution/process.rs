//! Process invocation seam
//!
//! Every external program drover starts goes through a [`ProcessRunner`]. Commands are
//! always structured argument vectors; a shell is only involved when a task explicitly
//! declares a single-string command.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::text::command_line;
use crate::types::{DroverError, DroverResult};

/// A fully described external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Build from a configured argument vector, program first
    pub fn from_argv(argv: &[String]) -> DroverResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| DroverError::Config("Command must not be empty".to_string()))?;
        Ok(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-pasteable rendering used in logs and error messages
    pub fn command_line(&self) -> String {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.as_str());
        argv.extend(self.args.iter().map(String::as_str));
        command_line(&argv)
    }
}

/// Exit status of a finished process; `None` when it was terminated by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus(pub Option<i32>);

impl ProcessStatus {
    pub fn success(&self) -> bool {
        self.0 == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.0
    }
}

/// Result of a process whose standard output was captured
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: String,
}

/// Starts external programs and waits for them to finish
pub trait ProcessRunner: Send + Sync {
    /// Run with inherited standard streams so output reaches the user verbatim
    fn run(&self, invocation: &Invocation) -> DroverResult<ProcessStatus>;

    /// Run capturing standard output; standard error stays inherited
    fn capture(&self, invocation: &Invocation) -> DroverResult<ProcessOutput>;
}

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command
    }

    fn spawn_error(invocation: &Invocation, source: std::io::Error) -> DroverError {
        DroverError::CommandSpawn {
            program: invocation.program.clone(),
            source,
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &Invocation) -> DroverResult<ProcessStatus> {
        debug!(command = %invocation.command_line(), cwd = ?invocation.cwd, "running");
        let status = Self::command(invocation)
            .status()
            .map_err(|e| Self::spawn_error(invocation, e))?;
        Ok(ProcessStatus(status.code()))
    }

    fn capture(&self, invocation: &Invocation) -> DroverResult<ProcessOutput> {
        debug!(command = %invocation.command_line(), cwd = ?invocation.cwd, "capturing");
        let output = Self::command(invocation)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Self::spawn_error(invocation, e))?;
        Ok(ProcessOutput {
            status: ProcessStatus(output.status.code()),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! Scriptable runner for unit tests

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        failures: Vec<(String, i32)>,
        outputs: Vec<(String, String)>,
        touches: Vec<(String, PathBuf)>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Any invocation whose command line contains `pattern` exits with `code`
        pub fn fail_on(mut self, pattern: &str, code: i32) -> Self {
            self.failures.push((pattern.to_string(), code));
            self
        }

        /// Captured invocations whose command line contains `pattern` print `stdout`
        pub fn respond(mut self, pattern: &str, stdout: &str) -> Self {
            self.outputs.push((pattern.to_string(), stdout.to_string()));
            self
        }

        /// Invocations whose command line contains `pattern` create the file at `path`
        pub fn touch_on(mut self, pattern: &str, path: &Path) -> Self {
            self.touches.push((pattern.to_string(), path.to_path_buf()));
            self
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn command_lines(&self) -> Vec<String> {
            self.calls().iter().map(Invocation::command_line).collect()
        }

        /// Number of recorded invocations whose command line contains `pattern`
        pub fn count(&self, pattern: &str) -> usize {
            self.command_lines()
                .iter()
                .filter(|line| line.contains(pattern))
                .count()
        }

        fn status_for(&self, invocation: &Invocation) -> ProcessStatus {
            let line = invocation.command_line();
            self.calls.lock().unwrap().push(invocation.clone());
            for (pattern, path) in &self.touches {
                if line.contains(pattern.as_str()) {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).unwrap();
                    }
                    std::fs::write(path, b"artifact").unwrap();
                }
            }
            let code = self
                .failures
                .iter()
                .find(|(pattern, _)| line.contains(pattern.as_str()))
                .map(|(_, code)| *code)
                .unwrap_or(0);
            ProcessStatus(Some(code))
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> DroverResult<ProcessStatus> {
            Ok(self.status_for(invocation))
        }

        fn capture(&self, invocation: &Invocation) -> DroverResult<ProcessOutput> {
            let status = self.status_for(invocation);
            let line = invocation.command_line();
            let stdout = self
                .outputs
                .iter()
                .find(|(pattern, _)| line.contains(pattern.as_str()))
                .map(|(_, out)| out.clone())
                .unwrap_or_default();
            Ok(ProcessOutput { status, stdout })
        }
    }
}
