//! Task execution module
//!
//! This module handles the actual execution of tasks: starting processes, running task
//! commands and scripts, and walking an execution plan with fail-fast semantics.

pub mod command;
pub mod process;
pub mod runner;

pub use command::CommandExecutor;
pub use process::{Invocation, ProcessRunner, ProcessStatus, SystemProcessRunner};
pub use runner::{TaskRunner, TaskRunnerConfig};
