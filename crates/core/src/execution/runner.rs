//! High-level task runner
//!
//! This module executes a resolved plan one task at a time. The first failing task
//! aborts the plan; every task after it is reported as not run.

use std::collections::BTreeSet;
use std::path::Path;

use colored::*;
use tracing::{debug, info};

use crate::configs::tasks::{Builtin, TaskConfig};
use crate::configs::workspace::WorkspaceConfig;
use crate::coverage::CoverageRunner;
use crate::environment::{Environment, EnvironmentManager};
use crate::execution::command::CommandExecutor;
use crate::execution::process::ProcessRunner;
use crate::matrix::TestMatrix;
use crate::platform::PlatformInfo;
use crate::release::{ReleaseOptions, ReleasePipeline, ReleaseReport};
use crate::results::{ExecutionReport, TaskOutcome, TaskStatus};
use crate::targets::list_targets;
use crate::task_graph::{ExecutionPlan, TaskGraph};
use crate::tasks::get_task_color;
use crate::types::{DroverError, DroverResult};

/// Configuration for the task runner
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskRunnerConfig {
    /// Confirmation to pass the release inspection gate
    pub confirm_release: bool,
}

/// Facts gathered while a plan runs that later tasks may rely on
#[derive(Debug, Default)]
struct RunState {
    matrix_passed: bool,
    release: Option<ReleaseReport>,
}

/// Runs the tasks of an execution plan in order
pub struct TaskRunner<'a> {
    root: &'a Path,
    workspace: &'a WorkspaceConfig,
    graph: &'a TaskGraph,
    runner: &'a dyn ProcessRunner,
    config: TaskRunnerConfig,
    platform: PlatformInfo,
}

impl<'a> TaskRunner<'a> {
    pub fn new(
        root: &'a Path,
        workspace: &'a WorkspaceConfig,
        graph: &'a TaskGraph,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            root,
            workspace,
            graph,
            runner,
            config: TaskRunnerConfig::default(),
            platform: PlatformInfo::current(),
        }
    }

    pub fn with_config(mut self, config: TaskRunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    /// Execute every task in `plan`, stopping at the first failure
    pub async fn run(&self, plan: &ExecutionPlan) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut state = RunState::default();
        let mut tasks = plan.iter();

        for name in tasks.by_ref() {
            match self.run_task(name, &mut state) {
                Ok(()) => {
                    report.outcomes.push(TaskOutcome {
                        name: name.to_string(),
                        status: TaskStatus::Succeeded,
                    });
                }
                Err(err) => {
                    println!("└─ {} {}", "✗".red().bold(), err.to_string().red());
                    report.outcomes.push(TaskOutcome {
                        name: name.to_string(),
                        status: TaskStatus::Failed,
                    });
                    report.failure = Some(err);
                    break;
                }
            }
        }

        for name in tasks {
            debug!(task = name, "skipped after earlier failure");
            report.outcomes.push(TaskOutcome {
                name: name.to_string(),
                status: TaskStatus::NotRun,
            });
        }

        report.release = state.release;
        report
    }

    fn run_task(&self, name: &str, state: &mut RunState) -> DroverResult<()> {
        let task = self
            .graph
            .get(name)
            .ok_or_else(|| DroverError::UnknownTask {
                name: name.to_string(),
            })?;

        if task.is_organizational() {
            debug!(task = name, "no command, prerequisites only");
            return Ok(());
        }

        println!();
        println!(
            "┌─ {}",
            format!("Running task '{}'", name)
                .color(get_task_color(name))
                .bold()
        );
        if let Some(description) = &task.description {
            println!("│  {}", description.bright_black());
        }

        info!(task = name, "starting task");
        if let Some(builtin) = task.builtin {
            self.run_builtin(task, builtin, state)?;
        } else {
            self.run_command(task)?;
        }

        println!("└─ {} {}", "✓".green().bold(), format!("{} done", name).green());
        Ok(())
    }

    fn run_command(&self, task: &TaskConfig) -> DroverResult<()> {
        let environment;
        let mut executor = CommandExecutor::new(self.root, self.runner, &task.name);
        if task.use_environment {
            environment = self.declared_environment();
            executor = executor.with_environment(&environment);
        }

        if let Some(script) = &task.script {
            executor.execute_script(script)
        } else if let Some(command) = &task.command {
            executor.execute_task_command(command)
        } else {
            Ok(())
        }
    }

    /// The configured environment, assumed provisioned by an earlier task
    fn declared_environment(&self) -> Environment {
        let path = &self.workspace.environment.path;
        Environment {
            path: if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path)
            },
            groups: BTreeSet::new(),
            created: false,
            platform: self.platform,
        }
    }

    fn environment_manager(&self) -> EnvironmentManager<'_> {
        EnvironmentManager::new(self.root, self.runner, &self.workspace.environment)
            .with_platform(self.platform)
    }

    fn run_builtin(
        &self,
        task: &TaskConfig,
        builtin: Builtin,
        state: &mut RunState,
    ) -> DroverResult<()> {
        match builtin {
            Builtin::ListTargets => {
                for target in list_targets(self.graph, &self.workspace.hidden)? {
                    println!("{}", target);
                }
            }
            Builtin::Setup => {
                self.environment_manager()
                    .install_active(&self.workspace.setup)?;
            }
            Builtin::UnitTests => {
                let coverage = &self.workspace.coverage;
                let report = CoverageRunner::new(self.root, self.runner, coverage)
                    .run_tests(&coverage.targets, coverage.threshold)?
                    .into_result(&task.name)?;
                if let Some(measured) = report.coverage.measured {
                    println!(
                        "│  {} {:.2}% (required {:.2}%)",
                        "coverage".bright_black(),
                        measured,
                        report.coverage.threshold
                    );
                }
            }
            Builtin::Environment => {
                let groups = self.workspace.environment.groups.iter().cloned().collect();
                let environment = self
                    .environment_manager()
                    .ensure(&self.workspace.environment.path, &groups)?;
                if environment.created {
                    println!("│  created {}", environment.path.display());
                }
            }
            Builtin::TestMatrix => {
                TestMatrix::new(self.root, self.runner, &self.workspace.matrix).run(&task.name)?;
                state.matrix_passed = true;
            }
            Builtin::Release => {
                let options = ReleaseOptions {
                    confirmed: self.config.confirm_release,
                    tests_already_passed: state.matrix_passed,
                };
                let report = ReleasePipeline::new(self.root, self.runner, self.workspace)
                    .with_platform(self.platform)
                    .run(&options)?;
                if let Some(version) = &report.version {
                    println!("│  released version {}", version.cyan());
                }
                state.release = Some(report);
            }
        }
        Ok(())
    }
}
