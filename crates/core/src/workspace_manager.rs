//! High-level workspace management interface
//!
//! This module provides the [`WorkspaceManager`] which serves as the primary interface
//! for all drover operations. It loads the workspace settings and task declarations,
//! builds the task graph, and runs plans against it.
//!
//! The WorkspaceManager abstracts away the complexity of:
//! - Loading and merging configuration files
//! - Task graph construction and cycle detection
//! - Execution planning and fail-fast task execution
//!
//! ## Example
//!
//! ```rust,no_run
//! use drover_core::workspace_manager::{RunOptions, WorkspaceManager, WorkspaceManagerConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> drover_core::types::DroverResult<()> {
//! let manager = WorkspaceManager::new(WorkspaceManagerConfig {
//!     workspace_root: PathBuf::from("."),
//! }).await?;
//!
//! // List invocable tasks
//! let targets = manager.list_targets()?;
//!
//! // Get execution plan for a task
//! let plan = manager.get_execution_plan("release")?;
//!
//! // Run a task
//! manager.run_task("test", RunOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::configs::{
    tasks::{default_tasks, parse_tasks_config, TaskConfig},
    workspace::{parse_workspace_config, parse_workspace_config_toml, WorkspaceConfig},
};
use crate::execution::process::{ProcessRunner, SystemProcessRunner};
use crate::execution::runner::{TaskRunner, TaskRunnerConfig};
use crate::results::{DependencyGraphResult, ExecutionReport, TaskPlanResult};
use crate::targets;
use crate::task_graph::{ExecutionPlan, TaskGraph};
use crate::tasks::task_colors;
use crate::types::{DroverError, DroverResult};

/// Directory under the workspace root holding drover's configuration
pub const CONFIG_DIR: &str = ".drover";

/// High-level workspace manager that encapsulates all workspace operations
pub struct WorkspaceManager {
    pub root: PathBuf,
    pub workspace_config: WorkspaceConfig,
    pub graph: TaskGraph,
    runner: Box<dyn ProcessRunner>,
}

/// Configuration for initializing a workspace manager
pub struct WorkspaceManagerConfig {
    pub workspace_root: PathBuf,
}

/// Per-run switches supplied by the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    pub confirm_release: bool,
}

impl WorkspaceManager {
    /// Initialize a new workspace manager from the given workspace root
    pub async fn new(config: WorkspaceManagerConfig) -> DroverResult<Self> {
        let root = config.workspace_root;

        // Load workspace settings
        let workspace_config = Self::load_workspace_config(&root).await?;

        // Load task declarations on top of the built-in set
        let mut tasks = default_tasks();
        tasks.extend(Self::load_task_configs(&root).await?);

        Ok(Self {
            graph: TaskGraph::new(tasks),
            root,
            workspace_config,
            runner: Box::new(SystemProcessRunner),
        })
    }

    /// Replace the process runner used to start external programs
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Sorted names a user can invoke
    pub fn list_targets(&self) -> DroverResult<Vec<String>> {
        targets::list_targets(&self.graph, &self.workspace_config.hidden)
    }

    /// Get execution plan for a task
    pub fn get_execution_plan(&self, task: &str) -> DroverResult<TaskPlanResult> {
        let plan = self.graph.resolve(task)?;
        let task_colors = task_colors(plan.iter());
        Ok(TaskPlanResult { plan, task_colors })
    }

    /// Resolve `task` and execute its plan
    pub async fn run_task(&self, task: &str, options: RunOptions) -> DroverResult<ExecutionReport> {
        // Resolution errors surface before anything runs
        let plan: ExecutionPlan = self.graph.resolve(task)?;
        debug!(task, plan = ?plan.tasks, "resolved execution plan");

        TaskRunner::new(
            &self.root,
            &self.workspace_config,
            &self.graph,
            self.runner.as_ref(),
        )
        .with_config(TaskRunnerConfig {
            confirm_release: options.confirm_release,
        })
        .run(&plan)
        .await
        .into_result()
    }

    /// Get dependency graph information
    pub fn get_dependency_graph(&self) -> DroverResult<DependencyGraphResult> {
        let tasks = self
            .graph
            .list_all()
            .into_iter()
            .map(|name| {
                let prerequisites = self.graph.prerequisites(&name).to_vec();
                (name, prerequisites)
            })
            .collect();

        Ok(DependencyGraphResult {
            tasks,
            cycles: self.graph.cycle_paths(),
        })
    }

    // Private helper methods

    async fn load_workspace_config(workspace_root: &Path) -> DroverResult<WorkspaceConfig> {
        let config_dir = workspace_root.join(CONFIG_DIR);
        let yaml_path = config_dir.join("drover.yml");
        let toml_path = config_dir.join("drover.toml");

        let config = if yaml_path.exists() {
            let content = tokio::fs::read_to_string(&yaml_path).await?;
            parse_workspace_config(&content).map_err(|e| {
                DroverError::Config(format!(
                    "Failed to parse workspace config {}: {}",
                    yaml_path.display(),
                    e
                ))
            })?
        } else if toml_path.exists() {
            let content = tokio::fs::read_to_string(&toml_path).await?;
            parse_workspace_config_toml(&content).map_err(|e| {
                DroverError::Config(format!(
                    "Failed to parse workspace config {}: {}",
                    toml_path.display(),
                    e
                ))
            })?
        } else {
            debug!(root = %workspace_root.display(), "no workspace config, using defaults");
            WorkspaceConfig::default()
        };

        Ok(config)
    }

    async fn load_task_configs(workspace_root: &Path) -> DroverResult<Vec<TaskConfig>> {
        let tasks_dir = workspace_root.join(CONFIG_DIR).join("tasks");
        if !tasks_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&tasks_dir).await.map_err(|e| {
            DroverError::Config(format!(
                "Failed to read tasks directory {}: {}",
                tasks_dir.display(),
                e
            ))
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if matches!(
                path.extension().and_then(|s| s.to_str()),
                Some("yml") | Some("yaml")
            ) {
                paths.push(path);
            }
        }
        // Later files override earlier ones, so the order must be stable
        paths.sort();

        let mut tasks = Vec::new();
        for path in paths {
            let content = tokio::fs::read_to_string(&path).await?;
            let config = parse_tasks_config(&content).map_err(|e| {
                DroverError::Config(format!(
                    "Failed to parse task config {}: {}",
                    path.display(),
                    e
                ))
            })?;
            debug!(file = %path.display(), count = config.tasks.len(), "loaded task declarations");
            tasks.extend(config.tasks);
        }

        Ok(tasks)
    }
}
