//! Result types for workspace operations
//!
//! This module contains the result types returned by workspace manager operations,
//! providing a centralized location for output structures.

use std::collections::HashMap;

use colored::Color;

use crate::release::ReleaseReport;
use crate::task_graph::ExecutionPlan;
use crate::types::{DroverError, DroverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Skipped because an earlier task in the plan failed
    NotRun,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub name: String,
    pub status: TaskStatus,
}

/// Per-task record of one plan execution
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<TaskOutcome>,
    pub failure: Option<DroverError>,
    pub release: Option<ReleaseReport>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.name == name)
            .map(|outcome| outcome.status)
    }

    pub fn names_with(&self, status: TaskStatus) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .map(|outcome| outcome.name.as_str())
            .collect()
    }

    /// The failure that aborted the plan, if any
    pub fn into_result(self) -> DroverResult<ExecutionReport> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Result of task execution planning
#[derive(Debug)]
pub struct TaskPlanResult {
    pub plan: ExecutionPlan,
    pub task_colors: HashMap<String, Color>,
}

/// Result of getting the dependency graph
#[derive(Debug)]
pub struct DependencyGraphResult {
    /// Every task with its declared prerequisites, sorted by name
    pub tasks: Vec<(String, Vec<String>)>,
    /// Each cycle as a closed dependency path, e.g. `a -> b -> a`
    pub cycles: Vec<Vec<String>>,
}
