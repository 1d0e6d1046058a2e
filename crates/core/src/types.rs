use std::path::PathBuf;

use thiserror::Error;

/// The main error type for drover operations
#[derive(Debug, Error)]
pub enum DroverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{name}' is not declared")]
    UnknownTask { name: String },

    #[error("Circular dependency detected: {}", render_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Task '{task}' failed with {}", render_status(.status))]
    TaskExecution { task: String, status: Option<i32> },

    #[error("Failed to start '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Coverage measurement failed: {0}")]
    Coverage(String),

    #[error("Failed to provision environment at {}: {reason}", .path.display())]
    EnvironmentProvisioning { path: PathBuf, reason: String },

    #[error("Coverage {measured:.2}% is below the required {threshold:.2}%")]
    CoverageThreshold { measured: f64, threshold: f64 },

    #[error(
        "Release halted at the inspection gate; inspect the artifacts in {} and re-run with confirmation to upload",
        .artifacts_dir.display()
    )]
    InspectionGate { artifacts_dir: PathBuf },

    #[error("Release error: {0}")]
    Release(String),

    #[error("Version error: {0}")]
    Version(String),
}

impl DroverError {
    /// Exit code of the failing process, when the error came from one
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            DroverError::TaskExecution { status, .. } => *status,
            _ => None,
        }
    }
}

fn render_cycle(cycle: &[String]) -> String {
    cycle.join(" -> ")
}

fn render_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Result type alias for drover operations
pub type DroverResult<T> = Result<T, DroverError>;
