use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::DroverResult;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    /// Run through `sh -c`
    Single(String),
    /// Program followed by its arguments, no shell involved
    Multiple(Vec<String>),
}

/// Behaviours implemented inside drover rather than by an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Builtin {
    ListTargets,
    Setup,
    UnitTests,
    Environment,
    TestMatrix,
    Release,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub description: Option<String>,
    pub script: Option<String>,
    pub command: Option<Command>,
    pub builtin: Option<Builtin>,
    pub dependencies: Option<Vec<String>>,
    /// Marks an internal bookkeeping task. Descriptive only: it is shown in plan output
    /// and has no effect on resolution or execution
    #[serde(default)]
    pub phony: bool,
    /// Run with the provisioned environment's executables first on `PATH`
    #[serde(default)]
    pub use_environment: bool,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            script: None,
            command: None,
            builtin: None,
            dependencies: None,
            phony: false,
            use_environment: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = Some(dependencies.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_builtin(mut self, builtin: Builtin) -> Self {
        self.builtin = Some(builtin);
        self
    }

    pub fn phony(mut self) -> Self {
        self.phony = true;
        self
    }

    pub fn dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or_default()
    }

    /// True when running the task has no effect beyond its prerequisites
    pub fn is_organizational(&self) -> bool {
        self.command.is_none() && self.script.is_none() && self.builtin.is_none()
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TasksFileConfig {
    pub description: Option<String>,
    pub tasks: Vec<TaskConfig>,
}

pub fn parse_tasks_config(yaml_str: &str) -> DroverResult<TasksFileConfig> {
    let config: TasksFileConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

fn argv(parts: &[&str]) -> Command {
    Command::Multiple(parts.iter().map(|p| p.to_string()).collect())
}

/// The task set every workspace starts with; task files may replace any of them
pub fn default_tasks() -> Vec<TaskConfig> {
    vec![
        TaskConfig::new("no_targets__").phony(),
        TaskConfig::new("list")
            .with_description("Print every invocable task name")
            .with_dependencies(&["no_targets__"])
            .with_builtin(Builtin::ListTargets)
            .phony(),
        TaskConfig::new("setup")
            .with_description("Install the declared dependency groups into the active environment")
            .with_builtin(Builtin::Setup),
        TaskConfig::new("test")
            .with_description("Alias for unit")
            .with_dependencies(&["unit"])
            .phony(),
        TaskConfig::new("unit")
            .with_description("Run the unit tests under coverage and enforce the threshold")
            .with_builtin(Builtin::UnitTests),
        TaskConfig::new("coverage-html")
            .with_description("Render the coverage report as HTML")
            .with_dependencies(&["unit"])
            .with_command(argv(&["coverage", "html"])),
        TaskConfig::new("venv")
            .with_description("Create the isolated environment and install its groups")
            .with_builtin(Builtin::Environment),
        TaskConfig::new("tox")
            .with_description("Run the test suite on every supported runtime")
            .with_dependencies(&["venv"])
            .with_builtin(Builtin::TestMatrix),
        TaskConfig {
            use_environment: true,
            ..TaskConfig::new("docs")
                .with_description("Build the documentation")
                .with_dependencies(&["venv"])
                .with_command(argv(&["sphinx-build", "-b", "html", "docs", "docs/_build/html"]))
        },
        TaskConfig::new("release")
            .with_description("Test, version, build and publish the package")
            .with_dependencies(&["tox", "venv"])
            .with_builtin(Builtin::Release),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_file_with_both_command_forms() {
        let yaml = r#"
tasks:
  - name: lint
    command: "flake8 src"
  - name: fmt
    command: ["black", "--check", "src"]
    dependencies: [lint]
    useEnvironment: true
"#;
        let config = parse_tasks_config(yaml).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(
            config.tasks[0].command,
            Some(Command::Single("flake8 src".to_string()))
        );
        assert_eq!(
            config.tasks[1].command,
            Some(Command::Multiple(vec![
                "black".to_string(),
                "--check".to_string(),
                "src".to_string()
            ]))
        );
        assert_eq!(config.tasks[1].dependencies(), ["lint".to_string()]);
        assert!(config.tasks[1].use_environment);
        assert!(!config.tasks[1].phony);
    }

    #[test]
    fn test_parse_builtin_task() {
        let yaml = "tasks:\n  - name: ship\n    builtin: release\n    dependencies: [tox]\n";
        let config = parse_tasks_config(yaml).unwrap();
        assert_eq!(config.tasks[0].builtin, Some(Builtin::Release));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = "tasks:\n  - name: x\n    comand: oops\n";
        assert!(parse_tasks_config(yaml).is_err());
    }

    #[test]
    fn test_default_tasks_cover_the_command_surface() {
        let tasks = default_tasks();
        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        for expected in [
            "list",
            "setup",
            "test",
            "unit",
            "coverage-html",
            "venv",
            "tox",
            "docs",
            "release",
        ] {
            assert!(names.contains(&expected), "missing default task {}", expected);
        }

        let release = tasks.iter().find(|t| t.name == "release").unwrap();
        assert_eq!(release.dependencies(), ["tox".to_string(), "venv".to_string()]);

        let helper = tasks.iter().find(|t| t.name == "no_targets__").unwrap();
        assert!(helper.phony);
        assert!(helper.is_organizational());
    }
}
