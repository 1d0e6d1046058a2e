use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{DroverError, DroverResult};

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Settings read from `.drover/drover.yml` (or `.drover/drover.toml`)
#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct WorkspaceConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub environment: EnvironmentConfig,
    pub setup: SetupConfig,
    pub coverage: CoverageConfig,
    pub matrix: MatrixConfig,
    pub release: ReleaseConfig,
    /// Glob patterns of task names that are internal bookkeeping and never listed
    pub hidden: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            environment: EnvironmentConfig::default(),
            setup: SetupConfig::default(),
            coverage: CoverageConfig::default(),
            matrix: MatrixConfig::default(),
            release: ReleaseConfig::default(),
            hidden: strings(&["*__"]),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct EnvironmentConfig {
    /// Location of the environment, relative to the workspace root
    pub path: PathBuf,
    pub groups: Vec<String>,
    /// Creation command; the environment path is appended
    pub create: Vec<String>,
    /// Installer resolved inside the environment's executable directory
    pub installer: Vec<String>,
    /// Package installed in editable mode with the requested groups as extras
    pub editable_target: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("venv"),
            groups: strings(&["core", "docs"]),
            create: strings(&["python3", "-m", "venv"]),
            installer: strings(&["pip", "install"]),
            editable_target: ".".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SetupConfig {
    pub groups: Vec<String>,
    /// Installer of the currently active environment
    pub installer: Vec<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            groups: strings(&["tests"]),
            installer: strings(&["pip", "install", "-U"]),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CoverageConfig {
    /// Minimum aggregate branch coverage, in percent
    pub threshold: f64,
    pub targets: Vec<PathBuf>,
    /// Instrumented test command; each target is appended in turn
    pub command: Vec<String>,
    pub doctests: bool,
    pub doctest_flag: String,
    /// Clears previous measurements before the first target runs
    pub erase_command: Vec<String>,
    /// Prints the aggregate percentage on stdout
    pub total_command: Vec<String>,
    /// Where the coverage report artifact is written
    pub report: PathBuf,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            targets: vec![PathBuf::from("tests"), PathBuf::from("src")],
            command: strings(&["coverage", "run", "--branch", "--append", "-m", "pytest"]),
            doctests: true,
            doctest_flag: "--doctest-modules".to_string(),
            erase_command: strings(&["coverage", "erase"]),
            total_command: strings(&["coverage", "report", "--format=total"]),
            report: PathBuf::from(".drover/coverage.json"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MatrixConfig {
    pub runtimes: Vec<String>,
    /// Per-runtime test command; the runtime name is appended
    pub command: Vec<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            runtimes: strings(&["py37", "py38", "py39", "py310", "py311"]),
            command: strings(&["tox", "-e"]),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Halt after packaging until a human confirms
    #[default]
    Manual,
    Disabled,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum BumpConfig {
    /// External version updater
    Command(Vec<String>),
    /// Next patch version computed from the repository's `v*` tags
    GitTags(GitTagsConfig),
}

impl Default for BumpConfig {
    fn default() -> Self {
        BumpConfig::GitTags(GitTagsConfig::default())
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct GitTagsConfig {
    pub version_file: PathBuf,
    pub allow_local_changes: bool,
    pub push: bool,
    pub remote: String,
    pub branch: String,
}

impl Default for GitTagsConfig {
    fn default() -> Self {
        Self {
            version_file: PathBuf::from("version.py"),
            allow_local_changes: false,
            push: true,
            remote: "origin".to_string(),
            branch: "master".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ReleaseConfig {
    /// Dependency groups the release environment needs
    pub groups: Vec<String>,
    pub dist_dir: PathBuf,
    /// Build command; `--outdir <distDir>` is appended
    pub build: Vec<String>,
    /// Written as a single-key map, e.g. `bump: { command: [...] }`
    #[serde(with = "serde_yaml::with::singleton_map")]
    #[schemars(with = "BumpConfig")]
    pub bump: BumpConfig,
    /// Upload command; every built artifact is appended
    pub upload: Vec<String>,
    pub gate: GateMode,
    pub state_file: PathBuf,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            groups: strings(&["core", "docs"]),
            dist_dir: PathBuf::from("dist"),
            build: strings(&["python3", "-m", "build"]),
            bump: BumpConfig::default(),
            upload: strings(&["twine", "upload"]),
            gate: GateMode::Manual,
            state_file: PathBuf::from(".drover/release-state.json"),
        }
    }
}

impl WorkspaceConfig {
    /// Reject settings that would only fail later, halfway through a plan
    pub fn validate(&self) -> DroverResult<()> {
        let threshold = self.coverage.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(DroverError::Config(format!(
                "coverage.threshold must be between 0 and 100, got {}",
                threshold
            )));
        }

        let mut commands = vec![
            ("environment.create", &self.environment.create),
            ("environment.installer", &self.environment.installer),
            ("setup.installer", &self.setup.installer),
            ("coverage.command", &self.coverage.command),
            ("coverage.totalCommand", &self.coverage.total_command),
            ("matrix.command", &self.matrix.command),
            ("release.build", &self.release.build),
            ("release.upload", &self.release.upload),
        ];
        if let BumpConfig::Command(command) = &self.release.bump {
            commands.push(("release.bump.command", command));
        }
        for (field, argv) in commands {
            if argv.is_empty() {
                return Err(DroverError::Config(format!("{} must not be empty", field)));
            }
        }

        Ok(())
    }
}

pub fn parse_workspace_config(yaml_str: &str) -> DroverResult<WorkspaceConfig> {
    let config: WorkspaceConfig = serde_yaml::from_str(yaml_str)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_workspace_config_toml(toml_str: &str) -> DroverResult<WorkspaceConfig> {
    let config: WorkspaceConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// JSON schema of the settings file
pub fn workspace_config_schema() -> DroverResult<String> {
    let schema = schemars::schema_for!(WorkspaceConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_workspace_config("{}").unwrap();
        assert_eq!(config, WorkspaceConfig::default());
        assert_eq!(config.coverage.threshold, 10.0);
        assert_eq!(config.environment.path, PathBuf::from("venv"));
        assert_eq!(config.hidden, vec!["*__".to_string()]);
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let yaml = r#"
environment:
  path: .venv
coverage:
  threshold: 85
release:
  gate: disabled
  bump:
    command: ["bump2version", "patch"]
"#;
        let config = parse_workspace_config(yaml).unwrap();
        assert_eq!(config.environment.path, PathBuf::from(".venv"));
        assert_eq!(config.environment.groups, vec!["core", "docs"]);
        assert_eq!(config.coverage.threshold, 85.0);
        assert_eq!(config.release.gate, GateMode::Disabled);
        assert_eq!(
            config.release.bump,
            BumpConfig::Command(vec!["bump2version".to_string(), "patch".to_string()])
        );
    }

    #[test]
    fn test_git_tags_bump() {
        let yaml = "release:\n  bump:\n    gitTags:\n      versionFile: pkg/version.py\n      push: false\n";
        let config = parse_workspace_config(yaml).unwrap();
        match config.release.bump {
            BumpConfig::GitTags(git) => {
                assert_eq!(git.version_file, PathBuf::from("pkg/version.py"));
                assert!(!git.push);
                assert_eq!(git.remote, "origin");
            }
            other => panic!("unexpected bump config {:?}", other),
        }
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let err = parse_workspace_config("coverage:\n  threshold: 120\n").unwrap_err();
        assert!(err.to_string().contains("coverage.threshold"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = parse_workspace_config("matrix:\n  command: []\n").unwrap_err();
        assert!(err.to_string().contains("matrix.command"));
    }

    #[test]
    fn test_toml_settings() {
        let toml_str = "[coverage]\nthreshold = 42.5\ntargets = [\"tests\"]\n";
        let config = parse_workspace_config_toml(toml_str).unwrap();
        assert_eq!(config.coverage.threshold, 42.5);
        assert_eq!(config.coverage.targets, vec![PathBuf::from("tests")]);
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = workspace_config_schema().unwrap();
        assert!(schema.contains("environment"));
        assert!(schema.contains("distDir"));
    }
}
