//! Platform details needed to locate executables inside an isolated environment

use std::env;
use std::path::{Path, PathBuf};

/// Layout of an isolated environment on the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Directory inside the environment holding its executables (e.g., "bin", "Scripts")
    pub env_bin_dir: &'static str,
    /// Suffix appended to executable names (e.g., "", ".exe")
    pub exe_suffix: &'static str,
}

impl PlatformInfo {
    /// Detect the current platform
    pub fn current() -> Self {
        Self::from_os(env::consts::OS)
    }

    /// Create platform info from an OS name as reported by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self {
                env_bin_dir: "Scripts",
                exe_suffix: ".exe",
            },
            _ => Self {
                env_bin_dir: "bin",
                exe_suffix: "",
            },
        }
    }

    /// Executable directory of the environment rooted at `env_path`
    pub fn bin_dir(&self, env_path: &Path) -> PathBuf {
        env_path.join(self.env_bin_dir)
    }

    /// Full path of `program` inside the environment rooted at `env_path`
    pub fn executable(&self, env_path: &Path, program: &str) -> PathBuf {
        self.bin_dir(env_path)
            .join(format!("{}{}", program, self.exe_suffix))
    }
}
