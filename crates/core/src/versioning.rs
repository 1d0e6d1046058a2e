//! Package version bumps driven by the repository's `vX.Y.Z` tags
//!
//! The next version is the patch successor of the highest tagged version. The bump refuses
//! to run on a working tree with local or unpushed changes unless configured otherwise,
//! and does nothing when HEAD is already the tagged version.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::configs::workspace::GitTagsConfig;
use crate::execution::process::{Invocation, ProcessRunner};
use crate::types::{DroverError, DroverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn bump_patch(&self) -> Self {
        Self::new(self.major, self.minor, self.patch + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DroverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DroverError::Version(format!("'{}' is not a MAJOR.MINOR.PATCH version", s));
        let mut parts = s.trim().split('.');
        let mut next = || -> DroverResult<u64> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// Highest version among `v`-prefixed tags, one tag per line; other tags are ignored
pub fn highest_tag_version(tags: &str) -> Option<Version> {
    tags.lines()
        .filter_map(|tag| tag.trim().strip_prefix('v'))
        .filter_map(|version| version.parse::<Version>().ok())
        .max()
}

/// Extract the version from a `version = "X.Y.Z"` file
pub fn read_version_file(contents: &str) -> Option<Version> {
    contents.lines().find_map(|line| {
        let value = line.trim().strip_prefix("version")?.trim_start();
        let value = value.strip_prefix('=')?.trim();
        value.trim_matches(|c| c == '"' || c == '\'').parse().ok()
    })
}

pub fn render_version_file(version: &Version) -> String {
    format!("version = \"{}\"\n", version)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpOutcome {
    /// HEAD already matches the highest tag; nothing was changed
    AlreadyTagged(Version),
    Bumped(Version),
}

impl BumpOutcome {
    pub fn version(&self) -> Version {
        match self {
            BumpOutcome::AlreadyTagged(v) | BumpOutcome::Bumped(v) => *v,
        }
    }
}

pub struct GitTagBumper<'a> {
    root: &'a Path,
    runner: &'a dyn ProcessRunner,
    config: &'a GitTagsConfig,
}

impl<'a> GitTagBumper<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn ProcessRunner, config: &'a GitTagsConfig) -> Self {
        Self {
            root,
            runner,
            config,
        }
    }

    fn git_invocation(&self, args: &[&str]) -> Invocation {
        Invocation::new("git")
            .args(args.iter().copied())
            .current_dir(self.root)
    }

    /// Run a git query and return its trimmed output
    fn query(&self, args: &[&str]) -> DroverResult<String> {
        let invocation = self.git_invocation(args);
        let output = self.runner.capture(&invocation)?;
        if !output.status.success() {
            return Err(DroverError::Version(format!(
                "`{}` exited with {:?}",
                invocation.command_line(),
                output.status.code()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    fn run(&self, args: &[&str]) -> DroverResult<()> {
        let invocation = self.git_invocation(args);
        let status = self.runner.run(&invocation)?;
        if !status.success() {
            return Err(DroverError::Version(format!(
                "`{}` exited with {:?}",
                invocation.command_line(),
                status.code()
            )));
        }
        Ok(())
    }

    fn version_file(&self) -> PathBuf {
        self.root.join(&self.config.version_file)
    }

    pub fn bump(&self) -> DroverResult<BumpOutcome> {
        let allow_local = self.config.allow_local_changes;

        if !allow_local && !self.query(&["diff-index", "--name-only", "HEAD", "--"])?.is_empty() {
            return Err(DroverError::Version("Local changes found".to_string()));
        }

        self.run(&["fetch"])?;
        let upstream = format!("{}/{}", self.config.remote, self.config.branch);
        if !allow_local && !self.query(&["diff", "--name-only", "HEAD", &upstream])?.is_empty() {
            return Err(DroverError::Version(format!(
                "Local changes not pushed to {}",
                upstream
            )));
        }

        let tags = self.query(&["tag"])?;
        let highest = highest_tag_version(&tags);
        let current = highest.unwrap_or(Version::new(0, 1, 0));

        if highest.is_some() {
            let tag = format!("v{}", current);
            let since_tag = self.query(&["diff", "--name-only", &tag, "HEAD"])?;
            let recorded = std::fs::read_to_string(self.version_file())
                .ok()
                .and_then(|contents| read_version_file(&contents));
            if since_tag.is_empty() && recorded == Some(current) {
                info!(version = %current, "HEAD is already tagged, no new tag needed");
                return Ok(BumpOutcome::AlreadyTagged(current));
            }
        }

        let next = current.bump_patch();
        let version_file = self.version_file();
        if let Some(parent) = version_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&version_file, render_version_file(&next))?;

        let relative = self.config.version_file.to_string_lossy().to_string();
        self.run(&["add", &relative])?;
        let staged = self.query(&["diff", "--cached", "--name-only", "--", &relative])?;
        if staged.is_empty() {
            info!(file = %relative, "version file is already up to date");
        } else {
            let message = format!("Updating version to {}", next);
            self.run(&["commit", &relative, "-m", &message])?;
        }

        if self.config.push {
            let refspec = format!("HEAD:{}", self.config.branch);
            self.run(&["push", &self.config.remote, &refspec])?;
        }

        let new_tag = format!("v{}", next);
        self.run(&["tag", &new_tag])?;
        if self.config.push {
            self.run(&["push", &self.config.remote, &new_tag])?;
        }

        info!(version = %next, "version bumped");
        Ok(BumpOutcome::Bumped(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::process::testing::RecordingRunner;

    #[test]
    fn test_version_parsing_and_ordering() {
        let v: Version = "1.10.0".parse().unwrap();
        assert_eq!(v, Version::new(1, 10, 0));
        assert!(v > "1.9.7".parse::<Version>().unwrap());
        assert!("1.2".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("1.x.3".parse::<Version>().is_err());
        assert_eq!(v.bump_patch().to_string(), "1.10.1");
    }

    #[test]
    fn test_highest_tag_uses_semantic_order() {
        let tags = "v1.0.0\nv1.9.0\nv1.10.0\nrelease-7\nv2.0.0-rc1\n";
        assert_eq!(highest_tag_version(tags), Some(Version::new(1, 10, 0)));
        assert_eq!(highest_tag_version("nightly\n"), None);
    }

    #[test]
    fn test_version_file_round_trip() {
        let contents = render_version_file(&Version::new(0, 4, 2));
        assert_eq!(contents, "version = \"0.4.2\"\n");
        assert_eq!(read_version_file(&contents), Some(Version::new(0, 4, 2)));
        assert_eq!(read_version_file("# nothing here\n"), None);
    }

    fn config() -> GitTagsConfig {
        GitTagsConfig {
            version_file: PathBuf::from("pkg/version.py"),
            ..GitTagsConfig::default()
        }
    }

    #[test]
    fn test_bump_writes_commits_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new()
            .respond("git tag", "v0.1.0\nv0.1.4\n")
            .respond("git diff --name-only v0.1.4 HEAD", "src/lib.py")
            .respond("--cached", "pkg/version.py");
        let config = config();

        let outcome = GitTagBumper::new(dir.path(), &runner, &config).bump().unwrap();

        assert_eq!(outcome, BumpOutcome::Bumped(Version::new(0, 1, 5)));
        let written = std::fs::read_to_string(dir.path().join("pkg/version.py")).unwrap();
        assert_eq!(written, "version = \"0.1.5\"\n");

        let lines = runner.command_lines();
        let position = |needle: &str| lines.iter().position(|l| l == needle).unwrap();
        assert!(
            position("git add pkg/version.py")
                < position("git commit pkg/version.py -m 'Updating version to 0.1.5'")
        );
        assert!(position("git tag v0.1.5") > position("git push origin HEAD:master"));
        assert_eq!(lines.last().map(String::as_str), Some("git push origin v0.1.5"));
    }

    #[test]
    fn test_already_tagged_head_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/version.py"), "version = \"2.3.4\"\n").unwrap();
        let runner = RecordingRunner::new().respond("git tag", "v2.3.4\n");
        let config = config();

        let outcome = GitTagBumper::new(dir.path(), &runner, &config).bump().unwrap();

        assert_eq!(outcome, BumpOutcome::AlreadyTagged(Version::new(2, 3, 4)));
        assert_eq!(runner.count("git commit"), 0);
        assert_eq!(runner.count("git push"), 0);
    }

    #[test]
    fn test_local_changes_block_the_bump() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("diff-index", "README.md");
        let config = config();

        let err = GitTagBumper::new(dir.path(), &runner, &config).bump().unwrap_err();
        assert!(err.to_string().contains("Local changes found"));
        assert_eq!(runner.count("git fetch"), 0);
    }

    #[test]
    fn test_unpushed_changes_block_the_bump() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("HEAD origin/master", "src/new.py");
        let config = config();

        let err = GitTagBumper::new(dir.path(), &runner, &config).bump().unwrap_err();
        assert!(err.to_string().contains("not pushed to origin/master"));
    }

    #[test]
    fn test_first_release_without_tags_and_without_push() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new().respond("--cached", "pkg/version.py");
        let config = GitTagsConfig {
            push: false,
            ..config()
        };

        let outcome = GitTagBumper::new(dir.path(), &runner, &config).bump().unwrap();

        assert_eq!(outcome.version(), Version::new(0, 1, 1));
        assert_eq!(runner.count("git push"), 0);
        assert_eq!(runner.count("git tag v0.1.1"), 1);
    }
}
