//! `.bazelpath.toml` settings.
//!
//! Read once at startup and turned into an immutable [`NamespaceConfig`];
//! never re-read while mounted.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bazelpath_kernel::{ConfigError, NamespaceConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_CONFIG;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} has to be set in the settings file")]
    Missing(&'static str),

    #[error("invalid build ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Namespace(#[from] ConfigError),
}

/// Settings file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// GOPATH exposed to the toolchain (`~` is expanded).
    pub go_path: String,
    /// Virtual prefix of first-party import paths.
    pub go_pkg_prefix: String,
    /// IDE command line, launched after mounting when non-empty.
    pub go_ide_cmd: String,
    /// Vendor roots, workspace-relative, in precedence order.
    pub vendor_dirs: Vec<String>,
    /// Pass-through roots, workspace-relative.
    pub fall_through_dirs: Vec<String>,
    /// Ignore patterns (regular expressions).
    pub ignore_dirs: Vec<String>,
    pub build: Option<BuildSettings>,
}

/// `[build]` table, used by build-on-mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Bazel rule kinds whose targets are built.
    pub rules: Vec<String>,
    /// Top-level directories skipped (regular expressions).
    pub ignore_dirs: Vec<String>,
}

impl BuildSettings {
    pub fn ignore_patterns(&self) -> Result<Vec<Regex>, SettingsError> {
        self.ignore_dirs
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| SettingsError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Write the commented default settings file.
    ///
    /// Returns `false` without touching anything if the file already exists.
    pub fn write_default(path: &Path) -> Result<bool, SettingsError> {
        let write_error = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(write_error(e)),
        };
        file.write_all(DEFAULT_CONFIG.as_bytes()).map_err(write_error)?;
        Ok(true)
    }

    /// Expanded GOPATH; relative paths are taken from the workspace.
    pub fn go_path(&self, workspace: &Path) -> Result<PathBuf, SettingsError> {
        if self.go_path.trim().is_empty() {
            return Err(SettingsError::Missing("go_path"));
        }
        let expanded = PathBuf::from(shellexpand::tilde(self.go_path.trim()).as_ref());
        Ok(workspace.join(expanded))
    }

    pub fn ide_command(&self) -> Option<&str> {
        Some(self.go_ide_cmd.trim()).filter(|cmd| !cmd.is_empty())
    }

    /// Build the immutable namespace configuration for a workspace.
    pub fn namespace_config(&self, workspace: &Path) -> Result<NamespaceConfig, SettingsError> {
        let prefix = self.go_pkg_prefix.trim();
        if prefix.is_empty() {
            return Err(SettingsError::Missing("go_pkg_prefix"));
        }

        let config = NamespaceConfig::builder(prefix, workspace)
            .vendor_roots(self.vendor_dirs.iter().map(|dir| trim_root(dir)))
            .pass_through_roots(self.fall_through_dirs.iter().map(|dir| trim_root(dir)))
            .ignore_patterns(self.ignore_dirs.iter().cloned())
            .build()?;
        Ok(config)
    }
}

/// `third-party-go/vendor/` and `third-party-go/vendor` name the same root.
fn trim_root(dir: &str) -> PathBuf {
    PathBuf::from(dir.trim().trim_end_matches('/'))
}
