//! Project Configuration (trellis.toml)
//!
//! Handles project-level configuration stored in `trellis.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Project configuration from trellis.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Test environment directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentConfig>,

    /// Named output directories (e.g. `persistent-storage = "output/keep"`)
    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub directories: HashMap<String, PathBuf>,

    /// Console reporting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportConfig>,

    /// Check behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ChecksConfig>,
}

/// Directories a test environment resolves paths against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Input data read by tests (default: "data")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_data: Option<PathBuf>,

    /// Reference files compared against (default: "reference")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,

    /// Files written by tests (default: "output")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Console report settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// One line per test instead of one character
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Colorized output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

/// Check settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ChecksConfig {
    /// Copy mismatching files into the `persistent-storage` directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_failures: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(env) = &self.environment {
            validate_path("environment.test_data", env.test_data.as_deref())?;
            validate_path("environment.reference", env.reference.as_deref())?;
            validate_path("environment.output", env.output.as_deref())?;
        }

        for (name, path) in &self.directories {
            validate_directory_name(name)?;
            validate_path(&format!("directories.{}", name), Some(path))?;
        }

        Ok(())
    }

    /// Test data directory, if configured
    pub fn test_data_dir(&self) -> Option<&Path> {
        self.environment
            .as_ref()
            .and_then(|e| e.test_data.as_deref())
    }

    /// Reference data directory, if configured
    pub fn reference_dir(&self) -> Option<&Path> {
        self.environment
            .as_ref()
            .and_then(|e| e.reference.as_deref())
    }

    /// Output directory, if configured
    pub fn output_dir(&self) -> Option<&Path> {
        self.environment.as_ref().and_then(|e| e.output.as_deref())
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if other.environment.is_some() {
            self.environment = other.environment.clone();
        }
        if !other.directories.is_empty() {
            self.directories.extend(other.directories.clone());
        }
        if other.report.is_some() {
            self.report = other.report.clone();
        }
        if other.checks.is_some() {
            self.checks = other.checks.clone();
        }
    }
}

fn validate_path(field: &str, path: Option<&Path>) -> ConfigResult<()> {
    if let Some(path) = path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: "path cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Directory names become path components under the output directory
fn validate_directory_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "directory name".to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigError::InvalidValue {
            field: format!("directories.{}", name),
            reason: "name must be a single path component".to_string(),
        });
    }
    Ok(())
}
