//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, ReportConfig};
use crate::{ConfigError, ConfigResult, PROJECT_CONFIG_FILE};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.trellis/config.toml) - lowest priority
/// 2. Project config (./trellis.toml) - overrides global
/// 3. Environment variables (TRELLIS_*) - overrides project
#[derive(Debug)]
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where trellis.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config file instead of ~/.trellis/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find trellis.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        let global_config = self.global_config_or_default();

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.global_config_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config)
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => {
                    // Reached filesystem root without finding trellis.toml
                    return Ok((None, ProjectConfig::default()));
                }
            }
        }
    }

    /// Global config is optional: a missing or broken file falls back to
    /// defaults, but a broken one is reported
    fn global_config_or_default(&mut self) -> GlobalConfig {
        self.load_global_config().unwrap_or_else(|error| {
            warn!(%error, "ignoring global configuration");
            GlobalConfig::default()
        })
    }

    /// Load global configuration from ~/.trellis/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// - TRELLIS_OUTPUT_DIR=<path>
    /// - TRELLIS_VERBOSE=true|false
    /// - TRELLIS_COLOR=true|false
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(output) = env::var("TRELLIS_OUTPUT_DIR") {
            if output.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "TRELLIS_OUTPUT_DIR".to_string(),
                    reason: "path cannot be empty".to_string(),
                });
            }
            config.environment.get_or_insert_with(Default::default).output =
                Some(PathBuf::from(output));
        }

        if let Ok(verbose) = env::var("TRELLIS_VERBOSE") {
            let report = config.report.get_or_insert_with(ReportConfig::default);
            report.verbose = Some(parse_bool("TRELLIS_VERBOSE", &verbose)?);
        }

        if let Ok(color) = env::var("TRELLIS_COLOR") {
            let report = config.report.get_or_insert_with(ReportConfig::default);
            report.color = Some(parse_bool("TRELLIS_COLOR", &color)?);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

impl Config {
    /// Configuration with no project and no global file
    pub fn empty() -> Self {
        Self {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        }
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has trellis.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Effective test data directory (default: `<root>/data`)
    pub fn test_data_dir(&self) -> PathBuf {
        self.resolve(self.project.test_data_dir().unwrap_or(Path::new("data")))
    }

    /// Effective reference directory (default: `<root>/reference`)
    pub fn reference_dir(&self) -> PathBuf {
        self.resolve(
            self.project
                .reference_dir()
                .unwrap_or(Path::new("reference")),
        )
    }

    /// Effective output directory (default: `<root>/output`)
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(self.project.output_dir().unwrap_or(Path::new("output")))
    }

    /// Named output directories, resolved against the project root
    pub fn directories(&self) -> BTreeMap<String, PathBuf> {
        self.project
            .directories
            .iter()
            .map(|(name, path)| (name.clone(), self.resolve(path)))
            .collect()
    }

    /// Effective verbosity (project > global > false)
    pub fn verbose(&self) -> bool {
        self.project
            .report
            .as_ref()
            .and_then(|r| r.verbose)
            .or_else(|| self.global.verbose())
            .unwrap_or(false)
    }

    /// Effective color setting (project > global > true)
    pub fn color(&self) -> bool {
        self.project
            .report
            .as_ref()
            .and_then(|r| r.color)
            .or_else(|| self.global.color())
            .unwrap_or(true)
    }

    /// Whether failing file comparisons keep copies of both files
    pub fn persist_failures(&self) -> bool {
        self.project
            .checks
            .as_ref()
            .and_then(|c| c.persist_failures)
            .unwrap_or(true)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
