//! Directories a test tree reads from and writes to
//!
//! A [`TestEnvironment`] is created once and borrowed by every test in a
//! tree, so it has to outlive all of them.

use crate::error::{FrameworkError, FrameworkResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use trellis_config::Config;

/// Name of the directory failing file comparisons are copied into
pub const PERSISTENT_STORAGE: &str = "persistent-storage";

/// Paths and settings shared by a test tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestEnvironment {
    test_data_dir: PathBuf,
    reference_dir: PathBuf,
    output_dir: PathBuf,
    directories: BTreeMap<String, PathBuf>,
}

impl TestEnvironment {
    /// An environment with every directory set to the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment used by tests constructed without one
    pub fn default_environment() -> &'static TestEnvironment {
        static DEFAULT: OnceLock<TestEnvironment> = OnceLock::new();
        DEFAULT.get_or_init(TestEnvironment::new)
    }

    /// Build an environment from loaded configuration
    ///
    /// Named directories are only registered for `persistent-storage` when
    /// `persist_failures` is enabled.
    pub fn from_config(config: &Config) -> Self {
        let mut directories = config.directories();
        if !config.persist_failures() {
            directories.remove(PERSISTENT_STORAGE);
        }

        Self {
            test_data_dir: config.test_data_dir(),
            reference_dir: config.reference_dir(),
            output_dir: config.output_dir(),
            directories,
        }
    }

    pub fn with_test_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_data_dir = dir.into();
        self
    }

    pub fn with_reference_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reference_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Register a named output directory
    pub fn with_directory(mut self, name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.directories.insert(name.into(), dir.into());
        self
    }

    pub fn test_data_dir(&self) -> &Path {
        &self.test_data_dir
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn test_data_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.test_data_dir.join(relative)
    }

    pub fn reference_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.reference_dir.join(relative)
    }

    pub fn output_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(relative)
    }

    /// Look up a named output directory
    pub fn named_directory(&self, name: &str) -> FrameworkResult<&Path> {
        self.directories
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| FrameworkError::UnknownDirectory(name.to_string()))
    }
}
