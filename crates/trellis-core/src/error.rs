//! Framework errors and the abort signal

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the framework itself (misuse, environment lookups, I/O
/// in helpers). Test outcomes are never reported through this type.
#[derive(Error, Debug)]
pub enum FrameworkError {
    #[error("Test '{0}' is not a sequence")]
    NotASequence(String),

    #[error("No directory named '{0}' in the test environment")]
    UnknownDirectory(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] trellis_config::ConfigError),
}

/// Result type for framework operations
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Signal returned by [`Test::abort`](crate::Test::abort)
///
/// A body returns it as an error to stop immediately. `Test::run` recognises
/// it and turns it into a `Failed` result; it never leaves `run`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("test aborted at {file}:{line}")]
pub struct Abort {
    pub file: &'static str,
    pub line: u32,
}
