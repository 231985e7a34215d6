//! Byte-wise comparison of an output file against a reference file

use crate::environment::{TestEnvironment, PERSISTENT_STORAGE};
use crate::error::{FrameworkError, FrameworkResult};
use crate::result::TestResult;
use crate::test::Test;
use similar::{DiffTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compares the file a test produced with the file it should have produced
///
/// On mismatch the owning test is failed with a one-line description of the
/// first changed line. If the test environment has a `persistent-storage`
/// directory, both files are copied to `persistent-storage/<test name>/`.
#[derive(Debug, Clone)]
pub struct FileComparisonCheck {
    output_path: PathBuf,
    reference_path: PathBuf,
    result: TestResult,
    first_different_line: Option<String>,
}

impl FileComparisonCheck {
    pub fn new(output_path: impl Into<PathBuf>, reference_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            reference_path: reference_path.into(),
            result: TestResult::Unknown,
            first_different_line: None,
        }
    }

    /// Resolve both paths against the environment's output and reference directories
    pub fn from_environment(
        environment: &TestEnvironment,
        output: impl AsRef<Path>,
        reference: impl AsRef<Path>,
    ) -> Self {
        Self::new(
            environment.output_path(output),
            environment.reference_path(reference),
        )
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = path.into();
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    pub fn set_reference_path(&mut self, path: impl Into<PathBuf>) {
        self.reference_path = path.into();
    }

    /// Result of the last [`run`](Self::run)
    pub fn result(&self) -> TestResult {
        self.result
    }

    pub fn first_different_line(&self) -> Option<&str> {
        self.first_different_line.as_deref()
    }

    /// Compare the files and fail `test` on any difference
    pub fn run(&mut self, test: &mut Test<'_>, file: &'static str, line: u32) -> TestResult {
        self.result = TestResult::Failed;
        self.first_different_line = None;

        let output = match fs::read(&self.output_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                test.fail_with(
                    format!("failed to open output file: {}", self.output_path.display()),
                    file,
                    line,
                );
                return self.result;
            }
        };
        let reference = match fs::read(&self.reference_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                test.fail_with(
                    format!(
                        "failed to open reference file: {}",
                        self.reference_path.display()
                    ),
                    file,
                    line,
                );
                return self.result;
            }
        };

        if output == reference {
            self.result = TestResult::Passed;
            return self.result;
        }

        let message = describe_difference(&output, &reference);
        debug!(
            output = %self.output_path.display(),
            reference = %self.reference_path.display(),
            %message,
            "file comparison failed"
        );
        test.fail_with(message.clone(), file, line);
        self.first_different_line = Some(message);

        if let Ok(storage) = test.environment().named_directory(PERSISTENT_STORAGE) {
            let target = storage.join(test.name());
            if let Err(e) = self.persist(&target) {
                warn!(target = %target.display(), error = %e, "could not keep copies of compared files");
            }
        }

        self.result
    }

    /// Copy both files into `target` for post-mortem inspection
    fn persist(&self, target: &Path) -> FrameworkResult<()> {
        fs::create_dir_all(target).map_err(|source| FrameworkError::Io {
            path: target.to_path_buf(),
            source,
        })?;

        for path in [&self.output_path, &self.reference_path] {
            let Some(name) = path.file_name() else {
                continue;
            };
            fs::copy(path, target.join(name)).map_err(|source| FrameworkError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Text for a structured report describing the failed comparison
    pub fn report_text(&self) -> String {
        let mut text = format!(
            "File comparison between output {} and reference {} failed.",
            self.output_path.display(),
            self.reference_path.display()
        );
        if let Some(line) = &self.first_different_line {
            text.push(' ');
            text.push_str(line);
        }
        text
    }
}

/// One line describing the first change between two files
fn describe_difference(output: &[u8], reference: &[u8]) -> String {
    let output = String::from_utf8_lossy(output);
    let reference = String::from_utf8_lossy(reference);
    let output_lines: Vec<&str> = output.lines().collect();
    let reference_lines: Vec<&str> = reference.lines().collect();

    let diff = TextDiff::from_lines(&*output, &*reference);
    let first_change = diff
        .ops()
        .iter()
        .map(|op| op.as_tag_tuple())
        .find(|(tag, _, _)| *tag != DiffTag::Equal);

    match first_change {
        Some((DiffTag::Delete, old, _)) => format!(
            "line {}: output has extra line {}",
            old.start + 1,
            quote(output_lines.get(old.start).copied())
        ),
        Some((DiffTag::Insert, old, new)) => format!(
            "line {}: output is missing {}",
            old.start + 1,
            quote(reference_lines.get(new.start).copied())
        ),
        Some((DiffTag::Replace, old, new))
            if output_lines.get(old.start) != reference_lines.get(new.start) =>
        {
            format!(
                "line {}: output {} != reference {}",
                old.start + 1,
                quote(output_lines.get(old.start).copied()),
                quote(reference_lines.get(new.start).copied())
            )
        }
        // Same text, different line endings or trailing newline
        _ => {
            let offset = output
                .bytes()
                .zip(reference.bytes())
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| output.len().min(reference.len()));
            format!("contents differ at byte {}", offset)
        }
    }
}

fn quote(line: Option<&str>) -> String {
    match line {
        Some(line) => format!("{:?}", line),
        None => "<end of file>".to_string(),
    }
}
