//! Test outcomes and how sequences fold them together

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    /// Not run, or no check was reached
    #[default]
    Unknown,
    Passed,
    /// Passed, but a leak detector flagged an allocation imbalance
    PassedButMemoryLeaks,
    /// The body returned an error or panicked
    Exception,
    /// A check failed or the body aborted
    Failed,
}

impl TestResult {
    /// Severity rank: `Passed < PassedButMemoryLeaks < Unknown < Exception < Failed`
    pub fn severity(self) -> u8 {
        match self {
            TestResult::Passed => 0,
            TestResult::PassedButMemoryLeaks => 1,
            TestResult::Unknown => 2,
            TestResult::Exception => 3,
            TestResult::Failed => 4,
        }
    }

    /// Whether this counts as a pass
    pub fn passed(self) -> bool {
        matches!(self, TestResult::Passed | TestResult::PassedButMemoryLeaks)
    }

    /// Fold the next child's result into a running sequence result
    ///
    /// `Failed` absorbs everything. `Exception` only moves to `Failed`.
    /// `Unknown` only moves to `Exception` or `Failed`. `PassedButMemoryLeaks`
    /// moves to anything but `Passed`. `Passed` is replaced by whatever comes
    /// next, including `Unknown`.
    pub fn merge(self, incoming: TestResult) -> TestResult {
        use TestResult::*;

        match (self, incoming) {
            (Failed, _) => Failed,
            (Exception, Failed) => Failed,
            (Exception, _) => Exception,
            (Unknown, Failed | Exception) => incoming,
            (Unknown, _) => Unknown,
            (PassedButMemoryLeaks, Failed | Exception | Unknown) => incoming,
            (PassedButMemoryLeaks, _) => PassedButMemoryLeaks,
            (Passed, _) => incoming,
        }
    }

    /// Fold child results in order; the first result seeds the fold
    ///
    /// An empty sequence is `Unknown`.
    pub fn aggregate<I>(results: I) -> TestResult
    where
        I: IntoIterator<Item = TestResult>,
    {
        let mut results = results.into_iter();
        match results.next() {
            Some(first) => results.fold(first, TestResult::merge),
            None => TestResult::Unknown,
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestResult::Unknown => "unknown",
            TestResult::Passed => "passed",
            TestResult::PassedButMemoryLeaks => "passed but memory leaks",
            TestResult::Exception => "exception",
            TestResult::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Leaf-result counts for a test tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRate {
    pub unknown: usize,
    pub passed: usize,
    pub passed_but_memory_leaks: usize,
    pub exception: usize,
    pub failed: usize,
    pub total: usize,
}

impl PassRate {
    /// Count one leaf result
    pub fn record(&mut self, result: TestResult) {
        match result {
            TestResult::Unknown => self.unknown += 1,
            TestResult::Passed => self.passed += 1,
            TestResult::PassedButMemoryLeaks => self.passed_but_memory_leaks += 1,
            TestResult::Exception => self.exception += 1,
            TestResult::Failed => self.failed += 1,
        }
        self.total += 1;
    }

    pub fn add(&mut self, other: &PassRate) {
        self.unknown += other.unknown;
        self.passed += other.passed;
        self.passed_but_memory_leaks += other.passed_but_memory_leaks;
        self.exception += other.exception;
        self.failed += other.failed;
        self.total += other.total;
    }
}
