//! Console reporter - an observer that prints test progress and a summary

use crate::result::TestResult;
use crate::test::{Failure, Observer, Test, TestEvent};
use colored::{ColoredString, Colorize};
use std::cell::RefCell;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::warn;
use trellis_config::Config;

/// A finished leaf test, kept for the failure listing
#[derive(Debug, Clone)]
struct Finished {
    number: String,
    name: String,
    result: TestResult,
    failures: Vec<Failure>,
}

/// Prints one character (quiet) or one line (verbose) per leaf test
///
/// Attach it to the root of a tree; sequences forward their observers to
/// every descendant.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    /// Show detailed output for each test
    verbose: bool,
    /// Disable colored output
    no_color: bool,
    out: RefCell<W>,
    /// Start times of the tests currently running, innermost last
    started: RefCell<Vec<Instant>>,
    finished: RefCell<Vec<Finished>>,
    elapsed: RefCell<Duration>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            verbose,
            no_color: false,
            out: RefCell::new(out),
            started: RefCell::new(Vec::new()),
            finished: RefCell::new(Vec::new()),
            elapsed: RefCell::new(Duration::ZERO),
        }
    }

    /// Take verbosity and color from configuration
    pub fn from_config(out: W, config: &Config) -> Self {
        Self::new(out, config.verbose()).with_no_color(!config.color())
    }

    /// Disable colored output
    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.no_color {
            text.to_string()
        } else {
            style(text).to_string()
        }
    }

    fn label(&self, result: TestResult) -> String {
        match (result, self.verbose) {
            (TestResult::Passed, false) => self.paint(".", |s| s.green()),
            (TestResult::Passed, true) => self.paint("PASS", |s| s.green().bold()),
            (TestResult::PassedButMemoryLeaks, false) => self.paint("L", |s| s.yellow()),
            (TestResult::PassedButMemoryLeaks, true) => self.paint("LEAK", |s| s.yellow().bold()),
            (TestResult::Unknown, false) => self.paint("?", |s| s.dimmed()),
            (TestResult::Unknown, true) => self.paint("UNKNOWN", |s| s.dimmed().bold()),
            (TestResult::Exception, false) => self.paint("E", |s| s.magenta().bold()),
            (TestResult::Exception, true) => self.paint("ERROR", |s| s.magenta().bold()),
            (TestResult::Failed, false) => self.paint("F", |s| s.red().bold()),
            (TestResult::Failed, true) => self.paint("FAIL", |s| s.red().bold()),
        }
    }

    /// Print a single leaf result
    fn print_test_result(&self, test: &Test<'_>, duration: Duration) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        let label = self.label(test.result());
        if self.verbose {
            writeln!(out, "{} {} {} ({:.2?})", label, test.number(), test.name(), duration)
        } else {
            write!(out, "{}", label)?;
            out.flush()
        }
    }

    /// Print the pass rate of `root` and the details of every failed leaf
    pub fn summary(&self, root: &Test<'_>) -> io::Result<()> {
        let rate = root.pass_rate();
        let mut out = self.out.borrow_mut();

        // Dots need a newline before the summary
        if !self.verbose && rate.total > 0 {
            writeln!(out)?;
        }
        writeln!(out)?;
        writeln!(out, "{}", "─".repeat(50))?;

        let status = if root.passed() {
            self.paint("PASSED", |s| s.green().bold())
        } else {
            self.paint(&root.result().to_string().to_uppercase(), |s| s.red().bold())
        };
        writeln!(
            out,
            "Test result: {} | {} total, {} passed, {} passed with leaks, {} unknown, {} exception, {} failed",
            status,
            rate.total,
            rate.passed,
            rate.passed_but_memory_leaks,
            rate.unknown,
            rate.exception,
            rate.failed
        )?;
        writeln!(out, "Time: {:.2?}", *self.elapsed.borrow())?;

        let finished = self.finished.borrow();
        let failures: Vec<_> = finished
            .iter()
            .filter(|f| matches!(f.result, TestResult::Failed | TestResult::Exception))
            .collect();
        if failures.is_empty() {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "{}", self.paint("Failures:", |s| s.red().bold()))?;
        for test in failures {
            writeln!(out, "  {} {} {}", self.paint("●", |s| s.red()), test.number, test.name)?;
            for failure in &test.failures {
                writeln!(out, "      {}", self.paint(&failure.to_string(), |s| s.dimmed()))?;
            }
        }
        Ok(())
    }
}

impl ConsoleReporter<Vec<u8>> {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.out.borrow()).into_owned()
    }
}

impl<W: Write> Observer for ConsoleReporter<W> {
    fn on_event(&self, source: &Test<'_>, event: TestEvent) {
        match event {
            TestEvent::Start => self.started.borrow_mut().push(Instant::now()),
            TestEvent::End => {
                let duration = self
                    .started
                    .borrow_mut()
                    .pop()
                    .map(|start| start.elapsed())
                    .unwrap_or_default();

                // Only outermost tests add to the total, nested time is already inside
                if self.started.borrow().is_empty() {
                    *self.elapsed.borrow_mut() += duration;
                }
                if source.is_sequence() {
                    return;
                }

                self.finished.borrow_mut().push(Finished {
                    number: source.number().to_string(),
                    name: source.name().to_string(),
                    result: source.result(),
                    failures: source.failures().to_vec(),
                });
                if let Err(e) = self.print_test_result(source, duration) {
                    warn!(error = %e, "failed to write test result");
                }
            }
        }
    }
}
