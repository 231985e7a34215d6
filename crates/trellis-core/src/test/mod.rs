//! Tests and their lifecycle
//!
//! A [`Test`] is a single entity whose behaviour comes from its
//! [`TestBody`]: a callable, a sequence of children, or an inner test it
//! delegates to. [`Test::run`] drives the lifecycle:
//!
//! 1. `Start` notification
//! 2. setup actions
//! 3. the body (skipped if setup failed)
//! 4. teardown actions, always
//! 5. `End` notification
//!
//! Nothing escapes `run`. Aborts, errors returned by the body and panics all
//! end up as the test's [`TestResult`] plus a recorded [`Failure`].


pub use action::{DirectoriesTeardownAction, SetupAction, TeardownAction};
pub use body::{TestBody, TestFn};
pub use observer::{Observer, Observers, TestEvent};

use crate::environment::TestEnvironment;
use crate::error::Abort;
use crate::number::TestNumber;
use crate::result::TestResult;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, warn};

/// A test shared between a sequence and whoever else holds on to it
pub type SharedTest<'env> = Rc<RefCell<Test<'env>>>;

/// Where a test is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    NotRun,
    Running,
    Completed,
}

/// A failed check, abort, or error recorded on a test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: Option<String>,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl Failure {
    fn at(message: Option<String>, file: &'static str, line: u32) -> Self {
        Self {
            message,
            file: Some(file),
            line: Some(line),
        }
    }

    fn unlocated(message: String) -> Self {
        Self {
            message: Some(message),
            file: None,
            line: None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}", file, line)?,
            _ => write!(f, "<unknown location>")?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// A runnable test
pub struct Test<'env> {
    number: TestNumber,
    name: String,
    result: TestResult,
    initial_result: TestResult,
    state: TestState,
    failures: Vec<Failure>,
    environment: &'env TestEnvironment,
    setup_actions: Vec<Rc<dyn SetupAction + 'env>>,
    teardown_actions: Vec<Rc<dyn TeardownAction + 'env>>,
    observers: Observers,
    body: TestBody<'env>,
}

impl<'env> Test<'env> {
    /// A test with no body; its result stays `Unknown`
    pub fn new(number: TestNumber, name: impl Into<String>) -> Self {
        Self::with_body(number, name, TestBody::Empty)
    }

    /// A test that always reports `result`
    pub fn with_result(number: TestNumber, name: impl Into<String>, result: TestResult) -> Self {
        let mut test = Self::new(number, name);
        test.initial_result = result;
        test.result = result;
        test
    }

    /// A test whose body is `f`
    ///
    /// `f` receives the test and records its outcome with [`pass`](Self::pass),
    /// [`fail`](Self::fail) and [`abort`](Self::abort). Returning `Err` with
    /// an [`Abort`] fails the test; any other `Err` is an `Exception`.
    pub fn with_function<F>(number: TestNumber, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut Test<'env>) -> anyhow::Result<()> + 'env,
    {
        Self::with_body(number, name, TestBody::Function(Box::new(f)))
    }

    /// An empty sequence; add children with [`append`](Self::append)
    pub fn sequence(number: TestNumber, name: impl Into<String>) -> Self {
        Self::with_body(number, name, TestBody::Sequence(Vec::new()))
    }

    /// A test that runs `inner` and reports its result
    ///
    /// Observers of the outer test are not forwarded to `inner`.
    pub fn wrapping(number: TestNumber, name: impl Into<String>, inner: Test<'env>) -> Self {
        Self::with_body(number, name, TestBody::Delegate(Box::new(inner)))
    }

    pub fn with_body(number: TestNumber, name: impl Into<String>, body: TestBody<'env>) -> Self {
        Self {
            number,
            name: name.into(),
            result: TestResult::Unknown,
            initial_result: TestResult::Unknown,
            state: TestState::NotRun,
            failures: Vec::new(),
            environment: TestEnvironment::default_environment(),
            setup_actions: Vec::new(),
            teardown_actions: Vec::new(),
            observers: Observers::new(),
            body,
        }
    }

    /// Attach the environment this test resolves paths against
    pub fn with_environment(mut self, environment: &'env TestEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn number(&self) -> &TestNumber {
        &self.number
    }

    /// Renumber this test; a sequence renumbers its children as well
    pub fn set_number(&mut self, number: TestNumber) {
        self.number = number;
        self.renumber_children();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> TestResult {
        self.result
    }

    pub fn set_result(&mut self, result: TestResult) {
        self.result = result;
    }

    pub fn passed(&self) -> bool {
        self.result.passed()
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn environment(&self) -> &'env TestEnvironment {
        self.environment
    }

    /// What this test runs
    ///
    /// While the body is running it is held outside the test, so calls made
    /// from inside it (a function body inspecting its own test, or an
    /// observer of a sequence) see [`TestBody::Empty`]. It is put back when
    /// the body returns or unwinds.
    pub fn body(&self) -> &TestBody<'env> {
        &self.body
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    pub fn add_setup_action<A: SetupAction + 'env>(&mut self, action: A) {
        self.setup_actions.push(Rc::new(action));
    }

    pub fn add_teardown_action<A: TeardownAction + 'env>(&mut self, action: A) {
        self.teardown_actions.push(Rc::new(action));
    }

    /// Register a teardown action the caller keeps a handle to
    pub fn add_shared_teardown_action(&mut self, action: Rc<dyn TeardownAction + 'env>) {
        self.teardown_actions.push(action);
    }

    // --- Checks ---

    /// Mark the test `Passed` unless something already decided its result
    pub fn pass(&mut self) {
        if self.result == TestResult::Unknown {
            self.result = TestResult::Passed;
        }
    }

    /// Record a failed check and keep going
    pub fn fail(&mut self, file: &'static str, line: u32) {
        self.record_failure(Failure::at(None, file, line));
    }

    /// Record a failed check with a message and keep going
    pub fn fail_with(&mut self, message: impl Into<String>, file: &'static str, line: u32) {
        self.record_failure(Failure::at(Some(message.into()), file, line));
    }

    pub fn fail_if(&mut self, condition: bool, file: &'static str, line: u32) {
        if condition {
            self.fail(file, line);
        }
    }

    /// Fail the test and produce the signal that stops its body
    ///
    /// ```
    /// use trellis_core::{Test, TestNumber, TestResult};
    ///
    /// let mut test = Test::with_function(TestNumber::major(1), "stops", |test| {
    ///     Err(test.abort(file!(), line!()).into())
    /// });
    /// test.run();
    /// assert_eq!(test.result(), TestResult::Failed);
    /// ```
    pub fn abort(&mut self, file: &'static str, line: u32) -> Abort {
        self.record_failure(Failure::at(None, file, line));
        Abort { file, line }
    }

    /// `Err(Abort)` when `condition` holds, for use with `?`
    pub fn abort_if(&mut self, condition: bool, file: &'static str, line: u32) -> Result<(), Abort> {
        if condition {
            Err(self.abort(file, line))
        } else {
            Ok(())
        }
    }

    fn record_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
        self.result = TestResult::Failed;
    }

    /// Move to `result` only if it is more severe than the current one
    fn worsen(&mut self, result: TestResult) {
        if result.severity() > self.result.severity() {
            self.result = result;
        }
    }

    // --- Lifecycle ---

    /// Run the test: setup, body, teardown, bracketed by start/end events
    pub fn run(&mut self) {
        self.run_observed(&[]);
    }

    /// Run with observers inherited from enclosing sequences, nearest first
    pub(crate) fn run_observed(&mut self, inherited: &[&Observers]) {
        self.result = self.initial_result;
        self.failures.clear();
        self.state = TestState::Running;

        debug!(number = %self.number, name = %self.name, "test started");
        self.notify(TestEvent::Start, inherited);

        if self.setup() {
            self.run_body(inherited);
        }
        self.teardown();

        self.state = TestState::Completed;
        debug!(number = %self.number, name = %self.name, result = %self.result, "test finished");
        self.notify(TestEvent::End, inherited);
    }

    fn notify(&self, event: TestEvent, inherited: &[&Observers]) {
        self.observers.notify(self, event);
        for observers in inherited {
            observers.notify(self, event);
        }
    }

    /// Returns false if an action failed; the body must then be skipped
    fn setup(&mut self) -> bool {
        let actions = self.setup_actions.clone();
        for action in actions {
            let outcome = match call_guarded(|| action.setup()) {
                Ok(outcome) => outcome,
                Err(message) => {
                    warn!(name = %self.name, panic = %message, "setup action panicked");
                    self.panicked(message);
                    return false;
                }
            };
            if let Err(e) = outcome {
                warn!(name = %self.name, error = %format!("{:#}", e), "setup action failed");
                self.interrupted(e);
                return false;
            }
        }
        true
    }

    fn teardown(&mut self) {
        let actions = self.teardown_actions.clone();
        for action in actions {
            let failure = match call_guarded(|| action.teardown()) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => {
                    warn!(name = %self.name, error = %format!("{:#}", e), "teardown action failed");
                    format!("teardown failed: {:#}", e)
                }
                Err(message) => {
                    warn!(name = %self.name, panic = %message, "teardown action panicked");
                    format!("teardown panicked: {}", message)
                }
            };
            self.failures.push(Failure::unlocated(failure));
            self.worsen(TestResult::Exception);
        }
    }

    fn run_body(&mut self, inherited: &[&Observers]) {
        let mut guard = RestoreBody {
            body: mem::take(&mut self.body),
            test: self,
        };
        let test = &mut *guard.test;

        match &mut guard.body {
            TestBody::Empty => {}
            TestBody::Function(f) => match call_guarded(|| f(test)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => test.interrupted(e),
                Err(message) => test.panicked(message),
            },
            TestBody::Sequence(children) => test.run_children(children, inherited),
            TestBody::Delegate(inner) => {
                inner.run();
                test.result = inner.result();
            }
        }
    }

    fn panicked(&mut self, message: String) {
        self.failures
            .push(Failure::unlocated(format!("panicked: {}", message)));
        self.worsen(TestResult::Exception);
    }

    /// Turn an error out of setup or the body into a result
    fn interrupted(&mut self, error: anyhow::Error) {
        match error.downcast_ref::<Abort>() {
            Some(abort) => {
                if self.failures.is_empty() {
                    self.failures.push(Failure::at(None, abort.file, abort.line));
                }
                self.result = TestResult::Failed;
            }
            None => {
                self.failures.push(Failure::unlocated(format!("{:#}", error)));
                self.worsen(TestResult::Exception);
            }
        }
    }

    /// Visit this test and, for sequences, every descendant in order
    pub fn traverse(&self, f: &mut dyn FnMut(&Test<'env>)) {
        f(self);
        if let TestBody::Sequence(children) = &self.body {
            for child in children {
                child.borrow().traverse(f);
            }
        }
    }
}

/// Puts the body back into its test when dropped, also while unwinding
struct RestoreBody<'t, 'env> {
    test: &'t mut Test<'env>,
    body: TestBody<'env>,
}

impl Drop for RestoreBody<'_, '_> {
    fn drop(&mut self) {
        self.test.body = mem::take(&mut self.body);
    }
}

/// Run `f`; a panic comes back as its message
fn call_guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for Test<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("result", &self.result)
            .field("state", &self.state)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn leaf<'env>(
        name: &str,
        f: impl FnMut(&mut Test<'env>) -> anyhow::Result<()> + 'env,
    ) -> Test<'env> {
        Test::with_function(TestNumber::major(1), name, f)
    }

    #[test]
    fn test_new_test_is_unknown() {
        let mut test = Test::new(TestNumber::major(1), "empty");
        assert_eq!(test.state(), TestState::NotRun);
        test.run();
        assert_eq!(test.result(), TestResult::Unknown);
        assert_eq!(test.state(), TestState::Completed);
    }

    #[test]
    fn test_fixed_result_survives_run() {
        let mut test = Test::with_result(TestNumber::major(1), "fixed", TestResult::Passed);
        test.run();
        assert_eq!(test.result(), TestResult::Passed);
    }

    #[test]
    fn test_pass_after_fail_stays_failed() {
        let mut test = leaf("fail-then-pass", |test| {
            test.fail(file!(), line!());
            test.pass();
            Ok(())
        });
        test.run();
        assert_eq!(test.result(), TestResult::Failed);
        assert_eq!(test.failures().len(), 1);
    }

    #[test]
    fn test_fail_continues_body() {
        let reached = Cell::new(false);
        let mut test = leaf("keeps-going", |test| {
            test.fail_if(true, file!(), line!());
            reached.set(true);
            Ok(())
        });
        test.run();
        assert!(reached.get());
        assert_eq!(test.result(), TestResult::Failed);
    }

    #[test]
    fn test_abort_stops_body() {
        let reached = Cell::new(false);
        let mut test = leaf("stops", |test| {
            test.abort_if(true, file!(), line!())?;
            reached.set(true);
            Ok(())
        });
        test.run();
        assert!(!reached.get());
        assert_eq!(test.result(), TestResult::Failed);
    }

    #[test]
    fn test_error_is_exception() {
        let mut test = leaf("errors", |_| Err(anyhow::anyhow!("unexpected")));
        test.run();
        assert_eq!(test.result(), TestResult::Exception);
        assert_eq!(test.failures()[0].message.as_deref(), Some("unexpected"));
    }

    #[test]
    fn test_panic_is_exception() {
        let mut test = leaf("panics", |_| panic!("kaboom"));
        test.run();
        assert_eq!(test.result(), TestResult::Exception);
        assert_eq!(
            test.failures()[0].message.as_deref(),
            Some("panicked: kaboom")
        );
    }

    #[test]
    fn test_rerun_resets_result() {
        let calls = Cell::new(0);
        let mut test = leaf("flaky", |test| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                test.fail(file!(), line!());
            } else {
                test.pass();
            }
            Ok(())
        });
        test.run();
        assert_eq!(test.result(), TestResult::Failed);
        test.run();
        assert_eq!(test.result(), TestResult::Passed);
        assert!(test.failures().is_empty());
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::at(Some("mismatch".to_string()), "a.rs", 7);
        assert_eq!(failure.to_string(), "a.rs:7: mismatch");
        assert_eq!(Failure::unlocated("x".to_string()).to_string(), "<unknown location>: x");
    }
}
