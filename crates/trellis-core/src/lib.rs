//! Trellis - sequential test execution
//!
//! Tests form a tree: leaves run a callable (or report a fixed result),
//! sequences run their children in order and fold the children's results
//! into their own. Observers attached to a test see a start and an end event
//! for it and, for sequences, for every descendant.
//!
//! # Example
//!
//! ```
//! use trellis_core::{fail_unless, Test, TestNumber, TestResult};
//!
//! let mut root = Test::sequence(TestNumber::major(1), "arithmetic");
//! root.append(Test::with_function(TestNumber::new(), "addition", |test| {
//!     fail_unless!(test, 1 + 1 == 2);
//!     test.pass();
//!     Ok(())
//! }))
//! .unwrap();
//! root.append(Test::with_result(TestNumber::new(), "known good", TestResult::Passed))
//!     .unwrap();
//!
//! root.run();
//! assert_eq!(root.result(), TestResult::Passed);
//! assert_eq!(root.pass_rate().passed, 2);
//! ```

pub mod check;
pub mod environment;
pub mod error;
mod macros;
pub mod number;
pub mod reporter;
pub mod result;
pub mod test;

pub use check::FileComparisonCheck;
pub use environment::TestEnvironment;
pub use error::{Abort, FrameworkError, FrameworkResult};
pub use number::TestNumber;
pub use reporter::ConsoleReporter;
pub use result::{PassRate, TestResult};
pub use test::{
    DirectoriesTeardownAction, Failure, Observer, Observers, SetupAction, SharedTest,
    TeardownAction, Test, TestBody, TestEvent, TestState,
};
