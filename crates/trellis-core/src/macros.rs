//! Check macros that capture the calling file and line
//!
//! They expect to be used inside a test body that returns
//! `anyhow::Result<()>`:
//!
//! ```
//! use trellis_core::{abort_unless, fail_if, pass, Test, TestNumber, TestResult};
//!
//! let mut test = Test::with_function(TestNumber::major(1), "arithmetic", |test| {
//!     abort_unless!(test, 2 + 2 == 4);
//!     fail_if!(test, 1 > 2);
//!     pass!(test);
//!     Ok(())
//! });
//! test.run();
//! assert_eq!(test.result(), TestResult::Passed);
//! ```

/// Fail the test and return from the body
#[macro_export]
macro_rules! abort {
    ($test:expr) => {
        return ::core::result::Result::Err($test.abort(file!(), line!()).into())
    };
}

/// Fail the test and return from the body if `condition` holds
#[macro_export]
macro_rules! abort_if {
    ($test:expr, $condition:expr) => {
        $test.abort_if($condition, file!(), line!())?
    };
}

/// Fail the test and return from the body unless `condition` holds
#[macro_export]
macro_rules! abort_unless {
    ($test:expr, $condition:expr) => {
        $test.abort_if(!($condition), file!(), line!())?
    };
}

/// Record a failed check and continue
#[macro_export]
macro_rules! fail {
    ($test:expr) => {
        $test.fail(file!(), line!())
    };
    ($test:expr, $($message:tt)+) => {
        $test.fail_with(format!($($message)+), file!(), line!())
    };
}

#[macro_export]
macro_rules! fail_if {
    ($test:expr, $condition:expr) => {
        $test.fail_if($condition, file!(), line!())
    };
}

#[macro_export]
macro_rules! fail_unless {
    ($test:expr, $condition:expr) => {
        $test.fail_if(!($condition), file!(), line!())
    };
}

#[macro_export]
macro_rules! pass {
    ($test:expr) => {
        $test.pass()
    };
}
