//! Reusable checks that record their outcome on a test

pub mod file_comparison;

pub use file_comparison::FileComparisonCheck;
