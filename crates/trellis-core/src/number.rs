//! Hierarchical test numbers (`1`, `1.2`, `1.2.3`, ...)

use std::fmt;

/// Position of a test in a test tree
///
/// A number is a path of levels. The empty number is used for tests that
/// have not been placed in a tree yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestNumber {
    parts: Vec<u32>,
}

impl TestNumber {
    /// The empty number
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// A single-level number
    pub fn major(n: u32) -> Self {
        Self { parts: vec![n] }
    }

    pub fn from_parts(parts: &[u32]) -> Self {
        Self {
            parts: parts.to_vec(),
        }
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Level `i`, counting from the outermost
    pub fn part(&self, i: usize) -> Option<u32> {
        self.parts.get(i).copied()
    }

    /// Number of the first child: this number with a `1` appended
    pub fn deeper_number(&self) -> Self {
        let mut parts = self.parts.clone();
        parts.push(1);
        Self { parts }
    }

    /// Number of the next sibling
    ///
    /// The empty number has no siblings and is returned unchanged.
    pub fn next(&self) -> Self {
        let mut next = self.clone();
        next.increment();
        next
    }

    /// Advance this number to its next sibling in place
    pub fn increment(&mut self) {
        if let Some(last) = self.parts.last_mut() {
            *last += 1;
        }
    }
}

impl fmt::Display for TestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}
