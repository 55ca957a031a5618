//! Source positions.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A line/column position in stylesheet source.
///
/// Line and column are 1-indexed. The default location (`0:0`) means the
/// position is unknown, which is the case for values built by primitives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    pub column: u32,
}

impl Location {
    /// Creates a location at the given position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Returns true if this location points at real source.
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "<unknown>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(Location::new(3, 14).to_string(), "3:14");
        assert_eq!(Location::default().to_string(), "<unknown>");
    }
}
