//! Source location tracking.
//!
//! `Span` tracks the position of tokens and syntax nodes in source code
//! for error reporting. Compiled code only keeps the [`Location`].

use dsssl_foundation::Location;

/// A span of source text.
///
/// Tracks byte offsets and line/column positions for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset where this span starts.
    pub start: usize,
    /// Byte offset where this span ends (exclusive).
    pub end: usize,
    /// 1-based line number where this span starts.
    pub line: u32,
    /// 1-based column number where this span starts.
    pub column: u32,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Creates a span covering the range from this span to another.
    #[must_use]
    pub fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }

    /// Returns the text this span covers in the given source.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// The line/column where this span starts.
    #[must_use]
    pub const fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_to_joins() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(5, 9, 2, 2);
        let joined = a.to(b);
        assert_eq!(joined.start, 0);
        assert_eq!(joined.end, 9);
        assert_eq!(joined.location(), Location::new(1, 1));
    }

    #[test]
    fn span_text() {
        let source = "(define x 1)";
        assert_eq!(Span::new(1, 7, 1, 2).text(source), "define");
    }
}
