//! Token types for DSSSL source.
//!
//! Tokens are the output of the lexer and input to the reader.

use dsssl_foundation::Decimal;

use crate::span::Span;

/// A token from lexical analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The type and value of this token.
    pub kind: TokenKind,
    /// Source location of this token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this token opens a list or vector.
    #[must_use]
    pub const fn is_open_delimiter(&self) -> bool {
        matches!(self.kind, TokenKind::LParen | TokenKind::HashParen)
    }
}

/// Token types for DSSSL source.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Delimiters
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `#(` opening a vector literal
    HashParen,
    /// `.` in a dotted pair
    Dot,

    // Quotation
    /// `'`
    Quote,
    /// `` ` ``
    Backtick,
    /// `,`
    Unquote,
    /// `,@`
    UnquoteSplice,

    // Literals
    /// `#t`
    True,
    /// `#f`
    False,
    /// Character literal like `#\a` or `#\space`
    Char(char),
    /// Integer literal like `42` or `-17`
    Integer(i64),
    /// Decimal literal like `3.14`
    Real(f64),
    /// Number followed by a unit name, like `12pt`
    Quantity {
        /// The numeric part, kept exact.
        magnitude: Decimal,
        /// The unit name.
        unit: String,
    },
    /// String literal like `"hello"`
    String(String),
    /// Identifier like `car` or `font-size`
    Symbol(String),
    /// Keyword like `font-size:` (stored without the colon)
    Keyword(String),

    // Formal parameter markers
    /// `#!optional`
    Optional,
    /// `#!rest`
    Rest,
    /// `#!key`
    Key,

    // Other
    /// `;` comment (preserved for tooling)
    Comment(String),
    /// Lexical error
    Error(String),
    /// End of input
    Eof,
}
