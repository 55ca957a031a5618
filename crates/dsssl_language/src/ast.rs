//! Syntax tree for DSSSL source.
//!
//! The reader produces data (s-expressions) rather than a typed tree: the
//! same structure is used for program text and for quoted literals. The
//! analyzer gives program text its meaning.

use dsssl_foundation::Decimal;

use crate::span::Span;

/// `#!optional`, `#!rest`, or `#!key` in a formal parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormalMarker {
    /// `#!optional`
    Optional,
    /// `#!rest`
    Rest,
    /// `#!key`
    Key,
}

/// A node read from source.
#[derive(Clone, Debug, PartialEq)]
pub enum Ast {
    /// `#t` or `#f`
    Bool(bool, Span),
    /// Integer literal like `42`
    Integer(i64, Span),
    /// Decimal literal like `3.14`
    Real(f64, Span),
    /// Quantity literal like `12pt`
    Quantity(Decimal, String, Span),
    /// Character literal like `#\a`
    Char(char, Span),
    /// String literal like `"hello"`
    String(String, Span),
    /// Identifier like `car`
    Symbol(String, Span),
    /// Keyword like `font-size:`
    Keyword(String, Span),
    /// Formal parameter marker
    Marker(FormalMarker, Span),

    /// Proper list like `(+ 1 2)`; `'x` reads as `(quote x)`
    List(Vec<Ast>, Span),
    /// Improper list like `(a b . c)`
    DottedList(Vec<Ast>, Box<Ast>, Span),
    /// Vector literal like `#(1 2 3)`
    Vector(Vec<Ast>, Span),
}

impl Ast {
    /// Returns the source span of this node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Bool(_, s)
            | Self::Integer(_, s)
            | Self::Real(_, s)
            | Self::Quantity(_, _, s)
            | Self::Char(_, s)
            | Self::String(_, s)
            | Self::Symbol(_, s)
            | Self::Keyword(_, s)
            | Self::Marker(_, s)
            | Self::List(_, s)
            | Self::DottedList(_, _, s)
            | Self::Vector(_, s) => *s,
        }
    }

    /// Returns the elements if this is a proper list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Ast]> {
        match self {
            Self::List(elements, _) => Some(elements),
            _ => None,
        }
    }

    /// Returns the name if this is a symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(name, _) => Some(name),
            _ => None,
        }
    }

    /// Returns the name if this is a keyword.
    #[must_use]
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Self::Keyword(name, _) => Some(name),
            _ => None,
        }
    }

    /// Returns true if this is the symbol `name`.
    #[must_use]
    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }

    /// Returns the head symbol of a list form like `(define ...)`.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// Returns a description of the node type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(..) => "boolean",
            Self::Integer(..) | Self::Real(..) => "number",
            Self::Quantity(..) => "quantity",
            Self::Char(..) => "character",
            Self::String(..) => "string",
            Self::Symbol(..) => "identifier",
            Self::Keyword(..) => "keyword",
            Self::Marker(..) => "formal marker",
            Self::List(..) | Self::DottedList(..) => "list",
            Self::Vector(..) => "vector",
        }
    }
}
