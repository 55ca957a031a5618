//! Value type names and procedure signatures.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::intern::SymbolId;

/// Type descriptor for runtime values, used in type errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// The empty list.
    EmptyList,
    /// A cons cell.
    Pair,
    /// A proper list (empty or pairs ending in the empty list).
    List,
    /// `#t` or `#f`.
    Boolean,
    /// Exact integer.
    Integer,
    /// Inexact real.
    Real,
    /// Any number, length or quantity.
    Number,
    /// Exact length in internal units.
    Length,
    /// Inexact quantity with a dimension.
    Quantity,
    /// Character.
    Char,
    /// String.
    String,
    /// Symbol.
    Symbol,
    /// Keyword (`name:`).
    Keyword,
    /// Vector.
    Vector,
    /// Procedure of any kind.
    Procedure,
    /// Style object.
    Style,
    /// Specification of a sequence of flow objects.
    Sosofo,
    /// The unspecified value.
    Unspecified,
    /// The error sentinel.
    Error,
    /// Anything else (internal values).
    Other,
}

impl Type {
    /// Returns true if values of this type are numeric.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Real | Self::Number | Self::Length | Self::Quantity
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmptyList => "empty list",
            Self::Pair => "pair",
            Self::List => "list",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Number => "number",
            Self::Length => "length",
            Self::Quantity => "quantity",
            Self::Char => "char",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Keyword => "keyword",
            Self::Vector => "vector",
            Self::Procedure => "procedure",
            Self::Style => "style",
            Self::Sosofo => "sosofo",
            Self::Unspecified => "unspecified",
            Self::Error => "error",
            Self::Other => "object",
        };
        write!(f, "{name}")
    }
}

/// Shape of a procedure's formal parameter list.
///
/// Arguments arrive in the order required, optional, then either a rest
/// list or keyword/value pairs (or both).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature {
    /// Number of required arguments.
    pub required: usize,
    /// Number of `#!optional` arguments.
    pub optional: usize,
    /// Whether a `#!rest` argument collects the remainder.
    pub rest: bool,
    /// Names accepted as `#!key` arguments.
    pub keys: Vec<SymbolId>,
}

impl Signature {
    /// A signature taking exactly `n` arguments.
    #[must_use]
    pub const fn fixed(n: usize) -> Self {
        Self {
            required: n,
            optional: 0,
            rest: false,
            keys: Vec::new(),
        }
    }

    /// A signature taking `required` arguments and then any number more.
    #[must_use]
    pub const fn variadic(required: usize) -> Self {
        Self {
            required,
            optional: 0,
            rest: true,
            keys: Vec::new(),
        }
    }

    /// A signature with `required` then `optional` arguments.
    #[must_use]
    pub const fn optional(required: usize, optional: usize) -> Self {
        Self {
            required,
            optional,
            rest: false,
            keys: Vec::new(),
        }
    }

    /// Number of keyword arguments.
    #[must_use]
    pub fn n_keys(&self) -> usize {
        self.keys.len()
    }

    /// Whether excess arguments are absorbed by a rest list or key scan.
    #[must_use]
    pub fn takes_varargs(&self) -> bool {
        self.rest || !self.keys.is_empty()
    }

    /// Number of stack slots the procedure's formals occupy once entered.
    #[must_use]
    pub fn n_formals(&self) -> usize {
        self.required + self.optional + usize::from(self.rest) + self.keys.len()
    }

    /// Maximum number of positional arguments, or `None` if unbounded.
    #[must_use]
    pub fn max_args(&self) -> Option<usize> {
        if self.takes_varargs() {
            None
        } else {
            Some(self.required + self.optional)
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_args() {
            Some(max) if max == self.required => write!(f, "{max}"),
            Some(max) => write!(f, "{}-{max}", self.required),
            None => write!(f, "{}+", self.required),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_display() {
        assert_eq!(Type::Procedure.to_string(), "procedure");
        assert_eq!(Type::EmptyList.to_string(), "empty list");
        assert!(Type::Length.is_numeric());
        assert!(!Type::Symbol.is_numeric());
    }

    #[test]
    fn signature_shapes() {
        assert_eq!(Signature::fixed(2).to_string(), "2");
        assert_eq!(Signature::optional(1, 2).to_string(), "1-3");
        assert_eq!(Signature::variadic(0).to_string(), "0+");
        assert_eq!(Signature::variadic(1).n_formals(), 2);
    }

    #[test]
    fn keys_make_signature_unbounded() {
        let sig = Signature {
            keys: vec![SymbolId(0), SymbolId(1)],
            ..Signature::fixed(1)
        };
        assert!(sig.takes_varargs());
        assert_eq!(sig.max_args(), None);
        assert_eq!(sig.n_formals(), 3);
    }
}
