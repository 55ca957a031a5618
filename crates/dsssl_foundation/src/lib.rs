//! Core types shared by every layer of the DSSSL engine.
//!
//! This crate provides:
//! - [`Error`] - Rich error types with context
//! - [`Interner`] / [`SymbolId`] - Interned identifiers
//! - [`Location`] - Source positions for diagnostics
//! - [`Type`] / [`Signature`] - Value type names and procedure signatures
//! - [`Number`] - Exact/inexact numbers, lengths, and dimensioned quantities

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod intern;
pub mod location;
pub mod quantity;
pub mod types;

pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use intern::{Interner, SymbolId};
pub use location::Location;
pub use quantity::{DEFAULT_UNITS_PER_INCH, Decimal, Number, unit_length};
pub use types::{Signature, Type};
