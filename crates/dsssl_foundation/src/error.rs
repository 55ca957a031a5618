//! Error types for the DSSSL engine.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! These errors cross API boundaries (reading, analysis, primitive bodies,
//! the command line). Failures inside the virtual machine are reported
//! through the interpreter's message sink instead.

use std::fmt;

use thiserror::Error;

use crate::location::Location;
use crate::types::Type;

/// The main error type for DSSSL operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a syntax error at the given location.
    #[must_use]
    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Syntax {
            message: message.into(),
            line: location.line,
            column: location.column,
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(left: i32, right: i32) -> Self {
        Self::new(ErrorKind::DimensionMismatch { left, right })
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    /// Creates an error raised by user code through `error`.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User(message.into()))
    }

    /// Creates an evaluation failure carrying the first diagnostic text.
    #[must_use]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Evaluation(message.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err.to_string()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Malformed source text or special form.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        /// Description of the problem.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
    },

    /// Type mismatch during runtime type checking.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Arithmetic on quantities of different dimensions.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch {
        /// Dimension of the left operand.
        left: i32,
        /// Dimension of the right operand.
        right: i32,
    },

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (length {length})")]
    IndexOutOfBounds {
        /// The index that was accessed.
        index: i64,
        /// The actual length of the collection.
        length: usize,
    },

    /// An argument had the right type but an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error signalled by stylesheet code.
    #[error("{0}")]
    User(String),

    /// Evaluation produced the error value.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// I/O failure while reading stylesheets.
    #[error("i/o error: {0}")]
    Io(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Source file name.
    pub source: Option<String>,
    /// Position in source.
    pub location: Option<Location>,
    /// Procedures active when the error occurred, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source file.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the position.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
            if let Some(location) = self.location {
                write!(f, ":{location}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias for DSSSL operations.
pub type Result<T> = std::result::Result<T, Error>;
