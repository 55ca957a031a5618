//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use dsssl_foundation::{Error, ErrorContext, ErrorKind, Location, Type};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch(Type::Pair, Type::Integer);
    assert!(matches!(
        err.kind,
        ErrorKind::TypeMismatch {
            expected: Type::Pair,
            actual: Type::Integer
        }
    ));
    assert_eq!(err.to_string(), "type mismatch: expected pair, got integer");
}

#[test]
fn error_syntax_position() {
    let err = Error::syntax("unbalanced `)`", Location::new(3, 14));
    assert!(matches!(err.kind, ErrorKind::Syntax { line: 3, column: 14, .. }));
    assert!(err.to_string().contains("3:14"));
}

#[test]
fn error_dimension_mismatch() {
    let err = Error::dimension_mismatch(1, 0);
    assert_eq!(err.to_string(), "dimension mismatch: 1 vs 0");
}

#[test]
fn error_user_message_is_verbatim() {
    let err = Error::user("bad value: 42");
    assert_eq!(err.to_string(), "bad value: 42");
}

#[test]
fn error_index_out_of_bounds() {
    let err = Error::new(ErrorKind::IndexOutOfBounds { index: 5, length: 3 });
    let msg = err.to_string();
    assert!(msg.contains('5'));
    assert!(msg.contains('3'));
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "style.dsl");
    let err: Error = io.into();
    assert!(matches!(err.kind, ErrorKind::Io(ref m) if m.contains("style.dsl")));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn context_is_optional() {
    let err = Error::internal("oops");
    assert!(err.context.is_none());
}

#[test]
fn context_display_lists_frames() {
    let context = ErrorContext::new()
        .with_source("book.dsl")
        .with_location(Location::new(12, 2))
        .with_frame("heading")
        .with_frame("chapter");
    let err = Error::evaluation("failed").with_context(context);
    let text = err.context.as_ref().map(ToString::to_string).unwrap_or_default();
    assert!(text.starts_with("at book.dsl:12:2"));
    assert!(text.contains("  in heading\n"));
    assert!(text.contains("  in chapter\n"));
}
