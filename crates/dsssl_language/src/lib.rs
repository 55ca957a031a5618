//! Reader, expression compiler, and stack VM for the DSSSL expression
//! language.
//!
//! This crate provides:
//! - `Lexer` / `Parser` - Reading source text into [`Ast`] data
//! - `Analyzer` - Turning data into [`Expression`] trees and registering
//!   top-level definitions
//! - `Expression` - Optimizing and compiling expressions to instruction graphs
//! - [`Vm`] - Running instruction graphs on an operand and a control stack
//! - [`Interpreter`] - Identifier, unit, characteristic and mode tables
//!   shared by compilation and evaluation
//!
//! # Example
//!
//! ```
//! use dsssl_language::{Value, eval};
//!
//! let value = eval("(let loop ((i 0)) (if (= i 10) i (loop (+ i 1))))").unwrap();
//! assert!(matches!(value, Value::Integer(10)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analyzer;
pub mod ast;
pub mod diagnostic;
pub mod environment;
pub mod expression;
pub mod flow;
pub mod function;
pub mod insn;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod primitive;
pub mod span;
pub mod token;
pub mod value;
pub mod vm;

pub use analyzer::Analyzer;
pub use ast::{Ast, FormalMarker};
pub use diagnostic::{CollectingMessenger, Diagnostic, Messenger, Report, Severity, TracingMessenger};
pub use expression::{ExprKind, Expression};
pub use flow::{FlowObject, Sosofo, Style};
pub use function::{Closure, Continuation, Function, Primitive};
pub use insn::{Insn, InsnPtr};
pub use interpreter::{Interpreter, Options};
pub use lexer::Lexer;
pub use parser::{Parser, parse, parse_one};
pub use span::Span;
pub use value::Value;
pub use vm::{CallContext, Vm, eval};
