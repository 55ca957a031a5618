//! Built-in procedures.
//!
//! Primitives are organized by category:
//! - `arithmetic`: numbers, lengths and quantities
//! - `list`: pairs, lists and association lists
//! - `predicates`: type tests and equivalence
//! - `string`: strings and symbols
//! - `vector`: vectors
//! - `control`: higher-order procedures and `error`
//! - `sosofo`: sosofos, styles and the processing mode
//!
//! `apply` and `call-with-current-continuation` are not primitives: they
//! work on the calling VM's stacks and are bound to dedicated
//! [`Function`] variants.

#[allow(clippy::unnecessary_wraps)]
mod arithmetic;
#[allow(clippy::unnecessary_wraps)]
mod control;
#[allow(clippy::unnecessary_wraps)]
mod list;
#[allow(clippy::unnecessary_wraps)]
mod predicates;
#[allow(clippy::unnecessary_wraps)]
mod sosofo;
#[allow(clippy::unnecessary_wraps)]
mod string;
#[allow(clippy::unnecessary_wraps)]
mod vector;

use std::rc::Rc;

use dsssl_foundation::{Error, Number, Result, Signature, Type};

use crate::function::{Function, Primitive, PrimitiveFn};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Name, accepted arguments and body of one primitive.
type Entry = (&'static str, Signature, PrimitiveFn);

/// Binds every built-in procedure in `interp`.
pub fn install(interp: &mut Interpreter) {
    let tables: [&[Entry]; 7] = [
        arithmetic::PRIMITIVES,
        list::PRIMITIVES,
        predicates::PRIMITIVES,
        string::PRIMITIVES,
        vector::PRIMITIVES,
        control::PRIMITIVES,
        sosofo::PRIMITIVES,
    ];
    for (name, signature, body) in tables.into_iter().flatten() {
        let primitive = Primitive {
            name: *name,
            signature: signature.clone(),
            body: *body,
        };
        interp.define_builtin(name, Value::Function(Rc::new(Function::Primitive(primitive))));
    }

    let apply = Value::Function(Rc::new(Function::Apply));
    interp.define_builtin("apply", apply);
    let call_cc = Value::Function(Rc::new(Function::CallWithCurrentContinuation));
    interp.define_builtin("call-with-current-continuation", call_cc.clone());
    interp.define_builtin("call/cc", call_cc);
}

// =============================================================================
// Argument helpers
// =============================================================================

fn expect(expected: Type, actual: &Value) -> Error {
    Error::type_mismatch(expected, actual.type_of())
}

fn number(value: &Value) -> Result<Number> {
    value.as_number().ok_or_else(|| expect(Type::Number, value))
}

fn integer(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(expect(Type::Integer, other)),
    }
}

/// A non-negative integer usable as an index or count.
fn index(value: &Value) -> Result<usize> {
    let n = integer(value)?;
    usize::try_from(n).map_err(|_| Error::invalid_argument(format!("{n} is negative")))
}

fn string(value: &Value) -> Result<&str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(expect(Type::String, other)),
    }
}

fn list(value: &Value) -> Result<Vec<Value>> {
    value.list_to_vec().ok_or_else(|| expect(Type::List, value))
}

fn procedure(value: &Value) -> Result<&Rc<Function>> {
    value.as_function().ok_or_else(|| expect(Type::Procedure, value))
}
