//! Type predicates and equivalence.

use dsssl_foundation::{Result, Signature};

use crate::value::Value;
use crate::vm::CallContext;

use super::Entry;

pub(super) const PRIMITIVES: &[Entry] = &[
    ("eq?", Signature::fixed(2), eq_p),
    ("eqv?", Signature::fixed(2), eqv_p),
    ("equal?", Signature::fixed(2), equal_p),
    ("not", Signature::fixed(1), not),
    ("boolean?", Signature::fixed(1), boolean_p),
    ("symbol?", Signature::fixed(1), symbol_p),
    ("string?", Signature::fixed(1), string_p),
    ("char?", Signature::fixed(1), char_p),
    ("procedure?", Signature::fixed(1), procedure_p),
    ("keyword?", Signature::fixed(1), keyword_p),
    ("vector?", Signature::fixed(1), vector_p),
];

fn eq_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].eq(&args[1])))
}

fn eqv_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].eqv(&args[1])))
}

fn equal_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].equal(&args[1])))
}

fn not(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(!args[0].is_true()))
}

fn boolean_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

fn symbol_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

fn string_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::String(_))))
}

fn char_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Char(_))))
}

fn procedure_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Function(_))))
}

fn keyword_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Keyword(_))))
}

fn vector_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Vector(_))))
}
