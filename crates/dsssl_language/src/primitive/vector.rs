//! Vectors.

use dsssl_foundation::{Error, ErrorKind, Result, Signature, Type};

use crate::diagnostic::Diagnostic;
use crate::value::{Value, VectorObj};
use crate::vm::CallContext;

use super::{Entry, expect, index, list};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("vector", Signature::variadic(0), vector),
    ("make-vector", Signature::optional(1, 1), make_vector),
    ("vector-ref", Signature::fixed(2), vector_ref),
    ("vector-set!", Signature::fixed(3), vector_set),
    ("vector-length", Signature::fixed(1), vector_length),
    ("vector->list", Signature::fixed(1), vector_to_list),
    ("list->vector", Signature::fixed(1), list_to_vector),
];

fn vector_arg(value: &Value) -> Result<&VectorObj> {
    match value {
        Value::Vector(v) => Ok(v),
        other => Err(expect(Type::Vector, other)),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn out_of_bounds(k: usize, length: usize) -> Error {
    Error::new(ErrorKind::IndexOutOfBounds {
        index: k as i64,
        length,
    })
}

fn vector(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::vector(args.to_vec()))
}

fn make_vector(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let k = index(&args[0])?;
    let fill = args.get(1).cloned().unwrap_or(Value::Unspecified);
    Ok(Value::vector(vec![fill; k]))
}

fn vector_ref(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let v = vector_arg(&args[0])?;
    let k = index(&args[1])?;
    v.elements()
        .get(k)
        .cloned()
        .ok_or_else(|| out_of_bounds(k, v.len()))
}

/// Frozen vectors are reported as `readOnly` and abort the evaluation.
fn vector_set(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    let v = vector_arg(&args[0])?;
    let k = index(&args[1])?;
    if v.is_read_only() {
        let location = ctx.location();
        ctx.interp().report_at(location, Diagnostic::ReadOnly);
        return Ok(Value::Error);
    }
    if v.set(k, args[2].clone()) {
        Ok(Value::Unspecified)
    } else {
        Err(out_of_bounds(k, v.len()))
    }
}

#[allow(clippy::cast_possible_wrap)]
fn vector_length(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Integer(vector_arg(&args[0])?.len() as i64))
}

fn vector_to_list(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let v = vector_arg(&args[0])?;
    let elements = v.elements().clone();
    Ok(Value::list(elements))
}

fn list_to_vector(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::vector(list(&args[0])?))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        let value = interp.eval_str(source).expect("evaluates");
        interp.print(&value)
    }

    #[test]
    fn construction_and_access() {
        assert_eq!(eval("(vector 1 'a)"), "#(1 a)");
        assert_eq!(eval("(make-vector 2 0)"), "#(0 0)");
        assert_eq!(eval("(vector-ref #(a b c) 2)"), "c");
        assert_eq!(eval("(vector-length (make-vector 3))"), "3");
    }

    #[test]
    fn mutation_of_a_fresh_vector() {
        assert_eq!(eval("(let ((v (vector 1 2))) (vector-set! v 0 'x) v)"), "#(x 2)");
    }

    #[test]
    fn conversions() {
        assert_eq!(eval("(vector->list #(1 2))"), "(1 2)");
        assert_eq!(eval("(list->vector '(1 2))"), "#(1 2)");
    }

    #[test]
    fn index_errors() {
        let mut interp = Interpreter::new();
        assert!(interp.eval_str("(vector-ref #(1) 1)").is_err());
        assert!(interp.eval_str("(vector-ref #(1) -1)").is_err());
        assert!(interp.eval_str("(vector-set! (vector 1) 5 0)").is_err());
    }
}
