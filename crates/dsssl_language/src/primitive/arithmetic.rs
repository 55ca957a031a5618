//! Arithmetic on integers, reals, lengths and quantities.

use std::cmp::Ordering;

use dsssl_foundation::{Error, ErrorKind, Number, Result, Signature};

use crate::value::Value;
use crate::vm::CallContext;

use super::{Entry, integer, number};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("+", Signature::variadic(0), add),
    ("-", Signature::variadic(1), sub),
    ("*", Signature::variadic(0), mul),
    ("/", Signature::variadic(1), div),
    ("quotient", Signature::fixed(2), quotient),
    ("remainder", Signature::fixed(2), remainder),
    ("modulo", Signature::fixed(2), modulo),
    ("abs", Signature::fixed(1), abs),
    ("min", Signature::variadic(1), min),
    ("max", Signature::variadic(1), max),
    ("=", Signature::variadic(1), num_eq),
    ("<", Signature::variadic(1), num_lt),
    (">", Signature::variadic(1), num_gt),
    ("<=", Signature::variadic(1), num_le),
    (">=", Signature::variadic(1), num_ge),
    ("zero?", Signature::fixed(1), zero_p),
    ("number?", Signature::fixed(1), number_p),
    ("integer?", Signature::fixed(1), integer_p),
    ("real?", Signature::fixed(1), real_p),
    ("exact->inexact", Signature::fixed(1), exact_to_inexact),
];

fn fold(args: &[Value], init: Number, op: fn(Number, Number) -> Result<Number>) -> Result<Value> {
    let mut acc = init;
    for arg in args {
        acc = op(acc, number(arg)?)?;
    }
    Ok(Value::from_number(acc))
}

fn add(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    // Seeding with 0 would fix the dimension to that of a plain number
    let Some((first, rest)) = args.split_first() else {
        return Ok(Value::Integer(0));
    };
    fold(rest, number(first)?, Number::add)
}

fn mul(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    fold(args, Number::Integer(1), Number::mul)
}

fn sub(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let first = number(&args[0])?;
    if args.len() == 1 {
        return Ok(Value::from_number(first.negate()));
    }
    fold(&args[1..], first, Number::sub)
}

fn div(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let first = number(&args[0])?;
    if args.len() == 1 {
        return Number::Integer(1).div(first).map(Value::from_number);
    }
    fold(&args[1..], first, Number::div)
}

// =============================================================================
// Integer division
// =============================================================================

fn integer_pair(args: &[Value]) -> Result<(i64, i64)> {
    let a = integer(&args[0])?;
    let b = integer(&args[1])?;
    if b == 0 {
        return Err(Error::new(ErrorKind::DivisionByZero));
    }
    Ok((a, b))
}

fn quotient(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let (a, b) = integer_pair(args)?;
    a.checked_div(b)
        .map(Value::Integer)
        .ok_or_else(|| Error::invalid_argument("integer overflow"))
}

fn remainder(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let (a, b) = integer_pair(args)?;
    Ok(Value::Integer(a.wrapping_rem(b)))
}

/// Like `remainder`, but the result takes the sign of the divisor.
fn modulo(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let (a, b) = integer_pair(args)?;
    let r = a.wrapping_rem(b);
    Ok(Value::Integer(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
}

// =============================================================================
// Comparison
// =============================================================================

fn abs(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let n = number(&args[0])?;
    Ok(Value::from_number(if n.to_f64() < 0.0 { n.negate() } else { n }))
}

/// `min` or `max`; the result is inexact if any argument is.
fn extremum(args: &[Value], keep: Ordering) -> Result<Value> {
    let mut best = number(&args[0])?;
    let mut exact = best.is_exact();
    for arg in &args[1..] {
        let n = number(arg)?;
        exact &= n.is_exact();
        if n.compare(best)? == keep {
            best = n;
        }
    }
    Ok(Value::from_number(if exact { best } else { best.to_inexact() }))
}

fn min(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    extremum(args, Ordering::Less)
}

fn max(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    extremum(args, Ordering::Greater)
}

/// Checks `holds` on each adjacent pair. Every argument must be a number.
fn chain(args: &[Value], holds: fn(Ordering) -> bool) -> Result<Value> {
    let numbers = args.iter().map(number).collect::<Result<Vec<_>>>()?;
    let mut result = true;
    for pair in numbers.windows(2) {
        result &= holds(pair[0].compare(pair[1])?);
    }
    Ok(Value::Bool(result))
}

fn num_eq(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    chain(args, Ordering::is_eq)
}

fn num_lt(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    chain(args, Ordering::is_lt)
}

fn num_gt(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    chain(args, Ordering::is_gt)
}

fn num_le(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    chain(args, Ordering::is_le)
}

fn num_ge(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    chain(args, Ordering::is_ge)
}

// =============================================================================
// Predicates and conversion
// =============================================================================

fn zero_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(number(&args[0])?.to_f64() == 0.0))
}

fn number_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].as_number().is_some()))
}

fn integer_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(match args[0] {
        Value::Integer(_) => true,
        Value::Real(r) => r.is_finite() && r.fract() == 0.0,
        _ => false,
    }))
}

fn real_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Integer(_) | Value::Real(_))))
}

fn exact_to_inexact(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::from_number(number(&args[0])?.to_inexact()))
}
