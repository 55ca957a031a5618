//! Higher-order procedures and `error`.
//!
//! `map` and `for-each` call their procedure through
//! [`CallContext::apply`], so each call runs in a nested VM. A continuation
//! captured outside that VM is dead inside it.

use dsssl_foundation::{Error, Result, Signature};

use crate::value::Value;
use crate::vm::CallContext;

use super::{Entry, list, procedure};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("map", Signature::variadic(2), map),
    ("for-each", Signature::variadic(2), for_each),
    ("error", Signature::variadic(1), error),
];

/// Calls `args[0]` on successive elements of the lists in `args[1..]`,
/// stopping at the end of the shortest list.
///
/// Returns `None` if a call failed.
fn each(args: &[Value], ctx: &mut CallContext<'_>, mut visit: impl FnMut(Value)) -> Result<Option<()>> {
    let function = procedure(&args[0])?;
    let lists = args[1..].iter().map(list).collect::<Result<Vec<_>>>()?;
    let n = lists.iter().map(Vec::len).min().unwrap_or(0);
    let mut row = Vec::with_capacity(lists.len());
    for i in 0..n {
        row.clear();
        row.extend(lists.iter().map(|l| l[i].clone()));
        let result = ctx.apply(function, &row);
        if result.is_error() {
            return Ok(None);
        }
        visit(result);
    }
    Ok(Some(()))
}

fn map(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    let mut results = Vec::new();
    Ok(match each(args, ctx, |v| results.push(v))? {
        Some(()) => Value::list(results),
        None => Value::Error,
    })
}

fn for_each(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(match each(args, ctx, drop)? {
        Some(()) => Value::Unspecified,
        None => Value::Error,
    })
}

/// Signals an error with the message string followed by any irritants.
fn error(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    let mut message = match &args[0] {
        Value::String(s) => s.to_string(),
        other => ctx.print(other),
    };
    for irritant in &args[1..] {
        message.push(' ');
        message.push_str(&ctx.print(irritant));
    }
    Err(Error::user(message))
}
