//! Pairs, lists and association lists.

use dsssl_foundation::{Error, ErrorKind, Result, Signature, Type};

use crate::value::Value;
use crate::vm::CallContext;

use super::{Entry, expect, index, list};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("cons", Signature::fixed(2), cons),
    ("car", Signature::fixed(1), car),
    ("cdr", Signature::fixed(1), cdr),
    ("list", Signature::variadic(0), make_list),
    ("length", Signature::fixed(1), length),
    ("append", Signature::variadic(0), append),
    ("reverse", Signature::fixed(1), reverse),
    ("list-ref", Signature::fixed(2), list_ref),
    ("member", Signature::fixed(2), member),
    ("memv", Signature::fixed(2), memv),
    ("assoc", Signature::fixed(2), assoc),
    ("assq", Signature::fixed(2), assq),
    ("null?", Signature::fixed(1), null_p),
    ("pair?", Signature::fixed(1), pair_p),
    ("list?", Signature::fixed(1), list_p),
];

fn cons(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

fn car(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    args[0]
        .as_pair()
        .map(|p| p.car.clone())
        .ok_or_else(|| expect(Type::Pair, &args[0]))
}

fn cdr(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    args[0]
        .as_pair()
        .map(|p| p.cdr.clone())
        .ok_or_else(|| expect(Type::Pair, &args[0]))
}

fn make_list(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::list(args.iter().cloned()))
}

#[allow(clippy::cast_possible_wrap)]
fn length(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Integer(list(&args[0])?.len() as i64))
}

/// Every argument but the last must be a list; the last becomes the tail.
fn append(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let Some((tail, lists)) = args.split_last() else {
        return Ok(Value::Nil);
    };
    let mut items = Vec::new();
    for l in lists {
        items.extend(list(l)?);
    }
    Ok(Value::list_with_tail(items, tail.clone()))
}

fn reverse(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let items = list(&args[0])?;
    Ok(items.into_iter().fold(Value::Nil, |acc, item| Value::cons(item, acc)))
}

#[allow(clippy::cast_possible_wrap)]
fn list_ref(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let items = list(&args[0])?;
    let k = index(&args[1])?;
    items.get(k).cloned().ok_or_else(|| {
        Error::new(ErrorKind::IndexOutOfBounds {
            index: k as i64,
            length: items.len(),
        })
    })
}

/// Returns the first sublist of `list` whose car satisfies `matches`.
fn find_tail(list: &Value, matches: impl Fn(&Value) -> bool) -> Result<Value> {
    let mut cursor = list;
    loop {
        match cursor {
            Value::Pair(p) if matches(&p.car) => return Ok(cursor.clone()),
            Value::Pair(p) => cursor = &p.cdr,
            Value::Nil => return Ok(Value::Bool(false)),
            _ => return Err(expect(Type::List, list)),
        }
    }
}

fn member(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    find_tail(&args[1], |v| v.equal(&args[0]))
}

fn memv(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    find_tail(&args[1], |v| v.eqv(&args[0]))
}

/// Returns the first pair in `alist` whose car satisfies `matches`.
fn find_entry(alist: &Value, matches: impl Fn(&Value) -> bool) -> Result<Value> {
    let tail = find_tail(alist, |entry| entry.as_pair().is_some_and(|p| matches(&p.car)))?;
    Ok(tail.as_pair().map_or(Value::Bool(false), |p| p.car.clone()))
}

fn assoc(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    find_entry(&args[1], |v| v.equal(&args[0]))
}

fn assq(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    find_entry(&args[1], |v| v.eq(&args[0]))
}

fn null_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].is_nil()))
}

fn pair_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].as_pair().is_some()))
}

fn list_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(args[0].list_to_vec().is_some()))
}
