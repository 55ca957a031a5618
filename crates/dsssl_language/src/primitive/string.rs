//! Strings and symbols.

use std::fmt::Write;

use dsssl_foundation::{Error, Result, Signature, Type};

use crate::value::Value;
use crate::vm::CallContext;

use super::{Entry, expect, integer, number, string};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("string-append", Signature::variadic(0), string_append),
    ("string-length", Signature::fixed(1), string_length),
    ("string=?", Signature::fixed(2), string_eq),
    ("symbol->string", Signature::fixed(1), symbol_to_string),
    ("string->symbol", Signature::fixed(1), string_to_symbol),
    ("number->string", Signature::optional(1, 1), number_to_string),
];

fn string_append(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        out.push_str(string(arg)?);
    }
    Ok(Value::string(&out))
}

#[allow(clippy::cast_possible_wrap)]
fn string_length(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Integer(string(&args[0])?.chars().count() as i64))
}

fn string_eq(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(string(&args[0])? == string(&args[1])?))
}

fn symbol_to_string(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    match args[0] {
        Value::Symbol(id) => Ok(Value::string(ctx.interner().resolve(id))),
        ref other => Err(expect(Type::Symbol, other)),
    }
}

fn string_to_symbol(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    let name = string(&args[0])?;
    Ok(Value::Symbol(ctx.intern(name)))
}

/// Formats an integer in radix 2, 8, 10 or 16; anything else as printed.
fn number_to_string(args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    let n = number(&args[0])?;
    let radix = args.get(1).map(integer).transpose()?.unwrap_or(10);
    if radix == 10 {
        return Ok(Value::string(&ctx.print(&args[0])));
    }
    let Value::Integer(n) = args[0] else {
        return Err(Error::invalid_argument(format!(
            "radix {radix} needs an exact integer, got {}",
            n.to_f64()
        )));
    };
    let mut out = String::new();
    if n < 0 {
        out.push('-');
    }
    let magnitude = n.unsigned_abs();
    let written = match radix {
        2 => write!(out, "{magnitude:b}"),
        8 => write!(out, "{magnitude:o}"),
        16 => write!(out, "{magnitude:x}"),
        _ => return Err(Error::invalid_argument(format!("unsupported radix {radix}"))),
    };
    written.map_err(|e| Error::internal(e.to_string()))?;
    Ok(Value::string(&out))
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
    fn string_operations() {
        assert_eq!(eval("(string-append \"ab\" \"\" \"c\")"), "\"abc\"");
        assert_eq!(eval("(string-length \"hello\")"), "5");
        assert_eq!(eval("(string=? \"a\" \"a\")"), "#t");
    }

    #[test]
    fn symbols_round_trip_through_strings() {
        assert_eq!(eval("(symbol->string 'para)"), "\"para\"");
        assert_eq!(eval("(eq? (string->symbol \"para\") 'para)"), "#t");
    }

    #[test]
    fn numbers_format_in_radix() {
        assert_eq!(eval("(number->string 255 16)"), "\"ff\"");
        assert_eq!(eval("(number->string -5 2)"), "\"-101\"");
        assert_eq!(eval("(number->string 12pt)"), "\"12pt\"");
    }

    #[test]
    fn radix_needs_an_integer() {
        let mut interp = Interpreter::new();
        assert!(interp.eval_str("(number->string 1.5 2)").is_err());
        assert!(interp.eval_str("(number->string 10 7)").is_err());
    }
}
