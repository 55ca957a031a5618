//! Sosofos, styles and the processing mode.

use std::rc::Rc;

use dsssl_foundation::{Result, Signature, Type};

use crate::flow::Sosofo;
use crate::value::Value;
use crate::vm::CallContext;

use super::{Entry, expect, string};

pub(super) const PRIMITIVES: &[Entry] = &[
    ("literal", Signature::variadic(0), literal),
    ("empty-sosofo", Signature::fixed(0), empty_sosofo),
    ("sosofo-append", Signature::variadic(0), sosofo_append),
    ("sosofo?", Signature::fixed(1), sosofo_p),
    ("style?", Signature::fixed(1), style_p),
    ("current-mode", Signature::fixed(0), current_mode),
];

/// Character data from the concatenated string arguments.
fn literal(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let mut text = String::new();
    for arg in args {
        text.push_str(string(arg)?);
    }
    Ok(Value::Sosofo(Rc::new(Sosofo::Literal(text.into()))))
}

fn empty_sosofo(_args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Sosofo(Rc::new(Sosofo::Empty)))
}

fn sosofo_append(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    let parts = args
        .iter()
        .map(|arg| match arg {
            Value::Sosofo(s) => Ok(Rc::clone(s)),
            other => Err(expect(Type::Sosofo, other)),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Sosofo(Rc::new(Sosofo::append(parts))))
}

fn sosofo_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Sosofo(_))))
}

fn style_p(args: &[Value], _ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Style(_))))
}

/// The mode symbol, or `#f` in the initial mode.
fn current_mode(_args: &[Value], ctx: &mut CallContext<'_>) -> Result<Value> {
    Ok(ctx.mode().map_or(Value::Bool(false), Value::Symbol))
}

#[cfg(test)]
mod tests {
    use crate::flow::Sosofo;
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    fn sosofo(source: &str) -> std::rc::Rc<Sosofo> {
        match Interpreter::new().eval_str(source) {
            Ok(Value::Sosofo(s)) => s,
            other => panic!("{source}: expected a sosofo, got {other:?}"),
        }
    }

    #[test]
    fn literal_and_append() {
        let s = sosofo("(sosofo-append (literal \"a\" \"b\") (empty-sosofo) (literal \"c\"))");
        assert_eq!(s.text(), "abc");
        assert!(matches!(*sosofo("(sosofo-append)"), Sosofo::Empty));
    }

    #[test]
    fn append_rejects_non_sosofos() {
        assert!(Interpreter::new().eval_str("(sosofo-append (literal \"a\") 1)").is_err());
    }

    #[test]
    fn current_mode_follows_with_mode() {
        let mut interp = Interpreter::new();
        let value = interp
            .eval_str("(mode toc) (list (current-mode) (with-mode toc (current-mode)))")
            .expect("evaluates");
        assert_eq!(interp.print(&value), "(#f toc)");
    }
}
