//! Syntax analyzer: turns read data into expression trees.
//!
//! Top-level definitions (`define`, `define-unit`,
//! `declare-initial-value`, `mode`) are registered with the interpreter
//! as they are analyzed; every other form becomes an [`Expression`].
//! Derived forms are expanded here: `cond` and `and` into `if`, named
//! `let` into `letrec`, internal definitions into `letrec`.

#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]

use dsssl_foundation::{Error, Location, Result, SymbolId};

use crate::ast::{Ast, FormalMarker};
use crate::expression::{
    Bindings, Case, CaseClause, ExprKind, Expression, Lambda, MakeSpec, QuasiquoteKind, StyleSpec,
};
use crate::interpreter::Interpreter;
use crate::value::{UnresolvedQuantity, Value};

/// Names that introduce special forms and cannot be bound.
const SYNTACTIC_KEYWORDS: &[&str] = &[
    "quote",
    "quasiquote",
    "unquote",
    "unquote-splicing",
    "lambda",
    "if",
    "cond",
    "case",
    "and",
    "or",
    "let",
    "let*",
    "letrec",
    "begin",
    "set!",
    "define",
    "else",
    "=>",
    "with-mode",
    "style",
    "make",
];

fn syntax_error(message: impl Into<String>, ast: &Ast) -> Error {
    Error::syntax(message, ast.span().location())
}

fn exact_args<const N: usize>(form: &Ast) -> Result<&[Ast; N]> {
    form.as_list()
        .and_then(|items| items.try_into().ok())
        .ok_or_else(|| {
            let head = form.head().unwrap_or("form");
            syntax_error(format!("{head} takes {} operands", N - 1), form)
        })
}

/// Parameter list sections, before they become a [`Lambda`].
#[derive(Default)]
struct Formals {
    required: Vec<SymbolId>,
    optional: Vec<(SymbolId, Option<Expression>)>,
    rest: Option<SymbolId>,
    keys: Vec<(SymbolId, Option<Expression>)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Required,
    Optional,
    Rest,
    Key,
}

/// Analyzer over one interpreter.
pub struct Analyzer<'a> {
    interp: &'a mut Interpreter,
}

impl<'a> Analyzer<'a> {
    /// Creates an analyzer that registers definitions with `interp`.
    pub fn new(interp: &'a mut Interpreter) -> Self {
        Self { interp }
    }

    /// Analyzes a top-level form.
    ///
    /// Returns `None` for definitions, which are registered instead.
    ///
    /// # Errors
    /// Returns a syntax error if the form is malformed.
    pub fn top_level(&mut self, form: &Ast) -> Result<Option<Expression>> {
        let location = form.span().location();
        match form.head() {
            Some("define") => {
                let (name, value) = self.definition(form)?;
                self.interp.define(name, value, location);
                Ok(None)
            }
            Some("define-unit") => {
                let [_, name, value] = exact_args::<3>(form)?;
                let name = self.symbol(name)?;
                let value = self.expression(value)?;
                self.interp.define_unit(name, value, location);
                Ok(None)
            }
            Some("declare-initial-value") => {
                let [_, name, value] = exact_args::<3>(form)?;
                let name = self.symbol(name)?;
                let value = self.expression(value)?;
                self.interp.declare_initial_value(name, value, location);
                Ok(None)
            }
            Some("mode") => {
                let name = form
                    .as_list()
                    .and_then(|items| items.get(1))
                    .ok_or_else(|| syntax_error("mode needs a name", form))?;
                let name = self.symbol(name)?;
                self.interp.declare_mode(name);
                Ok(None)
            }
            _ => self.expression(form).map(Some),
        }
    }

    /// Analyzes an expression.
    ///
    /// # Errors
    /// Returns a syntax error if the expression is malformed.
    pub fn expression(&mut self, ast: &Ast) -> Result<Expression> {
        let location = ast.span().location();
        match ast {
            Ast::Symbol(name, _) => {
                if SYNTACTIC_KEYWORDS.contains(&name.as_str()) {
                    return Err(syntax_error(format!("syntactic keyword `{name}` used as a variable"), ast));
                }
                let id = self.interp.intern(name);
                Ok(Expression::variable(id, location))
            }
            Ast::List(items, _) => self.combination(ast, items, location),
            Ast::DottedList(..) => Err(syntax_error("dotted list is not an expression", ast)),
            Ast::Marker(..) => Err(syntax_error("formal marker outside a parameter list", ast)),
            _ => Ok(Expression::constant(self.datum(ast)?, location)),
        }
    }

    fn combination(&mut self, ast: &Ast, items: &[Ast], location: Location) -> Result<Expression> {
        let Some(head) = items.first() else {
            return Err(syntax_error("empty combination", ast));
        };
        let args = &items[1..];
        let kind = match head.as_symbol() {
            Some("quote") => {
                let [datum] = args else {
                    return Err(syntax_error("quote takes one datum", ast));
                };
                ExprKind::Constant(self.datum(datum)?)
            }
            Some("quasiquote") => {
                let [template] = args else {
                    return Err(syntax_error("quasiquote takes one template", ast));
                };
                return self.quasiquote(template);
            }
            Some("unquote" | "unquote-splicing") => {
                return Err(syntax_error("unquote outside quasiquote", ast));
            }
            Some("lambda") => {
                let [formals, body @ ..] = args else {
                    return Err(syntax_error("lambda needs a parameter list", ast));
                };
                ExprKind::Lambda(Box::new(self.lambda(formals, body, ast)?))
            }
            Some("if") => {
                let (test, consequent, alternative) = match args {
                    [test, consequent] => (test, consequent, None),
                    [test, consequent, alternative] => (test, consequent, Some(alternative)),
                    _ => return Err(syntax_error("if takes two or three operands", ast)),
                };
                let alternative = match alternative {
                    Some(alternative) => self.expression(alternative)?,
                    None => Expression::constant(Value::Unspecified, location),
                };
                ExprKind::If {
                    test: Box::new(self.expression(test)?),
                    consequent: Box::new(self.expression(consequent)?),
                    alternative: Box::new(alternative),
                }
            }
            Some("cond") => return self.cond(args, location),
            Some("case") => return self.case(args, ast, location),
            Some("and") => return self.and(args, location),
            Some("or") => return self.or(args, location),
            Some("let") => return self.named_or_plain_let(args, ast, location),
            Some("let*") => {
                let bindings = self.let_bindings(args, ast)?;
                ExprKind::LetStar(Box::new(bindings))
            }
            Some("letrec") => {
                let bindings = self.let_bindings(args, ast)?;
                ExprKind::Letrec(Box::new(bindings))
            }
            Some("begin") => {
                if args.is_empty() {
                    return Ok(Expression::constant(Value::Unspecified, location));
                }
                return self.sequence(args, location);
            }
            Some("set!") => {
                let [name, value] = args else {
                    return Err(syntax_error("set! takes a variable and a value", ast));
                };
                ExprKind::Assignment {
                    name: self.variable_name(name)?,
                    value: Box::new(self.expression(value)?),
                }
            }
            Some("define") => return Err(syntax_error("definition in expression context", ast)),
            Some("with-mode") => {
                let [mode, body] = args else {
                    return Err(syntax_error("with-mode takes a mode and an expression", ast));
                };
                ExprKind::WithMode {
                    mode: self.symbol(mode)?,
                    body: Box::new(self.expression(body)?),
                }
            }
            Some("style") => {
                let (style, rest) = self.keyword_args(args)?;
                if let Some(extra) = rest.first() {
                    return Err(syntax_error("style takes only keyword arguments", extra));
                }
                ExprKind::Style(Box::new(style))
            }
            Some("make") => {
                let [class, rest @ ..] = args else {
                    return Err(syntax_error("make needs a flow object class", ast));
                };
                let class = self.symbol(class)?;
                let (style, content) = self.keyword_args(rest)?;
                let content = content
                    .iter()
                    .map(|c| self.expression(c))
                    .collect::<Result<Vec<_>>>()?;
                ExprKind::Make(Box::new(MakeSpec { class, style, content }))
            }
            _ => ExprKind::Call {
                op: Box::new(self.expression(head)?),
                args: args
                    .iter()
                    .map(|a| self.expression(a))
                    .collect::<Result<Vec<_>>>()?,
            },
        };
        Ok(Expression::new(kind, location))
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Converts a literal to a value.
    fn datum(&mut self, ast: &Ast) -> Result<Value> {
        Ok(match ast {
            Ast::Bool(b, _) => Value::Bool(*b),
            Ast::Integer(n, _) => Value::Integer(*n),
            Ast::Real(r, _) => Value::Real(*r),
            Ast::Quantity(magnitude, unit, _) => {
                let unit = self.interp.intern(unit);
                Value::UnresolvedQuantity(std::rc::Rc::new(UnresolvedQuantity {
                    magnitude: *magnitude,
                    unit,
                }))
            }
            Ast::Char(c, _) => Value::Char(*c),
            Ast::String(s, _) => Value::string(s),
            Ast::Symbol(name, _) => Value::Symbol(self.interp.intern(name)),
            Ast::Keyword(name, _) => Value::Keyword(self.interp.intern(name)),
            Ast::Marker(..) => return Err(syntax_error("formal marker in datum", ast)),
            Ast::List(items, _) => {
                let items = items.iter().map(|i| self.datum(i)).collect::<Result<Vec<_>>>()?;
                Value::list(items)
            }
            Ast::DottedList(items, tail, _) => {
                let items = items.iter().map(|i| self.datum(i)).collect::<Result<Vec<_>>>()?;
                let tail = self.datum(tail)?;
                Value::list_with_tail(items, tail)
            }
            Ast::Vector(items, _) => {
                let items = items.iter().map(|i| self.datum(i)).collect::<Result<Vec<_>>>()?;
                Value::vector(items)
            }
        })
    }

    fn quasiquote(&mut self, template: &Ast) -> Result<Expression> {
        let location = template.span().location();
        let (kind, items, tail) = match template {
            Ast::List(items, _) => {
                if let Some(("unquote", [expr])) = template.head().zip(items.get(1..)) {
                    return self.expression(expr);
                }
                (QuasiquoteKind::List, items.as_slice(), None)
            }
            Ast::DottedList(items, tail, _) => (QuasiquoteKind::Improper, items.as_slice(), Some(&**tail)),
            Ast::Vector(items, _) => (QuasiquoteKind::Vector, items.as_slice(), None),
            _ => return Ok(Expression::constant(self.datum(template)?, location)),
        };
        let mut members = Vec::with_capacity(items.len() + 1);
        let mut spliced = Vec::with_capacity(items.len() + 1);
        for item in items {
            match item.head().zip(item.as_list().and_then(|l| l.get(1..))) {
                Some(("unquote-splicing", [expr])) => {
                    members.push(self.expression(expr)?);
                    spliced.push(true);
                }
                _ => {
                    members.push(self.quasiquote(item)?);
                    spliced.push(false);
                }
            }
        }
        if let Some(tail) = tail {
            if tail.head() == Some("unquote-splicing") {
                return Err(syntax_error("unquote-splicing in the tail of a dotted list", tail));
            }
            members.push(self.quasiquote(tail)?);
            spliced.push(false);
        }
        Ok(Expression::new(
            ExprKind::Quasiquote {
                kind,
                members,
                spliced,
            },
            location,
        ))
    }

    // =========================================================================
    // Names and definitions
    // =========================================================================

    fn symbol(&mut self, ast: &Ast) -> Result<SymbolId> {
        match ast.as_symbol() {
            Some(name) => Ok(self.interp.intern(name)),
            None => Err(syntax_error(format!("expected an identifier, found {}", ast.type_name()), ast)),
        }
    }

    fn variable_name(&mut self, ast: &Ast) -> Result<SymbolId> {
        match ast.as_symbol() {
            Some(name) if SYNTACTIC_KEYWORDS.contains(&name) => {
                Err(syntax_error(format!("syntactic keyword `{name}` cannot be bound"), ast))
            }
            _ => self.symbol(ast),
        }
    }

    /// `(define name expr)` or `(define (name . formals) body...)`.
    fn definition(&mut self, form: &Ast) -> Result<(SymbolId, Expression)> {
        let items = form.as_list().unwrap_or_default();
        match items {
            [_, Ast::Symbol(..), value] => {
                let name = self.variable_name(&items[1])?;
                Ok((name, self.expression(value)?))
            }
            [_, Ast::List(signature, _), body @ ..] if !signature.is_empty() => {
                let name = self.variable_name(&signature[0])?;
                let formals = Ast::List(signature[1..].to_vec(), items[1].span());
                let lambda = self.lambda(&formals, body, form)?;
                Ok((name, Expression::new(ExprKind::Lambda(Box::new(lambda)), form.span().location())))
            }
            [_, Ast::DottedList(signature, rest, span), body @ ..] if !signature.is_empty() => {
                let name = self.variable_name(&signature[0])?;
                let formals = if signature.len() == 1 {
                    (**rest).clone()
                } else {
                    Ast::DottedList(signature[1..].to_vec(), rest.clone(), *span)
                };
                let lambda = self.lambda(&formals, body, form)?;
                Ok((name, Expression::new(ExprKind::Lambda(Box::new(lambda)), form.span().location())))
            }
            _ => Err(syntax_error("malformed definition", form)),
        }
    }

    // =========================================================================
    // Procedures and bodies
    // =========================================================================

    fn lambda(&mut self, formals: &Ast, body: &[Ast], form: &Ast) -> Result<Lambda> {
        let formals = self.formals(formals)?;
        let body = self.body(body, form)?;
        Ok(Lambda::new(
            formals.required,
            formals.optional,
            formals.rest,
            formals.keys,
            body,
        ))
    }

    fn formals(&mut self, ast: &Ast) -> Result<Formals> {
        let mut formals = Formals::default();
        let (items, tail) = match ast {
            Ast::Symbol(..) => {
                formals.rest = Some(self.variable_name(ast)?);
                return Ok(formals);
            }
            Ast::List(items, _) => (items.as_slice(), None),
            Ast::DottedList(items, tail, _) => (items.as_slice(), Some(&**tail)),
            _ => return Err(syntax_error("malformed parameter list", ast)),
        };
        let mut section = Section::Required;
        for item in items {
            match (item, section) {
                (Ast::Marker(FormalMarker::Optional, _), Section::Required) => section = Section::Optional,
                (Ast::Marker(FormalMarker::Rest, _), Section::Required | Section::Optional) => {
                    section = Section::Rest;
                }
                (Ast::Marker(FormalMarker::Key, _), _) => section = Section::Key,
                (Ast::Marker(..), _) => return Err(syntax_error("parameter marker out of order", item)),
                (Ast::Symbol(..), Section::Required) => formals.required.push(self.variable_name(item)?),
                (Ast::Symbol(..), Section::Rest) if formals.rest.is_none() => {
                    formals.rest = Some(self.variable_name(item)?);
                }
                (Ast::Symbol(..), Section::Optional) => formals.optional.push((self.variable_name(item)?, None)),
                (Ast::Symbol(..), Section::Key) => formals.keys.push((self.variable_name(item)?, None)),
                (Ast::List(pair, _), Section::Optional | Section::Key) => {
                    let [name, init] = pair.as_slice() else {
                        return Err(syntax_error("default must be (name expression)", item));
                    };
                    let entry = (self.variable_name(name)?, Some(self.expression(init)?));
                    if section == Section::Optional {
                        formals.optional.push(entry);
                    } else {
                        formals.keys.push(entry);
                    }
                }
                _ => return Err(syntax_error("malformed parameter", item)),
            }
        }
        if let Some(tail) = tail {
            if formals.rest.is_some() || !formals.keys.is_empty() {
                return Err(syntax_error("dotted parameter after #!rest or #!key", tail));
            }
            formals.rest = Some(self.variable_name(tail)?);
        }
        Ok(formals)
    }

    /// A body: internal definitions, then at least one expression.
    fn body(&mut self, forms: &[Ast], context: &Ast) -> Result<Expression> {
        let n_defines = forms.iter().take_while(|f| f.head() == Some("define")).count();
        let (defines, exprs) = forms.split_at(n_defines);
        let Some(first) = exprs.first() else {
            return Err(syntax_error("body has no expressions", context));
        };
        let location = first.span().location();
        let body = self.sequence(exprs, location)?;
        if defines.is_empty() {
            return Ok(body);
        }
        let mut vars = Vec::with_capacity(defines.len());
        let mut inits = Vec::with_capacity(defines.len());
        for define in defines {
            let (name, init) = self.definition(define)?;
            vars.push(name);
            inits.push(init);
        }
        Ok(Expression::new(
            ExprKind::Letrec(Box::new(Bindings::new(vars, inits, body))),
            defines[0].span().location(),
        ))
    }

    fn sequence(&mut self, forms: &[Ast], location: Location) -> Result<Expression> {
        let mut exprs = forms
            .iter()
            .map(|f| self.expression(f))
            .collect::<Result<Vec<_>>>()?;
        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }
        Ok(Expression::new(ExprKind::Sequence(exprs), location))
    }

    // =========================================================================
    // Binding forms
    // =========================================================================

    fn binding_list(&mut self, ast: &Ast) -> Result<(Vec<SymbolId>, Vec<Expression>)> {
        let Some(items) = ast.as_list() else {
            return Err(syntax_error("malformed binding list", ast));
        };
        let mut vars = Vec::with_capacity(items.len());
        let mut inits = Vec::with_capacity(items.len());
        for binding in items {
            let Some([name, init]) = binding.as_list().and_then(|b| <&[Ast; 2]>::try_from(b).ok()) else {
                return Err(syntax_error("binding must be (name expression)", binding));
            };
            vars.push(self.variable_name(name)?);
            inits.push(self.expression(init)?);
        }
        Ok((vars, inits))
    }

    fn let_bindings(&mut self, args: &[Ast], form: &Ast) -> Result<Bindings> {
        let [bindings, body @ ..] = args else {
            return Err(syntax_error("missing binding list", form));
        };
        let (vars, inits) = self.binding_list(bindings)?;
        let body = self.body(body, form)?;
        Ok(Bindings::new(vars, inits, body))
    }

    /// Named `let` becomes `((letrec ((name (lambda vars body))) name) inits...)`.
    fn named_or_plain_let(&mut self, args: &[Ast], form: &Ast, location: Location) -> Result<Expression> {
        let [Ast::Symbol(..), bindings, body @ ..] = args else {
            let bindings = self.let_bindings(args, form)?;
            return Ok(Expression::new(ExprKind::Let(Box::new(bindings)), location));
        };
        let name = self.variable_name(&args[0])?;
        let (vars, inits) = self.binding_list(bindings)?;
        let body = self.body(body, form)?;
        let lambda = Lambda::new(vars, Vec::new(), None, Vec::new(), body);
        let procedure = Expression::new(
            ExprKind::Letrec(Box::new(Bindings::new(
                vec![name],
                vec![Expression::new(ExprKind::Lambda(Box::new(lambda)), location)],
                Expression::variable(name, location),
            ))),
            location,
        );
        Ok(Expression::new(
            ExprKind::Call {
                op: Box::new(procedure),
                args: inits,
            },
            location,
        ))
    }

    // =========================================================================
    // Conditionals
    // =========================================================================

    /// What an unmatched `cond` or `case` evaluates to.
    fn no_match(&self, location: Location) -> Option<Expression> {
        self.interp
            .options()
            .dsssl2
            .then(|| Expression::constant(Value::Unspecified, location))
    }

    fn cond(&mut self, clauses: &[Ast], location: Location) -> Result<Expression> {
        let mut result = self
            .no_match(location)
            .unwrap_or_else(|| Expression::new(ExprKind::CondFail, location));
        for (i, clause) in clauses.iter().enumerate().rev() {
            let Some(items) = clause.as_list().filter(|items| !items.is_empty()) else {
                return Err(syntax_error("cond clause must be a non-empty list", clause));
            };
            let clause_location = clause.span().location();
            if items[0].is_symbol("else") {
                if i + 1 != clauses.len() {
                    return Err(syntax_error("else must be the last cond clause", clause));
                }
                if items.len() == 1 {
                    return Err(syntax_error("else clause has no expressions", clause));
                }
                result = self.sequence(&items[1..], clause_location)?;
                continue;
            }
            if items.get(1).is_some_and(|a| a.is_symbol("=>")) {
                return Err(syntax_error("=> in cond clauses is not supported", clause));
            }
            let test = self.expression(&items[0])?;
            result = if items.len() == 1 {
                Expression::new(
                    ExprKind::Or {
                        first: Box::new(test),
                        second: Box::new(result),
                    },
                    clause_location,
                )
            } else {
                Expression::new(
                    ExprKind::If {
                        test: Box::new(test),
                        consequent: Box::new(self.sequence(&items[1..], clause_location)?),
                        alternative: Box::new(result),
                    },
                    clause_location,
                )
            };
        }
        Ok(result)
    }

    fn case(&mut self, args: &[Ast], form: &Ast, location: Location) -> Result<Expression> {
        let [key, clauses @ ..] = args else {
            return Err(syntax_error("case needs a key", form));
        };
        let key = self.expression(key)?;
        let mut case_clauses = Vec::with_capacity(clauses.len());
        let mut else_clause = None;
        for (i, clause) in clauses.iter().enumerate() {
            let Some([datums, body @ ..]) = clause.as_list() else {
                return Err(syntax_error("case clause must be a non-empty list", clause));
            };
            if body.is_empty() {
                return Err(syntax_error("case clause has no expressions", clause));
            }
            let body = self.sequence(body, clause.span().location())?;
            if datums.is_symbol("else") {
                if i + 1 != clauses.len() {
                    return Err(syntax_error("else must be the last case clause", clause));
                }
                else_clause = Some(body);
                continue;
            }
            let Some(datums) = datums.as_list() else {
                return Err(syntax_error("case clause needs a list of data", clause));
            };
            let datums = datums.iter().map(|d| self.datum(d)).collect::<Result<Vec<_>>>()?;
            case_clauses.push(CaseClause::new(datums, body));
        }
        let else_clause = else_clause.or_else(|| self.no_match(location));
        Ok(Expression::new(
            ExprKind::Case(Box::new(Case::new(key, case_clauses, else_clause))),
            location,
        ))
    }

    fn and(&mut self, args: &[Ast], location: Location) -> Result<Expression> {
        let Some((last, rest)) = args.split_last() else {
            return Ok(Expression::constant(Value::Bool(true), location));
        };
        let mut result = self.expression(last)?;
        for arg in rest.iter().rev() {
            result = Expression::new(
                ExprKind::If {
                    test: Box::new(self.expression(arg)?),
                    consequent: Box::new(result),
                    alternative: Box::new(Expression::constant(Value::Bool(false), location)),
                },
                location,
            );
        }
        Ok(result)
    }

    fn or(&mut self, args: &[Ast], location: Location) -> Result<Expression> {
        let Some((last, rest)) = args.split_last() else {
            return Ok(Expression::constant(Value::Bool(false), location));
        };
        let mut result = self.expression(last)?;
        for arg in rest.iter().rev() {
            result = Expression::new(
                ExprKind::Or {
                    first: Box::new(self.expression(arg)?),
                    second: Box::new(result),
                },
                location,
            );
        }
        Ok(result)
    }

    // =========================================================================
    // Styles
    // =========================================================================

    /// Splits leading `keyword: value` pairs from the remaining arguments.
    fn keyword_args<'f>(&mut self, args: &'f [Ast]) -> Result<(StyleSpec, &'f [Ast])> {
        let mut style = StyleSpec::default();
        let mut rest = args;
        while let [Ast::Keyword(name, _), value, tail @ ..] = rest {
            let value = self.expression(value)?;
            if name == "use" {
                style.use_style = Some(value);
            } else {
                style.keys.push(self.interp.intern(name));
                style.values.push(value);
            }
            rest = tail;
        }
        Ok((style, rest))
    }
}
