//! Expression tree, optimizer and compiler.
//!
//! The analyzer turns program text into an [`Expression`]. Compiling it is
//! continuation-passing: every node receives the instruction that runs
//! after it and returns the instruction that runs it, so graphs are built
//! from the end backwards and branches share their tails.
//!
//! # Stack positions
//!
//! `stack_pos` is the number of slots the current activation holds above
//! its frame pointer when the node starts running. Frame variables are
//! addressed relative to it.
//!
//! # Optimizing
//!
//! [`Expression::optimize`] may replace a node with a cheaper equivalent:
//! constants with resolved quantities, folded `if`/`or`/`case`, references
//! to evaluated top-level definitions, constant quasiquotes. It is
//! idempotent and always runs before a node is compiled.

#![allow(clippy::cast_possible_wrap)]

mod binding;
mod lambda;
mod style;

pub use binding::Bindings;
pub use lambda::Lambda;
pub use style::{MakeSpec, StyleSpec};

use dsssl_foundation::{Location, SymbolId};

use crate::diagnostic::Diagnostic;
use crate::environment::{BoundVarList, Environment, Slot, VarFlags};
use crate::insn::{Insn, InsnPtr};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// A node of the expression tree.
#[derive(Debug, Default)]
pub struct Expression {
    /// What the node does.
    pub kind: ExprKind,
    /// Where it came from.
    pub location: Location,
}

/// The forms an expression can take.
#[derive(Debug)]
pub enum ExprKind {
    /// Literal that may still contain unresolved quantities.
    Constant(Value),
    /// Literal that is ready to push.
    ResolvedConstant(Value),
    /// Variable reference.
    Variable {
        /// Name referenced.
        name: SymbolId,
        /// Set once compilation finds no local binding.
        is_top: bool,
    },
    /// Procedure call.
    Call {
        /// Operator.
        op: Box<Expression>,
        /// Operands.
        args: Vec<Expression>,
    },
    /// Two-armed conditional.
    If {
        /// Condition.
        test: Box<Expression>,
        /// Taken when the condition is true.
        consequent: Box<Expression>,
        /// Taken otherwise.
        alternative: Box<Expression>,
    },
    /// `(or first second)`.
    Or {
        /// Tried first; its value is the result when true.
        first: Box<Expression>,
        /// Tried when `first` is `#f`.
        second: Box<Expression>,
    },
    /// Terminal of a `cond` without `else`.
    CondFail,
    /// `case`.
    Case(Box<Case>),
    /// `lambda`.
    Lambda(Box<Lambda>),
    /// `let`.
    Let(Box<Bindings>),
    /// `let*`.
    LetStar(Box<Bindings>),
    /// `letrec`, and internal definitions.
    Letrec(Box<Bindings>),
    /// Quasiquoted list, improper list or vector.
    Quasiquote {
        /// Shape being built.
        kind: QuasiquoteKind,
        /// Elements; for an improper list the last one is the tail.
        members: Vec<Expression>,
        /// Which members are `unquote-splicing`.
        spliced: Vec<bool>,
    },
    /// `begin`; never empty.
    Sequence(Vec<Expression>),
    /// `set!`.
    Assignment {
        /// Variable assigned.
        name: SymbolId,
        /// New value.
        value: Box<Expression>,
    },
    /// `with-mode`.
    WithMode {
        /// Processing mode name.
        mode: SymbolId,
        /// Evaluated in that mode.
        body: Box<Expression>,
    },
    /// `style`.
    Style(Box<StyleSpec>),
    /// `make`.
    Make(Box<MakeSpec>),
}

impl Default for ExprKind {
    fn default() -> Self {
        Self::Constant(Value::Unspecified)
    }
}

/// What a quasiquote builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuasiquoteKind {
    /// Proper list.
    List,
    /// List whose last member is the tail.
    Improper,
    /// Vector.
    Vector,
}

/// A `case` expression.
#[derive(Debug)]
pub struct Case {
    /// Key expression.
    pub key: Expression,
    /// Clauses in source order.
    pub clauses: Vec<CaseClause>,
    /// `else` clause.
    pub else_clause: Option<Expression>,
    resolved: bool,
}

/// One `((datum ...) body)` clause.
#[derive(Debug)]
pub struct CaseClause {
    /// Candidate data; resolved ones are moved to the front.
    pub datums: Vec<Value>,
    /// Clause body.
    pub body: Expression,
    n_resolved: usize,
}

impl CaseClause {
    /// Creates a clause.
    #[must_use]
    pub const fn new(datums: Vec<Value>, body: Expression) -> Self {
        Self {
            datums,
            body,
            n_resolved: 0,
        }
    }
}

impl Case {
    /// Creates a `case`.
    #[must_use]
    pub const fn new(key: Expression, clauses: Vec<CaseClause>, else_clause: Option<Expression>) -> Self {
        Self {
            key,
            clauses,
            else_clause,
            resolved: false,
        }
    }

    fn optimized(&mut self, interp: &mut Interpreter, env: &Environment, location: Location) -> Option<Expression> {
        self.key.optimize(interp, env);
        if self.resolved {
            return None;
        }
        self.resolved = true;
        let key = self.key.constant_value().cloned();
        let mut unresolved = false;
        for clause in &mut self.clauses {
            clause.body.optimize(interp, env);
            let mut n_resolved = 0;
            for j in 0..clause.datums.len() {
                let Some(datum) = interp.resolve_quantities(&clause.datums[j], false, location) else {
                    unresolved = true;
                    continue;
                };
                if key.as_ref().is_some_and(|k| k.eqv(&datum)) {
                    return Some(std::mem::take(&mut clause.body));
                }
                clause.datums.swap(j, n_resolved);
                clause.datums[n_resolved] = datum;
                n_resolved += 1;
            }
            clause.n_resolved = n_resolved;
        }
        if let Some(else_clause) = &mut self.else_clause {
            else_clause.optimize(interp, env);
            if key.is_some() && !unresolved {
                return Some(std::mem::take(else_clause));
            }
        } else if let Some(key) = key.filter(|_| !unresolved) {
            let text = interp.print(&key);
            interp.set_next_location(location);
            interp.message(Diagnostic::CaseFail(text));
        }
        if unresolved {
            interp.set_next_location(location);
            interp.message(Diagnostic::CaseUnresolvedQuantities);
        }
        None
    }

    fn compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
        location: Location,
    ) -> InsnPtr {
        let mut finish = match &mut self.else_clause {
            Some(else_clause) => Insn::Pop {
                next: else_clause.optimize_compile(interp, env, stack_pos, next.clone()),
            }
            .into_ptr(),
            None => Insn::CaseFail { location }.into_ptr(),
        };
        // Built back to front so the first clause is tested first.
        for clause in self.clauses.iter_mut().rev() {
            let on_match = clause.body.optimize_compile(interp, env, stack_pos, next.clone());
            for datum in clause.datums[..clause.n_resolved].iter().rev() {
                finish = Insn::Case {
                    datum: datum.clone(),
                    on_match: on_match.clone(),
                    fail: finish,
                }
                .into_ptr();
            }
        }
        self.key.optimize_compile(interp, env, stack_pos, finish)
    }

    fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        self.key.can_eval(interp, maybe_call)
            && self
                .else_clause
                .as_ref()
                .is_none_or(|e| e.can_eval(interp, maybe_call))
            && self
                .clauses
                .iter()
                .all(|c| c.n_resolved == c.datums.len() && c.body.can_eval(interp, maybe_call))
    }
}

impl Expression {
    /// Creates a node.
    #[must_use]
    pub const fn new(kind: ExprKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// A literal.
    #[must_use]
    pub const fn constant(value: Value, location: Location) -> Self {
        Self::new(ExprKind::Constant(value), location)
    }

    /// A variable reference.
    #[must_use]
    pub const fn variable(name: SymbolId, location: Location) -> Self {
        Self::new(ExprKind::Variable { name, is_top: false }, location)
    }

    /// The value of this node if it is known at compile time.
    #[must_use]
    pub const fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::ResolvedConstant(value) => Some(value),
            _ => None,
        }
    }

    /// Optimizes, then compiles.
    pub fn optimize_compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        self.optimize(interp, env);
        self.compile(interp, env, stack_pos, next)
    }

    /// Replaces this node with cheaper equivalents until none applies.
    pub fn optimize(&mut self, interp: &mut Interpreter, env: &Environment) {
        while let Some(replacement) = self.optimized(interp, env) {
            *self = replacement;
        }
    }

    fn optimized(&mut self, interp: &mut Interpreter, env: &Environment) -> Option<Expression> {
        let location = self.location;
        match &mut self.kind {
            ExprKind::Constant(value) => interp
                .resolve_quantities(value, false, location)
                .filter(|v| !v.is_error())
                .map(|v| Self::new(ExprKind::ResolvedConstant(v), location)),
            ExprKind::Variable { name, is_top } => {
                if env.lookup(*name).is_some() {
                    return None;
                }
                *is_top = true;
                if !interp.is_defined(*name) {
                    return None;
                }
                interp
                    .compute_value(*name, false)
                    .filter(|v| !v.is_error())
                    .map(|v| Self::constant(v, location))
            }
            ExprKind::If {
                test,
                consequent,
                alternative,
            } => {
                test.optimize(interp, env);
                let taken = if test.constant_value()?.is_true() {
                    consequent
                } else {
                    alternative
                };
                Some(std::mem::take(&mut **taken))
            }
            ExprKind::Or { first, second } => {
                first.optimize(interp, env);
                let taken = if first.constant_value()?.is_true() {
                    first
                } else {
                    second
                };
                Some(std::mem::take(&mut **taken))
            }
            ExprKind::Case(case) => case.optimized(interp, env, location),
            ExprKind::Quasiquote {
                kind,
                members,
                spliced,
            } => optimized_quasiquote(kind, members, spliced, interp, env, location),
            ExprKind::Sequence(sequence) => {
                for expr in sequence.iter_mut() {
                    expr.optimize(interp, env);
                }
                let last = sequence.pop()?;
                sequence.retain(|e| e.constant_value().is_none());
                sequence.push(last);
                if sequence.len() == 1 {
                    sequence.pop()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Compiles this node so that its value is pushed and `next` runs.
    pub fn compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        let location = self.location;
        match &mut self.kind {
            ExprKind::Constant(value) => Insn::Constant {
                value: value.clone(),
                next: Insn::ResolveQuantities { location, next }.into_ptr(),
            }
            .into_ptr(),
            ExprKind::ResolvedConstant(value) => Insn::Constant {
                value: value.clone(),
                next,
            }
            .into_ptr(),
            ExprKind::Variable { name, is_top } => {
                compile_variable(*name, is_top, location, interp, env, stack_pos, next)
            }
            ExprKind::Call { op, args } => compile_call(op, args, location, interp, env, stack_pos, next),
            ExprKind::If {
                test,
                consequent,
                alternative,
            } => {
                alternative.optimize(interp, env);
                let branch = if matches!(alternative.constant_value(), Some(Value::Bool(false))) {
                    Insn::And {
                        next_test: consequent.optimize_compile(interp, env, stack_pos, next.clone()),
                        next,
                    }
                } else {
                    Insn::Test {
                        consequent: consequent.optimize_compile(interp, env, stack_pos, next.clone()),
                        alternative: alternative.compile(interp, env, stack_pos, next),
                    }
                };
                test.optimize_compile(interp, env, stack_pos, branch.into_ptr())
            }
            ExprKind::Or { first, second } => {
                let next_test = second.optimize_compile(interp, env, stack_pos, next.clone());
                first.optimize_compile(interp, env, stack_pos, Insn::Or { next_test, next }.into_ptr())
            }
            ExprKind::CondFail => Insn::CondFail { location }.into_ptr(),
            ExprKind::Case(case) => case.compile(interp, env, stack_pos, next, location),
            ExprKind::Lambda(lambda) => lambda.compile(interp, env, next, location),
            ExprKind::Let(bindings) => bindings.compile_let(interp, env, stack_pos, next),
            ExprKind::LetStar(bindings) => bindings.compile_let_star(interp, env, stack_pos, next),
            ExprKind::Letrec(bindings) => bindings.compile_letrec(interp, env, stack_pos, next),
            ExprKind::Quasiquote {
                kind,
                members,
                spliced,
            } => compile_quasiquote(*kind, members, spliced, location, interp, env, stack_pos, next),
            ExprKind::Sequence(sequence) => {
                let mut rest = sequence.iter_mut().rev();
                let mut result = match rest.next() {
                    Some(last) => last.optimize_compile(interp, env, stack_pos, next),
                    None => Insn::Constant {
                        value: Value::Unspecified,
                        next,
                    }
                    .into_ptr(),
                };
                for expr in rest {
                    result = expr.optimize_compile(interp, env, stack_pos, Insn::Pop { next: result }.into_ptr());
                }
                result
            }
            ExprKind::Assignment { name, value } => {
                compile_assignment(*name, value, location, interp, env, stack_pos, next)
            }
            ExprKind::WithMode { mode, body } => {
                if !interp.is_mode(*mode) {
                    let text = interp.name(*mode).to_string();
                    interp.set_next_location(location);
                    interp.message(Diagnostic::UndefinedMode(text));
                }
                let body = body.optimize_compile(interp, env, stack_pos, Insn::PopMode { next }.into_ptr());
                Insn::PushMode {
                    mode: *mode,
                    next: body,
                }
                .into_ptr()
            }
            ExprKind::Style(style) => style.compile(interp, env, stack_pos, next, location),
            ExprKind::Make(make) => make.compile(interp, env, stack_pos, next, location),
        }
    }

    /// Returns true if evaluating this node now gives the same result as
    /// evaluating it later.
    ///
    /// `maybe_call` is set when the value may be called, so a lambda's body
    /// matters too. Top-level references only qualify once the referenced
    /// definition has a value. Must be asked after compiling.
    #[must_use]
    pub fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        match &self.kind {
            ExprKind::Constant(_) => false,
            ExprKind::ResolvedConstant(_) | ExprKind::CondFail => true,
            ExprKind::Variable { name, is_top } => !*is_top || interp.is_evaluated(*name),
            ExprKind::Call { op, args } => {
                op.can_eval(interp, true) && args.iter().all(|a| a.can_eval(interp, true))
            }
            ExprKind::If {
                test,
                consequent,
                alternative,
            } => {
                test.can_eval(interp, maybe_call)
                    && consequent.can_eval(interp, maybe_call)
                    && alternative.can_eval(interp, maybe_call)
            }
            ExprKind::Or { first, second } => {
                first.can_eval(interp, maybe_call) && second.can_eval(interp, maybe_call)
            }
            ExprKind::Case(case) => case.can_eval(interp, maybe_call),
            ExprKind::Lambda(lambda) => lambda.can_eval(interp, maybe_call),
            ExprKind::Let(bindings) | ExprKind::LetStar(bindings) | ExprKind::Letrec(bindings) => {
                bindings.can_eval(interp, maybe_call)
            }
            ExprKind::Quasiquote { members, .. } => members.iter().all(|m| m.can_eval(interp, maybe_call)),
            ExprKind::Sequence(sequence) => sequence.iter().all(|e| e.can_eval(interp, maybe_call)),
            ExprKind::Assignment { value, .. } => value.can_eval(interp, maybe_call),
            ExprKind::WithMode { body, .. } => body.can_eval(interp, maybe_call),
            ExprKind::Style(style) => style.can_eval(interp, maybe_call),
            ExprKind::Make(make) => make.can_eval(interp, maybe_call),
        }
    }

    /// Records how this node uses the variables in `vars`.
    ///
    /// `shared` is set once the walk has entered a nested lambda.
    pub fn mark_bound_vars(&self, vars: &mut BoundVarList, shared: bool) {
        let shared_flag = if shared { VarFlags::SHARED } else { VarFlags::NONE };
        match &self.kind {
            ExprKind::Constant(_) | ExprKind::ResolvedConstant(_) | ExprKind::CondFail => {}
            ExprKind::Variable { name, .. } => vars.mark(*name, VarFlags::USED | shared_flag),
            ExprKind::Call { op, args } => {
                op.mark_bound_vars(vars, shared);
                for arg in args {
                    arg.mark_bound_vars(vars, shared);
                }
            }
            ExprKind::If {
                test,
                consequent,
                alternative,
            } => {
                test.mark_bound_vars(vars, shared);
                consequent.mark_bound_vars(vars, shared);
                alternative.mark_bound_vars(vars, shared);
            }
            ExprKind::Or { first, second } => {
                first.mark_bound_vars(vars, shared);
                second.mark_bound_vars(vars, shared);
            }
            ExprKind::Case(case) => {
                case.key.mark_bound_vars(vars, shared);
                for clause in &case.clauses {
                    clause.body.mark_bound_vars(vars, shared);
                }
                if let Some(else_clause) = &case.else_clause {
                    else_clause.mark_bound_vars(vars, shared);
                }
            }
            ExprKind::Lambda(lambda) => lambda.mark_bound_vars(vars),
            ExprKind::Let(bindings) => bindings.mark_let(vars, shared),
            ExprKind::LetStar(bindings) => bindings.mark_let_star(vars, shared),
            ExprKind::Letrec(bindings) => bindings.mark_letrec(vars, shared),
            ExprKind::Quasiquote { members, .. } => {
                for member in members {
                    member.mark_bound_vars(vars, shared);
                }
            }
            ExprKind::Sequence(sequence) => {
                for expr in sequence {
                    expr.mark_bound_vars(vars, shared);
                }
            }
            ExprKind::Assignment { name, value } => {
                vars.mark(*name, VarFlags::USED | VarFlags::ASSIGNED | shared_flag);
                value.mark_bound_vars(vars, shared);
            }
            ExprKind::WithMode { body, .. } => body.mark_bound_vars(vars, shared),
            ExprKind::Style(style) => style.mark_bound_vars(vars, shared),
            ExprKind::Make(make) => make.mark_bound_vars(vars, shared),
        }
    }
}

// =============================================================================
// Variables and calls
// =============================================================================

fn compile_variable(
    name: SymbolId,
    is_top: &mut bool,
    location: Location,
    interp: &mut Interpreter,
    env: &Environment,
    stack_pos: usize,
    next: InsnPtr,
) -> InsnPtr {
    if let Some(resolved) = env.lookup(name) {
        let access = |mut tem: InsnPtr| {
            if resolved.flags.is_uninit() {
                tem = Insn::CheckInit { name, location, next: tem }.into_ptr();
            }
            if resolved.flags.is_boxed() {
                tem = Insn::Unbox { next: tem }.into_ptr();
            }
            tem
        };
        // The value is already on top when it is the only binding about to
        // be popped, as in the body of a named let.
        if resolved.slot == Slot::Frame(stack_pos.wrapping_sub(1)) {
            if let Some(Insn::PopBindings { n: 1, next: after }) = next.as_deref() {
                return access(after.clone());
            }
        }
        let tem = access(next);
        return match resolved.slot {
            Slot::Frame(index) => Insn::StackRef {
                offset: index as isize - stack_pos as isize,
                next: tem,
            },
            Slot::Closure(index) => Insn::ClosureRef { index, next: tem },
        }
        .into_ptr();
    }
    *is_top = true;
    if !interp.is_defined(name) {
        let text = interp.name(name).to_string();
        interp.set_next_location(location);
        interp.message(Diagnostic::UndefinedVariableReference(text));
        return Insn::Error.into_ptr();
    }
    match interp.compute_value(name, false) {
        None => Insn::TopRef { name, next }.into_ptr(),
        Some(Value::Error) => Insn::Error.into_ptr(),
        Some(value) => Insn::Constant { value, next }.into_ptr(),
    }
}

fn compile_call(
    op: &mut Expression,
    args: &mut Vec<Expression>,
    location: Location,
    interp: &mut Interpreter,
    env: &Environment,
    stack_pos: usize,
    next: InsnPtr,
) -> InsnPtr {
    op.optimize(interp, env);
    let tail = next
        .as_deref()
        .and_then(Insn::is_return)
        .filter(|_| !interp.options().debug);
    let mut result = if let Some(value) = op.constant_value() {
        let Some(function) = value.as_function().cloned() else {
            let text = interp.print(value);
            interp.set_next_location(location);
            interp.message(Diagnostic::CallNonFunction(text));
            return Insn::Error.into_ptr();
        };
        let signature = function.signature();
        if args.len() < signature.required {
            interp.set_next_location(location);
            interp.message(Diagnostic::MissingArg);
            return Insn::Error.into_ptr();
        }
        let accepted = signature.required + signature.optional;
        if args.len() > accepted {
            if !signature.keys.is_empty() {
                if (args.len() - accepted) % 2 == 1 {
                    interp.set_next_location(location);
                    interp.message(Diagnostic::OddKeyArgs);
                    args.truncate(accepted);
                }
            } else if !signature.rest {
                interp.set_next_location(location);
                interp.message(Diagnostic::TooManyArgs);
                args.truncate(accepted);
            }
        }
        let n_args = args.len();
        match tail {
            Some(n_caller_args) => Insn::FunctionTailCall {
                n_args,
                function,
                location,
                n_caller_args,
            },
            None if function.is_primitive() => Insn::PrimitiveCall {
                n_args,
                function,
                location,
                next,
            },
            None => Insn::FunctionCall {
                n_args,
                function,
                location,
                next,
            },
        }
        .into_ptr()
    } else {
        let n_args = args.len();
        let call = match tail {
            Some(n_caller_args) => Insn::TailApply {
                n_caller_args,
                n_args,
                location,
            },
            None => Insn::Apply {
                n_args,
                location,
                next,
            },
        };
        op.compile(interp, env, stack_pos + n_args, call.into_ptr())
    };
    for (i, arg) in args.iter_mut().enumerate().rev() {
        result = arg.optimize_compile(interp, env, stack_pos + i, result);
    }
    result
}

fn compile_assignment(
    name: SymbolId,
    value: &mut Expression,
    location: Location,
    interp: &mut Interpreter,
    env: &Environment,
    stack_pos: usize,
    next: InsnPtr,
) -> InsnPtr {
    let Some(resolved) = env.lookup(name) else {
        let text = interp.name(name).to_string();
        let diagnostic = if interp.is_defined(name) {
            Diagnostic::TopLevelAssignment(text)
        } else {
            Diagnostic::UndefinedVariableReference(text)
        };
        interp.set_next_location(location);
        interp.message(diagnostic);
        return Insn::Error.into_ptr();
    };
    let mut tem = next;
    if resolved.flags.is_uninit() {
        tem = Insn::CheckInit {
            name,
            location,
            next: tem,
        }
        .into_ptr();
    }
    let set = match resolved.slot {
        Slot::Frame(index) => {
            let offset = index as isize - (stack_pos as isize + 1);
            if resolved.flags.is_boxed() {
                Insn::StackSetBox {
                    offset,
                    location,
                    next: tem,
                }
            } else {
                Insn::StackSet { offset, next: tem }
            }
        }
        // Assigned variables reachable from a closure are always shared.
        Slot::Closure(index) => Insn::ClosureSetBox {
            index,
            location,
            next: tem,
        },
    };
    value.optimize_compile(interp, env, stack_pos, set.into_ptr())
}

// =============================================================================
// Quasiquote
// =============================================================================

fn optimized_quasiquote(
    kind: &mut QuasiquoteKind,
    members: &mut Vec<Expression>,
    spliced: &mut Vec<bool>,
    interp: &mut Interpreter,
    env: &Environment,
    location: Location,
) -> Option<Expression> {
    for member in members.iter_mut() {
        member.optimize(interp, env);
    }
    if *kind == QuasiquoteKind::Vector {
        return None;
    }
    let Some(last) = members.last() else {
        return Some(Expression::new(ExprKind::ResolvedConstant(Value::Nil), location));
    };
    let mut tail = last.constant_value()?.clone();
    if *kind == QuasiquoteKind::List && !spliced.last().copied().unwrap_or(false) {
        tail = Value::cons(tail, Value::Nil);
    }
    for i in (0..members.len() - 1).rev() {
        match members[i].constant_value() {
            Some(value) if !spliced[i] => tail = Value::cons(value.clone(), tail),
            _ => {
                // Keep the constant suffix folded into an improper tail.
                members.truncate(i + 2);
                spliced.truncate(i + 2);
                members[i + 1] = Expression::new(ExprKind::ResolvedConstant(tail), location);
                spliced[i + 1] = false;
                *kind = QuasiquoteKind::Improper;
                return None;
            }
        }
    }
    Some(Expression::new(ExprKind::ResolvedConstant(tail), location))
}

#[allow(clippy::too_many_arguments)]
fn compile_quasiquote(
    kind: QuasiquoteKind,
    members: &mut [Expression],
    spliced: &[bool],
    location: Location,
    interp: &mut Interpreter,
    env: &Environment,
    stack_pos: usize,
    next: InsnPtr,
) -> InsnPtr {
    let mut tem = next;
    let mut n = members.len();
    match kind {
        QuasiquoteKind::Vector if !spliced.contains(&true) => {
            tem = Insn::Vector { n, next: tem }.into_ptr();
            for (i, member) in members.iter_mut().enumerate().rev() {
                tem = member.optimize_compile(interp, env, stack_pos + i, tem);
            }
            return tem;
        }
        QuasiquoteKind::Vector => tem = Insn::ListToVector { next: tem }.into_ptr(),
        QuasiquoteKind::Improper => n -= 1,
        QuasiquoteKind::List => {}
    }
    // The tail is pushed first; each member is then consed or spliced onto
    // it, last member first.
    for (member, &splice) in members[..n].iter_mut().zip(spliced) {
        tem = if splice {
            Insn::Append { location, next: tem }
        } else {
            Insn::Cons { next: tem }
        }
        .into_ptr();
        tem = member.optimize_compile(interp, env, stack_pos + 1, tem);
    }
    match members.get_mut(n) {
        Some(tail) if kind == QuasiquoteKind::Improper => tail.optimize_compile(interp, env, stack_pos, tem),
        _ => Insn::Constant {
            value: Value::Nil,
            next: tem,
        }
        .into_ptr(),
    }
}
