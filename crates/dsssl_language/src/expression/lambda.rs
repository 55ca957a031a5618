//! `lambda`: formals, argument defaulting and closure creation.

use std::rc::Rc;

use dsssl_foundation::{Location, Signature, SymbolId};

use crate::environment::{BoundVarList, Environment, Resolved, Slot, VarFlags};
use crate::insn::{Insn, InsnPtr};
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::Expression;

/// A `lambda` expression.
///
/// Formals are kept in the order their values sit on the stack once the
/// procedure has been entered: required, `#!optional`, the `#!rest` list,
/// then `#!key` arguments. A procedure with optional or variable arguments
/// gets one entry point per number of optionals supplied; each fills in the
/// missing defaults and falls through to the next.
#[derive(Debug)]
pub struct Lambda {
    /// Parameter names in stack order.
    pub formals: Vec<SymbolId>,
    /// Default for each optional formal, then for each key formal.
    pub inits: Vec<Option<Expression>>,
    /// Shape of the parameter list.
    pub signature: Rc<Signature>,
    /// Body.
    pub body: Expression,
}

impl Lambda {
    /// Creates a lambda from its parameter list sections.
    #[must_use]
    pub fn new(
        required: Vec<SymbolId>,
        optional: Vec<(SymbolId, Option<Expression>)>,
        rest: Option<SymbolId>,
        keys: Vec<(SymbolId, Option<Expression>)>,
        body: Expression,
    ) -> Self {
        let signature = Signature {
            required: required.len(),
            optional: optional.len(),
            rest: rest.is_some(),
            keys: keys.iter().map(|(name, _)| *name).collect(),
        };
        let mut formals = required;
        let mut inits = Vec::with_capacity(optional.len() + keys.len());
        for (name, init) in optional {
            formals.push(name);
            inits.push(init);
        }
        formals.extend(rest);
        for (name, init) in keys {
            formals.push(name);
            inits.push(init);
        }
        Self {
            formals,
            inits,
            signature: Rc::new(signature),
            body,
        }
    }

    /// Stack slot of the formal whose default is `inits[i]`.
    fn init_slot(&self, i: usize) -> usize {
        let skip_rest = self.signature.rest && i >= self.signature.optional;
        self.signature.required + i + skip_rest as usize
    }

    pub(super) fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        !maybe_call
            || (self.body.can_eval(interp, true)
                && self.inits.iter().flatten().all(|init| init.can_eval(interp, true)))
    }

    pub(super) fn mark_bound_vars(&self, vars: &mut BoundVarList) {
        for (i, init) in self.inits.iter().enumerate() {
            if let Some(init) = init {
                let visible = &self.formals[..self.init_slot(i)];
                vars.rebind(visible);
                init.mark_bound_vars(vars, true);
                vars.unbind(visible);
            }
        }
        vars.rebind(&self.formals);
        self.body.mark_bound_vars(vars, true);
        vars.unbind(&self.formals);
    }

    /// The formals in stack order, marked by the defaults and the body.
    fn formal_vars(&self) -> BoundVarList {
        let signature = &self.signature;
        let rest_slot = signature.required + signature.optional;
        let mut vars = BoundVarList::from_names(&self.formals[..signature.required], VarFlags::NONE);
        for (i, init) in self.inits.iter().enumerate() {
            if signature.rest && i == signature.optional {
                vars.append(self.formals[rest_slot], VarFlags::NONE);
            }
            if let Some(init) = init {
                init.mark_bound_vars(&mut vars, false);
            }
            vars.append(self.formals[self.init_slot(i)], VarFlags::NONE);
        }
        if signature.rest && signature.keys.is_empty() {
            vars.append(self.formals[rest_slot], VarFlags::NONE);
        }
        self.body.mark_bound_vars(&mut vars, false);
        vars
    }

    pub(super) fn compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        next: InsnPtr,
        location: Location,
    ) -> InsnPtr {
        let mut captured = env.bound_vars();
        self.mark_bound_vars(&mut captured);
        captured.remove_unused();
        let captured = Rc::new(captured);

        let formal_vars = Rc::new(self.formal_vars());
        let n_formals = self.formals.len();
        let body_env = Environment::for_lambda(Rc::clone(&formal_vars), Rc::clone(&captured));
        let mut code = self.body.optimize_compile(
            interp,
            &body_env,
            n_formals,
            Insn::Return { total_args: n_formals }.into_ptr(),
        );
        if self.signature.optional > 0 || self.signature.takes_varargs() {
            code = self.compile_entry_points(interp, &formal_vars, &captured, code, location);
        }
        for i in (0..self.signature.required).rev() {
            if formal_vars.is_boxed(i) {
                code = Insn::BoxArg { index: i, next: code }.into_ptr();
            }
        }
        let closure = Insn::Closure {
            signature: Rc::clone(&self.signature),
            code,
            display_length: captured.len(),
            next,
        }
        .into_ptr();
        push_captured(env, &captured, closure)
    }

    #[allow(clippy::too_many_lines)]
    fn compile_entry_points(
        &mut self,
        interp: &mut Interpreter,
        formal_vars: &BoundVarList,
        captured: &Rc<BoundVarList>,
        code: InsnPtr,
        location: Location,
    ) -> InsnPtr {
        let signature = Rc::clone(&self.signature);
        let n_opt = signature.optional;
        let n_key = signature.keys.len();
        let rest = usize::from(signature.rest);
        let varargs = signature.takes_varargs();
        let rest_slot = signature.required + n_opt;
        let n_formals = self.formals.len();
        let mut entry_points: Vec<InsnPtr> = vec![None; n_opt + usize::from(varargs) + 1];

        // Every path ends at the body. Keyword defaults are filled in on
        // the way, each test looking at a slot counted back from the top.
        let mut last = code.clone();
        if varargs {
            if signature.rest && formal_vars.is_boxed(rest_slot) {
                last = Insn::BoxStack {
                    offset: -1 - n_key as isize,
                    next: last,
                }
                .into_ptr();
            }
            for i in (0..n_key).rev() {
                let slot = rest_slot + rest + i;
                let offset = i as isize - n_key as isize;
                let boxed = formal_vars.is_boxed(slot);
                let mut set = Insn::SetKeyArg { offset, next: last.clone() }.into_ptr();
                if boxed {
                    set = Insn::Box { next: set }.into_ptr();
                }
                let if_null = self.compile_init(n_opt + i, interp, formal_vars, captured, n_formals, set);
                let if_not_null = if boxed {
                    Insn::BoxStack { offset, next: last }.into_ptr()
                } else {
                    last
                };
                last = Insn::TestNull {
                    offset,
                    if_null,
                    if_not_null,
                }
                .into_ptr();
            }
        }
        entry_points[n_opt + usize::from(varargs)] = last;

        // Only optionals supplied: the rest list is empty and every key
        // takes its default.
        if varargs {
            let mut tem = code;
            for i in (0..n_key).rev() {
                let slot = rest_slot + rest + i;
                if formal_vars.is_boxed(slot) {
                    tem = Insn::Box { next: tem }.into_ptr();
                }
                tem = self.compile_init(n_opt + i, interp, formal_vars, captured, slot, tem);
            }
            if signature.rest {
                if formal_vars.is_boxed(rest_slot) {
                    tem = Insn::Box { next: tem }.into_ptr();
                }
                tem = Insn::Constant {
                    value: Value::Nil,
                    next: tem,
                }
                .into_ptr();
            }
            entry_points[n_opt] = tem;
        }

        for i in (0..n_opt).rev() {
            let slot = signature.required + i;
            let mut tem = entry_points[i + 1].clone();
            if formal_vars.is_boxed(slot) {
                tem = Insn::Box { next: tem }.into_ptr();
            }
            entry_points[i] = self.compile_init(i, interp, formal_vars, captured, slot, tem);
        }

        // A supplied optional is boxed by every entry point past its own.
        for i in 0..n_opt {
            let slot = signature.required + i;
            if !formal_vars.is_boxed(slot) {
                continue;
            }
            for entry in &mut entry_points[i + 1..=n_opt] {
                *entry = Insn::BoxArg {
                    index: slot,
                    next: entry.take(),
                }
                .into_ptr();
            }
            if varargs {
                if let Some(entry) = entry_points.last_mut() {
                    *entry = Insn::BoxStack {
                        offset: i as isize - (n_key + rest + n_opt) as isize,
                        next: entry.take(),
                    }
                    .into_ptr();
                }
            }
        }

        Insn::Varargs {
            signature,
            entry_points,
            location,
        }
        .into_ptr()
    }

    /// Compiles the default of `inits[i]`, seeing only earlier formals.
    fn compile_init(
        &mut self,
        i: usize,
        interp: &mut Interpreter,
        formal_vars: &BoundVarList,
        captured: &Rc<BoundVarList>,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        let visible = self.init_slot(i);
        match &mut self.inits[i] {
            Some(init) => {
                let env = Environment::for_lambda(Rc::new(formal_vars.prefix(visible)), Rc::clone(captured));
                init.optimize_compile(interp, &env, stack_pos, next)
            }
            None => Insn::Constant {
                value: Value::Bool(false),
                next,
            }
            .into_ptr(),
        }
    }
}

/// Pushes the captured variables in display order, then runs `next`.
fn push_captured(env: &Environment, captured: &BoundVarList, next: InsnPtr) -> InsnPtr {
    captured.iter().rev().fold(next, |next, var| {
        match env.lookup(var.name) {
            Some(Resolved {
                slot: Slot::Frame(index),
                ..
            }) => Insn::FrameRef { index, next },
            Some(Resolved {
                slot: Slot::Closure(index),
                ..
            }) => Insn::ClosureRef { index, next },
            None => Insn::Constant {
                value: Value::Uninit,
                next,
            },
        }
        .into_ptr()
    })
}
