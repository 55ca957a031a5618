//! Calling, returning and escaping.

use std::rc::Rc;

use dsssl_foundation::{Location, Signature};

use crate::diagnostic::Diagnostic;
use crate::function::{Closure, Continuation, Function, Primitive};
use crate::insn::InsnPtr;
use crate::value::Value;

use super::{CallContext, Vm};

/// How control comes back from a call.
#[derive(Clone, Copy)]
pub(crate) enum Linkage<'a> {
    /// Push an activation that returns to this instruction.
    Call(&'a InsnPtr),
    /// Reuse the caller's activation, which owns this many stack slots.
    TailCall(usize),
}

impl Vm<'_> {
    /// Calls the function on top of `n_args` arguments.
    pub(crate) fn apply_top(&mut self, n_args: usize, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        let function = match self.pop() {
            Value::Function(function) => function,
            other => {
                let callee = self.interp.print(&other);
                return self.fail(location, Diagnostic::CallNonFunction(callee));
            }
        };
        let n = self.decode_args(function.signature(), n_args, location)?;
        self.n_actual_args = n;
        self.call(&function, location, linkage)
    }

    /// Checks `n_args` against `signature`, dropping excess arguments.
    ///
    /// Returns the number of arguments left on the stack, or `None` after
    /// reporting a missing argument.
    pub(crate) fn decode_args(&mut self, signature: &Signature, n_args: usize, location: Location) -> Option<usize> {
        if n_args < signature.required {
            self.fail(location, Diagnostic::MissingArg);
            return None;
        }
        let accepted = signature.required + signature.optional;
        if n_args <= accepted {
            return Some(n_args);
        }
        let excess = n_args - accepted;
        if !signature.keys.is_empty() {
            if excess % 2 == 1 {
                self.interp.report_at(location, Diagnostic::OddKeyArgs);
                self.drop_args(excess);
                return Some(accepted);
            }
        } else if !signature.rest {
            self.interp.report_at(location, Diagnostic::TooManyArgs);
            self.drop_args(excess);
            return Some(accepted);
        }
        Some(n_args)
    }

    fn drop_args(&mut self, n: usize) {
        let len = self.stack.len();
        self.stack.truncate(len - n);
    }

    /// Calls `function` on the `n_actual_args` values on top of the stack.
    pub(crate) fn call(&mut self, function: &Rc<Function>, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        match &**function {
            Function::Primitive(primitive) => self.call_primitive(primitive, location, linkage),
            Function::Closure(closure) => self.call_closure(closure, location, linkage),
            Function::Continuation(k) => self.throw(function, k, location),
            Function::Apply => self.call_apply(location, linkage),
            Function::CallWithCurrentContinuation => self.call_cc(location, linkage),
        }
    }

    fn call_primitive(&mut self, primitive: &Primitive, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        let argp = self.stack.len() - self.n_actual_args;
        let mut ctx = CallContext::new(&mut *self.interp, self.mode, location);
        let result = (primitive.body)(&self.stack[argp..], &mut ctx);
        let value = match result {
            Ok(Value::Error) => return self.abort(),
            Ok(value) => value,
            Err(err) => {
                let diagnostic = Diagnostic::PrimitiveFailed {
                    procedure: primitive.name.to_string(),
                    message: err.to_string(),
                };
                return self.fail(location, diagnostic);
            }
        };
        match linkage {
            Linkage::Call(next) => {
                self.stack.truncate(argp);
                self.push(value);
                next.clone()
            }
            Linkage::TailCall(n_caller_args) => {
                self.stack.truncate(argp - n_caller_args);
                let next = self.pop_frame();
                self.need_stack(1);
                self.push(value);
                next
            }
        }
    }

    fn call_closure(&mut self, closure: &Closure, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        let n_args = self.n_actual_args;
        self.need_stack(1);
        match linkage {
            Linkage::Call(next) => {
                self.push_frame(next.clone(), n_args);
                self.frame = self.stack.len() - n_args;
            }
            Linkage::TailCall(n_caller_args) => {
                let old_frame = self.stack.len() - n_args;
                let new_frame = old_frame - n_caller_args;
                if n_caller_args > 0 {
                    self.stack.drain(new_frame..old_frame);
                }
                self.frame = new_frame;
            }
        }
        self.closure = Rc::clone(&closure.display);
        self.closure_loc = location;
        closure.code.clone()
    }

    /// Escapes to the activation that captured `k`.
    fn throw(&mut self, function: &Rc<Function>, k: &Continuation, location: Location) -> InsnPtr {
        let size = k.control_stack_size();
        if !k.is_live() || k.owner() != self.id || !self.holds_continuation(size, function) {
            return self.fail(location, Diagnostic::ContinuationDead);
        }
        let result = self.pop();
        self.unwind_control_stack(size);
        self.stack.truncate(k.stack_size() - 1);
        let next = self.pop_frame();
        self.push(result);
        next
    }

    /// `apply`: spreads the final list argument onto the stack.
    fn call_apply(&mut self, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        let n_args = self.n_actual_args;
        let argp = self.stack.len() - n_args;
        let function = self.stack.remove(argp);
        let list = self.pop();
        let Some(items) = list.list_to_vec() else {
            return self.fail(
                location,
                Diagnostic::NotAList {
                    procedure: "apply".into(),
                    position: n_args,
                },
            );
        };
        let n_spread = n_args - 2 + items.len();
        self.need_stack(items.len() + 1);
        self.stack.extend(items);
        self.push(function);
        self.apply_top(n_spread, location, linkage)
    }

    /// `call-with-current-continuation`: replaces the procedure argument
    /// with a fresh continuation and calls the procedure on it.
    fn call_cc(&mut self, location: Location, linkage: Linkage<'_>) -> InsnPtr {
        let Value::Function(function) = self.top().clone() else {
            return self.fail(
                location,
                Diagnostic::NotAProcedure {
                    procedure: "call-with-current-continuation".into(),
                    position: 1,
                },
            );
        };
        let cc = Rc::new(Function::Continuation(Continuation::new(self.id)));
        self.set_top(Value::Function(Rc::clone(&cc)));
        let n = self.decode_args(function.signature(), 1, location)?;
        self.n_actual_args = n;
        let insn = self.call(&function, location, linkage);
        if n == 1 && matches!(*function, Function::Closure(_)) {
            self.set_arg_to_cc(cc);
        }
        insn
    }

    /// Picks the entry point for the number of optional arguments
    /// supplied, collecting rest and keyword arguments first.
    pub(crate) fn enter_varargs(
        &mut self,
        signature: &Signature,
        entry_points: &[InsnPtr],
        location: Location,
    ) -> InsnPtr {
        let n = self.n_actual_args - signature.required;
        if !signature.takes_varargs() || n <= signature.optional {
            return entry_points.get(n).cloned().flatten();
        }
        let n_extra = n - signature.optional;
        let base = self.stack.len() - n_extra;
        let extra = self.stack.split_off(base);
        let n_keys = signature.keys.len();
        self.need_stack(n_keys + usize::from(signature.rest));
        if signature.rest {
            self.push(Value::list(extra.iter().cloned()));
        }
        if n_keys > 0 {
            let keys_base = self.stack.len();
            self.stack.resize(keys_base + n_keys, Value::Uninit);
            for pair in extra.chunks(2) {
                let [key, value] = pair else { break };
                let Value::Keyword(name) = key else {
                    self.interp.report_at(location, Diagnostic::KeyArgsNotKey);
                    continue;
                };
                match signature.keys.iter().position(|k| k == name) {
                    Some(j) => {
                        let slot = &mut self.stack[keys_base + j];
                        if matches!(slot, Value::Uninit) {
                            *slot = value.clone();
                        }
                    }
                    None if !signature.rest => {
                        let name = self.interp.name(*name).to_string();
                        self.interp.report_at(location, Diagnostic::InvalidKeyArg(name));
                    }
                    None => {}
                }
            }
        }
        entry_points.last().cloned().flatten()
    }
}
