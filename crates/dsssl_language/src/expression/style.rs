//! `style` and `make`.

use dsssl_foundation::{Location, SymbolId};

use crate::diagnostic::Diagnostic;
use crate::environment::{BoundVarList, Environment};
use crate::insn::{Insn, InsnPtr};
use crate::interpreter::Interpreter;

use super::Expression;

/// Characteristic keywords with their value expressions, and `use:`.
#[derive(Debug, Default)]
pub struct StyleSpec {
    /// Characteristic names.
    pub keys: Vec<SymbolId>,
    /// One value expression per key.
    pub values: Vec<Expression>,
    /// Expression given with `use:`.
    pub use_style: Option<Expression>,
}

/// A `make` expression.
#[derive(Debug)]
pub struct MakeSpec {
    /// Flow-object class.
    pub class: SymbolId,
    /// Characteristics given on the object.
    pub style: StyleSpec,
    /// Content expressions; each must yield a sosofo.
    pub content: Vec<Expression>,
}

impl StyleSpec {
    pub(super) fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        self.values.iter().all(|v| v.can_eval(interp, maybe_call))
            && self
                .use_style
                .as_ref()
                .is_none_or(|u| u.can_eval(interp, maybe_call))
    }

    pub(super) fn mark_bound_vars(&self, vars: &mut BoundVarList, shared: bool) {
        for value in &self.values {
            value.mark_bound_vars(vars, shared);
        }
        if let Some(use_style) = &self.use_style {
            use_style.mark_bound_vars(vars, shared);
        }
    }

    /// Keeps the keys `accept` allows, reporting the others with `reject`.
    ///
    /// Returns the accepted keys and their positions in `keys`. Values of
    /// rejected keys are never evaluated.
    fn accepted_keys(
        &self,
        interp: &mut Interpreter,
        location: Location,
        accept: fn(&Interpreter, SymbolId) -> bool,
        reject: fn(String) -> Diagnostic,
    ) -> (Vec<SymbolId>, Vec<usize>) {
        let mut keys = Vec::with_capacity(self.keys.len());
        let mut positions = Vec::with_capacity(self.keys.len());
        for (i, &key) in self.keys.iter().enumerate() {
            if accept(interp, key) {
                keys.push(key);
                positions.push(i);
            } else {
                let text = format!("{}:", interp.name(key));
                interp.set_next_location(location);
                interp.message(reject(text));
            }
        }
        (keys, positions)
    }

    /// Compiles the values at `positions`, then `use:`, ahead of `next`.
    fn compile_values(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        location: Location,
        positions: &[usize],
        next: InsnPtr,
    ) -> InsnPtr {
        let mut tem = next;
        if let Some(use_style) = &mut self.use_style {
            tem = Insn::CheckStyle { location, next: tem }.into_ptr();
            tem = use_style.optimize_compile(interp, env, stack_pos + positions.len(), tem);
        }
        for (pos, &i) in positions.iter().enumerate().rev() {
            tem = self.values[i].optimize_compile(interp, env, stack_pos + pos, tem);
        }
        tem
    }

    pub(super) fn compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
        location: Location,
    ) -> InsnPtr {
        let (keys, positions) = self.accepted_keys(
            interp,
            location,
            Interpreter::is_inherited_characteristic,
            Diagnostic::InvalidStyleKeyword,
        );
        let make = Insn::MakeStyle {
            keys,
            has_use: self.use_style.is_some(),
            next,
        }
        .into_ptr();
        self.compile_values(interp, env, stack_pos, location, &positions, make)
    }
}

impl MakeSpec {
    pub(super) fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        self.style.can_eval(interp, maybe_call) && self.content.iter().all(|c| c.can_eval(interp, maybe_call))
    }

    pub(super) fn mark_bound_vars(&self, vars: &mut BoundVarList, shared: bool) {
        self.style.mark_bound_vars(vars, shared);
        for content in &self.content {
            content.mark_bound_vars(vars, shared);
        }
    }

    pub(super) fn compile(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
        location: Location,
    ) -> InsnPtr {
        if !interp.is_flow_object_class(self.class) {
            let text = interp.name(self.class).to_string();
            interp.set_next_location(location);
            interp.message(Diagnostic::UnknownFlowObjectClass(text));
            self.class = interp.intern("sequence");
        }
        let (keys, positions) = self.style.accepted_keys(
            interp,
            location,
            Interpreter::is_characteristic,
            Diagnostic::InvalidMakeKeyword,
        );
        let has_use = self.style.use_style.is_some();
        let below = positions.len() + usize::from(has_use);
        let mut tem = Insn::MakeFlowObject {
            class: self.class,
            keys,
            has_use,
            n_content: self.content.len(),
            next,
        }
        .into_ptr();
        for (i, item) in self.content.iter_mut().enumerate().rev() {
            tem = Insn::CheckSosofo { location, next: tem }.into_ptr();
            tem = item.optimize_compile(interp, env, stack_pos + below + i, tem);
        }
        self.style.compile_values(interp, env, stack_pos, location, &positions, tem)
    }
}
