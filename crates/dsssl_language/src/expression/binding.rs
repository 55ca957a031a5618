//! `let`, `let*` and `letrec`.
//!
//! All three push one slot per variable, run the body above them and pop
//! the slots with [`Insn::pop_bindings`], which folds into a following
//! return so a body call in tail position stays a tail call.

use std::rc::Rc;

use dsssl_foundation::SymbolId;

use crate::environment::{BoundVarList, Environment, VarFlags};
use crate::insn::{Insn, InsnPtr};
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::Expression;

/// Variables, their initializers and a body.
#[derive(Debug)]
pub struct Bindings {
    /// Variables in binding order.
    pub vars: Vec<SymbolId>,
    /// One initializer per variable.
    pub inits: Vec<Expression>,
    /// Body.
    pub body: Expression,
}

impl Bindings {
    /// Creates a binding construct.
    #[must_use]
    pub const fn new(vars: Vec<SymbolId>, inits: Vec<Expression>, body: Expression) -> Self {
        Self { vars, inits, body }
    }

    pub(super) fn can_eval(&self, interp: &Interpreter, maybe_call: bool) -> bool {
        self.body.can_eval(interp, maybe_call) && self.inits.iter().all(|init| init.can_eval(interp, true))
    }

    // =========================================================================
    // Marking
    // =========================================================================

    pub(super) fn mark_let(&self, vars: &mut BoundVarList, shared: bool) {
        for init in &self.inits {
            init.mark_bound_vars(vars, shared);
        }
        vars.rebind(&self.vars);
        self.body.mark_bound_vars(vars, shared);
        vars.unbind(&self.vars);
    }

    pub(super) fn mark_let_star(&self, vars: &mut BoundVarList, shared: bool) {
        for (i, init) in self.inits.iter().enumerate() {
            init.mark_bound_vars(vars, shared);
            vars.rebind(&self.vars[i..=i]);
        }
        self.body.mark_bound_vars(vars, shared);
        vars.unbind(&self.vars);
    }

    pub(super) fn mark_letrec(&self, vars: &mut BoundVarList, shared: bool) {
        vars.rebind(&self.vars);
        for init in &self.inits {
            init.mark_bound_vars(vars, shared);
        }
        self.body.mark_bound_vars(vars, shared);
        vars.unbind(&self.vars);
    }

    // =========================================================================
    // Compiling
    // =========================================================================

    pub(super) fn compile_let(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        let n = self.vars.len();
        let mut vars = BoundVarList::from_names(&self.vars, VarFlags::NONE);
        self.body.mark_bound_vars(&mut vars, false);
        let vars = Rc::new(vars);
        let body_env = env.augment_frame(Rc::clone(&vars), stack_pos);
        let mut tem = self
            .body
            .optimize_compile(interp, &body_env, stack_pos + n, Insn::pop_bindings(n, next));
        for (i, init) in self.inits.iter_mut().enumerate().rev() {
            if vars.is_boxed(i) {
                tem = Insn::Box { next: tem }.into_ptr();
            }
            tem = init.optimize_compile(interp, env, stack_pos + i, tem);
        }
        tem
    }

    /// Each initializer sees the variables bound before it, so every
    /// variable gets its own single-slot frame.
    pub(super) fn compile_let_star(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        let n = self.vars.len();
        let mut vars = BoundVarList::new();
        for (&name, init) in self.vars.iter().zip(&self.inits) {
            init.mark_bound_vars(&mut vars, false);
            vars.append(name, VarFlags::NONE);
        }
        self.body.mark_bound_vars(&mut vars, false);

        let mut envs = Vec::with_capacity(n + 1);
        envs.push(env.clone());
        for (i, var) in vars.iter().enumerate() {
            let mut single = BoundVarList::new();
            single.append(var.name, var.flags);
            let inner = envs[i].augment_frame(Rc::new(single), stack_pos + i);
            envs.push(inner);
        }

        let mut tem = self
            .body
            .optimize_compile(interp, &envs[n], stack_pos + n, Insn::pop_bindings(n, next));
        for (i, init) in self.inits.iter_mut().enumerate().rev() {
            if vars.is_boxed(i) {
                tem = Insn::Box { next: tem }.into_ptr();
            }
            tem = init.optimize_compile(interp, &envs[i], stack_pos + i, tem);
        }
        tem
    }

    /// Pushes a placeholder per variable, evaluates every initializer above
    /// them, then stores the results into the placeholders.
    pub(super) fn compile_letrec(
        &mut self,
        interp: &mut Interpreter,
        env: &Environment,
        stack_pos: usize,
        next: InsnPtr,
    ) -> InsnPtr {
        let n = self.vars.len();
        let mut vars = BoundVarList::from_names(&self.vars, VarFlags::ASSIGNED);
        for init in &self.inits {
            init.mark_bound_vars(&mut vars, false);
        }
        self.body.mark_bound_vars(&mut vars, false);

        let body_env = env.augment_frame(Rc::new(vars.clone()), stack_pos);
        let mut tem = self
            .body
            .optimize_compile(interp, &body_env, stack_pos + n, Insn::pop_bindings(n, next));

        // Initializers may run before every variable has its value.
        vars.set_all(VarFlags::UNINIT);
        let init_env = env.augment_frame(Rc::new(vars.clone()), stack_pos);
        for i in 0..n {
            tem = if vars.is_boxed(i) {
                Insn::SetBox { n, next: tem }
            } else {
                Insn::SetImmediate { n, next: tem }
            }
            .into_ptr();
        }
        for (i, init) in self.inits.iter_mut().enumerate().rev() {
            tem = init.optimize_compile(interp, &init_env, stack_pos + n + i, tem);
        }
        for i in (0..n).rev() {
            if vars.is_boxed(i) {
                tem = Insn::Box { next: tem }.into_ptr();
            }
            tem = Insn::Constant {
                value: Value::Uninit,
                next: tem,
            }
            .into_ptr();
        }
        tem
    }
}

#[cfg(test)]
mod tests {
    use crate::insn::count;
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    fn eval(source: &str) -> Value {
        Interpreter::new().eval_str(source).expect("evaluates")
    }

    #[test]
    fn let_binds_in_parallel() {
        assert!(matches!(eval("(let ((x 1)) (let ((x 2) (y x)) y))"), Value::Integer(1)));
    }

    #[test]
    fn let_star_binds_in_sequence() {
        assert!(matches!(eval("(let* ((x 1) (y (+ x 1))) (* x y))"), Value::Integer(2)));
        assert!(matches!(eval("(let* ((x 1) (x (+ x 1))) x)"), Value::Integer(2)));
    }

    #[test]
    fn letrec_supports_mutual_recursion() {
        let source = "(letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                               (odd? (lambda (n) (if (= n 0) #f (even? (- n 1))))))
                        (even? 100))";
        assert!(matches!(eval(source), Value::Bool(true)));
    }

    #[test]
    fn letrec_reference_before_init_fails() {
        let mut interp = Interpreter::new();
        assert!(interp.eval_str("(letrec ((a b) (b 1)) a)").is_err());
    }

    #[test]
    fn letrec_closures_are_boxed_only_when_captured() {
        let insn = Interpreter::new()
            .compile("(letrec ((a 1) (b 2)) (+ a b))")
            .expect("compiles");
        assert_eq!(count(&insn, "SetBox"), 0);
        assert_eq!(count(&insn, "SetImmediate"), 2);
        let insn = Interpreter::new()
            .compile("(letrec ((f (lambda () (f)))) f)")
            .expect("compiles");
        assert_eq!(count(&insn, "SetBox"), 1);
    }

    #[test]
    fn let_body_in_lambda_tail_position_is_a_tail_call() {
        let insn = Interpreter::new()
            .compile("(lambda (f) (let ((x 1)) (f x)))")
            .expect("compiles");
        assert_eq!(count(&insn, "TailApply"), 1);
        assert_eq!(count(&insn, "PopBindings"), 0);
    }
}
