//! Compiled instructions.
//!
//! Instructions form a DAG: each one owns the instruction that runs after
//! it, so the compiler builds graphs from the end backwards and branches
//! can share a common tail. Nothing is mutated after construction; all
//! side effects happen in [`Vm`](crate::vm::Vm) when an instruction runs.

use std::collections::HashSet;
use std::rc::Rc;

use dsssl_foundation::{Location, Signature, SymbolId};

use crate::function::Function;
use crate::value::Value;

/// Link to the next instruction; `None` halts the VM.
pub type InsnPtr = Option<Rc<Insn>>;

/// One VM instruction.
///
/// Offsets named `offset` are relative to the stack pointer and always
/// negative; `index` fields are relative to the frame pointer or the
/// closure display.
pub enum Insn {
    /// Clears the stack and halts; the diagnostic was reported earlier.
    Error,
    /// Reports an unmatched `cond` and halts.
    CondFail {
        /// Position of the `cond`.
        location: Location,
    },
    /// Reports an unmatched `case` key (on top of the stack) and halts.
    CaseFail {
        /// Position of the `case`.
        location: Location,
    },
    /// Pushes a value.
    Constant {
        /// Value to push.
        value: Value,
        /// Continuation.
        next: InsnPtr,
    },
    /// Resolves unit names in the value on top of the stack.
    ResolveQuantities {
        /// Position of the literal.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Pops a value and branches on it.
    Test {
        /// Taken when the value is true.
        consequent: InsnPtr,
        /// Taken when the value is `#f`.
        alternative: InsnPtr,
    },
    /// Keeps a true top and jumps to `next`; otherwise pops and runs `next_test`.
    Or {
        /// Evaluates the remaining alternatives.
        next_test: InsnPtr,
        /// Continuation.
        next: InsnPtr,
    },
    /// Keeps a false top and jumps to `next`; otherwise pops and runs `next_test`.
    And {
        /// Evaluates the consequent.
        next_test: InsnPtr,
        /// Continuation.
        next: InsnPtr,
    },
    /// Pops the key and jumps to `on_match` if it is `eqv?` to `datum`.
    Case {
        /// Candidate datum.
        datum: Value,
        /// Clause body.
        on_match: InsnPtr,
        /// Next candidate.
        fail: InsnPtr,
    },
    /// Discards the top value.
    Pop {
        /// Continuation.
        next: InsnPtr,
    },
    /// Replaces `cdr car` on top of the stack with their pair.
    Cons {
        /// Continuation.
        next: InsnPtr,
    },
    /// Prepends a copy of the list on top to the value beneath it.
    Append {
        /// Position of the `unquote-splicing`.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Replaces the top `n` values with a vector of them.
    Vector {
        /// Number of elements.
        n: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Replaces the list on top with a vector.
    ListToVector {
        /// Continuation.
        next: InsnPtr,
    },
    /// Calls the function on top of `n_args` arguments.
    Apply {
        /// Number of arguments beneath the function.
        n_args: usize,
        /// Call site.
        location: Location,
        /// Return address.
        next: InsnPtr,
    },
    /// Tail-calls the function on top of `n_args` arguments.
    TailApply {
        /// Stack slots owned by the caller's activation.
        n_caller_args: usize,
        /// Number of arguments beneath the function.
        n_args: usize,
        /// Call site.
        location: Location,
    },
    /// Pushes a frame slot.
    FrameRef {
        /// Frame-relative index.
        index: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Pushes a stack slot relative to the stack pointer.
    StackRef {
        /// Negative offset from the stack pointer.
        offset: isize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Pushes a captured variable.
    ClosureRef {
        /// Display index.
        index: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Pushes the value of a top-level identifier, computing it if needed.
    TopRef {
        /// Identifier.
        name: SymbolId,
        /// Continuation.
        next: InsnPtr,
    },
    /// Swaps the top with the contents of a boxed captured variable.
    ClosureSetBox {
        /// Display index.
        index: usize,
        /// Position of the `set!`.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Swaps the top with the contents of a boxed stack variable.
    StackSetBox {
        /// Negative offset from the stack pointer.
        offset: isize,
        /// Position of the `set!`.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Swaps the top with an unboxed stack variable.
    StackSet {
        /// Negative offset from the stack pointer.
        offset: isize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Drops `n` bindings beneath the top value.
    PopBindings {
        /// Number of bindings.
        n: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Returns the top value to the caller, dropping `total_args` slots.
    Return {
        /// Formals plus locals still on the stack.
        total_args: usize,
    },
    /// `letrec`: pops a value into the box `n` slots down.
    SetBox {
        /// Distance below the new top.
        n: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// `letrec`: pops a value into the slot `n` slots down.
    SetImmediate {
        /// Distance below the new top.
        n: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Fails if the top value is the uninitialized marker.
    CheckInit {
        /// Variable name for the diagnostic.
        name: SymbolId,
        /// Position of the reference.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Replaces a box on top with its contents.
    Unbox {
        /// Continuation.
        next: InsnPtr,
    },
    /// Replaces the top with a box holding it.
    Box {
        /// Continuation.
        next: InsnPtr,
    },
    /// Boxes an argument in place on procedure entry.
    BoxArg {
        /// Argument index.
        index: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Boxes a stack slot in place.
    BoxStack {
        /// Negative offset from the stack pointer.
        offset: isize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Branches on whether a keyword slot was left unsupplied.
    TestNull {
        /// Negative offset from the stack pointer.
        offset: isize,
        /// Taken when the slot is unsupplied.
        if_null: InsnPtr,
        /// Taken otherwise.
        if_not_null: InsnPtr,
    },
    /// Pops a value into a keyword slot.
    SetKeyArg {
        /// Negative offset from the stack pointer after the pop.
        offset: isize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Dispatches on the number of optional arguments supplied.
    Varargs {
        /// Signature of the procedure being entered.
        signature: Rc<Signature>,
        /// Entry `i` runs when `i` optional arguments were supplied; the
        /// last entry handles rest and keyword arguments.
        entry_points: Vec<InsnPtr>,
        /// Position of the lambda.
        location: Location,
    },
    /// Calls a statically known primitive.
    PrimitiveCall {
        /// Number of arguments.
        n_args: usize,
        /// The primitive.
        function: Rc<Function>,
        /// Call site.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Calls a statically known procedure.
    FunctionCall {
        /// Number of arguments.
        n_args: usize,
        /// The procedure.
        function: Rc<Function>,
        /// Call site.
        location: Location,
        /// Return address.
        next: InsnPtr,
    },
    /// Tail-calls a statically known procedure.
    FunctionTailCall {
        /// Number of arguments.
        n_args: usize,
        /// The procedure.
        function: Rc<Function>,
        /// Call site.
        location: Location,
        /// Stack slots owned by the caller's activation.
        n_caller_args: usize,
    },
    /// Builds a closure from the `display_length` values on top.
    Closure {
        /// Signature of the new procedure.
        signature: Rc<Signature>,
        /// Entry instruction.
        code: InsnPtr,
        /// Number of captured variables.
        display_length: usize,
        /// Continuation.
        next: InsnPtr,
    },
    /// Enters a processing mode.
    PushMode {
        /// Mode name.
        mode: SymbolId,
        /// Continuation.
        next: InsnPtr,
    },
    /// Leaves the innermost processing mode.
    PopMode {
        /// Continuation.
        next: InsnPtr,
    },
    /// Fails unless the top value is a style.
    CheckStyle {
        /// Position of the `use:` value.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Fails unless the top value is a sosofo.
    CheckSosofo {
        /// Position of the content expression.
        location: Location,
        /// Continuation.
        next: InsnPtr,
    },
    /// Builds a style from characteristic values (and an optional `use:`).
    MakeStyle {
        /// Characteristic names, one value each on the stack.
        keys: Vec<SymbolId>,
        /// Whether a `use:` style sits above the values.
        has_use: bool,
        /// Continuation.
        next: InsnPtr,
    },
    /// Builds a flow-object sosofo.
    MakeFlowObject {
        /// Flow-object class.
        class: SymbolId,
        /// Characteristic names, one value each on the stack.
        keys: Vec<SymbolId>,
        /// Whether a `use:` style sits above the values.
        has_use: bool,
        /// Number of content sosofos on top.
        n_content: usize,
        /// Continuation.
        next: InsnPtr,
    },
}

impl Insn {
    /// Wraps this instruction for linking.
    #[must_use]
    pub fn into_ptr(self) -> InsnPtr {
        Some(Rc::new(self))
    }

    /// Builds a `PopBindings`, fusing it with a following `Return` or
    /// `PopBindings`.
    #[must_use]
    pub fn pop_bindings(n: usize, next: InsnPtr) -> InsnPtr {
        if n == 0 {
            return next;
        }
        if let Some(insn) = &next {
            if let Some(total_args) = insn.is_return() {
                return Self::Return {
                    total_args: n + total_args,
                }
                .into_ptr();
            }
            if let Self::PopBindings { n: m, next: after } = &**insn {
                return Self::PopBindings {
                    n: n + m,
                    next: after.clone(),
                }
                .into_ptr();
            }
        }
        Self::PopBindings { n, next }.into_ptr()
    }

    /// Number of slots dropped if this is a `Return`.
    #[must_use]
    pub const fn is_return(&self) -> Option<usize> {
        match self {
            Self::Return { total_args } => Some(*total_args),
            _ => None,
        }
    }

    /// Instruction name, for inspection.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::CondFail { .. } => "CondFail",
            Self::CaseFail { .. } => "CaseFail",
            Self::Constant { .. } => "Constant",
            Self::ResolveQuantities { .. } => "ResolveQuantities",
            Self::Test { .. } => "Test",
            Self::Or { .. } => "Or",
            Self::And { .. } => "And",
            Self::Case { .. } => "Case",
            Self::Pop { .. } => "Pop",
            Self::Cons { .. } => "Cons",
            Self::Append { .. } => "Append",
            Self::Vector { .. } => "Vector",
            Self::ListToVector { .. } => "ListToVector",
            Self::Apply { .. } => "Apply",
            Self::TailApply { .. } => "TailApply",
            Self::FrameRef { .. } => "FrameRef",
            Self::StackRef { .. } => "StackRef",
            Self::ClosureRef { .. } => "ClosureRef",
            Self::TopRef { .. } => "TopRef",
            Self::ClosureSetBox { .. } => "ClosureSetBox",
            Self::StackSetBox { .. } => "StackSetBox",
            Self::StackSet { .. } => "StackSet",
            Self::PopBindings { .. } => "PopBindings",
            Self::Return { .. } => "Return",
            Self::SetBox { .. } => "SetBox",
            Self::SetImmediate { .. } => "SetImmediate",
            Self::CheckInit { .. } => "CheckInit",
            Self::Unbox { .. } => "Unbox",
            Self::Box { .. } => "Box",
            Self::BoxArg { .. } => "BoxArg",
            Self::BoxStack { .. } => "BoxStack",
            Self::TestNull { .. } => "TestNull",
            Self::SetKeyArg { .. } => "SetKeyArg",
            Self::Varargs { .. } => "Varargs",
            Self::PrimitiveCall { .. } => "PrimitiveCall",
            Self::FunctionCall { .. } => "FunctionCall",
            Self::FunctionTailCall { .. } => "FunctionTailCall",
            Self::Closure { .. } => "Closure",
            Self::PushMode { .. } => "PushMode",
            Self::PopMode { .. } => "PopMode",
            Self::CheckStyle { .. } => "CheckStyle",
            Self::CheckSosofo { .. } => "CheckSosofo",
            Self::MakeStyle { .. } => "MakeStyle",
            Self::MakeFlowObject { .. } => "MakeFlowObject",
        }
    }

    /// Instructions this one can transfer to, including a closure's code.
    #[must_use]
    pub fn successors(&self) -> Vec<&Rc<Insn>> {
        let links: Vec<&InsnPtr> = match self {
            Self::Error
            | Self::CondFail { .. }
            | Self::CaseFail { .. }
            | Self::TailApply { .. }
            | Self::Return { .. }
            | Self::FunctionTailCall { .. } => Vec::new(),
            Self::Test {
                consequent,
                alternative,
            } => vec![consequent, alternative],
            Self::Or { next_test, next } | Self::And { next_test, next } => vec![next_test, next],
            Self::Case { on_match, fail, .. } => vec![on_match, fail],
            Self::TestNull {
                if_null,
                if_not_null,
                ..
            } => vec![if_null, if_not_null],
            Self::Varargs { entry_points, .. } => entry_points.iter().collect(),
            Self::Closure { code, next, .. } => vec![code, next],
            Self::Constant { next, .. }
            | Self::ResolveQuantities { next, .. }
            | Self::Pop { next }
            | Self::Cons { next }
            | Self::Append { next, .. }
            | Self::Vector { next, .. }
            | Self::ListToVector { next }
            | Self::Apply { next, .. }
            | Self::FrameRef { next, .. }
            | Self::StackRef { next, .. }
            | Self::ClosureRef { next, .. }
            | Self::TopRef { next, .. }
            | Self::ClosureSetBox { next, .. }
            | Self::StackSetBox { next, .. }
            | Self::StackSet { next, .. }
            | Self::PopBindings { next, .. }
            | Self::SetBox { next, .. }
            | Self::SetImmediate { next, .. }
            | Self::CheckInit { next, .. }
            | Self::Unbox { next }
            | Self::Box { next }
            | Self::BoxArg { next, .. }
            | Self::BoxStack { next, .. }
            | Self::SetKeyArg { next, .. }
            | Self::PrimitiveCall { next, .. }
            | Self::FunctionCall { next, .. }
            | Self::PushMode { next, .. }
            | Self::PopMode { next }
            | Self::CheckStyle { next, .. }
            | Self::CheckSosofo { next, .. }
            | Self::MakeStyle { next, .. }
            | Self::MakeFlowObject { next, .. } => vec![next],
        };
        links.into_iter().flatten().collect()
    }
}

/// Every instruction reachable from `root`, each shared node once.
#[must_use]
pub fn reachable(root: &InsnPtr) -> Vec<Rc<Insn>> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut pending: Vec<Rc<Insn>> = root.iter().cloned().collect();
    while let Some(insn) = pending.pop() {
        if !seen.insert(Rc::as_ptr(&insn)) {
            continue;
        }
        pending.extend(insn.successors().into_iter().cloned());
        order.push(insn);
    }
    order
}

/// Number of reachable instructions with the given name.
#[must_use]
pub fn count(root: &InsnPtr, name: &str) -> usize {
    reachable(root).iter().filter(|i| i.name() == name).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_bindings_fuses_with_return() {
        let ret = Insn::Return { total_args: 2 }.into_ptr();
        let fused = Insn::pop_bindings(3, ret);
        assert_eq!(fused.as_deref().and_then(Insn::is_return), Some(5));
    }

    #[test]
    fn pop_bindings_fuses_with_pop_bindings() {
        let inner = Insn::pop_bindings(1, None);
        let fused = Insn::pop_bindings(2, inner);
        match fused.as_deref() {
            Some(Insn::PopBindings { n, next }) => {
                assert_eq!(*n, 3);
                assert!(next.is_none());
            }
            _ => panic!("expected fused PopBindings"),
        }
        assert!(Insn::pop_bindings(0, None).is_none());
    }

    #[test]
    fn reachable_visits_shared_tails_once() {
        let tail = Insn::Pop { next: None }.into_ptr();
        let test = Insn::Test {
            consequent: Insn::Constant {
                value: Value::Integer(1),
                next: tail.clone(),
            }
            .into_ptr(),
            alternative: Insn::Constant {
                value: Value::Integer(2),
                next: tail,
            }
            .into_ptr(),
        }
        .into_ptr();
        assert_eq!(reachable(&test).len(), 4);
        assert_eq!(count(&test, "Constant"), 2);
        assert_eq!(count(&test, "Pop"), 1);
    }
}
