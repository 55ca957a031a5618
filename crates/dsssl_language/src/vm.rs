//! Stack-based virtual machine for compiled instruction graphs.
//!
//! The VM owns an operand stack and a control stack. Instructions link to
//! their successors, so running a program is a trampoline: each
//! [`Insn::execute`] returns the next instruction and `None` halts.
//!
//! # Failure
//!
//! Nothing in here returns `Err`. A failing instruction reports a
//! [`Diagnostic`] through the interpreter, empties the operand stack and
//! halts; [`Vm::eval`] then yields [`Value::Error`].
//!
//! # Nesting
//!
//! Primitives that call back into user code (`map`, `for-each`) build a
//! fresh `Vm` over the same interpreter through [`CallContext::apply`].
//! Each VM has its own id; continuations only work in the VM that
//! captured them.

#![allow(clippy::cast_possible_wrap)]

mod call;
mod context;
mod execute;
#[cfg(test)]
mod tests;

pub use context::CallContext;

use std::rc::Rc;

use dsssl_foundation::{Location, Result, SymbolId};

use crate::diagnostic::Diagnostic;
use crate::function::Function;
use crate::insn::{Insn, InsnPtr};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Saved state of a caller while a closure runs.
struct ControlStackEntry {
    /// Caller's slots below the callee's arguments.
    frame_size: usize,
    closure: Rc<[Value]>,
    closure_loc: Location,
    /// Continuations captured by the callee's activation.
    continuations: Vec<Rc<Function>>,
    next: InsnPtr,
}

/// Stack-based virtual machine.
pub struct Vm<'i> {
    /// Tables, options and the message sink.
    pub(crate) interp: &'i mut Interpreter,
    id: u64,
    /// Operand stack; its length is the stack pointer.
    pub(crate) stack: Vec<Value>,
    /// Index of the current activation's first argument.
    pub(crate) frame: usize,
    /// Display of the running closure.
    pub(crate) closure: Rc<[Value]>,
    /// Arguments supplied to the closure being entered.
    pub(crate) n_actual_args: usize,
    /// Call site of the running closure.
    pub(crate) closure_loc: Location,
    control_stack: Vec<ControlStackEntry>,
    /// Current processing mode.
    pub(crate) mode: Option<SymbolId>,
    mode_stack: Vec<Option<SymbolId>>,
    peak_control_depth: usize,
}

impl<'i> Vm<'i> {
    /// Creates a VM over `interp`.
    pub fn new(interp: &'i mut Interpreter) -> Self {
        let id = interp.next_vm_id();
        Self {
            interp,
            id,
            stack: Vec::with_capacity(64),
            frame: 0,
            closure: Rc::from(Vec::new()),
            n_actual_args: 0,
            closure_loc: Location::default(),
            control_stack: Vec::new(),
            mode: None,
            mode_stack: Vec::new(),
            peak_control_depth: 0,
        }
    }

    /// Id that continuations captured by this VM carry.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Sets the processing mode evaluation starts in.
    pub fn set_mode(&mut self, mode: Option<SymbolId>) {
        self.mode = mode;
    }

    /// Deepest control stack seen since the last [`eval`](Self::eval).
    #[must_use]
    pub const fn peak_control_depth(&self) -> usize {
        self.peak_control_depth
    }

    /// Current operand stack size.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Current control stack size.
    #[must_use]
    pub fn control_stack_size(&self) -> usize {
        self.control_stack.len()
    }

    /// Runs `insn` to completion.
    ///
    /// `display` becomes the running closure's captured variables and
    /// `arg`, if given, is pushed before the first instruction runs.
    pub fn eval(&mut self, insn: &InsnPtr, display: Option<Rc<[Value]>>, arg: Option<Value>) -> Value {
        self.init_stack();
        if let Some(arg) = arg {
            self.need_stack(1);
            self.push(arg);
        }
        self.closure = display.unwrap_or_else(|| Rc::from(Vec::new()));
        self.closure_loc = Location::default();
        self.run(insn.clone())
    }

    /// Calls `function` on `args` and returns its result.
    pub fn apply(&mut self, function: &Rc<Function>, args: &[Value], location: Location) -> Value {
        self.init_stack();
        self.need_stack(args.len() + 1);
        self.stack.extend_from_slice(args);
        self.push(Value::Function(Rc::clone(function)));
        let start = Insn::Apply {
            n_args: args.len(),
            location,
            next: None,
        }
        .into_ptr();
        self.run(start)
    }

    fn run(&mut self, mut cur: InsnPtr) -> Value {
        while let Some(insn) = cur {
            cur = insn.execute(self);
        }
        if let Some(result) = self.stack.pop() {
            debug_assert!(self.stack.is_empty(), "operand stack not balanced");
            debug_assert!(self.control_stack.is_empty(), "control stack not balanced");
            result
        } else {
            if self.interp.options().debug {
                self.stack_trace();
            }
            self.init_stack();
            Value::Error
        }
    }

    fn init_stack(&mut self) {
        for entry in self.control_stack.drain(..) {
            kill_all(&entry.continuations);
        }
        self.stack.clear();
        self.frame = 0;
        self.mode_stack.clear();
        self.peak_control_depth = 0;
    }

    /// Makes room for `n` more values.
    ///
    /// Doubles the capacity, or grows to exactly the request when that is
    /// larger.
    pub(crate) fn need_stack(&mut self, n: usize) {
        let free = self.stack.capacity() - self.stack.len();
        if free < n {
            let wanted = (self.stack.capacity() * 2).max(self.stack.len() + n);
            self.stack.reserve_exact(wanted - self.stack.len());
        }
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    pub(crate) fn top(&self) -> &Value {
        self.stack.last().unwrap_or(&Value::Error)
    }

    pub(crate) fn set_top(&mut self, value: Value) {
        if let Some(top) = self.stack.last_mut() {
            *top = value;
        }
    }

    /// Index of the slot `offset` (negative) places below the stack pointer.
    pub(crate) fn slot(&self, offset: isize) -> usize {
        self.stack.len().wrapping_add_signed(offset)
    }

    /// Reports `diagnostic` at `location` and halts.
    pub(crate) fn fail(&mut self, location: Location, diagnostic: Diagnostic) -> InsnPtr {
        self.interp.report_at(location, diagnostic);
        self.stack.clear();
        None
    }

    /// Halts after an error that has already been reported.
    pub(crate) fn abort(&mut self) -> InsnPtr {
        self.stack.clear();
        None
    }

    pub(crate) fn push_frame(&mut self, next: InsnPtr, args_pushed: usize) {
        self.control_stack.push(ControlStackEntry {
            frame_size: self.stack.len() - self.frame - args_pushed,
            closure: Rc::clone(&self.closure),
            closure_loc: self.closure_loc,
            continuations: Vec::new(),
            next,
        });
        self.peak_control_depth = self.peak_control_depth.max(self.control_stack.len());
    }

    pub(crate) fn pop_frame(&mut self) -> InsnPtr {
        let entry = self.control_stack.pop()?;
        kill_all(&entry.continuations);
        self.closure = entry.closure;
        self.frame = self.stack.len() - entry.frame_size;
        self.closure_loc = entry.closure_loc;
        entry.next
    }

    pub(crate) fn push_mode(&mut self, mode: SymbolId) {
        self.mode_stack.push(self.mode.replace(mode));
    }

    pub(crate) fn pop_mode(&mut self) {
        if let Some(mode) = self.mode_stack.pop() {
            self.mode = mode;
        }
    }

    /// Attaches `cc` to the innermost activation, recording the current
    /// stack sizes.
    pub(crate) fn set_arg_to_cc(&mut self, cc: Rc<Function>) {
        let (sp, csp) = (self.stack.len(), self.control_stack.len());
        let Some(entry) = self.control_stack.last_mut() else {
            return;
        };
        if let Function::Continuation(k) = &*cc {
            k.set(sp, csp);
            entry.continuations.push(cc);
        }
    }

    /// Returns true if the activation `size` entries deep holds `cc`.
    pub(crate) fn holds_continuation(&self, size: usize, cc: &Rc<Function>) -> bool {
        size > 0
            && self
                .control_stack
                .get(size - 1)
                .is_some_and(|entry| entry.continuations.iter().any(|c| Rc::ptr_eq(c, cc)))
    }

    /// Drops control entries above `size`, killing what they captured.
    pub(crate) fn unwind_control_stack(&mut self, size: usize) {
        while self.control_stack.len() > size {
            if let Some(entry) = self.control_stack.pop() {
                kill_all(&entry.continuations);
            }
        }
    }

    fn stack_trace(&mut self) {
        let mut count = 0;
        if self.closure_loc.is_known() {
            self.interp.report_at(self.closure_loc, Diagnostic::StackTrace);
            count += 1;
        }
        let lim = usize::from(
            self.control_stack
                .first()
                .is_some_and(|entry| !entry.closure_loc.is_known()),
        );
        let mut p = self.control_stack.len();
        while p > lim {
            let location = self.control_stack[p - 1].closure_loc;
            count += 1;
            if count == 5 && p - lim > 7 {
                self.interp
                    .report_at(location, Diagnostic::StackTraceEllipsis(p - (lim + 6)));
                p = lim + 6;
            } else {
                self.interp.report_at(location, Diagnostic::StackTrace);
            }
            p -= 1;
        }
    }
}

fn kill_all(continuations: &[Rc<Function>]) {
    for cc in continuations {
        if let Function::Continuation(k) = &**cc {
            k.kill();
        }
    }
}

/// Evaluates source text in a fresh interpreter.
///
/// Definitions are registered first, then the remaining forms run in
/// order; the value of the last one is returned.
///
/// # Errors
/// Returns an error if the source cannot be read or analyzed, or if the
/// last form evaluates to the error value.
pub fn eval(source: &str) -> Result<Value> {
    Interpreter::new().eval_str(source)
}
