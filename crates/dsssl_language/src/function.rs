//! Procedure objects: primitives, closures and escape continuations.

use std::cell::Cell;
use std::rc::Rc;

use dsssl_foundation::{Result, Signature};

use crate::insn::InsnPtr;
use crate::value::Value;
use crate::vm::CallContext;

/// Body of a built-in procedure.
///
/// Receives the actual arguments, already arity-checked against the
/// primitive's signature. An `Err` is reported by the VM at the call site;
/// returning `Ok(Value::Error)` aborts silently (used when a nested
/// evaluation has already reported).
pub type PrimitiveFn = fn(&[Value], &mut CallContext<'_>) -> Result<Value>;

static APPLY_SIGNATURE: Signature = Signature::variadic(2);
static CALL_CC_SIGNATURE: Signature = Signature::fixed(1);
static CONTINUATION_SIGNATURE: Signature = Signature::fixed(1);

/// A built-in procedure.
pub struct Primitive {
    /// Name the primitive is bound to.
    pub name: &'static str,
    /// Accepted arguments.
    pub signature: Signature,
    /// Implementation.
    pub body: PrimitiveFn,
}

/// A compiled lambda together with its captured variables.
pub struct Closure {
    /// Accepted arguments.
    pub signature: Rc<Signature>,
    /// Entry instruction.
    pub code: InsnPtr,
    /// Captured variables, in the order the compiler laid them out.
    pub display: Rc<[Value]>,
    read_only: Cell<bool>,
}

impl Closure {
    /// Creates a closure.
    #[must_use]
    pub fn new(signature: Rc<Signature>, code: InsnPtr, display: Rc<[Value]>) -> Self {
        Self {
            signature,
            code,
            display,
            read_only: Cell::new(false),
        }
    }
}

/// An escape-only continuation.
///
/// Records the operand and control stack sizes of the VM that captured it.
/// It stays callable only while the control entry it is attached to is
/// still on that VM's control stack.
pub struct Continuation {
    owner: u64,
    stack_size: Cell<usize>,
    control_stack_size: Cell<usize>,
    read_only: Cell<bool>,
}

impl Continuation {
    /// Creates a continuation owned by the VM with id `owner`.
    ///
    /// It is dead until [`set`](Self::set) attaches it to a control entry.
    #[must_use]
    pub const fn new(owner: u64) -> Self {
        Self {
            owner,
            stack_size: Cell::new(0),
            control_stack_size: Cell::new(0),
            read_only: Cell::new(false),
        }
    }

    /// Records the stack sizes to unwind to.
    pub fn set(&self, stack_size: usize, control_stack_size: usize) {
        self.stack_size.set(stack_size);
        self.control_stack_size.set(control_stack_size);
    }

    /// Marks the continuation as dead.
    pub fn kill(&self) {
        self.control_stack_size.set(0);
    }

    /// Returns true while the capturing activation is still active.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.control_stack_size.get() > 0 && !self.read_only.get()
    }

    /// Id of the VM that captured this continuation.
    #[must_use]
    pub const fn owner(&self) -> u64 {
        self.owner
    }

    /// Operand stack size at capture time.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size.get()
    }

    /// Control stack depth at capture time.
    #[must_use]
    pub fn control_stack_size(&self) -> usize {
        self.control_stack_size.get()
    }
}

/// A procedure value.
pub enum Function {
    /// Built-in procedure.
    Primitive(Primitive),
    /// User procedure.
    Closure(Closure),
    /// Escape continuation from `call-with-current-continuation`.
    Continuation(Continuation),
    /// `apply`, which needs direct access to the operand stack.
    Apply,
    /// `call-with-current-continuation`.
    CallWithCurrentContinuation,
}

impl Function {
    /// Accepted arguments.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Primitive(p) => &p.signature,
            Self::Closure(c) => &c.signature,
            Self::Continuation(_) => &CONTINUATION_SIGNATURE,
            Self::Apply => &APPLY_SIGNATURE,
            Self::CallWithCurrentContinuation => &CALL_CC_SIGNATURE,
        }
    }

    /// Short description used when printing.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.name,
            Self::Closure(_) => "procedure",
            Self::Continuation(_) => "continuation",
            Self::Apply => "apply",
            Self::CallWithCurrentContinuation => "call-with-current-continuation",
        }
    }

    /// Name of a built-in procedure, `None` for closures and continuations.
    #[must_use]
    pub const fn primitive_name(&self) -> Option<&'static str> {
        match self {
            Self::Primitive(_) | Self::Apply | Self::CallWithCurrentContinuation => {
                Some(self.name())
            }
            Self::Closure(_) | Self::Continuation(_) => None,
        }
    }

    /// Returns true for built-ins called through `PrimitiveCall`.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Freezes captured state.
    ///
    /// A closure freezes its display; a continuation becomes dead.
    pub fn make_read_only(&self) {
        match self {
            Self::Closure(c) => {
                if !c.read_only.replace(true) {
                    for value in c.display.iter() {
                        value.make_read_only();
                    }
                }
            }
            Self::Continuation(k) => k.read_only.set(true),
            _ => {}
        }
    }
}
