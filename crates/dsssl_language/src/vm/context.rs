//! What a primitive can see while it runs.

use std::rc::Rc;

use dsssl_foundation::{Interner, Location, SymbolId};

use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::Vm;

/// Access a primitive body has to the interpreter.
///
/// The calling VM's stacks are not reachable from here. Calling back into
/// user code goes through [`apply`](Self::apply), which runs a separate VM.
pub struct CallContext<'a> {
    interp: &'a mut Interpreter,
    mode: Option<SymbolId>,
    location: Location,
}

impl<'a> CallContext<'a> {
    /// Creates a context for a call at `location`.
    pub fn new(interp: &'a mut Interpreter, mode: Option<SymbolId>, location: Location) -> Self {
        Self {
            interp,
            mode,
            location,
        }
    }

    /// The interpreter.
    pub fn interp(&mut self) -> &mut Interpreter {
        self.interp
    }

    /// Symbol table.
    #[must_use]
    pub fn interner(&self) -> &Interner {
        self.interp.interner()
    }

    /// Interns `name`.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.interp.intern(name)
    }

    /// Processing mode in effect at the call.
    #[must_use]
    pub const fn mode(&self) -> Option<SymbolId> {
        self.mode
    }

    /// Source position of the call.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Prints `value` the way the interpreter does.
    #[must_use]
    pub fn print(&self, value: &Value) -> String {
        self.interp.print(value)
    }

    /// Calls `function` on `args` in a nested VM.
    ///
    /// Returns [`Value::Error`] if the call failed; the failure has already
    /// been reported.
    pub fn apply(&mut self, function: &Rc<Function>, args: &[Value]) -> Value {
        let mut vm = Vm::new(self.interp);
        vm.set_mode(self.mode);
        vm.apply(function, args, self.location)
    }
}
