//! Compile-time lexical environment.
//!
//! An [`Environment`] maps local names to stack or closure slots. It is
//! persistent: binding forms extend a copy with [`Environment::augment_frame`]
//! and the parent stays untouched. Variable usage is recorded on a
//! [`BoundVarList`] by the marking pass before any storage is laid out.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

use dsssl_foundation::SymbolId;
use im::Vector;

/// Usage flags of one bound variable.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VarFlags(u8);

impl VarFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Referenced at least once.
    pub const USED: Self = Self(1);
    /// Target of `set!` (or bound by `letrec`).
    pub const ASSIGNED: Self = Self(2);
    /// Referenced from inside a nested lambda.
    pub const SHARED: Self = Self(4);
    /// May be read before its initializer has run.
    pub const UNINIT: Self = Self(8);

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// These flags without those in `other`.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Storage must be a heap box: assigned and shared.
    #[must_use]
    pub const fn is_boxed(self) -> bool {
        self.contains(Self(Self::ASSIGNED.0 | Self::SHARED.0))
    }

    /// Returns true if the variable may be uninitialized.
    #[must_use]
    pub const fn is_uninit(self) -> bool {
        self.contains(Self::UNINIT)
    }
}

impl BitOr for VarFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for VarFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for VarFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::USED, "used"),
            (Self::ASSIGNED, "assigned"),
            (Self::SHARED, "shared"),
            (Self::UNINIT, "uninit"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{{{}}}", set.join(", "))
    }
}

/// One lexical variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundVar {
    /// Source name.
    pub name: SymbolId,
    /// Usage recorded by the marking pass.
    pub flags: VarFlags,
    rebound_count: u32,
}

impl BoundVar {
    /// Returns true if this variable needs boxed storage.
    #[must_use]
    pub const fn is_boxed(&self) -> bool {
        self.flags.is_boxed()
    }
}

/// An ordered list of variables bound by one construct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundVarList {
    vars: Vec<BoundVar>,
}

impl BoundVarList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list binding `names` with the given flags.
    #[must_use]
    pub fn from_names(names: &[SymbolId], flags: VarFlags) -> Self {
        let mut list = Self::new();
        for &name in names {
            list.append(name, flags);
        }
        list
    }

    /// Adds a variable. The used flag is never inherited.
    pub fn append(&mut self, name: SymbolId, flags: VarFlags) {
        self.vars.push(BoundVar {
            name,
            flags: flags.without(VarFlags::USED),
            rebound_count: 0,
        });
    }

    /// Records a use of `name`, unless an inner construct rebinds it.
    pub fn mark(&mut self, name: SymbolId, flags: VarFlags) {
        if let Some(var) = self.find_mut(name) {
            if var.rebound_count == 0 {
                var.flags |= flags;
            }
        }
    }

    /// Marks `names` as shadowed by an inner binding.
    pub fn rebind(&mut self, names: &[SymbolId]) {
        for &name in names {
            if let Some(var) = self.find_mut(name) {
                var.rebound_count += 1;
            }
        }
    }

    /// Undoes [`rebind`](Self::rebind).
    pub fn unbind(&mut self, names: &[SymbolId]) {
        for &name in names {
            if let Some(var) = self.find_mut(name) {
                var.rebound_count = var.rebound_count.saturating_sub(1);
            }
        }
    }

    /// Drops variables the marking pass never saw used.
    pub fn remove_unused(&mut self) {
        self.vars.retain(|v| v.flags.contains(VarFlags::USED));
    }

    /// Sets `flags` on every variable.
    pub fn set_all(&mut self, flags: VarFlags) {
        for var in &mut self.vars {
            var.flags |= flags;
        }
    }

    /// The first `n` variables, with their flags.
    #[must_use]
    pub fn prefix(&self, n: usize) -> Self {
        Self {
            vars: self.vars[..n.min(self.vars.len())]
                .iter()
                .map(|v| BoundVar {
                    rebound_count: 0,
                    ..v.clone()
                })
                .collect(),
        }
    }

    /// Finds a variable by name.
    #[must_use]
    pub fn find(&self, name: SymbolId) -> Option<&BoundVar> {
        self.vars.iter().find(|v| v.name == name)
    }

    fn find_mut(&mut self, name: SymbolId) -> Option<&mut BoundVar> {
        self.vars.iter_mut().find(|v| v.name == name)
    }

    /// Position of `name`.
    #[must_use]
    pub fn position(&self, name: SymbolId) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    /// Variable at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BoundVar> {
        self.vars.get(index)
    }

    /// Returns true if the variable at `index` is boxed.
    #[must_use]
    pub fn is_boxed(&self, index: usize) -> bool {
        self.vars.get(index).is_some_and(BoundVar::is_boxed)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variables are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over the variables.
    pub fn iter(&self) -> std::slice::Iter<'_, BoundVar> {
        self.vars.iter()
    }
}

/// Where a local variable lives at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Frame-relative stack index.
    Frame(usize),
    /// Index into the current closure's display.
    Closure(usize),
}

/// Result of a successful [`Environment::lookup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Storage slot.
    pub slot: Slot,
    /// Usage flags.
    pub flags: VarFlags,
}

#[derive(Clone, Debug)]
struct FrameVarList {
    stack_pos: usize,
    vars: Rc<BoundVarList>,
}

/// Lexical environment: frame variable lists (innermost first) plus the
/// variables captured by the enclosing closure.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    frames: Vector<FrameVarList>,
    closure_vars: Rc<BoundVarList>,
}

impl Environment {
    /// The empty environment of a top-level expression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment of a lambda body: its formals at frame offset 0 and its
    /// captured variables.
    #[must_use]
    pub fn for_lambda(formals: Rc<BoundVarList>, closure_vars: Rc<BoundVarList>) -> Self {
        let mut frames = Vector::new();
        frames.push_front(FrameVarList {
            stack_pos: 0,
            vars: formals,
        });
        Self {
            frames,
            closure_vars,
        }
    }

    /// A copy of this environment with `vars` bound from `stack_pos`.
    #[must_use]
    pub fn augment_frame(&self, vars: Rc<BoundVarList>, stack_pos: usize) -> Self {
        let mut frames = self.frames.clone();
        frames.push_front(FrameVarList { stack_pos, vars });
        Self {
            frames,
            closure_vars: Rc::clone(&self.closure_vars),
        }
    }

    /// Resolves a local name; `None` means a top-level reference.
    #[must_use]
    pub fn lookup(&self, name: SymbolId) -> Option<Resolved> {
        for frame in &self.frames {
            if let Some(i) = frame.vars.position(name) {
                return Some(Resolved {
                    slot: Slot::Frame(frame.stack_pos + i),
                    flags: frame.vars.vars[i].flags,
                });
            }
        }
        self.closure_vars.position(name).map(|i| Resolved {
            slot: Slot::Closure(i),
            flags: self.closure_vars.vars[i].flags,
        })
    }

    /// Every visible local variable: closure variables first, then frame
    /// variables innermost first. Shadowed bindings are left out so each
    /// name appears once, with the flags [`lookup`](Self::lookup) would
    /// report.
    #[must_use]
    pub fn bound_vars(&self) -> BoundVarList {
        let mut frame_vars = BoundVarList::new();
        for frame in &self.frames {
            for var in frame.vars.iter() {
                if frame_vars.find(var.name).is_none() {
                    frame_vars.append(var.name, var.flags);
                }
            }
        }
        let mut result = BoundVarList::new();
        for var in self.closure_vars.iter() {
            if frame_vars.find(var.name).is_none() && result.find(var.name).is_none() {
                result.append(var.name, var.flags);
            }
        }
        result.vars.extend(frame_vars.vars);
        result
    }
}
