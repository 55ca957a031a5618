//! String interning for identifiers.
//!
//! Symbols, keywords, identifiers, unit names and flow-object class names
//! all share one table. A keyword `foo:` is represented by the id of `foo`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interned identifier.
///
/// Comparing two ids is a single integer comparison.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Returns the raw index of this symbol.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

/// Interner mapping names to [`SymbolId`]s and back.
///
/// Scoped to one interpreter; not shared between threads.
#[derive(Clone, Debug, Default)]
pub struct Interner {
    names: Vec<Rc<str>>,
    ids: HashMap<Rc<str>, SymbolId>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a name, returning its [`SymbolId`].
    ///
    /// # Panics
    ///
    /// Panics if the number of interned names exceeds `u32::MAX`.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = SymbolId(u32::try_from(self.names.len()).expect("too many symbols"));
        let name: Rc<str> = name.into();
        self.names.push(Rc::clone(&name));
        self.ids.insert(name, id);
        id
    }

    /// Returns the id of a name if it has been interned.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    /// Gets the name for a symbol.
    #[must_use]
    pub fn resolve(&self, id: SymbolId) -> &str {
        self.names.get(id.0 as usize).map_or("", AsRef::as_ref)
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
