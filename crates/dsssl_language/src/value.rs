//! Runtime values.
//!
//! Values are cheap to clone: everything larger than a word lives behind an
//! `Rc`. Pairs are immutable; vectors and boxes are the only mutable
//! containers, and both can be frozen with [`Value::make_read_only`].

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use dsssl_foundation::{Decimal, Interner, Number, SymbolId, Type};

use crate::flow::{Sosofo, Style};
use crate::function::Function;

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// The empty list `()`.
    Nil,
    /// `#t` or `#f`.
    Bool(bool),
    /// The value of expressions with no useful result.
    #[default]
    Unspecified,
    /// The sentinel produced when evaluation fails.
    Error,
    /// Placeholder for a `letrec` slot or an unsupplied keyword argument.
    Uninit,
    /// Exact integer.
    Integer(i64),
    /// Inexact real.
    Real(f64),
    /// Exact length in internal units.
    Length(i64),
    /// Inexact quantity: magnitude and dimension.
    Quantity(f64, i32),
    /// A quantity literal whose unit has not been resolved yet.
    UnresolvedQuantity(Rc<UnresolvedQuantity>),
    /// Character.
    Char(char),
    /// Immutable string.
    String(Rc<str>),
    /// Symbol.
    Symbol(SymbolId),
    /// Keyword (`name:`).
    Keyword(SymbolId),
    /// Cons cell.
    Pair(Rc<Pair>),
    /// Vector.
    Vector(Rc<VectorObj>),
    /// Mutable cell holding an assigned, captured variable.
    Box(Rc<BoxObj>),
    /// Procedure.
    Function(Rc<Function>),
    /// Style object.
    Style(Rc<Style>),
    /// Flow-object specification.
    Sosofo(Rc<Sosofo>),
}

/// A cons cell.
pub struct Pair {
    /// First element.
    pub car: Value,
    /// Rest of the list.
    pub cdr: Value,
}

impl Drop for Pair {
    // Unlinks the spine one cell at a time so long lists free in constant
    // stack depth.
    fn drop(&mut self) {
        let mut next = std::mem::take(&mut self.cdr);
        while let Value::Pair(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut pair) => next = std::mem::take(&mut pair.cdr),
                Err(_) => break,
            }
        }
    }
}

/// A vector with an optional read-only flag.
pub struct VectorObj {
    elements: RefCell<Vec<Value>>,
    read_only: Cell<bool>,
}

impl VectorObj {
    /// Creates a mutable vector.
    #[must_use]
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            elements: RefCell::new(elements),
            read_only: Cell::new(false),
        }
    }

    /// Borrows the elements.
    pub fn elements(&self) -> Ref<'_, Vec<Value>> {
        self.elements.borrow()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    /// Returns true if the vector has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the vector has been frozen.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.get()
    }

    /// Stores `value` at `index`; false if frozen or out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        if self.read_only.get() {
            return false;
        }
        match self.elements.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A mutable cell.
pub struct BoxObj {
    value: RefCell<Value>,
    read_only: Cell<bool>,
}

impl BoxObj {
    /// Creates a box holding `value`.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
            read_only: Cell::new(false),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Replaces the contents, returning the previous value.
    pub fn replace(&self, value: Value) -> Value {
        self.value.replace(value)
    }

    /// Returns true if assignment through this box is forbidden.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.get()
    }
}

/// Quantity literal with a unit name still to be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedQuantity {
    /// Numeric part.
    pub magnitude: Decimal,
    /// Unit name.
    pub unit: SymbolId,
}

impl Value {
    /// Builds a pair.
    #[must_use]
    pub fn cons(car: Value, cdr: Value) -> Self {
        Self::Pair(Rc::new(Pair { car, cdr }))
    }

    /// Builds a proper list.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>) -> Self {
        Self::list_with_tail(items, Value::Nil)
    }

    /// Builds a list ending in `tail`.
    #[must_use]
    pub fn list_with_tail(
        items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>,
        tail: Value,
    ) -> Self {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Value::cons(item, acc))
    }

    /// Builds a string value.
    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::String(Rc::from(s))
    }

    /// Builds a vector value.
    #[must_use]
    pub fn vector(elements: Vec<Value>) -> Self {
        Self::Vector(Rc::new(VectorObj::new(elements)))
    }

    /// Wraps a foundation number.
    #[must_use]
    pub fn from_number(n: Number) -> Self {
        match n {
            Number::Integer(i) => Self::Integer(i),
            Number::Real(r) => Self::Real(r),
            Number::Length(l) => Self::Length(l),
            Number::Quantity { value, dim } => Self::Quantity(value, dim),
        }
    }

    /// Views this value as a number.
    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match *self {
            Self::Integer(i) => Some(Number::Integer(i)),
            Self::Real(r) => Some(Number::Real(r)),
            Self::Length(l) => Some(Number::Length(l)),
            Self::Quantity(value, dim) => Some(Number::inexact(value, dim)),
            _ => None,
        }
    }

    /// Returns the function if this is a procedure.
    #[must_use]
    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the pair if this is a cons cell.
    #[must_use]
    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            Self::Pair(p) => Some(p),
            _ => None,
        }
    }

    /// Everything except `#f` counts as true.
    #[must_use]
    pub const fn is_true(&self) -> bool {
        !matches!(self, Self::Bool(false))
    }

    /// Returns true for the error sentinel.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns true for the empty list.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Collects a proper list into a vector; `None` if improper.
    #[must_use]
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Self::Nil => return Some(items),
                Self::Pair(p) => {
                    items.push(p.car.clone());
                    cursor = &p.cdr;
                }
                _ => return None,
            }
        }
    }

    /// The type name of this value.
    #[must_use]
    pub fn type_of(&self) -> Type {
        match self {
            Self::Nil => Type::EmptyList,
            Self::Bool(_) => Type::Boolean,
            Self::Unspecified => Type::Unspecified,
            Self::Error => Type::Error,
            Self::Integer(_) => Type::Integer,
            Self::Real(_) => Type::Real,
            Self::Length(_) => Type::Length,
            Self::Quantity(..) | Self::UnresolvedQuantity(_) => Type::Quantity,
            Self::Char(_) => Type::Char,
            Self::String(_) => Type::String,
            Self::Symbol(_) => Type::Symbol,
            Self::Keyword(_) => Type::Keyword,
            Self::Pair(_) => Type::Pair,
            Self::Vector(_) => Type::Vector,
            Self::Function(_) => Type::Procedure,
            Self::Style(_) => Type::Style,
            Self::Sosofo(_) => Type::Sosofo,
            Self::Uninit | Self::Box(_) => Type::Other,
        }
    }

    /// `eq?`: identity.
    #[must_use]
    pub fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil)
            | (Self::Unspecified, Self::Unspecified)
            | (Self::Error, Self::Error)
            | (Self::Uninit, Self::Uninit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) | (Self::Length(a), Self::Length(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) | (Self::Keyword(a), Self::Keyword(b)) => a == b,
            (Self::String(a), Self::String(b)) => Rc::ptr_eq(a, b),
            (Self::Pair(a), Self::Pair(b)) => Rc::ptr_eq(a, b),
            (Self::Vector(a), Self::Vector(b)) => Rc::ptr_eq(a, b),
            (Self::Box(a), Self::Box(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Style(a), Self::Style(b)) => Rc::ptr_eq(a, b),
            (Self::Sosofo(a), Self::Sosofo(b)) => Rc::ptr_eq(a, b),
            (Self::UnresolvedQuantity(a), Self::UnresolvedQuantity(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `eqv?`: identity, plus numbers compared by value and exactness.
    #[must_use]
    pub fn eqv(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Quantity(a, da), Self::Quantity(b, db)) => a == b && da == db,
            (Self::String(a), Self::String(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            _ => self.eq(other),
        }
    }

    /// `equal?`: structural equality.
    #[must_use]
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Pair(_), Self::Pair(_)) => {
                let (mut a, mut b) = (self, other);
                loop {
                    match (a, b) {
                        (Self::Pair(pa), Self::Pair(pb)) => {
                            if !pa.car.equal(&pb.car) {
                                return false;
                            }
                            a = &pa.cdr;
                            b = &pb.cdr;
                        }
                        _ => return a.equal(b),
                    }
                }
            }
            (Self::Vector(a), Self::Vector(b)) => {
                let (a, b) = (a.elements(), b.elements());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            _ => self.eqv(other),
        }
    }

    /// Freezes this value and everything reachable from it.
    ///
    /// Vectors reject `vector-set!`, boxes reject assignment and
    /// continuations become dead.
    pub fn make_read_only(&self) {
        let mut cursor = self;
        loop {
            match cursor {
                Self::Pair(p) => {
                    p.car.make_read_only();
                    cursor = &p.cdr;
                    continue;
                }
                Self::Vector(v) => {
                    if !v.read_only.replace(true) {
                        for element in v.elements().iter() {
                            element.make_read_only();
                        }
                    }
                }
                Self::Box(b) => {
                    if !b.read_only.replace(true) {
                        b.value.borrow().make_read_only();
                    }
                }
                Self::Function(f) => f.make_read_only(),
                _ => {}
            }
            return;
        }
    }

    /// Adapter for printing with symbol names.
    #[must_use]
    pub fn display<'a>(&'a self, interner: &'a Interner, units_per_inch: i64) -> Printed<'a> {
        Printed {
            value: self,
            interner,
            units_per_inch,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "()"),
            Self::Bool(true) => write!(f, "#t"),
            Self::Bool(false) => write!(f, "#f"),
            Self::Unspecified => write!(f, "#<unspecified>"),
            Self::Error => write!(f, "#<error>"),
            Self::Uninit => write!(f, "#<uninitialized>"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(r) => write!(f, "{r:?}"),
            Self::Length(n) => write!(f, "Length({n})"),
            Self::Quantity(v, d) => write!(f, "Quantity({v:?}, {d})"),
            Self::UnresolvedQuantity(q) => write!(f, "{q:?}"),
            Self::Char(c) => write!(f, "{c:?}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(id) => write!(f, "Symbol({})", id.index()),
            Self::Keyword(id) => write!(f, "Keyword({})", id.index()),
            Self::Pair(p) => {
                write!(f, "({:?}", p.car)?;
                let mut cursor = &p.cdr;
                while let Self::Pair(next) = cursor {
                    write!(f, " {:?}", next.car)?;
                    cursor = &next.cdr;
                }
                match cursor {
                    Self::Nil => write!(f, ")"),
                    tail => write!(f, " . {tail:?})"),
                }
            }
            Self::Vector(v) => write!(f, "#{:?}", v.elements()),
            Self::Box(b) => write!(f, "#<box {:?}>", b.get()),
            Self::Function(func) => write!(f, "#<procedure {}>", func.name()),
            Self::Style(_) => write!(f, "#<style>"),
            Self::Sosofo(_) => write!(f, "#<sosofo>"),
        }
    }
}

/// A value paired with what it needs to print in Scheme syntax.
pub struct Printed<'a> {
    value: &'a Value,
    interner: &'a Interner,
    units_per_inch: i64,
}

impl Printed<'_> {
    fn with<'b>(&'b self, value: &'b Value) -> Printed<'b> {
        Printed {
            value,
            interner: self.interner,
            units_per_inch: self.units_per_inch,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn write_points(&self, f: &mut fmt::Formatter<'_>, value: f64, dim: i32) -> fmt::Result {
        let scale = 72.0 / self.units_per_inch as f64;
        let points = value * scale.powi(dim);
        if points.fract() == 0.0 && points.abs() < 1e15 {
            write!(f, "{points:.0}pt")?;
        } else {
            write!(f, "{points}pt")?;
        }
        if dim != 1 {
            write!(f, "{dim}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Printed<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Length(n) => self.write_points(f, *n as f64, 1),
            Value::Quantity(v, dim) => self.write_points(f, *v, *dim),
            Value::UnresolvedQuantity(q) => {
                write!(f, "{}{}", q.magnitude.to_f64(), self.interner.resolve(q.unit))
            }
            Value::Char(' ') => write!(f, "#\\space"),
            Value::Char('\n') => write!(f, "#\\newline"),
            Value::Char('\t') => write!(f, "#\\tab"),
            Value::Char(c) => write!(f, "#\\{c}"),
            Value::Symbol(id) => write!(f, "{}", self.interner.resolve(*id)),
            Value::Keyword(id) => write!(f, "{}:", self.interner.resolve(*id)),
            Value::Pair(_) => {
                write!(f, "(")?;
                let mut cursor = self.value;
                let mut first = true;
                loop {
                    match cursor {
                        Value::Pair(p) => {
                            if !first {
                                write!(f, " ")?;
                            }
                            write!(f, "{}", self.with(&p.car))?;
                            first = false;
                            cursor = &p.cdr;
                        }
                        Value::Nil => break,
                        tail => {
                            write!(f, " . {}", self.with(tail))?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Vector(v) => {
                write!(f, "#(")?;
                for (i, element) in v.elements().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", self.with(element))?;
                }
                write!(f, ")")
            }
            Value::Function(func) => match func.primitive_name() {
                Some(name) => write!(f, "#<procedure {name}>"),
                None => write!(f, "#<{}>", func.name()),
            },
            other => write!(f, "{other:?}"),
        }
    }
}
