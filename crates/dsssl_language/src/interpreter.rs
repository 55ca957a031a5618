//! The interpreter context: options, top-level tables and the message sink.
//!
//! Everything the compiler and VM consult outside an expression lives
//! here: the symbol table, top-level identifiers, units, inherited
//! characteristics, flow-object classes and processing modes.
//!
//! Top-level definitions are deferred. [`Interpreter::load`] registers
//! every definition in a source text before evaluating anything, and each
//! definition is compiled and evaluated the first time something needs its
//! value (or earlier, during optimization, if it can be evaluated
//! without forcing anything else).

use std::collections::{HashMap, HashSet};
use std::fmt;

use dsssl_foundation::{
    DEFAULT_UNITS_PER_INCH, Error, Interner, Location, Number, Result, SymbolId, unit_length,
};
use tracing::{debug, trace};

use crate::analyzer::Analyzer;
use crate::diagnostic::{Diagnostic, Messenger, Report, Severity, TracingMessenger};
use crate::environment::Environment;
use crate::expression::Expression;
use crate::flow::{FLOW_OBJECT_CLASSES, INHERITED_CHARACTERISTICS, NON_INHERITED_CHARACTERISTICS};
use crate::insn::InsnPtr;
use crate::parser;
use crate::primitive;
use crate::value::{UnresolvedQuantity, Value};
use crate::vm::Vm;

/// Interpreter settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// Disable tail calls and report stack traces on errors.
    pub debug: bool,
    /// Accept DSSSL2 extensions: the `pc` unit, and `cond`/`case` without a
    /// matching clause yield the unspecified value.
    pub dsssl2: bool,
    /// Internal length units per inch.
    pub units_per_inch: i64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            debug: false,
            dsssl2: false,
            units_per_inch: DEFAULT_UNITS_PER_INCH,
        }
    }
}

/// A top-level identifier.
#[derive(Default)]
struct Identifier {
    definition: Option<Expression>,
    location: Location,
    user_defined: bool,
    insn: Option<InsnPtr>,
    value: Option<Value>,
    builtin: Option<Value>,
    being_computed: bool,
}

impl Identifier {
    const fn is_defined(&self) -> bool {
        self.user_defined || self.builtin.is_some()
    }

    const fn is_evaluated(&self) -> bool {
        self.value.is_some() || (!self.user_defined && self.builtin.is_some())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum UnitState {
    NotComputed,
    BeingComputed,
    Computed(Number),
    Failed,
}

/// A unit of measure usable in quantity literals.
struct Unit {
    definition: Option<Expression>,
    location: Location,
    insn: Option<InsnPtr>,
    state: UnitState,
}

/// Outcome of asking for a unit's value.
enum UnitValue {
    Known(Number),
    Failed,
    Pending,
    Undefined,
}

/// Outcome of resolving the quantities inside a value.
enum Resolution {
    Unchanged,
    Resolved(Value),
    Pending,
    Failed,
}

/// A built-in inherited characteristic.
struct Characteristic {
    /// Source text of the built-in initial value.
    source: &'static str,
    declared: Option<Expression>,
    declared_at: Location,
    value: Option<Value>,
}

/// Compilation and evaluation context.
pub struct Interpreter {
    options: Options,
    interner: Interner,
    identifiers: HashMap<SymbolId, Identifier>,
    units: HashMap<SymbolId, Unit>,
    inherited: HashMap<SymbolId, Characteristic>,
    non_inherited: HashSet<SymbolId>,
    flow_object_classes: HashSet<SymbolId>,
    modes: HashSet<SymbolId>,
    messenger: Box<dyn Messenger>,
    next_location: Location,
    error_count: usize,
    first_error: Option<String>,
    vm_count: u64,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("options", &self.options)
            .field("identifiers", &self.identifiers.len())
            .field("units", &self.units.len())
            .field("error_count", &self.error_count)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Creates an interpreter with default options and the built-in
    /// procedures, units and characteristics installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates an interpreter with the given options.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        let mut interp = Self {
            options,
            interner: Interner::new(),
            identifiers: HashMap::new(),
            units: HashMap::new(),
            inherited: HashMap::new(),
            non_inherited: HashSet::new(),
            flow_object_classes: HashSet::new(),
            modes: HashSet::new(),
            messenger: Box::new(TracingMessenger),
            next_location: Location::default(),
            error_count: 0,
            first_error: None,
            vm_count: 0,
        };
        interp.install_units();
        interp.install_characteristics();
        primitive::install(&mut interp);
        interp
    }

    fn install_units(&mut self) {
        let mut units = vec![
            ("in", 1, 1),
            ("cm", 100, 254),
            ("mm", 10, 254),
            ("m", 1000, 254),
            ("pt", 1, 72),
            ("pica", 1, 6),
        ];
        if self.options.dsssl2 {
            units.push(("pc", 1, 6));
        }
        for (name, numer, denom) in units {
            let name = self.interner.intern(name);
            let length = unit_length(numer, denom, self.options.units_per_inch);
            self.units.insert(
                name,
                Unit {
                    definition: None,
                    location: Location::default(),
                    insn: None,
                    state: UnitState::Computed(length),
                },
            );
        }
    }

    fn install_characteristics(&mut self) {
        for &(name, source) in INHERITED_CHARACTERISTICS {
            let name = self.interner.intern(name);
            self.inherited.insert(
                name,
                Characteristic {
                    source,
                    declared: None,
                    declared_at: Location::default(),
                    value: None,
                },
            );
        }
        for name in NON_INHERITED_CHARACTERISTICS {
            let name = self.interner.intern(name);
            self.non_inherited.insert(name);
        }
        for name in FLOW_OBJECT_CLASSES {
            let name = self.interner.intern(name);
            self.flow_object_classes.insert(name);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current options.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Symbol table.
    #[must_use]
    pub const fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Interns `name`.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.interner.intern(name)
    }

    /// Name of an interned symbol.
    #[must_use]
    pub fn name(&self, id: SymbolId) -> &str {
        self.interner.resolve(id)
    }

    /// Prints `value` in Scheme syntax.
    #[must_use]
    pub fn print(&self, value: &Value) -> String {
        value
            .display(&self.interner, self.options.units_per_inch)
            .to_string()
    }

    /// A fresh id for a new VM.
    pub fn next_vm_id(&mut self) -> u64 {
        self.vm_count += 1;
        self.vm_count
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Replaces the message sink.
    pub fn set_messenger(&mut self, messenger: Box<dyn Messenger>) {
        self.messenger = messenger;
    }

    /// Sets the location the next [`message`](Self::message) is reported at.
    pub fn set_next_location(&mut self, location: Location) {
        self.next_location = location;
    }

    /// Reports `diagnostic` at the location set last.
    pub fn message(&mut self, diagnostic: Diagnostic) {
        self.report_at(self.next_location, diagnostic);
    }

    /// Reports `diagnostic` at `location`.
    pub fn report_at(&mut self, location: Location, diagnostic: Diagnostic) {
        if diagnostic.severity() == Severity::Error {
            self.error_count += 1;
            if self.first_error.is_none() {
                self.first_error = Some(diagnostic.to_string());
            }
        }
        self.messenger.report(Report {
            location,
            diagnostic,
        });
    }

    /// Number of error diagnostics reported so far.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.error_count
    }

    // =========================================================================
    // Loading and evaluating
    // =========================================================================

    /// Loads source text.
    ///
    /// Definitions are registered first; the remaining forms are then
    /// compiled and evaluated in order. Returns the value of the last one,
    /// or the unspecified value if there is none.
    ///
    /// # Errors
    /// Returns an error if the text cannot be read or a form is malformed.
    pub fn load(&mut self, source: &str) -> Result<Value> {
        let forms = parser::parse(source)?;
        let mut expressions = Vec::new();
        for form in &forms {
            if let Some(expr) = Analyzer::new(self).top_level(form)? {
                expressions.push(expr);
            }
        }
        let mut result = Value::Unspecified;
        for mut expr in expressions {
            trace!(line = expr.location.line, "compiling top-level form");
            let insn = expr.optimize_compile(self, &Environment::new(), 0, None);
            result = Vm::new(self).eval(&insn, None, None);
        }
        Ok(result)
    }

    /// Loads source text and fails if the result is the error value.
    ///
    /// # Errors
    /// Returns an error if loading fails or the last form evaluates to the
    /// error value; the message is that of the first error reported.
    pub fn eval_str(&mut self, source: &str) -> Result<Value> {
        let errors_before = self.error_count;
        let value = self.load(source)?;
        if value.is_error() {
            let message = if self.error_count > errors_before {
                self.first_error.clone()
            } else {
                None
            };
            return Err(Error::evaluation(
                message.unwrap_or_else(|| "evaluation failed".to_string()),
            ));
        }
        Ok(value)
    }

    /// Registers the definitions in `source` and compiles its last
    /// expression without evaluating it.
    ///
    /// # Errors
    /// Returns an error if the text cannot be read, a form is malformed, or
    /// there is no expression to compile.
    pub fn compile(&mut self, source: &str) -> Result<InsnPtr> {
        let forms = parser::parse(source)?;
        let mut last = None;
        for form in &forms {
            if let Some(expr) = Analyzer::new(self).top_level(form)? {
                last = Some(expr);
            }
        }
        let mut expr = last.ok_or_else(|| Error::invalid_argument("no expression to compile"))?;
        Ok(expr.optimize_compile(self, &Environment::new(), 0, None))
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// Binds a built-in value to `name`. User definitions take precedence.
    pub fn define_builtin(&mut self, name: &str, value: Value) {
        let id = self.interner.intern(name);
        self.identifiers.entry(id).or_default().builtin = Some(value);
    }

    /// Records a top-level definition.
    ///
    /// A second user definition of the same name is reported and ignored.
    pub fn define(&mut self, name: SymbolId, definition: Expression, location: Location) {
        let ident = self.identifiers.entry(name).or_default();
        if ident.user_defined {
            let text = self.interner.resolve(name).to_string();
            self.report_at(location, Diagnostic::DuplicateDefinition(text));
            return;
        }
        ident.user_defined = true;
        ident.definition = Some(definition);
        ident.location = location;
        ident.value = None;
        ident.insn = None;
        debug!(name = self.interner.resolve(name), "defined");
    }

    /// Returns true if `name` has a user or built-in definition.
    #[must_use]
    pub fn is_defined(&self, name: SymbolId) -> bool {
        self.identifiers.get(&name).is_some_and(Identifier::is_defined)
    }

    /// Returns true if the value of `name` is already known.
    #[must_use]
    pub fn is_evaluated(&self, name: SymbolId) -> bool {
        self.identifiers.get(&name).is_some_and(Identifier::is_evaluated)
    }

    /// Value of a top-level identifier, computing it if needed.
    ///
    /// Without `force` the definition is only evaluated if that cannot
    /// depend on anything not yet known; `None` means it was not. With
    /// `force` it is always evaluated, and a definition that needs its own
    /// value is reported and yields [`Value::Error`].
    pub fn compute_value(&mut self, name: SymbolId, force: bool) -> Option<Value> {
        let ident = self.identifiers.get_mut(&name)?;
        if let Some(value) = &ident.value {
            return Some(value.clone());
        }
        if ident.being_computed {
            if !force {
                return None;
            }
            ident.value = Some(Value::Error);
            let location = ident.location;
            let text = self.interner.resolve(name).to_string();
            self.report_at(location, Diagnostic::IdentifierLoop(text));
            return Some(Value::Error);
        }
        let Some(mut definition) = ident.definition.take() else {
            return ident.builtin.clone();
        };
        ident.being_computed = true;
        let cached = ident.insn.take();
        debug!(name = self.interner.resolve(name), force, "computing value");

        let insn = cached.unwrap_or_else(|| definition.optimize_compile(self, &Environment::new(), 0, None));
        let value = (force || definition.can_eval(self, false)).then(|| {
            let value = Vm::new(self).eval(&insn, None, None);
            value.make_read_only();
            value
        });

        let ident = self.identifiers.get_mut(&name)?;
        ident.definition = Some(definition);
        ident.insn = Some(insn);
        ident.being_computed = false;
        if ident.value.is_none() {
            ident.value = value;
        }
        ident.value.clone()
    }

    // =========================================================================
    // Units and quantities
    // =========================================================================

    /// Records a unit definition.
    pub fn define_unit(&mut self, name: SymbolId, definition: Expression, location: Location) {
        if self.units.contains_key(&name) {
            let text = self.interner.resolve(name).to_string();
            self.report_at(location, Diagnostic::DuplicateDefinition(text));
            return;
        }
        debug!(unit = self.interner.resolve(name), "defined unit");
        self.units.insert(
            name,
            Unit {
                definition: Some(definition),
                location,
                insn: None,
                state: UnitState::NotComputed,
            },
        );
    }

    fn unit_value(&mut self, name: SymbolId, force: bool) -> UnitValue {
        let Some(unit) = self.units.get_mut(&name) else {
            return UnitValue::Undefined;
        };
        match unit.state {
            UnitState::Computed(n) => return UnitValue::Known(n),
            UnitState::Failed => return UnitValue::Failed,
            UnitState::BeingComputed => {
                unit.state = UnitState::Failed;
                let location = unit.location;
                let text = self.interner.resolve(name).to_string();
                self.report_at(location, Diagnostic::UnitLoop(text));
                return UnitValue::Failed;
            }
            UnitState::NotComputed => {}
        }
        let Some(mut definition) = unit.definition.take() else {
            unit.state = UnitState::Failed;
            return UnitValue::Failed;
        };
        unit.state = UnitState::BeingComputed;
        let cached = unit.insn.take();
        let location = unit.location;
        debug!(unit = self.interner.resolve(name), force, "computing unit");

        let insn = cached.unwrap_or_else(|| definition.optimize_compile(self, &Environment::new(), 0, None));
        let state = if force || definition.can_eval(self, false) {
            match Vm::new(self).eval(&insn, None, None) {
                Value::Length(n) => UnitState::Computed(Number::Length(n)),
                Value::Quantity(value, dim) => UnitState::Computed(Number::inexact(value, dim)),
                Value::Error => UnitState::Failed,
                _ => {
                    let text = self.interner.resolve(name).to_string();
                    self.report_at(location, Diagnostic::BadUnitDefinition(text));
                    UnitState::Failed
                }
            }
        } else {
            UnitState::NotComputed
        };

        let Some(unit) = self.units.get_mut(&name) else {
            return UnitValue::Failed;
        };
        unit.definition = Some(definition);
        unit.insn = Some(insn);
        if unit.state == UnitState::BeingComputed {
            unit.state = state;
        }
        match unit.state {
            UnitState::Computed(n) => UnitValue::Known(n),
            UnitState::Failed => UnitValue::Failed,
            UnitState::NotComputed | UnitState::BeingComputed => UnitValue::Pending,
        }
    }

    fn resolve_quantity(&mut self, quantity: &UnresolvedQuantity, force: bool, location: Location) -> Resolution {
        match self.unit_value(quantity.unit, force) {
            UnitValue::Known(unit) => {
                Resolution::Resolved(Value::from_number(Number::scale_literal(quantity.magnitude, unit)))
            }
            UnitValue::Failed => Resolution::Failed,
            UnitValue::Pending => Resolution::Pending,
            UnitValue::Undefined if force => {
                let text = self.interner.resolve(quantity.unit).to_string();
                self.report_at(location, Diagnostic::UndefinedQuantity(text));
                Resolution::Failed
            }
            UnitValue::Undefined => Resolution::Pending,
        }
    }

    fn resolve(&mut self, value: &Value, force: bool, location: Location) -> Resolution {
        match value {
            Value::UnresolvedQuantity(quantity) => self.resolve_quantity(quantity, force, location),
            Value::Pair(_) => {
                let mut items = Vec::new();
                let mut changed = false;
                let mut cursor = value;
                while let Value::Pair(pair) = cursor {
                    match self.resolve(&pair.car, force, location) {
                        Resolution::Unchanged => items.push(pair.car.clone()),
                        Resolution::Resolved(v) => {
                            changed = true;
                            items.push(v);
                        }
                        other => return other,
                    }
                    cursor = &pair.cdr;
                }
                let tail = match self.resolve(cursor, force, location) {
                    Resolution::Unchanged => cursor.clone(),
                    Resolution::Resolved(v) => {
                        changed = true;
                        v
                    }
                    other => return other,
                };
                if changed {
                    Resolution::Resolved(Value::list_with_tail(items, tail))
                } else {
                    Resolution::Unchanged
                }
            }
            Value::Vector(vector) => {
                let elements = vector.elements().clone();
                let mut changed = false;
                let mut resolved = Vec::with_capacity(elements.len());
                for element in &elements {
                    match self.resolve(element, force, location) {
                        Resolution::Unchanged => resolved.push(element.clone()),
                        Resolution::Resolved(v) => {
                            changed = true;
                            resolved.push(v);
                        }
                        other => return other,
                    }
                }
                if changed {
                    Resolution::Resolved(Value::vector(resolved))
                } else {
                    Resolution::Unchanged
                }
            }
            _ => Resolution::Unchanged,
        }
    }

    /// Replaces unresolved quantities in `value`, including inside lists
    /// and vectors.
    ///
    /// Returns `None` if a unit is not known yet and `force` is not set.
    /// With `force`, an undefined unit is reported and the result is
    /// [`Value::Error`].
    pub fn resolve_quantities(&mut self, value: &Value, force: bool, location: Location) -> Option<Value> {
        match self.resolve(value, force, location) {
            Resolution::Unchanged => Some(value.clone()),
            Resolution::Resolved(v) => Some(v),
            Resolution::Pending => None,
            Resolution::Failed => Some(Value::Error),
        }
    }

    // =========================================================================
    // Characteristics, flow objects and modes
    // =========================================================================

    /// Returns true for built-in inherited characteristics.
    #[must_use]
    pub fn is_inherited_characteristic(&self, name: SymbolId) -> bool {
        self.inherited.contains_key(&name)
    }

    /// Returns true for any characteristic `make` accepts.
    #[must_use]
    pub fn is_characteristic(&self, name: SymbolId) -> bool {
        self.is_inherited_characteristic(name) || self.non_inherited.contains(&name)
    }

    /// Returns true for known flow-object classes.
    #[must_use]
    pub fn is_flow_object_class(&self, name: SymbolId) -> bool {
        self.flow_object_classes.contains(&name)
    }

    /// Declares a processing mode.
    pub fn declare_mode(&mut self, name: SymbolId) {
        self.modes.insert(name);
    }

    /// Returns true if `name` was declared as a processing mode.
    #[must_use]
    pub fn is_mode(&self, name: SymbolId) -> bool {
        self.modes.contains(&name)
    }

    /// Overrides the initial value of an inherited characteristic.
    pub fn declare_initial_value(&mut self, name: SymbolId, expr: Expression, location: Location) {
        let text = self.interner.resolve(name).to_string();
        let Some(characteristic) = self.inherited.get_mut(&name) else {
            self.report_at(location, Diagnostic::NotABuiltinInheritedC(text));
            return;
        };
        if characteristic.declared.is_some() {
            self.report_at(location, Diagnostic::DuplicateInitialValue(text));
            return;
        }
        characteristic.declared = Some(expr);
        characteristic.declared_at = location;
        characteristic.value = None;
    }

    /// Initial value of an inherited characteristic.
    ///
    /// Evaluated on first request, from the declared expression if there
    /// is one and the built-in default otherwise.
    ///
    /// # Errors
    /// Returns an error if the built-in default cannot be read.
    pub fn initial_value(&mut self, name: SymbolId) -> Result<Option<Value>> {
        let Some(characteristic) = self.inherited.get_mut(&name) else {
            return Ok(None);
        };
        if let Some(value) = &characteristic.value {
            return Ok(Some(value.clone()));
        }
        let source = characteristic.source;
        let location = characteristic.declared_at;
        let declared = characteristic.declared.is_some();
        let mut expr = match characteristic.declared.take() {
            Some(expr) => expr,
            None => {
                let form = parser::parse_one(source)?;
                Analyzer::new(self).expression(&form)?
            }
        };
        self.set_next_location(location);
        let insn = expr.optimize_compile(self, &Environment::new(), 0, None);
        let value = Vm::new(self).eval(&insn, None, None);
        value.make_read_only();
        if let Some(characteristic) = self.inherited.get_mut(&name) {
            if declared {
                characteristic.declared = Some(expr);
            }
            characteristic.value = Some(value.clone());
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::CollectingMessenger;

    fn collecting() -> (Interpreter, CollectingMessenger) {
        let mut interp = Interpreter::new();
        let messenger = CollectingMessenger::new();
        interp.set_messenger(Box::new(messenger.clone()));
        (interp, messenger)
    }

    #[test]
    fn definitions_are_registered_before_evaluation() {
        let mut interp = Interpreter::new();
        let value = interp.eval_str("(f 20) (define (f x) (+ x y)) (define y 22)").unwrap();
        assert!(matches!(value, Value::Integer(42)));
    }

    #[test]
    fn duplicate_definition_keeps_first() {
        let (mut interp, messenger) = collecting();
        let value = interp.eval_str("(define x 1) (define x 2) x").unwrap();
        assert!(matches!(value, Value::Integer(1)));
        assert_eq!(messenger.diagnostics(), vec![Diagnostic::DuplicateDefinition("x".into())]);
    }

    #[test]
    fn builtins_can_be_overridden() {
        let mut interp = Interpreter::new();
        let value = interp.eval_str("(define (car x) 'mine) (car '(1))").unwrap();
        assert_eq!(interp.print(&value), "mine");
    }

    #[test]
    fn identifier_loop_is_reported() {
        let (mut interp, messenger) = collecting();
        assert!(interp.eval_str("(define a b) (define b a) a").is_err());
        assert!(
            messenger
                .diagnostics()
                .iter()
                .any(|d| matches!(d, Diagnostic::IdentifierLoop(_)))
        );
    }

    #[test]
    fn definition_values_are_read_only() {
        let (mut interp, messenger) = collecting();
        assert!(interp.eval_str("(define v (vector 1 2)) (vector-set! v 0 9)").is_err());
        assert_eq!(messenger.diagnostics(), vec![Diagnostic::ReadOnly]);
    }

    #[test]
    fn builtin_units_are_exact() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.eval_str("12pt").unwrap(), Value::Length(12_000)));
        assert!(matches!(interp.eval_str("1in").unwrap(), Value::Length(72_000)));
        assert!(matches!(interp.eval_str("1.5pica").unwrap(), Value::Length(18_000)));
        assert!(matches!(interp.eval_str("1cm").unwrap(), Value::Quantity(..)));
    }

    #[test]
    fn pc_unit_needs_dsssl2() {
        let (mut interp, messenger) = collecting();
        assert!(interp.eval_str("2pc").is_err());
        assert_eq!(messenger.diagnostics(), vec![Diagnostic::UndefinedQuantity("pc".into())]);

        let mut interp = Interpreter::with_options(Options {
            dsssl2: true,
            ..Options::default()
        });
        assert!(matches!(interp.eval_str("2pc").unwrap(), Value::Length(24_000)));
    }

    #[test]
    fn user_units_resolve_lazily() {
        let mut interp = Interpreter::new();
        let value = interp.eval_str("(define-unit em 10pt) 2em").unwrap();
        assert!(matches!(value, Value::Length(20_000)));
        let value = interp.eval_str("'(1em #(2em))").unwrap();
        assert_eq!(interp.print(&value), "(10pt #(20pt))");
    }

    #[test]
    fn unit_loop_is_reported() {
        let (mut interp, messenger) = collecting();
        assert!(interp.eval_str("(define-unit foo 2foo) 1foo").is_err());
        assert!(
            messenger
                .diagnostics()
                .iter()
                .any(|d| matches!(d, Diagnostic::UnitLoop(_)))
        );
    }

    #[test]
    fn bad_unit_definition_is_reported() {
        let (mut interp, messenger) = collecting();
        assert!(interp.eval_str("(define-unit foo 'x) 1foo").is_err());
        assert_eq!(messenger.diagnostics(), vec![Diagnostic::BadUnitDefinition("foo".into())]);
    }

    #[test]
    fn initial_values_default_and_override() {
        let mut interp = Interpreter::new();
        let size = interp.intern("font-size");
        assert!(matches!(interp.initial_value(size).unwrap(), Some(Value::Length(10_000))));

        let mut interp = Interpreter::new();
        interp.load("(declare-initial-value font-size 14pt)").unwrap();
        let size = interp.intern("font-size");
        assert!(matches!(interp.initial_value(size).unwrap(), Some(Value::Length(14_000))));
    }

    #[test]
    fn initial_value_declarations_are_checked() {
        let (mut interp, messenger) = collecting();
        interp
            .load("(declare-initial-value font-size 1pt) (declare-initial-value font-size 2pt) (declare-initial-value page-width 1in)")
            .unwrap();
        assert_eq!(
            messenger.diagnostics(),
            vec![
                Diagnostic::DuplicateInitialValue("font-size".into()),
                Diagnostic::NotABuiltinInheritedC("page-width".into()),
            ]
        );
        let size = interp.intern("font-size");
        assert!(matches!(interp.initial_value(size).unwrap(), Some(Value::Length(1000))));
    }

    #[test]
    fn errors_are_counted() {
        let (mut interp, _messenger) = collecting();
        assert_eq!(interp.error_count(), 0);
        let err = interp.eval_str("(car 1)").unwrap_err();
        assert_eq!(interp.error_count(), 1);
        assert!(err.to_string().contains("car"));
    }
}
