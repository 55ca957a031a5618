//! Diagnostics reported while compiling and evaluating.
//!
//! The compiler and VM never format text for users. They pick a
//! [`Diagnostic`], pair it with the location set by
//! [`Interpreter::set_next_location`](crate::Interpreter::set_next_location),
//! and hand the [`Report`] to a [`Messenger`].

use std::cell::RefCell;
use std::rc::Rc;

use dsssl_foundation::Location;
use thiserror::Error;

/// How serious a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Context for another diagnostic.
    Info,
    /// Reported; evaluation carries on with a fallback.
    Warning,
    /// Evaluation of the current expression failed.
    Error,
}

/// One message kind with its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Reference to an identifier with no definition.
    #[error("reference to undefined variable `{0}`")]
    UndefinedVariableReference(String),
    /// More arguments than the procedure accepts; the excess is dropped.
    #[error("too many arguments for procedure")]
    TooManyArgs,
    /// Fewer arguments than the procedure requires.
    #[error("missing argument for procedure")]
    MissingArg,
    /// Keyword arguments did not come in pairs; they are dropped.
    #[error("odd number of keyword/value arguments")]
    OddKeyArgs,
    /// A keyword argument position held a non-keyword.
    #[error("keyword argument expected")]
    KeyArgsNotKey,
    /// A keyword the procedure does not accept.
    #[error("`{0}` is not a valid keyword argument for this procedure")]
    InvalidKeyArg(String),
    /// Call of a value that is not a procedure.
    #[error("call of non-function object `{0}`")]
    CallNonFunction(String),
    /// `apply` or a primitive needed a procedure.
    #[error("argument {position} to `{procedure}` is not a procedure")]
    NotAProcedure {
        /// Primitive name.
        procedure: String,
        /// 1-based argument position.
        position: usize,
    },
    /// `apply` needed a proper list.
    #[error("argument {position} to `{procedure}` is not a list")]
    NotAList {
        /// Primitive name.
        procedure: String,
        /// 1-based argument position.
        position: usize,
    },
    /// `,@` applied to a non-list.
    #[error("unquote-splicing of a non-list")]
    SpliceNotList,
    /// Mutation of a read-only value.
    #[error("attempt to modify a read-only object")]
    ReadOnly,
    /// No `case` clause matched and there was no `else`.
    #[error("no clause in case expression matched `{0}`")]
    CaseFail(String),
    /// No `cond` clause matched and there was no `else`.
    #[error("no clause in cond expression matched")]
    CondFail,
    /// A `case` datum used a unit that could not be resolved.
    #[error("case datum contains unresolved quantities")]
    CaseUnresolvedQuantities,
    /// A continuation was invoked after its activation returned.
    #[error("continuation invoked after its activation returned")]
    ContinuationDead,
    /// A `letrec` variable was read before its initializer finished.
    #[error("variable `{0}` used before it was initialized")]
    UninitializedVariableReference(String),
    /// `set!` of a top-level definition.
    #[error("assignment to top-level variable `{0}`")]
    TopLevelAssignment(String),
    /// A definition depends on its own value.
    #[error("identifier `{0}` is defined in terms of itself")]
    IdentifierLoop(String),
    /// A unit definition depends on its own value.
    #[error("unit `{0}` is defined in terms of itself")]
    UnitLoop(String),
    /// A unit definition did not evaluate to a length or quantity.
    #[error("invalid value for unit `{0}`")]
    BadUnitDefinition(String),
    /// A quantity literal used an undefined unit.
    #[error("quantity uses undefined unit `{0}`")]
    UndefinedQuantity(String),
    /// A top-level identifier was defined twice; the first wins.
    #[error("`{0}` is already defined")]
    DuplicateDefinition(String),
    /// An initial value was declared twice; the first wins.
    #[error("initial value for `{0}` is already declared")]
    DuplicateInitialValue(String),
    /// `declare-initial-value` of something that is not an inherited characteristic.
    #[error("`{0}` is not a built-in inherited characteristic")]
    NotABuiltinInheritedC(String),
    /// `with-mode` named a mode that was never declared.
    #[error("undefined processing mode `{0}`")]
    UndefinedMode(String),
    /// A `style` keyword that is not an inherited characteristic.
    #[error("`{0}` is not a valid style keyword")]
    InvalidStyleKeyword(String),
    /// A `make` keyword that is not a characteristic.
    #[error("`{0}` is not a valid characteristic for make")]
    InvalidMakeKeyword(String),
    /// `make` of an unknown flow-object class; `sequence` is used instead.
    #[error("unknown flow object class `{0}`")]
    UnknownFlowObjectClass(String),
    /// A `use:` value that is not a style.
    #[error("value used as a style is not a style object")]
    StyleContext,
    /// Flow-object content that is not a sosofo.
    #[error("flow object content is not a sosofo")]
    SosofoContext,
    /// A primitive procedure signalled an error.
    #[error("{procedure}: {message}")]
    PrimitiveFailed {
        /// Primitive name.
        procedure: String,
        /// Error text.
        message: String,
    },
    /// One active call in a debug-mode stack trace.
    #[error("called from here")]
    StackTrace,
    /// Elided part of a debug-mode stack trace.
    #[error("called from here ({0} more calls omitted)")]
    StackTraceEllipsis(usize),
}

impl Diagnostic {
    /// Severity of this diagnostic.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::StackTrace | Self::StackTraceEllipsis(_) => Severity::Info,
            Self::TooManyArgs
            | Self::OddKeyArgs
            | Self::KeyArgsNotKey
            | Self::InvalidKeyArg(_)
            | Self::CaseUnresolvedQuantities
            | Self::DuplicateDefinition(_)
            | Self::DuplicateInitialValue(_)
            | Self::UndefinedMode(_)
            | Self::InvalidStyleKeyword(_)
            | Self::InvalidMakeKeyword(_)
            | Self::UnknownFlowObjectClass(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A diagnostic and where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Source position.
    pub location: Location,
    /// What happened.
    pub diagnostic: Diagnostic,
}

impl Report {
    /// Severity of the diagnostic.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.diagnostic.severity()
    }
}

/// Sink for diagnostics.
pub trait Messenger {
    /// Receives one report.
    fn report(&mut self, report: Report);
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default)]
pub struct TracingMessenger;

impl Messenger for TracingMessenger {
    fn report(&mut self, report: Report) {
        let Report {
            location,
            diagnostic,
        } = report;
        match diagnostic.severity() {
            Severity::Error => tracing::error!(
                line = location.line,
                column = location.column,
                "{diagnostic}"
            ),
            Severity::Warning => tracing::warn!(
                line = location.line,
                column = location.column,
                "{diagnostic}"
            ),
            Severity::Info => tracing::info!(
                line = location.line,
                column = location.column,
                "{diagnostic}"
            ),
        }
    }
}

/// Keeps reports in a buffer shared with the caller.
#[derive(Debug, Default, Clone)]
pub struct CollectingMessenger {
    reports: Rc<RefCell<Vec<Report>>>,
}

impl CollectingMessenger {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected reports.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    /// Removes and returns the collected reports.
    #[must_use]
    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }

    /// Just the diagnostics, in order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reports
            .borrow()
            .iter()
            .map(|r| r.diagnostic.clone())
            .collect()
    }
}

impl Messenger for CollectingMessenger {
    fn report(&mut self, report: Report) {
        self.reports.borrow_mut().push(report);
    }
}
