//! Styles and flow-object specifications.
//!
//! These are the values `style` and `make` produce. Formatting them is the
//! job of a backend; here they are plain data.

use std::rc::Rc;

use dsssl_foundation::SymbolId;

use crate::value::Value;

/// Characteristics inherited down the flow-object tree, with the source of
/// their initial values.
pub const INHERITED_CHARACTERISTICS: &[(&str, &str)] = &[
    ("font-size", "10pt"),
    ("font-family-name", "\"iso-serif\""),
    ("font-weight", "'medium"),
    ("font-posture", "'upright"),
    ("line-spacing", "12pt"),
    ("quadding", "'start"),
    ("start-indent", "0pt"),
    ("end-indent", "0pt"),
    ("first-line-start-indent", "0pt"),
    ("color", "#f"),
    ("language", "#f"),
    ("writing-mode", "'left-to-right"),
];

/// Characteristics that only apply to the flow object they are given on.
pub const NON_INHERITED_CHARACTERISTICS: &[&str] = &[
    "label",
    "space-before",
    "space-after",
    "keep-with-next?",
    "keep-with-previous?",
    "break-before",
    "break-after",
    "page-width",
    "page-height",
    "char",
];

/// Flow-object classes `make` accepts.
pub const FLOW_OBJECT_CLASSES: &[&str] = &[
    "sequence",
    "display-group",
    "simple-page-sequence",
    "paragraph",
    "paragraph-break",
    "line-field",
    "sideline",
    "character",
    "leader",
    "link",
    "score",
    "box",
    "rule",
    "external-graphic",
    "table",
    "table-row",
    "table-cell",
];

/// A set of characteristic values, optionally layered over another style.
#[derive(Debug, Default)]
pub struct Style {
    /// Characteristic name and value, in source order.
    pub characteristics: Vec<(SymbolId, Value)>,
    /// Style given with `use:`.
    pub parent: Option<Rc<Style>>,
}

impl Style {
    /// Looks up a characteristic, falling back to the `use:` chain.
    #[must_use]
    pub fn get(&self, name: SymbolId) -> Option<&Value> {
        self.characteristics
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(name)))
    }
}

/// A made flow object.
#[derive(Debug)]
pub struct FlowObject {
    /// Flow-object class name.
    pub class: SymbolId,
    /// Characteristics given directly on `make`.
    pub characteristics: Vec<(SymbolId, Value)>,
    /// Style given with `use:`.
    pub style: Option<Rc<Style>>,
    /// Processing mode in effect when the object was made.
    pub mode: Option<SymbolId>,
    /// Content.
    pub content: Vec<Rc<Sosofo>>,
}

impl FlowObject {
    /// Looks up a characteristic given on the object or its style.
    #[must_use]
    pub fn characteristic(&self, name: SymbolId) -> Option<&Value> {
        self.characteristics
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .or_else(|| self.style.as_ref().and_then(|s| s.get(name)))
    }
}

/// Specification of a sequence of flow objects.
#[derive(Debug)]
pub enum Sosofo {
    /// Produces nothing.
    Empty,
    /// Character data.
    Literal(Rc<str>),
    /// Concatenation.
    Append(Vec<Rc<Sosofo>>),
    /// A single flow object.
    FlowObject(FlowObject),
}

impl Sosofo {
    /// Concatenates sosofos, dropping empties and flattening nested appends.
    #[must_use]
    pub fn append(parts: Vec<Rc<Sosofo>>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match &*part {
                Self::Empty => {}
                Self::Append(inner) => flat.extend(inner.iter().cloned()),
                _ => flat.push(part),
            }
        }
        if flat.is_empty() {
            Self::Empty
        } else {
            Self::Append(flat)
        }
    }

    /// Text content in document order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Empty => {}
            Self::Literal(s) => out.push_str(s),
            Self::Append(parts) => parts.iter().for_each(|p| p.collect_text(out)),
            Self::FlowObject(fo) => fo.content.iter().for_each(|p| p.collect_text(out)),
        }
    }
}
