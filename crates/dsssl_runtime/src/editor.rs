//! Line editor abstraction for the REPL.
//!
//! The REPL talks to a [`LineEditor`]; [`RustylineEditor`] is the terminal
//! implementation and tests substitute a scripted one.

use dsssl_foundation::{Error, Result};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::HistoryHinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Completer, Config, Context, Editor, Helper, Hinter, Validator as RLValidator};
use std::borrow::Cow;

/// Result of reading a line from the editor.
#[derive(Debug)]
pub enum ReadResult {
    /// A line was successfully read.
    Line(String),
    /// User pressed Ctrl+C.
    Interrupted,
    /// User pressed Ctrl+D (EOF).
    Eof,
}

/// Abstraction over line editing functionality.
pub trait LineEditor {
    /// Read a line with the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the terminal fails.
    fn read_line(&mut self, prompt: &str) -> Result<ReadResult>;

    /// Read a continuation line (for multi-line input).
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the terminal fails.
    fn read_continuation(&mut self, prompt: &str) -> Result<ReadResult> {
        self.read_line(prompt)
    }

    /// Add a line to history.
    fn add_history(&mut self, line: &str);

    /// Set the words offered for completion.
    fn set_keywords(&mut self, keywords: Vec<String>);
}

/// Checks whether `input` has balanced parentheses outside strings,
/// comments and character literals.
#[must_use]
pub fn is_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '#' if chars.peek() == Some(&'\\') => {
                // #\( and #\) are characters, not delimiters
                chars.next();
                chars.next();
            }
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

/// Words offered for completion before any are set explicitly.
const DEFAULT_KEYWORDS: &[&str] = &[
    // Special forms
    "quote",
    "quasiquote",
    "unquote",
    "unquote-splicing",
    "lambda",
    "if",
    "cond",
    "case",
    "and",
    "or",
    "let",
    "let*",
    "letrec",
    "begin",
    "set!",
    "define",
    "define-unit",
    "declare-initial-value",
    "declare-characteristic",
    "declare-flow-object-class",
    "mode",
    "with-mode",
    "style",
    "make",
    "else",
    "#!optional",
    "#!rest",
    "#!key",
    // Procedures
    "+",
    "-",
    "*",
    "/",
    "quotient",
    "remainder",
    "modulo",
    "abs",
    "min",
    "max",
    "=",
    "<",
    ">",
    "<=",
    ">=",
    "zero?",
    "number?",
    "integer?",
    "real?",
    "exact->inexact",
    "cons",
    "car",
    "cdr",
    "list",
    "length",
    "append",
    "reverse",
    "list-ref",
    "member",
    "memv",
    "assoc",
    "assq",
    "null?",
    "pair?",
    "list?",
    "eq?",
    "eqv?",
    "equal?",
    "not",
    "boolean?",
    "symbol?",
    "string?",
    "char?",
    "procedure?",
    "keyword?",
    "vector?",
    "string-append",
    "string-length",
    "string=?",
    "symbol->string",
    "string->symbol",
    "number->string",
    "vector",
    "make-vector",
    "vector-ref",
    "vector-set!",
    "vector-length",
    "vector->list",
    "list->vector",
    "map",
    "for-each",
    "apply",
    "call-with-current-continuation",
    "call/cc",
    "error",
    "literal",
    "empty-sosofo",
    "sosofo-append",
    "sosofo?",
    "style?",
    "current-mode",
];

/// Helper for rustyline that provides completion, hints, highlighting, and validation.
#[derive(Helper, Completer, Hinter, RLValidator)]
struct DssslHelper {
    #[rustyline(Completer)]
    completer: DssslCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    #[rustyline(Validator)]
    validator: BracketValidator,
}

impl Highlighter for DssslHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Cow::Owned(format!("\x1b[1;32m{prompt}\x1b[0m"))
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        false
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
    }
}

/// Completer for special forms, built-in procedures and file paths.
struct DssslCompleter {
    file_completer: FilenameCompleter,
    keywords: Vec<String>,
}

impl DssslCompleter {
    fn new() -> Self {
        Self {
            file_completer: FilenameCompleter::new(),
            keywords: DEFAULT_KEYWORDS.iter().map(|&kw| kw.to_string()).collect(),
        }
    }
}

impl Completer for DssslCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Inside a string, complete file paths
        if line[..pos].chars().filter(|&c| c == '"').count() % 2 == 1 {
            return self.file_completer.complete(line, pos, ctx);
        }

        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || "()'`,".contains(c))
            .map_or(0, |i| i + 1);
        let word = &line[start..pos];

        let candidates = self
            .keywords
            .iter()
            .filter(|kw| kw.starts_with(word))
            .map(|kw| Pair {
                display: kw.clone(),
                replacement: kw.clone(),
            })
            .collect();

        Ok((start, candidates))
    }
}

/// Keeps reading lines while parentheses are open.
#[derive(Default)]
struct BracketValidator;

impl Validator for BracketValidator {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if is_complete(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

/// Line editor implementation using rustyline.
pub struct RustylineEditor {
    editor: Editor<DssslHelper, DefaultHistory>,
}

impl RustylineEditor {
    /// Creates a new rustyline-based editor.
    ///
    /// # Errors
    ///
    /// Returns an error if rustyline initialization fails.
    pub fn new() -> Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .max_history_size(1000)
            .map_err(|e| Error::internal(e.to_string()))?
            .build();

        let helper = DssslHelper {
            completer: DssslCompleter::new(),
            hinter: HistoryHinter::new(),
            validator: BracketValidator,
        };

        let mut editor =
            Editor::with_config(config).map_err(|e| Error::internal(e.to_string()))?;
        editor.set_helper(Some(helper));

        Ok(Self { editor })
    }
}

impl LineEditor for RustylineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadResult> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadResult::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadResult::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadResult::Eof),
            Err(e) => Err(Error::internal(e.to_string())),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn set_keywords(&mut self, keywords: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.completer.keywords = keywords;
        }
    }
}
