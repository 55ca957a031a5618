//! The interactive read-eval-print loop.

use crate::editor::{LineEditor, ReadResult, RustylineEditor, is_complete};
use dsssl_foundation::{Error, ErrorContext, Result};
use dsssl_language::{CollectingMessenger, Interpreter, Options, Report, Severity, Value};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

const HELP: &str = "\
Enter expressions or definitions to evaluate them.
  :help         Show this message
  :load FILE    Load a stylesheet file
  :quit         Exit (Ctrl+D also works)";

/// The interactive REPL.
pub struct Repl<E: LineEditor = RustylineEditor> {
    /// The line editor for input.
    editor: E,

    /// Definitions persist across inputs.
    interp: Interpreter,

    /// Shared with `interp`; drained after every input.
    messenger: CollectingMessenger,

    /// Whether to show the welcome banner.
    show_banner: bool,

    /// Primary prompt.
    prompt: String,

    /// Continuation prompt (for multi-line input).
    continuation_prompt: String,
}

impl Repl<RustylineEditor> {
    /// Creates a new REPL with the default rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize.
    pub fn new(options: Options) -> Result<Self> {
        let editor = RustylineEditor::new()?;
        Ok(Self::with_editor(editor, options))
    }
}

impl<E: LineEditor> Repl<E> {
    /// Creates a new REPL with the given editor.
    pub fn with_editor(editor: E, options: Options) -> Self {
        let mut interp = Interpreter::with_options(options);
        let messenger = CollectingMessenger::new();
        interp.set_messenger(Box::new(messenger.clone()));
        Self {
            editor,
            interp,
            messenger,
            show_banner: true,
            prompt: "dsssl> ".to_string(),
            continuation_prompt: "  ...> ".to_string(),
        }
    }

    /// Disables the welcome banner.
    #[must_use]
    pub const fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Sets the primary prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// The interpreter holding the session's definitions.
    #[must_use]
    pub const fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// Number of error diagnostics reported so far.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.interp.error_count()
    }

    /// Runs the REPL loop.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails fatally.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            self.print_banner();
        }

        loop {
            match self.read_eval_print() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => print_error(&e),
            }
        }

        println!();
        Ok(())
    }

    /// Executes one read-eval-print iteration.
    ///
    /// Returns `Ok(true)` to continue, `Ok(false)` to exit.
    fn read_eval_print(&mut self) -> Result<bool> {
        let Some(input) = self.read_input()? else {
            return Ok(false);
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(true);
        }
        self.editor.add_history(&input);

        if let Some(command) = trimmed.strip_prefix(':') {
            return self.command(command);
        }

        let value = self.eval(&input)?;
        if let Some(text) = self.format_value(&value) {
            println!("{text}");
        }
        Ok(true)
    }

    /// Runs a `:` command. Returns `Ok(false)` to exit.
    fn command(&mut self, command: &str) -> Result<bool> {
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));
        match name {
            "q" | "quit" | "exit" => return Ok(false),
            "h" | "help" => println!("{HELP}"),
            "l" | "load" if !arg.is_empty() => {
                let value = self.eval_file(Path::new(arg))?;
                if let Some(text) = self.format_value(&value) {
                    println!("{text}");
                }
            }
            _ => eprintln!("unknown command :{command} (try :help)"),
        }
        Ok(true)
    }

    /// Reads a potentially multi-line input.
    fn read_input(&mut self) -> Result<Option<String>> {
        let mut input = String::new();
        let mut first_line = true;

        loop {
            let result = if first_line {
                self.editor.read_line(&self.prompt)?
            } else {
                self.editor.read_continuation(&self.continuation_prompt)?
            };

            match result {
                ReadResult::Line(line) => {
                    if !first_line {
                        input.push('\n');
                    }
                    input.push_str(&line);
                    if is_complete(&input) {
                        return Ok(Some(input));
                    }
                    first_line = false;
                }
                ReadResult::Interrupted => {
                    if !first_line {
                        println!("\nInput cancelled.");
                    }
                    return Ok(Some(String::new()));
                }
                ReadResult::Eof => {
                    if first_line {
                        return Ok(None);
                    }
                    return Err(Error::internal("unexpected end of input"));
                }
            }
        }
    }

    /// Loads `input` into the session and prints the diagnostics it
    /// produced. The result is the error value if evaluation failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or a form is malformed.
    pub fn eval(&mut self, input: &str) -> Result<Value> {
        let result = self.interp.load(input);
        self.print_diagnostics();
        result
    }

    /// Loads a file into the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a form is malformed.
    pub fn eval_file(&mut self, path: &Path) -> Result<Value> {
        let context = || ErrorContext::new().with_source(path.display().to_string());
        let source = fs::read_to_string(path).map_err(|e| Error::from(e).with_context(context()))?;
        tracing::info!(path = %path.display(), "loading file");
        self.eval(&source).map_err(|e| match e.context {
            Some(_) => e,
            None => e.with_context(context()),
        })
    }

    /// The printed form of a value, or `None` for results with nothing to
    /// show.
    fn format_value(&self, value: &Value) -> Option<String> {
        match value {
            Value::Unspecified | Value::Error => None,
            _ => Some(self.interp.print(value)),
        }
    }

    fn print_diagnostics(&self) {
        for report in self.messenger.take() {
            eprintln!("{}", format_report(&report));
        }
    }

    /// Prints the welcome banner.
    #[allow(clippy::unused_self)]
    fn print_banner(&self) {
        println!("DSSSL expression language v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for commands, Ctrl+D to exit.\n");
        let _ = io::stdout().flush();
    }
}

/// Renders a report as `line:col: severity: message`.
#[must_use]
pub fn format_report(report: &Report) -> String {
    let severity = match report.severity() {
        Severity::Error => "\x1b[31merror\x1b[0m",
        Severity::Warning => "\x1b[33mwarning\x1b[0m",
        Severity::Info => "note",
    };
    format!("{}: {severity}: {}", report.location, report.diagnostic)
}

/// Prints an error, and its context if any, to stderr.
pub fn print_error(error: &Error) {
    match &error.context {
        Some(context) => eprintln!("\x1b[31mError: {error}\x1b[0m {context}"),
        None => eprintln!("\x1b[31mError: {error}\x1b[0m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays scripted lines, then reports end of input.
    struct MockEditor {
        inputs: Vec<String>,
        index: usize,
        history: Vec<String>,
    }

    impl MockEditor {
        fn new(inputs: Vec<&str>) -> Self {
            Self {
                inputs: inputs.into_iter().map(String::from).collect(),
                index: 0,
                history: Vec::new(),
            }
        }
    }

    impl LineEditor for MockEditor {
        fn read_line(&mut self, _prompt: &str) -> Result<ReadResult> {
            if self.index < self.inputs.len() {
                let line = self.inputs[self.index].clone();
                self.index += 1;
                Ok(ReadResult::Line(line))
            } else {
                Ok(ReadResult::Eof)
            }
        }

        fn add_history(&mut self, line: &str) {
            self.history.push(line.to_string());
        }

        fn set_keywords(&mut self, _keywords: Vec<String>) {}
    }

    fn repl(inputs: Vec<&str>) -> Repl<MockEditor> {
        Repl::with_editor(MockEditor::new(inputs), Options::default()).without_banner()
    }

    #[test]
    fn eval_simple_expression() {
        let mut repl = repl(vec![]);
        let value = repl.eval("(+ 1 2)").unwrap();
        assert!(matches!(value, Value::Integer(3)));
    }

    #[test]
    fn definitions_persist_between_inputs() {
        let mut repl = repl(vec![]);
        repl.eval("(define (square x) (* x x))").unwrap();
        let value = repl.eval("(square 7)").unwrap();
        assert_eq!(repl.interpreter().print(&value), "49");
    }

    #[test]
    fn failed_evaluation_counts_an_error() {
        let mut repl = repl(vec![]);
        let value = repl.eval("(car '())").unwrap();
        assert!(value.is_error());
        assert!(repl.error_count() > 0);
        assert!(repl.messenger.reports().is_empty());
    }

    #[test]
    fn multi_line_input_is_joined() {
        let mut repl = repl(vec!["(define (f x)", "  (+ x 1))", "(f 41)"]);
        assert!(repl.read_eval_print().unwrap());
        assert!(repl.read_eval_print().unwrap());
        assert_eq!(repl.editor.history, vec!["(define (f x)\n  (+ x 1))", "(f 41)"]);
        assert!(!repl.read_eval_print().unwrap());
    }

    #[test]
    fn quit_command_stops_the_loop() {
        let mut repl = repl(vec![":help", ":quit", "(this is never read)"]);
        assert!(repl.read_eval_print().unwrap());
        assert!(!repl.read_eval_print().unwrap());
        assert_eq!(repl.editor.index, 2);
    }

    #[test]
    fn eof_inside_open_form_is_an_error() {
        let mut repl = repl(vec!["(list 1"]);
        assert!(repl.read_eval_print().is_err());
    }

    #[test]
    fn run_consumes_all_input() {
        let mut repl = repl(vec!["(define x 1)", "", "x"]);
        repl.run().unwrap();
        assert_eq!(repl.error_count(), 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut repl = repl(vec![]);
        let err = repl.eval_file(Path::new("/nonexistent/style.dsl")).unwrap_err();
        assert!(matches!(err.kind, dsssl_foundation::ErrorKind::Io(_)));
        let context = err.context.expect("file context");
        assert_eq!(context.source.as_deref(), Some("/nonexistent/style.dsl"));
    }

    #[test]
    fn reports_render_with_location_and_severity() {
        let mut repl = repl(vec![]);
        let messenger = CollectingMessenger::new();
        repl.interp.set_messenger(Box::new(messenger.clone()));
        repl.interp.load("(car 1)").unwrap();
        let rendered: Vec<String> = messenger.take().iter().map(format_report).collect();
        assert!(!rendered.is_empty());
        assert!(rendered[0].starts_with("1:"), "{}", rendered[0]);
        assert!(rendered[0].contains("error"), "{}", rendered[0]);
    }
}
