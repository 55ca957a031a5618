//! The REPL driven by a scripted editor.

use dsssl::foundation::Result;
use dsssl::language::Options;
use dsssl::runtime::{LineEditor, ReadResult, Repl, is_complete};
use std::collections::VecDeque;

struct ScriptedEditor {
    lines: VecDeque<String>,
    keywords: Vec<String>,
}

impl ScriptedEditor {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|&l| l.to_string()).collect(),
            keywords: Vec::new(),
        }
    }
}

impl LineEditor for ScriptedEditor {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadResult> {
        Ok(self.lines.pop_front().map_or(ReadResult::Eof, ReadResult::Line))
    }

    fn add_history(&mut self, _line: &str) {}

    fn set_keywords(&mut self, keywords: Vec<String>) {
        self.keywords = keywords;
    }
}

#[test]
fn session_keeps_definitions_across_lines() {
    let editor = ScriptedEditor::new(&["(define-unit em 10pt)", "(define (indent n)", "  (* n 1em))", ":quit"]);
    let mut repl = Repl::with_editor(editor, Options::default()).without_banner();
    repl.run().unwrap();
    let value = repl.eval("(indent 3)").unwrap();
    assert_eq!(repl.interpreter().print(&value), "30pt");
    assert_eq!(repl.error_count(), 0);
}

#[test]
fn errors_do_not_end_the_session() {
    let editor = ScriptedEditor::new(&["(car '())", "(undefined-thing)", "(+ 1 1)"]);
    let mut repl = Repl::with_editor(editor, Options::default()).without_banner();
    repl.run().unwrap();
    assert_eq!(repl.error_count(), 2);
}

#[test]
fn reader_errors_surface_as_results() {
    let mut repl = Repl::with_editor(ScriptedEditor::new(&[]), Options::default());
    assert!(repl.eval("(list 1))").is_err());
}

#[test]
fn debug_option_reaches_the_interpreter() {
    let options = Options {
        debug: true,
        ..Options::default()
    };
    let repl = Repl::with_editor(ScriptedEditor::new(&[]), options);
    assert!(repl.interpreter().options().debug);
}

#[test]
fn completeness_matches_the_reader() {
    for complete in ["(a (b) \"(\")", "#\\(", "x ; (", "'(1 . 2)"] {
        assert!(is_complete(complete), "{complete}");
    }
    for open in ["(a (b)", "(define (f)\n", "\"unterminated"] {
        assert!(!is_complete(open), "{open}");
    }
}
