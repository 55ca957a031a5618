//! Whole stylesheets: definitions, units, modes and flow objects together.

use dsssl::language::{CollectingMessenger, Diagnostic, Interpreter, Options, Sosofo, Value};
use std::rc::Rc;

const BOOK: &str = r#"
    (define-unit em 10pt)
    (declare-initial-value font-size 11pt)

    (mode toc)

    (define base-style (style font-family-name: "Serif" line-spacing: 1.2em))

    (define (heading level text)
      (make paragraph
            use: base-style
            font-size: (case level ((1) 2em) ((2) 1.5em) (else 1em))
            font-weight: 'bold
            (literal text)))

    (define (entry text)
      (with-mode toc
        (make paragraph
              start-indent: (if (eq? (current-mode) 'toc) 2em 0pt)
              (literal text))))

    (define chapters '("Intro" "Usage" "Internals"))

    (sosofo-append
      (heading 1 "Manual")
      (apply sosofo-append (map entry chapters)))
"#;

fn flow_objects(sosofo: &Sosofo) -> Vec<&dsssl::language::FlowObject> {
    match sosofo {
        Sosofo::FlowObject(fo) => vec![fo],
        Sosofo::Append(parts) => parts.iter().flat_map(|p| flow_objects(p)).collect(),
        Sosofo::Empty | Sosofo::Literal(_) => Vec::new(),
    }
}

#[test]
fn book_stylesheet_builds_expected_flow_objects() {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));

    let value = interp.eval_str(BOOK).expect("stylesheet evaluates");
    assert!(messenger.reports().is_empty(), "{:?}", messenger.reports());

    let Value::Sosofo(root) = value else {
        panic!("expected a sosofo");
    };
    assert_eq!(root.text(), "ManualIntroUsageInternals");

    let objects = flow_objects(&root);
    assert_eq!(objects.len(), 4);

    let font_size = interp.intern("font-size");
    let family = interp.intern("font-family-name");
    let indent = interp.intern("start-indent");
    let toc = interp.intern("toc");

    let heading = objects[0];
    assert!(matches!(heading.characteristic(font_size), Some(Value::Length(20_000))));
    let printed = heading.characteristic(family).map(|v| interp.print(v));
    assert_eq!(printed.as_deref(), Some("\"Serif\""));
    assert_eq!(heading.mode, None);

    for entry in &objects[1..] {
        assert_eq!(entry.mode, Some(toc));
        assert!(matches!(entry.characteristic(indent), Some(Value::Length(20_000))));
    }

    assert!(matches!(interp.initial_value(font_size), Ok(Some(Value::Length(11_000)))));
}

#[test]
fn definitions_are_frozen_after_load() {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    interp.load(BOOK).expect("loads");
    let _ = messenger.take();

    let value = interp.load("(set! chapters '())").expect("loads");
    assert!(value.is_error());
    assert_eq!(
        messenger.diagnostics(),
        vec![Diagnostic::TopLevelAssignment("chapters".into())]
    );
}

#[test]
fn later_loads_see_earlier_definitions() {
    let mut interp = Interpreter::new();
    interp.load("(define (twice x) (* 2 x)) (define-unit em 12pt)").unwrap();
    let value = interp.eval_str("(twice 1em)").unwrap();
    assert_eq!(interp.print(&value), "24pt");
}

#[test]
fn resolution_changes_length_values_not_printing() {
    let mut interp = Interpreter::with_options(Options {
        units_per_inch: 7200,
        ..Options::default()
    });
    let value = interp.eval_str("(+ 1in 36pt)").unwrap();
    assert!(matches!(value, Value::Length(10_800)));
    assert_eq!(interp.print(&value), "108pt");
}

#[test]
fn dsssl2_relaxes_conditionals_and_adds_pc() {
    let mut interp = Interpreter::with_options(Options {
        dsssl2: true,
        ..Options::default()
    });
    let value = interp.eval_str("(list (cond (#f 1)) (case 3 ((1) 'a)) 1pc)").unwrap();
    assert_eq!(interp.print(&value), "(#<unspecified> #<unspecified> 12pt)");
}

#[test]
fn identifier_loops_are_diagnosed_once_per_cycle() {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    let value = interp.load("(define a b) (define b a) a").unwrap();
    assert!(value.is_error());
    assert!(
        messenger
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::IdentifierLoop(_)))
    );
}

#[test]
fn shared_flow_objects_are_reference_counted() {
    let mut interp = Interpreter::new();
    let value = interp
        .eval_str("(let ((p (literal \"x\"))) (sosofo-append p p))")
        .unwrap();
    let Value::Sosofo(root) = value else {
        panic!("expected a sosofo");
    };
    let Sosofo::Append(parts) = &*root else {
        panic!("expected an append");
    };
    assert!(Rc::ptr_eq(&parts[0], &parts[1]));
}
