//! Procedures that call back into the VM through a nested evaluation.

use dsssl::language::{CollectingMessenger, Diagnostic, Interpreter};

fn eval(source: &str) -> String {
    let mut interp = Interpreter::new();
    let value = interp.eval_str(source).expect("evaluates");
    interp.print(&value)
}

#[test]
fn map_runs_user_closures() {
    let source = "(define (scale factor) (lambda (x) (* factor x)))
                  (map (scale 2) '(1pt 2pt 3pt))";
    assert_eq!(eval(source), "(2pt 4pt 6pt)");
}

#[test]
fn nested_maps_see_their_closures() {
    let source = "(map (lambda (row) (map (lambda (x) (* x x)) row)) '((1 2) (3 4)))";
    assert_eq!(eval(source), "((1 4) (9 16))");
}

#[test]
fn mutations_inside_callbacks_are_visible_after_return() {
    let source = "(let ((total 0))
                    (for-each (lambda (x) (set! total (+ total x))) '(1 2 3 4))
                    total)";
    assert_eq!(eval(source), "10");
}

#[test]
fn outer_continuation_is_dead_in_a_nested_evaluation() {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    let value = interp
        .load("(call/cc (lambda (k) (for-each (lambda (x) (k x)) '(1 2))))")
        .unwrap();
    assert!(value.is_error());
    assert!(messenger.diagnostics().contains(&Diagnostic::ContinuationDead));
}

#[test]
fn failure_in_a_callback_fails_the_caller() {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    let value = interp.load("(list 'start (map car '((1) 2)))").unwrap();
    assert!(value.is_error());
    assert_eq!(messenger.reports().len(), 1);
}

#[test]
fn interpreter_is_usable_after_nested_failure() {
    let mut interp = Interpreter::new();
    interp.set_messenger(Box::new(CollectingMessenger::new()));
    assert!(interp.eval_str("(map (lambda (x) (car x)) '(1))").is_err());
    let value = interp.eval_str("(map (lambda (x) (+ x 1)) '(1))").unwrap();
    assert_eq!(interp.print(&value), "(2)");
}
