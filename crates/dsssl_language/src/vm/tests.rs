//! Tests for the VM.

use super::*;
use crate::diagnostic::CollectingMessenger;
use crate::flow::Sosofo;
use crate::interpreter::Options;

fn eval_test(source: &str) -> Value {
    eval(source).expect("eval failed")
}

fn eval_print(source: &str) -> String {
    let mut interp = Interpreter::new();
    let value = interp.eval_str(source).expect("eval failed");
    interp.print(&value)
}

/// Evaluates `source`, returning the printed result and every diagnostic.
fn eval_diagnosed(source: &str, options: Options) -> (String, Vec<Diagnostic>) {
    let mut interp = Interpreter::with_options(options);
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    let value = interp.load(source).expect("load failed");
    (interp.print(&value), messenger.diagnostics())
}

fn failure(source: &str) -> Vec<Diagnostic> {
    let (printed, diagnostics) = eval_diagnosed(source, Options::default());
    assert_eq!(printed, "#<error>", "{source} should fail");
    diagnostics
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn eval_identity_lambda() {
    assert!(matches!(eval_test("((lambda (x) x) 42)"), Value::Integer(42)));
}

#[test]
fn eval_closure_over_assigned_variable() {
    let source = "(let ((n 0))
                    (let ((inc (lambda () (set! n (+ n 1)) n)))
                      (inc)
                      (inc)))";
    assert!(matches!(eval_test(source), Value::Integer(2)));
}

#[test]
fn eval_apply_spreads_last_argument() {
    assert!(matches!(eval_test("(apply + 1 2 '(3 4))"), Value::Integer(10)));
    assert!(matches!(eval_test("(apply (lambda (a b) (- a b)) '(5 3))"), Value::Integer(2)));
}

#[test]
fn eval_optional_and_key_defaults() {
    assert_eq!(eval_print("((lambda (a #!optional (b 10)) (list a b)) 1)"), "(1 10)");
    assert_eq!(eval_print("((lambda (a #!optional (b 10)) (list a b)) 1 2)"), "(1 2)");
    assert_eq!(eval_print("((lambda (#!key (x 1) y) (list x y)) y: 2)"), "(1 2)");
    assert_eq!(eval_print("((lambda (#!key (x 1)) x) x: 5)"), "5");
    assert_eq!(eval_print("((lambda (a #!rest r) r) 1 2 3)"), "(2 3)");
}

#[test]
fn missing_argument_yields_error_sentinel() {
    let diagnostics = failure("((lambda (x y) x) 1)");
    assert!(diagnostics.contains(&Diagnostic::MissingArg));

    let diagnostics = failure("(let ((f (lambda (x y) x))) (f 1))");
    assert!(diagnostics.contains(&Diagnostic::MissingArg));
}

#[test]
fn calling_a_non_procedure_fails() {
    let diagnostics = failure("(let ((f 1)) (f 2))");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::CallNonFunction(_))));
}

#[test]
fn undefined_variable_fails() {
    let diagnostics = failure("(+ 1 no-such-variable)");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UndefinedVariableReference(name) if name == "no-such-variable")));
}

// =============================================================================
// Tail calls and stack discipline
// =============================================================================

#[test]
fn named_let_loop_terminates() {
    let mut interp = Interpreter::new();
    let value = interp
        .eval_str("(let loop ((i 0)) (if (< i 10) (loop (+ i 1)) 'done))")
        .expect("eval failed");
    assert_eq!(interp.print(&value), "done");
}

#[test]
fn deep_tail_recursion_runs_in_bounded_control_depth() {
    let mut interp = Interpreter::new();
    let insn = interp
        .compile("(let loop ((i 0)) (if (= i 100000) 'done (loop (+ i 1))))")
        .expect("compiles");
    let mut vm = Vm::new(&mut interp);
    let value = vm.eval(&insn, None, None);
    let depth = vm.peak_control_depth();
    let (sp, csp) = (vm.stack_size(), vm.control_stack_size());
    drop(vm);
    assert_eq!(interp.print(&value), "done");
    assert!(depth <= 2, "control depth grew to {depth}");
    assert_eq!((sp, csp), (0, 0));
}

#[test]
fn non_tail_recursion_grows_the_control_stack() {
    let mut interp = Interpreter::new();
    let insn = interp
        .compile("(letrec ((f (lambda (n) (if (= n 0) 0 (+ 1 (f (- n 1))))))) (f 50))")
        .expect("compiles");
    let mut vm = Vm::new(&mut interp);
    let value = vm.eval(&insn, None, None);
    assert!(matches!(value, Value::Integer(50)));
    assert!(vm.peak_control_depth() > 50);
    assert_eq!((vm.stack_size(), vm.control_stack_size()), (0, 0));
}

#[test]
fn stacks_are_empty_after_a_failure() {
    let mut interp = Interpreter::new();
    interp.set_messenger(Box::new(CollectingMessenger::new()));
    let insn = interp.compile("(letrec ((f (lambda (n) (car n)))) (+ 1 (f 2)))").expect("compiles");
    let mut vm = Vm::new(&mut interp);
    assert!(vm.eval(&insn, None, None).is_error());
    assert_eq!((vm.stack_size(), vm.control_stack_size()), (0, 0));
}

#[test]
fn vm_apply_calls_a_procedure_value() {
    let mut interp = Interpreter::new();
    let car = interp.eval_str("car").expect("car is bound");
    let list = interp.eval_str("'(a b)").expect("quoted list");
    let function = car.as_function().cloned().expect("car is a procedure");
    let value = Vm::new(&mut interp).apply(&function, &[list], Location::default());
    assert_eq!(interp.print(&value), "a");
}

// =============================================================================
// Continuations
// =============================================================================

#[test]
fn call_cc_escapes() {
    assert!(matches!(
        eval_test("(+ 1 (call-with-current-continuation (lambda (k) (+ 10 (k 41)))))"),
        Value::Integer(42)
    ));
}

#[test]
fn call_cc_escapes_from_deep_recursion() {
    let source = "(call/cc
                    (lambda (return)
                      (letrec ((walk (lambda (l)
                                       (cond ((null? l) 'none)
                                             ((< (car l) 0) (return (car l)))
                                             (else (walk (cdr l)))))))
                        (walk '(1 2 -3 4)))))";
    assert!(matches!(eval_test(source), Value::Integer(-3)));
}

#[test]
fn continuation_is_dead_after_its_activation_returns() {
    let diagnostics = failure("(let ((saved #f)) (call/cc (lambda (k) (set! saved k) 1)) (saved 5))");
    assert!(diagnostics.contains(&Diagnostic::ContinuationDead));
}

// =============================================================================
// Conditionals and literals
// =============================================================================

#[test]
fn case_selects_matching_clause() {
    assert_eq!(eval_print("(case (* 1 2) ((1) 'a) ((2 3) 'b) (else 'c))"), "b");
    assert_eq!(eval_print("(case 'x ((a) 1) (else 'other))"), "other");
}

#[test]
fn case_without_match_fails() {
    let diagnostics = failure("(case (+ 1 1) ((1) 'a))");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::CaseFail(_))));
}

#[test]
fn cond_without_match_fails_unless_dsssl2() {
    let diagnostics = failure("(cond ((= (+ 1 1) 3) 'a))");
    assert!(diagnostics.contains(&Diagnostic::CondFail));

    let options = Options {
        dsssl2: true,
        ..Options::default()
    };
    let (printed, diagnostics) = eval_diagnosed("(cond ((= (+ 1 1) 3) 'a))", options);
    assert_eq!(printed, "#<unspecified>");
    assert!(diagnostics.is_empty());
}

#[test]
fn cond_test_only_clause_returns_test_value() {
    assert_eq!(eval_print("(cond ((memv 2 '(1 2 3))) (else #f))"), "(2 3)");
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(eval_print("(and 1 2 3)"), "3");
    assert_eq!(eval_print("(and 1 #f (car 1))"), "#f");
    assert_eq!(eval_print("(or #f 2 (car 1))"), "2");
    assert_eq!(eval_print("(or)"), "#f");
}

#[test]
fn quoted_literals_print() {
    assert_eq!(eval_print("'(a . b)"), "(a . b)");
    assert_eq!(eval_print("'(1 (2 3) . 4)"), "(1 (2 3) . 4)");
    assert_eq!(eval_print("'#(1 a \"s\")"), "#(1 a \"s\")");
    assert_eq!(eval_print("'font-size:"), "font-size:");
}

#[test]
fn quasiquote_builds_structure() {
    assert_eq!(eval_print("`(1 ,(+ 1 1) ,@(list 3 4))"), "(1 2 3 4)");
    assert_eq!(eval_print("`(1 . ,(+ 1 1))"), "(1 . 2)");
    assert_eq!(eval_print("`#(a ,(* 2 3))"), "#(a 6)");
    assert_eq!(eval_print("`(x ,@'() y)"), "(x y)");
}

#[test]
fn splicing_a_non_list_fails() {
    let diagnostics = failure("(let ((x 1)) `(a ,@x b))");
    assert!(diagnostics.contains(&Diagnostic::SpliceNotList));
}

#[test]
fn lengths_are_exact() {
    assert!(matches!(eval_test("12pt"), Value::Length(12000)));
    assert_eq!(eval_print("(= (+ 1in 72pt) 2in)"), "#t");
}

// =============================================================================
// Variables
// =============================================================================

#[test]
fn letrec_use_before_initialization_fails() {
    let diagnostics = failure("(letrec ((a (+ b 1)) (b 1)) a)");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UninitializedVariableReference(_))));
}

#[test]
fn top_level_variables_cannot_be_assigned() {
    let (_, diagnostics) = eval_diagnosed("(define x 1) (set! x 2)", Options::default());
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::TopLevelAssignment(_))));
}

#[test]
fn top_level_vectors_are_read_only() {
    let diagnostics = failure("(define v (vector 1 2)) (vector-set! v 0 9)");
    assert_eq!(diagnostics, vec![Diagnostic::ReadOnly]);
}

// =============================================================================
// Styles and flow objects
// =============================================================================

#[test]
fn make_builds_a_flow_object() {
    let mut interp = Interpreter::new();
    let value = interp
        .eval_str("(make paragraph font-size: 12pt (literal \"Hello, \") (literal \"world\"))")
        .expect("eval failed");
    let Value::Sosofo(sosofo) = value else {
        panic!("expected a sosofo");
    };
    let Sosofo::FlowObject(fo) = &*sosofo else {
        panic!("expected a flow object");
    };
    assert_eq!(interp.name(fo.class), "paragraph");
    let font_size = interp.intern("font-size");
    assert!(matches!(fo.characteristic(font_size), Some(Value::Length(12000))));
    assert_eq!(sosofo.text(), "Hello, world");
}

#[test]
fn make_uses_a_style() {
    let mut interp = Interpreter::new();
    let value = interp
        .eval_str("(let ((s (style font-weight: 'bold))) (make paragraph use: s))")
        .expect("eval failed");
    let Value::Sosofo(sosofo) = value else {
        panic!("expected a sosofo");
    };
    let Sosofo::FlowObject(fo) = &*sosofo else {
        panic!("expected a flow object");
    };
    let weight = interp.intern("font-weight");
    let printed = fo.characteristic(weight).map(|v| interp.print(v));
    assert_eq!(printed.as_deref(), Some("bold"));
}

#[test]
fn invalid_style_keyword_is_dropped() {
    let (printed, diagnostics) = eval_diagnosed("(style? (style no-such-thing: 1))", Options::default());
    assert_eq!(printed, "#t");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidStyleKeyword(_))));
}

#[test]
fn make_content_must_be_sosofos() {
    let diagnostics = failure("(make paragraph (+ 1 2))");
    assert!(diagnostics.contains(&Diagnostic::SosofoContext));
}

#[test]
fn unknown_flow_object_class_becomes_sequence() {
    let (printed, diagnostics) = eval_diagnosed("(sosofo? (make no-such-class))", Options::default());
    assert_eq!(printed, "#t");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UnknownFlowObjectClass(_))));
}

// =============================================================================
// Debug mode
// =============================================================================

#[test]
fn debug_mode_reports_a_stack_trace() {
    let options = Options {
        debug: true,
        ..Options::default()
    };
    let source = "(letrec ((f (lambda (n) (if (= n 0) (car n) (+ 1 (f (- n 1))))))) (f 3))";
    let (printed, diagnostics) = eval_diagnosed(source, options);
    assert_eq!(printed, "#<error>");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::PrimitiveFailed { .. })));
    assert!(diagnostics.contains(&Diagnostic::StackTrace));
}

#[test]
fn long_stack_traces_are_elided() {
    let options = Options {
        debug: true,
        ..Options::default()
    };
    let source = "(letrec ((f (lambda (n) (if (= n 0) (car n) (+ 1 (f (- n 1))))))) (f 20))";
    let (_, diagnostics) = eval_diagnosed(source, options);
    let traces = diagnostics.iter().filter(|d| **d == Diagnostic::StackTrace).count();
    assert!(traces < 12, "{traces} stack trace entries");
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::StackTraceEllipsis(_))));
}
