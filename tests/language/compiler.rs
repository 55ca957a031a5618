//! Integration tests for compilation to instruction graphs

use dsssl_language::insn::{InsnPtr, count};
use dsssl_language::{Interpreter, Value};

fn compiled(source: &str) -> InsnPtr {
    Interpreter::new().compile(source).expect("compiles")
}

fn boxes(source: &str) -> usize {
    let insn = compiled(source);
    ["Box", "BoxArg", "BoxStack"].iter().map(|name| count(&insn, name)).sum()
}

// =============================================================================
// Constant Folding
// =============================================================================

#[test]
fn constant_if_has_no_branch() {
    let insn = compiled("(if #t 1 2)");
    assert_eq!(count(&insn, "Test"), 0);
    let mut interp = Interpreter::new();
    let insn = interp.compile("(if #t 1 2)").unwrap();
    let value = dsssl_language::Vm::new(&mut interp).eval(&insn, None, None);
    assert!(matches!(value, Value::Integer(1)));
}

#[test]
fn resolved_quantity_constants_skip_runtime_resolution() {
    assert_eq!(count(&compiled("12pt"), "ResolveQuantities"), 0);
    assert_eq!(count(&compiled("'(1 2pt)"), "ResolveQuantities"), 0);
}

#[test]
fn non_constant_test_keeps_branch() {
    assert_eq!(count(&compiled("(lambda (x) (if x 1 2))"), "Test"), 1);
}

// =============================================================================
// Boxing
// =============================================================================

#[test]
fn assigned_but_unshared_variables_are_not_boxed() {
    assert_eq!(boxes("(let ((x 1)) (set! x 2) x)"), 0);
    assert_eq!(boxes("(lambda (x) (set! x 2) x)"), 0);
}

#[test]
fn shared_but_unassigned_variables_are_not_boxed() {
    assert_eq!(boxes("(let ((x 1)) (lambda () x))"), 0);
}

#[test]
fn assigned_and_shared_variables_are_boxed() {
    assert_eq!(boxes("(let ((x 1)) (lambda () (set! x 2)))"), 1);
    assert_eq!(boxes("(lambda (x) (lambda () (set! x (+ x 1))))"), 1);
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn tail_calls_reuse_the_frame() {
    let insn = compiled("(lambda (f x) (f x))");
    assert_eq!(count(&insn, "TailApply"), 1);
    assert_eq!(count(&insn, "Apply"), 0);
}

#[test]
fn non_tail_calls_push_a_frame() {
    let insn = compiled("(lambda (f x) (+ 1 (f x)))");
    assert_eq!(count(&insn, "TailApply"), 0);
    assert!(count(&insn, "Apply") >= 1);
}

#[test]
fn compile_requires_an_expression() {
    assert!(Interpreter::new().compile("(define x 1)").is_err());
    assert!(Interpreter::new().compile("(lambda)").is_err());
}
