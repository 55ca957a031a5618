//! Integration tests for the VM
//!
//! Tests evaluation of compiled programs and the stack invariants.

use dsssl_language::{CollectingMessenger, Diagnostic, Interpreter, Options, Value, Vm, eval};
use proptest::prelude::*;

/// Evaluates `source` in a fresh VM, returning the printed result, the peak
/// control depth, and the final stack sizes.
fn run(source: &str) -> (String, usize, (usize, usize)) {
    let mut interp = Interpreter::new();
    interp.set_messenger(Box::new(CollectingMessenger::new()));
    let insn = interp.compile(source).expect("compiles");
    let mut vm = Vm::new(&mut interp);
    let value = vm.eval(&insn, None, None);
    let depth = vm.peak_control_depth();
    let sizes = (vm.stack_size(), vm.control_stack_size());
    drop(vm);
    (interp.print(&value), depth, sizes)
}

fn diagnostics(source: &str) -> (String, Vec<Diagnostic>) {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    let value = interp.load(source).expect("loads");
    (interp.print(&value), messenger.diagnostics())
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn eval_identity() {
    assert!(matches!(eval("((lambda (x) x) 42)").unwrap(), Value::Integer(42)));
}

#[test]
fn eval_named_let() {
    let (printed, _, _) = run("(let loop ((n 5)) (if (= n 0) 'done (loop (- n 1))))");
    assert_eq!(printed, "done");
}

#[test]
fn eval_case() {
    let (printed, _, _) = run("(case 2 ((1) 'a) ((2) 'b) (else 'c))");
    assert_eq!(printed, "b");
}

#[test]
fn escaping_continuation_discards_pending_work() {
    assert!(matches!(
        eval("(call-with-current-continuation (lambda (k) (+ 1 (k 42))))").unwrap(),
        Value::Integer(42)
    ));
}

#[test]
fn missing_argument_makes_the_whole_expression_fail() {
    let (printed, diagnostics) = diagnostics("(list 'before ((lambda (a b) a) 1))");
    assert_eq!(printed, "#<error>");
    assert_eq!(diagnostics, vec![Diagnostic::MissingArg]);
}

#[test]
fn excess_arguments_are_reported_and_dropped() {
    let (printed, diagnostics) = diagnostics("((lambda (a) a) 1 2 3)");
    assert_eq!(printed, "1");
    assert_eq!(diagnostics, vec![Diagnostic::TooManyArgs]);
}

#[test]
fn dead_continuation_does_not_corrupt_the_stack() {
    let source = "(let ((saved #f))
                    (+ 1 (call/cc (lambda (k) (set! saved k) 1)))
                    (saved 2))";
    let (printed, _, sizes) = run(source);
    assert_eq!(printed, "#<error>");
    assert_eq!(sizes, (0, 0));
}

#[test]
fn vm_is_reusable_after_a_failure() {
    let mut interp = Interpreter::new();
    interp.set_messenger(Box::new(CollectingMessenger::new()));
    let bad = interp.compile("(car '())").unwrap();
    let good = interp.compile("(car '(ok))").unwrap();
    let mut vm = Vm::new(&mut interp);
    assert!(vm.eval(&bad, None, None).is_error());
    let value = vm.eval(&good, None, None);
    drop(vm);
    assert_eq!(interp.print(&value), "ok");
}

#[test]
fn debug_mode_disables_tail_calls() {
    let source = "(let loop ((i 0)) (if (= i 100) i (loop (+ i 1))))";
    let mut interp = Interpreter::with_options(Options {
        debug: true,
        ..Options::default()
    });
    let insn = interp.compile(source).unwrap();
    let mut vm = Vm::new(&mut interp);
    assert!(matches!(vm.eval(&insn, None, None), Value::Integer(100)));
    assert!(vm.peak_control_depth() > 100);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn tail_loops_run_in_constant_control_depth(n in 1usize..20_000) {
        let source = format!("(let loop ((i 0)) (if (= i {n}) i (loop (+ i 1))))");
        let (printed, depth, sizes) = run(&source);
        prop_assert_eq!(printed, n.to_string());
        prop_assert!(depth <= 2, "depth {} for {} iterations", depth, n);
        prop_assert_eq!(sizes, (0, 0));
    }

    #[test]
    fn stacks_balance_after_nested_calls(a in -1000i64..1000, b in -1000i64..1000, c in 0usize..30) {
        let source = format!(
            "(letrec ((sum (lambda (n acc) (if (= n 0) acc (+ 1 (sum (- n 1) acc))))))
               (list (sum {c} {a}) ((lambda (x #!optional (y {b})) (- x y)) {a})))"
        );
        let (printed, _, sizes) = run(&source);
        prop_assert_eq!(printed, format!("({} {})", a + c as i64, a - b));
        prop_assert_eq!(sizes, (0, 0));
    }
}
