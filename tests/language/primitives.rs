//! Integration tests for the built-in procedures

use dsssl_language::{CollectingMessenger, Diagnostic, Interpreter};

fn eval(source: &str) -> String {
    let mut interp = Interpreter::new();
    let value = interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("{source}: {e}"));
    interp.print(&value)
}

fn fails(source: &str) -> Vec<Diagnostic> {
    let mut interp = Interpreter::new();
    let messenger = CollectingMessenger::new();
    interp.set_messenger(Box::new(messenger.clone()));
    assert!(interp.eval_str(source).is_err(), "{source} should fail");
    messenger.diagnostics()
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn arithmetic_on_lengths() {
    assert_eq!(eval("(+ 1in 72pt)"), "144pt");
    assert_eq!(eval("(* 2 6pt)"), "12pt");
    assert_eq!(eval("(/ 12pt 4pt)"), "3");
    assert_eq!(eval("(- 10pt)"), "-10pt");
    assert_eq!(eval("(max 1pt 2pt 3pt)"), "3pt");
}

#[test]
fn arithmetic_comparisons_chain() {
    assert_eq!(eval("(< 1 2 3)"), "#t");
    assert_eq!(eval("(< 1 3 2)"), "#f");
    assert_eq!(eval("(= 1in 72pt)"), "#t");
}

#[test]
fn integer_division_family() {
    assert_eq!(eval("(list (quotient 17 5) (remainder 17 5) (modulo -7 2))"), "(3 2 1)");
}

#[test]
fn mixed_dimensions_fail() {
    let diagnostics = fails("(+ 1pt 1)");
    assert!(matches!(diagnostics[..], [Diagnostic::PrimitiveFailed { .. }]));
}

// =============================================================================
// Lists and equality
// =============================================================================

#[test]
fn list_operations() {
    assert_eq!(eval("(append '(1 2) '(3) '() '(4))"), "(1 2 3 4)");
    assert_eq!(eval("(reverse '(1 2 3))"), "(3 2 1)");
    assert_eq!(eval("(list-ref '(a b c) 2)"), "c");
    assert_eq!(eval("(assq 'b '((a 1) (b 2)))"), "(b 2)");
    assert_eq!(eval("(member \"b\" '(\"a\" \"b\" \"c\"))"), "(\"b\" \"c\")");
    assert_eq!(eval("(cons 1 2)"), "(1 . 2)");
}

#[test]
fn long_lists_built_in_a_loop() {
    let build = "(define (build n) \
                   (let loop ((i 0) (acc '())) \
                     (if (= i n) acc (loop (+ i 1) (cons i acc)))))";
    assert_eq!(eval(&format!("{build} (length (build 300000))")), "300000");
    assert_eq!(
        eval(&format!("{build} (equal? (build 300000) (reverse (reverse (build 300000))))")),
        "#t"
    );
}

#[test]
fn equality_levels() {
    assert_eq!(eval("(eq? 'a 'a)"), "#t");
    assert_eq!(eval("(eqv? 2 2)"), "#t");
    assert_eq!(eval("(equal? '(1 #(2 \"x\")) (list 1 (vector 2 \"x\")))"), "#t");
    assert_eq!(eval("(eq? (list 1) (list 1))"), "#f");
}

// =============================================================================
// Strings, symbols, vectors
// =============================================================================

#[test]
fn string_conversions() {
    assert_eq!(eval("(string-append \"font\" \"-\" \"size\")"), "\"font-size\"");
    assert_eq!(eval("(symbol->string 'quadding)"), "\"quadding\"");
    assert_eq!(eval("(string->symbol \"start\")"), "start");
    assert_eq!(eval("(number->string 255 16)"), "\"ff\"");
}

#[test]
fn vector_operations() {
    assert_eq!(eval("(let ((v (make-vector 2 0))) (vector-set! v 1 'x) v)"), "#(0 x)");
    assert_eq!(eval("(vector->list (list->vector '(1 2)))"), "(1 2)");
    assert_eq!(eval("(vector-length #(1 2 3))"), "3");
}

#[test]
fn out_of_range_index_fails() {
    let diagnostics = fails("(vector-ref (vector 1 2) 5)");
    assert!(matches!(diagnostics[..], [Diagnostic::PrimitiveFailed { .. }]));
}

// =============================================================================
// Control
// =============================================================================

#[test]
fn higher_order_procedures() {
    assert_eq!(eval("(map (lambda (x y) (+ x y)) '(1 2) '(10 20))"), "(11 22)");
    assert_eq!(eval("(apply max 1 '(5 3))"), "5");
    assert_eq!(eval("(procedure? car)"), "#t");
}

#[test]
fn user_errors_carry_their_message() {
    let mut interp = Interpreter::new();
    interp.set_messenger(Box::new(CollectingMessenger::new()));
    let err = interp.eval_str("(error \"no such chapter:\" 7)").unwrap_err();
    assert!(err.to_string().contains("no such chapter: 7"), "{err}");
}

#[test]
fn sosofo_construction() {
    assert_eq!(eval("(sosofo? (sosofo-append (literal \"a\") (empty-sosofo)))"), "#t");
    assert_eq!(eval("(style? (style font-size: 12pt))"), "#t");
}
