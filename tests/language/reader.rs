//! Integration tests for the lexer and reader

use dsssl_language::token::TokenKind;
use dsssl_language::{Ast, FormalMarker, Lexer, parse, parse_one};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize_all(source).into_iter().map(|t| t.kind).collect()
}

// =============================================================================
// Tokens
// =============================================================================

#[test]
fn lex_stylesheet_fragment() {
    let tokens = kinds("(make paragraph font-size: 12pt)");
    assert_eq!(tokens.len(), 7);
    assert_eq!(tokens[0], TokenKind::LParen);
    assert_eq!(tokens[1], TokenKind::Symbol("make".into()));
    assert_eq!(tokens[3], TokenKind::Keyword("font-size".into()));
    assert!(matches!(tokens[4], TokenKind::Quantity { ref unit, .. } if unit == "pt"));
    assert_eq!(tokens[5], TokenKind::RParen);
    assert_eq!(tokens[6], TokenKind::Eof);
}

#[test]
fn lex_named_characters() {
    assert_eq!(
        kinds("#\\space #\\newline #\\tab #\\a"),
        vec![
            TokenKind::Char(' '),
            TokenKind::Char('\n'),
            TokenKind::Char('\t'),
            TokenKind::Char('a'),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lex_brackets_are_rejected() {
    assert!(matches!(kinds("[1]")[0], TokenKind::Error(_)));
}

#[test]
fn tokens_carry_positions() {
    let tokens = Lexer::tokenize_all("(a\n  b)");
    assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 2));
    assert_eq!((tokens[2].span.line, tokens[2].span.column), (2, 3));
}

// =============================================================================
// Data
// =============================================================================

#[test]
fn read_quantities_keep_unit() {
    let ast = parse_one("-3mm").unwrap();
    assert!(matches!(ast, Ast::Quantity(d, ref unit, _) if d.mantissa == -3 && unit == "mm"));
    let ast = parse_one("1.5in").unwrap();
    assert!(matches!(ast, Ast::Quantity(d, ref unit, _) if d.mantissa == 15 && d.exponent == -1 && unit == "in"));
}

#[test]
fn read_abbreviations() {
    let ast = parse_one("`(a ,b ,@c)").unwrap();
    assert_eq!(ast.head(), Some("quasiquote"));
    let inner = ast.as_list().unwrap()[1].as_list().unwrap();
    assert_eq!(inner[1].head(), Some("unquote"));
    assert_eq!(inner[2].head(), Some("unquote-splicing"));
}

#[test]
fn read_lambda_formals() {
    let ast = parse_one("(a #!optional (b 1) #!rest r #!key k)").unwrap();
    let elements = ast.as_list().unwrap();
    assert!(matches!(elements[1], Ast::Marker(FormalMarker::Optional, _)));
    assert!(matches!(elements[3], Ast::Marker(FormalMarker::Rest, _)));
    assert!(matches!(elements[5], Ast::Marker(FormalMarker::Key, _)));
}

#[test]
fn read_strings_with_escapes() {
    let ast = parse_one(r#""say \"hi\"\n""#).unwrap();
    assert!(matches!(ast, Ast::String(ref s, _) if s == "say \"hi\"\n"));
}

#[test]
fn read_several_forms_with_comments() {
    let forms = parse("; heading\n(define x 1) ; trailing\nx").unwrap();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].head(), Some("define"));
    assert!(forms[1].is_symbol("x"));
}

#[test]
fn read_errors_report_position() {
    let err = parse("(define x\n  (+ 1 2)").unwrap_err();
    assert!(err.to_string().contains("1:1"), "{err}");
    assert!(parse(")").is_err());
    assert!(parse("(. a)").is_err());
    assert!(parse("(a . b c)").is_err());
}
