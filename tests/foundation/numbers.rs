//! Integration tests for numbers and quantities

use dsssl_foundation::{DEFAULT_UNITS_PER_INCH, Decimal, ErrorKind, Number, unit_length};
use proptest::prelude::*;

fn points(n: i64) -> Number {
    Number::Length(n * 1000)
}

// =============================================================================
// Exactness
// =============================================================================

#[test]
fn integer_arithmetic_stays_exact() {
    assert_eq!(Number::Integer(6).add(Number::Integer(7)).unwrap(), Number::Integer(13));
    assert_eq!(Number::Integer(6).mul(Number::Integer(7)).unwrap(), Number::Integer(42));
    assert_eq!(Number::Integer(6).div(Number::Integer(3)).unwrap(), Number::Integer(2));
}

#[test]
fn inexact_division_yields_real() {
    assert_eq!(Number::Integer(1).div(Number::Integer(2)).unwrap(), Number::Real(0.5));
}

#[test]
fn overflow_falls_back_to_inexact() {
    let sum = Number::Integer(i64::MAX).add(Number::Integer(1)).unwrap();
    assert!(!sum.is_exact());
    assert_eq!(sum.dim(), 0);
}

#[test]
fn division_by_zero_fails() {
    let err = Number::Integer(1).div(Number::Integer(0)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DivisionByZero));
}

// =============================================================================
// Dimensions
// =============================================================================

#[test]
fn lengths_add_and_compare() {
    assert_eq!(points(12).add(points(6)).unwrap(), points(18));
    assert!(points(12).compare(points(6)).unwrap().is_gt());
}

#[test]
fn mixed_dimensions_are_rejected() {
    let err = points(1).add(Number::Integer(1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DimensionMismatch { left: 1, right: 0 }));
    assert!(points(1).compare(Number::Integer(1)).is_err());
}

#[test]
fn dimensions_combine_under_multiplication() {
    let area = points(2).mul(points(3)).unwrap();
    assert_eq!(area.dim(), 2);
    assert_eq!(points(6).div(points(2)).unwrap(), Number::Integer(3));
    assert_eq!(points(6).div(Number::Integer(2)).unwrap(), points(3));
}

// =============================================================================
// Units
// =============================================================================

#[test]
fn builtin_unit_factors() {
    assert_eq!(unit_length(1, 1, DEFAULT_UNITS_PER_INCH), Number::Length(72000));
    assert_eq!(unit_length(1, 72, DEFAULT_UNITS_PER_INCH), Number::Length(1000));
    assert_eq!(unit_length(1, 6, DEFAULT_UNITS_PER_INCH), Number::Length(12000));
    assert!(!unit_length(10, 254, DEFAULT_UNITS_PER_INCH).is_exact());
}

#[test]
fn decimal_literals_scale_exactly_when_possible() {
    let one_and_half = Decimal::parse("1.5").unwrap();
    assert_eq!(
        Number::scale_literal(one_and_half, Number::Length(72000)),
        Number::Length(108_000)
    );
    let tiny = Decimal::parse("0.0001").unwrap();
    assert!(!Number::scale_literal(tiny, Number::Length(1000)).is_exact());
    assert!(Decimal::parse("1.2.3").is_none());
    assert!(Decimal::parse("-").is_none());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn addition_commutes(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let x = Number::Integer(a);
        let y = Number::Integer(b);
        prop_assert_eq!(x.add(y).unwrap(), y.add(x).unwrap());
    }

    #[test]
    fn subtraction_undoes_addition(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let x = Number::Length(a);
        let y = Number::Length(b);
        prop_assert_eq!(x.add(y).unwrap().sub(y).unwrap(), x);
    }

    #[test]
    fn negation_is_an_involution(a in -1_000_000i64..1_000_000) {
        let x = Number::Integer(a);
        prop_assert_eq!(x.negate().negate(), x);
    }

    #[test]
    fn whole_literals_scale_exactly(n in -10_000i64..10_000) {
        let literal = Decimal::parse(&n.to_string()).unwrap();
        prop_assert_eq!(Number::scale_literal(literal, points(1)), points(n));
    }
}
