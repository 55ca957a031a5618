//! Integration tests for interning, locations and signatures

use dsssl_foundation::{Interner, Location, Signature, Type};

#[test]
fn interning_is_idempotent() {
    let mut interner = Interner::new();
    let a = interner.intern("font-size");
    let b = interner.intern("font-size");
    let c = interner.intern("font-weight");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
    assert_eq!(interner.resolve(c), "font-weight");
    assert_eq!(interner.lookup("font-size"), Some(a));
    assert_eq!(interner.lookup("quadding"), None);
}

#[test]
fn unknown_location_displays_as_such() {
    assert!(!Location::default().is_known());
    assert_eq!(Location::default().to_string(), "<unknown>");
    assert_eq!(Location::new(2, 7).to_string(), "2:7");
}

#[test]
fn signature_arity_bounds() {
    assert_eq!(Signature::fixed(2).max_args(), Some(2));
    assert_eq!(Signature::optional(1, 1).max_args(), Some(2));
    assert_eq!(Signature::variadic(1).max_args(), None);
    assert!(Signature::variadic(0).takes_varargs());
    assert_eq!(Signature::variadic(2).n_formals(), 3);
}

#[test]
fn keyword_signatures_take_varargs() {
    let mut interner = Interner::new();
    let signature = Signature {
        keys: vec![interner.intern("size")],
        ..Signature::fixed(1)
    };
    assert!(signature.takes_varargs());
    assert_eq!(signature.n_keys(), 1);
    assert_eq!(signature.n_formals(), 2);
    assert_eq!(signature.to_string(), "1+");
}

#[test]
fn numeric_types() {
    for ty in [Type::Integer, Type::Real, Type::Length, Type::Quantity, Type::Number] {
        assert!(ty.is_numeric(), "{ty}");
    }
    assert!(!Type::Sosofo.is_numeric());
}
