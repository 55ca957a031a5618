//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Error, Number, Interner, Signature.

mod errors;
mod numbers;
mod symbols;
