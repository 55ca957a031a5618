//! DSSSL - Expression compiler and stack virtual machine
//!
//! This crate re-exports all layers of the DSSSL engine for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: dsssl_runtime    - REPL, CLI, logging setup
//! Layer 1: dsssl_language   - Reader, analyzer, compiler, VM, primitives
//! Layer 0: dsssl_foundation - Core types (Error, Number, Signature, Interner)
//! ```

pub use dsssl_foundation as foundation;
pub use dsssl_language as language;
pub use dsssl_runtime as runtime;
