//! Cross-layer integration tests for the DSSSL engine
//!
//! Tests that verify correct interaction between multiple crates.

mod nested_evaluation;
mod repl;
mod stylesheets;
