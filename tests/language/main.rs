//! Integration tests for Layer 1: Language
//!
//! Tests for the reader, compiler, VM, and built-in procedures.

mod compiler;
mod primitives;
mod reader;
mod vm;
