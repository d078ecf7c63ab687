//! Deterministic, pure logic shared by the executor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! strings and typed plans and return deterministic outputs suitable for tests.

pub mod codemod;
pub mod text;
pub mod types;
