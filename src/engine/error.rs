// src/engine/error.rs
//! Error handling for the curlog engine.
//!
//! `EngineError` covers machine-level faults: malformed code, register
//! misuse, parse failures. Errors of the *language* (instantiation errors,
//! type errors and friends) are ordinary terms carried by `GoalResult` and
//! never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Register {0} is out of bounds.")]
    RegisterOutOfBounds(usize),
    #[error("Register {0} is uninitialized.")]
    UninitializedRegister(usize),
    #[error("Malformed code: {0}")]
    MalformedCode(&'static str),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Directive failed: {0}")]
    DirectiveFailed(String),
}
