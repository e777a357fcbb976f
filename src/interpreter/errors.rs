//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], covering everything that can fail
//! while loading or dispatching. Built-in handlers and builtin functions do
//! not produce these for bad input; they report problems inside their result
//! value instead.
//!
//! A failed dispatch only fails that call. Registries, associative memory and
//! the boot log are left as they were, and other call chains are unaffected.

use crate::parser::ParseErrors;

/// Errors raised by loading or dispatching
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Source failed to parse; nothing was loaded
    #[error("parse failed: {0}")]
    Parse(#[from] ParseErrors),

    /// `run` called before a successful `load`
    #[error("no program loaded")]
    NoProgram,

    /// Dispatch named a handler that was never registered
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    /// Nested dispatch went deeper than the configured ceiling
    #[error("maximum call depth exceeded (limit {limit})")]
    DepthExceeded { limit: usize },

    /// An externally registered handler reported a failure
    #[error("handler {handler} failed: {message}")]
    Handler { handler: String, message: String },
}

impl RuntimeError {
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }
}
