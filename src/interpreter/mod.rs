//! K'UHUL interpreter and dispatch engine
//!
//! This module provides the execution side of the crate:
//! - [`engine`]: The [`Interpreter`], with `load`, `run`, `eval` and `dispatch`
//! - [`statements`]: Program registration and block execution
//! - [`context`]: The [`RequestContext`] handed to every handler
//! - [`handlers`]: Built-in handler library (boot, memory, traces, n-grams)
//! - [`builtins`]: Fixed table of pure builtin functions
//! - [`errors`]: Runtime error types
//! - [`config`] / [`constants`]: Limits and well-known names
//!
//! # Execution Model
//!
//! Loading a program registers one handler per capability block. Running it
//! binds declarations and assignments in the root scope, then executes each
//! block definition in a child scope, dispatching the capability blocks
//! nested in its body. Every dispatch counts toward a shared call-depth
//! ceiling, so runaway recursion fails with [`RuntimeError::DepthExceeded`]
//! instead of overflowing the stack.

pub mod builtins;
pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod handlers;
mod statements;

pub use config::InterpreterConfig;
pub use context::RequestContext;
pub use engine::{DispatchRequest, Interpreter};
pub use errors::RuntimeError;
