//! # Introduction
//!
//! K'UHUL is a glyph-marked configuration and orchestration language. A
//! program declares a manifest, variables and *capability blocks*; loading it
//! registers one named handler per capability block, and the host then drives
//! the program by dispatching those handlers by name.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → Program → Interpreter → dispatch → Value
//!                                                  ↘ Fingerprint / Compaction
//! ```
//!
//! 1. [`parser`] tokenises the source and builds a [`parser::ast::Program`].
//! 2. [`interpreter`] registers handlers, binds variables, runs block
//!    definitions and serves `dispatch` calls with a bounded call depth.
//! 3. [`memory`] holds the runtime model: dynamic [`Value`]s, parent-linked
//!    [`memory::environment::Environment`] scopes and the shared
//!    [`memory::state::RuntimeState`].
//! 4. [`fingerprint`] derives order-independent content identifiers and the
//!    reversible compacted form of program trees.
//!
//! ## Example
//!
//! ```
//! use kuhul::{memory::value::Dict, Interpreter};
//!
//! let mut interp = Interpreter::new();
//! interp.load("C@@L BLOCK boot\n@handler: kernel_boot").unwrap();
//!
//! let result = interp.dispatch("kernel_boot", Dict::new()).unwrap();
//! assert_eq!(result.get("ok").map(|v| v.to_bool()), Some(true));
//! assert!(interp.state().is_booted());
//! ```

pub mod fingerprint;
pub mod interpreter;
pub mod memory;
pub mod parser;

pub use fingerprint::{compress, decompress, fingerprint, verify, Compacted};
pub use interpreter::{Interpreter, InterpreterConfig, RuntimeError};
pub use memory::value::Value;
pub use parser::lexer::tokenize;
pub use parser::parse;

/// Crate version, also reported in the kernel identifier.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
