//! Runtime memory model
//!
//! This module provides the data the interpreter reads and writes:
//! - [`value`]: Dynamic value representation (null, bool, number, text, list, dict)
//! - [`environment`]: Parent-linked variable scopes
//! - [`state`]: Runtime state shared by every handler (registries, boot log,
//!   associative memory and the secondary stores)
//!
//! # Locking
//!
//! Each [`environment::Environment`] scope owns one lock and each
//! [`state::RuntimeState`] owns one lock. Handlers are looked up and cloned out
//! of the registry before they run, so no lock is held across handler code.

pub mod environment;
pub mod state;
pub mod value;
