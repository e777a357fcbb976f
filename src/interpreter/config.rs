//! Interpreter configuration

use super::constants::{MAX_CALL_DEPTH, MAX_CALL_DEPTH_ENV};

/// Tunables for one [`Interpreter`](super::engine::Interpreter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Deepest nested dispatch allowed before `DepthExceeded`.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

impl InterpreterConfig {
    /// Defaults overridden by `KUHUL_MAX_CALL_DEPTH` when it holds a positive
    /// integer. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(depth) = std::env::var(MAX_CALL_DEPTH_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|depth| *depth > 0)
        {
            config.max_call_depth = depth;
        }
        config
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
