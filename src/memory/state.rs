//! Runtime state shared across dispatches
//!
//! [`RuntimeState`] owns everything a running program can observe besides
//! its syntax tree:
//!
//! - the root [`Environment`] holding program variables
//! - the handler and vector registries
//! - the manifest map copied in at load time
//! - the boot flag, ordered boot log and error log
//! - the associative memory (key/value store exposed to programs)
//! - the secondary [`Stores`]: n-gram counts, trace records and tapes
//!
//! All registries and stores sit behind a single [`RwLock`]. Multi-step
//! updates go through [`RuntimeState::write`] so they happen in one critical
//! section.

use super::environment::Environment;
use super::value::{Dict, Value};
use crate::interpreter::context::RequestContext;
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::CapabilityBlock;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callable body of a handler.
pub type Executor =
    Arc<dyn Fn(&RequestContext<'_>) -> Result<Value, RuntimeError> + Send + Sync>;

/// A named, dispatchable unit of behavior
#[derive(Clone)]
pub struct Handler {
    pub name: String,
    /// Capability block this handler was registered from, if any.
    pub block: Option<CapabilityBlock>,
    /// Parameters declared on the block; passed as request params on dispatch.
    pub params: Dict,
    pub executor: Executor,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, executor: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            block: None,
            params: Dict::new(),
            executor: Arc::new(executor),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("block", &self.block.as_ref().map(|b| &b.name))
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registered capability vector
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    pub name: String,
    pub params: Dict,
}

/// Secondary stores written by the built-in handler library
#[derive(Debug, Clone, Default)]
pub struct Stores {
    /// Observed n-gram (joined with `|`) → occurrence count.
    pub ngrams: BTreeMap<String, u64>,
    /// Append-only trace records, oldest first.
    pub traces: Vec<Value>,
    /// Tape id → tape descriptor.
    pub tapes: Dict,
}

/// Everything behind the state lock
#[derive(Debug, Default)]
pub struct StateData {
    pub handlers: FxHashMap<String, Arc<Handler>>,
    pub vectors: FxHashMap<String, Vector>,
    pub manifest: Dict,
    pub booted: bool,
    pub boot_steps: Vec<String>,
    pub errors: Vec<String>,
    /// Associative memory.
    pub memory: Dict,
    pub stores: Stores,
}

/// Shared runtime state for one interpreter
#[derive(Debug)]
pub struct RuntimeState {
    variables: Arc<Environment>,
    data: RwLock<StateData>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeState {
    pub fn new() -> Self {
        Self {
            variables: Environment::new(),
            data: RwLock::new(StateData::default()),
        }
    }

    /// Root variable scope.
    pub fn variables(&self) -> &Arc<Environment> {
        &self.variables
    }

    /// Run `f` with shared access to the state.
    pub fn read<R>(&self, f: impl FnOnce(&StateData) -> R) -> R {
        f(&self.data.read())
    }

    /// Run `f` with exclusive access to the state.
    pub fn write<R>(&self, f: impl FnOnce(&mut StateData) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Register or replace a handler. Returns `true` if one was replaced.
    pub fn register_handler(&self, handler: Handler) -> bool {
        let name = handler.name.clone();
        let replaced = self
            .data
            .write()
            .handlers
            .insert(name.clone(), Arc::new(handler))
            .is_some();
        if replaced {
            tracing::warn!(handler = %name, "handler re-registered, last registration wins");
        }
        replaced
    }

    /// Look up a handler, cloned out so no lock is held while it runs.
    pub fn handler(&self, name: &str) -> Option<Arc<Handler>> {
        self.data.read().handlers.get(name).cloned()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.data.read().handlers.contains_key(name)
    }

    /// Registered handler names, sorted.
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data.read().handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register_vector(&self, vector: Vector) -> bool {
        self.data
            .write()
            .vectors
            .insert(vector.name.clone(), vector)
            .is_some()
    }

    pub fn vector(&self, name: &str) -> Option<Vector> {
        self.data.read().vectors.get(name).cloned()
    }

    pub fn set_manifest(&self, manifest: Dict) {
        self.data.write().manifest = manifest;
    }

    pub fn manifest(&self) -> Dict {
        self.data.read().manifest.clone()
    }

    pub fn is_booted(&self) -> bool {
        self.data.read().booted
    }

    pub fn boot_steps(&self) -> Vec<String> {
        self.data.read().boot_steps.clone()
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.data.write().errors.push(message.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.data.read().errors.clone()
    }

    pub fn memory_get(&self, key: &str) -> Option<Value> {
        self.data.read().memory.get(key).cloned()
    }

    pub fn memory_set(&self, key: impl Into<String>, value: Value) {
        self.data.write().memory.insert(key.into(), value);
    }

    /// Associative-memory keys, sorted.
    pub fn memory_keys(&self) -> Vec<String> {
        self.data.read().memory.keys().cloned().collect()
    }

    /// `{booted, boot_steps, errors, handlers, variables}` with sorted names.
    pub fn snapshot(&self) -> Value {
        let mut variables = self.variables.all_keys();
        variables.sort();

        let data = self.data.read();
        let mut handlers: Vec<&String> = data.handlers.keys().collect();
        handlers.sort();

        let text_list = |items: &[String]| -> Value {
            Value::List(items.iter().map(|s| Value::from(s.as_str())).collect())
        };

        Value::Dict(Dict::from([
            ("booted".to_string(), Value::Bool(data.booted)),
            ("boot_steps".to_string(), text_list(&data.boot_steps)),
            ("errors".to_string(), text_list(&data.errors)),
            (
                "handlers".to_string(),
                Value::List(handlers.into_iter().map(|h| Value::from(h.as_str())).collect()),
            ),
            ("variables".to_string(), text_list(&variables)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Handler {
        Handler::new("echo", |ctx| Ok(Value::from(ctx.handler.as_str())))
    }

    #[test]
    fn test_handler_registry() {
        let state = RuntimeState::new();
        assert!(!state.register_handler(echo()));
        assert!(state.register_handler(echo()));
        assert!(state.has_handler("echo"));
        assert_eq!(state.handler_names(), vec!["echo"]);
        assert!(state.handler("missing").is_none());
    }

    #[test]
    fn test_memory_roundtrip() {
        let state = RuntimeState::new();
        state.memory_set("b", Value::from(2i64));
        state.memory_set("a", Value::from("x"));
        assert_eq!(state.memory_get("a"), Some(Value::from("x")));
        assert_eq!(state.memory_keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_snapshot_shape() {
        let state = RuntimeState::new();
        state.variables().set("zeta", Value::Null);
        state.variables().set("alpha", Value::Null);
        state.register_handler(echo());
        state.write(|data| {
            data.booted = true;
            data.boot_steps.push("start".to_string());
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.get("booted"), Some(&Value::Bool(true)));
        assert_eq!(
            snapshot.get("variables"),
            Some(&Value::List(vec![Value::from("alpha"), Value::from("zeta")]))
        );
        assert_eq!(
            snapshot.get("handlers"),
            Some(&Value::List(vec![Value::from("echo")]))
        );
        assert_eq!(snapshot.get("errors"), Some(&Value::List(vec![])));
    }
}
