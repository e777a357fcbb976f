//! Per-dispatch request context

use super::builtins;
use super::engine::{DispatchRequest, Interpreter};
use super::errors::RuntimeError;
use crate::memory::environment::Environment;
use crate::memory::state::RuntimeState;
use crate::memory::value::{Dict, Value};
use std::sync::Arc;

/// What a handler sees when it runs
pub struct RequestContext<'a> {
    /// Name the handler was dispatched under.
    pub handler: String,
    pub params: Dict,
    pub body: Dict,
    pub query: Dict,
    pub state: &'a RuntimeState,
    /// Scope active at the call site.
    pub env: Arc<Environment>,
    /// Nesting of this dispatch within its call chain, starting at 1.
    pub depth: usize,
    pub(crate) interpreter: &'a Interpreter,
}

impl RequestContext<'_> {
    /// Argument lookup shared by the built-in handlers: body, then params,
    /// then query.
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.body
            .get(key)
            .or_else(|| self.params.get(key))
            .or_else(|| self.query.get(key))
    }

    /// Non-empty text argument.
    pub fn arg_text(&self, key: &str) -> Option<String> {
        match self.arg(key)? {
            Value::Null => None,
            value => Some(value.to_text()).filter(|text| !text.is_empty()),
        }
    }

    /// Dispatch another handler from inside this one. The nested call runs
    /// one level deeper in this chain and in this context's scope.
    pub fn dispatch(&self, name: &str, body: Dict) -> Result<Value, RuntimeError> {
        let request = DispatchRequest::new(name).with_body(body);
        self.interpreter
            .dispatch_in(request, Arc::clone(&self.env), self.depth + 1)
    }

    /// Call a function from the builtin table by name.
    pub fn call_builtin(&self, name: &str, args: &[Value]) -> Option<Value> {
        builtins::call(name, args)
    }
}
