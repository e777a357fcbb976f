//! Program registration and statement execution
//!
//! Extends [`Interpreter`] with the steps behind `load`, `run` and `eval`:
//! registering capability constructs, binding declarations and assignments,
//! and executing block definitions.

use super::engine::{DispatchRequest, Interpreter};
use super::errors::RuntimeError;
use super::handlers;
use crate::memory::environment::Environment;
use crate::memory::state::{Handler, Vector};
use crate::memory::value::Value;
use crate::parser::ast::{BlockDefinition, CapabilityBlock, Program, SyntaxNode};
use std::sync::Arc;

impl Interpreter {
    /// Copy the manifest into state and register handlers, variables and vectors.
    pub(crate) fn register_program(&self, program: &Program) {
        if let Some(manifest) = &program.manifest {
            self.state().set_manifest(manifest.raw.clone());
        }

        for block in program.capability_blocks.values() {
            self.state().register_handler(handler_for_block(block));
        }

        for variable in program.capability_variables.values() {
            self.state()
                .variables()
                .set(variable.name.clone(), variable.default_value.clone());
        }

        for vector in program.capability_vectors.values() {
            self.state().register_vector(Vector {
                name: vector.name.clone(),
                params: vector.params.clone(),
            });
        }
    }

    /// Bind declarations, evaluate assignments, then execute blocks.
    ///
    /// Returns the most recent value produced, if any. The first failing
    /// block stops execution; its error is recorded in the state's error log
    /// and returned.
    pub(crate) fn execute_program(&self, program: &Program) -> Result<Option<Value>, RuntimeError> {
        let root = Arc::clone(self.state().variables());
        let mut last = None;

        for decl in &program.declarations {
            root.set(decl.name.clone(), decl.value.clone());
        }

        for assign in &program.assignments {
            let value = resolve(&assign.value, &root);
            root.set(assign.name.clone(), value.clone());
            last = Some(value);
        }

        for block in &program.blocks {
            let value = self.execute_block(block, &root).inspect_err(|err| {
                tracing::warn!(block = %block.name, error = %err, "block failed");
                self.state().push_error(format!("{}: {}", block.name, err));
            })?;
            last = Some(value);
        }

        Ok(last)
    }

    /// Run a block definition in a child scope seeded with its params.
    ///
    /// Every capability block nested in the body dispatches its handler with
    /// the nested block's params. The result is the last handler's value, or
    /// the block's emit value when no handler ran.
    pub(crate) fn execute_block(
        &self,
        block: &BlockDefinition,
        parent: &Arc<Environment>,
    ) -> Result<Value, RuntimeError> {
        let scope = Environment::child(parent);
        for (name, value) in &block.params {
            scope.set(name.clone(), resolve(value, parent));
        }

        let mut result = None;
        for node in &block.body {
            let SyntaxNode::CapabilityBlock(nested) = node else {
                continue;
            };
            let target = nested.handler_name();
            if !self.state().has_handler(target) {
                tracing::warn!(block = %block.name, handler = %target, "nested handler not registered, skipped");
                continue;
            }

            let params = nested
                .params
                .iter()
                .map(|(name, value)| (name.clone(), resolve(value, &scope)))
                .collect();
            let request = DispatchRequest::new(target).with_params(params);
            result = Some(self.dispatch_in(request, Arc::clone(&scope), 1)?);
        }

        Ok(result.or_else(|| block.emit.clone()).unwrap_or_default())
    }
}

/// Handler registered for a capability block: runs the built-in library entry
/// of the same name, or echoes when there is none.
fn handler_for_block(block: &CapabilityBlock) -> Handler {
    let name = block.handler_name().to_string();
    let target = name.clone();
    let mut handler = Handler::new(name, move |ctx| handlers::execute(&target, ctx));
    handler.params = block.params.clone();
    handler.block = Some(block.clone());
    handler
}

/// `@name` text resolves through the scope chain (`@name`, then `name`);
/// anything else, or an unbound reference, is returned unchanged.
pub(crate) fn resolve(value: &Value, env: &Environment) -> Value {
    if let Value::Text(text) = value {
        if let Some(name) = text.strip_prefix('@').filter(|name| !name.is_empty()) {
            if let Some(bound) = env.get(text).or_else(|| env.get(name)) {
                return bound;
            }
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_reference() {
        let env = Environment::new();
        env.set("x", Value::from(3i64));
        env.set("@flag", Value::Bool(true));

        assert_eq!(resolve(&Value::from("@x"), &env), Value::Number(3.0));
        assert_eq!(resolve(&Value::from("@flag"), &env), Value::Bool(true));
        assert_eq!(resolve(&Value::from("@missing"), &env), Value::from("@missing"));
        assert_eq!(resolve(&Value::from("@"), &env), Value::from("@"));
        assert_eq!(resolve(&Value::from("x"), &env), Value::from("x"));
    }
}
