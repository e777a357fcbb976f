// Execution engine for the K'UHUL interpreter

use super::config::InterpreterConfig;
use super::context::RequestContext;
use super::errors::RuntimeError;
use crate::memory::environment::Environment;
use crate::memory::state::{Handler, RuntimeState, Vector};
use crate::memory::value::{Dict, Value};
use crate::parser::ast::Program;
use crate::parser::{parse, ParseErrors};
use std::sync::Arc;

/// A dispatch call with explicit request parts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchRequest {
    pub handler: String,
    /// `None` uses the params the handler was declared with.
    pub params: Option<Dict>,
    pub body: Dict,
    pub query: Dict,
}

impl DispatchRequest {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Dict) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_body(mut self, body: Dict) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Dict) -> Self {
        self.query = query;
        self
    }
}

/// The interpreter that loads K'UHUL programs and dispatches handlers
pub struct Interpreter {
    /// Registries, variables, boot log and stores
    state: Arc<RuntimeState>,

    /// Program from the last successful `load`
    program: Option<Program>,

    config: InterpreterConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create an interpreter with fresh state and default configuration
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::with_state(Arc::new(RuntimeState::new()), config)
    }

    /// Create an interpreter over existing state, e.g. one shared with a front end
    pub fn with_state(state: Arc<RuntimeState>, config: InterpreterConfig) -> Self {
        Self {
            state,
            program: None,
            config,
        }
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Parse `source` and register its handlers, variables and vectors.
    ///
    /// On parse errors nothing is registered and the previous program stays.
    pub fn load(&mut self, source: &str) -> Result<(), RuntimeError> {
        let (program, errors) = parse(source);
        if !errors.is_empty() {
            return Err(RuntimeError::Parse(ParseErrors(errors)));
        }
        self.load_program(program);
        Ok(())
    }

    /// Register an already-parsed program.
    pub fn load_program(&mut self, program: Program) {
        self.register_program(&program);
        tracing::debug!(
            handlers = program.capability_blocks.len(),
            vectors = program.capability_vectors.len(),
            variables = program.capability_variables.len(),
            blocks = program.blocks.len(),
            "program loaded"
        );
        self.program = Some(program);
    }

    /// Execute the loaded program and return a state snapshot.
    ///
    /// Stops at the first failing block and returns its error.
    pub fn run(&self) -> Result<Value, RuntimeError> {
        let program = self.program.as_ref().ok_or(RuntimeError::NoProgram)?;
        self.execute_program(program)?;
        Ok(self.state.snapshot())
    }

    /// Parse and execute a snippet against the current state.
    ///
    /// Capability constructs in the snippet are registered as with `load`.
    /// Returns the last assigned value or block result, `Null` if none.
    pub fn eval(&self, source: &str) -> Result<Value, RuntimeError> {
        let (program, errors) = parse(source);
        if !errors.is_empty() {
            return Err(RuntimeError::Parse(ParseErrors(errors)));
        }
        self.register_program(&program);
        Ok(self.execute_program(&program)?.unwrap_or_default())
    }

    /// Dispatch `name` with a request body. Params default to the handler's
    /// declared params; query is empty; the scope is the root environment.
    pub fn dispatch(&self, name: &str, body: Dict) -> Result<Value, RuntimeError> {
        self.dispatch_request(DispatchRequest::new(name).with_body(body))
    }

    pub fn dispatch_request(&self, request: DispatchRequest) -> Result<Value, RuntimeError> {
        let env = Arc::clone(self.state.variables());
        self.dispatch_in(request, env, 1)
    }

    /// Dispatch at nesting `depth` of the current call chain (1 for a call
    /// from outside any handler). Each chain counts its own depth.
    pub(crate) fn dispatch_in(
        &self,
        request: DispatchRequest,
        env: Arc<Environment>,
        depth: usize,
    ) -> Result<Value, RuntimeError> {
        if depth > self.config.max_call_depth {
            tracing::warn!(handler = %request.handler, depth, "maximum call depth exceeded");
            return Err(RuntimeError::DepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        let handler = self
            .state
            .handler(&request.handler)
            .ok_or_else(|| RuntimeError::HandlerNotFound(request.handler.clone()))?;

        tracing::trace!(handler = %request.handler, depth, "dispatch");

        let ctx = RequestContext {
            params: request.params.unwrap_or_else(|| handler.params.clone()),
            handler: request.handler,
            body: request.body,
            query: request.query,
            state: &self.state,
            env,
            depth,
            interpreter: self,
        };
        (handler.executor)(&ctx)
    }

    /// Register (or replace) a handler backed by a Rust closure.
    pub fn register_handler<F>(&self, name: &str, executor: F) -> bool
    where
        F: Fn(&RequestContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.state.register_handler(Handler::new(name, executor))
    }

    pub fn register_vector(&self, name: &str, params: Dict) -> bool {
        self.state.register_vector(Vector {
            name: name.to_string(),
            params,
        })
    }

    /// Bind a variable in the root scope.
    pub fn bind(&self, name: &str, value: Value) {
        self.state.variables().set(name, value);
    }

    /// Resolve a variable from the root scope.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.state.variables().get(name)
    }
}
