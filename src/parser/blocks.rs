//! Block-shaped constructs
//!
//! `⟁Sek⟁` control vectors, `⟁Xul⟁` block definitions, `⟁Ch'en⟁` returns,
//! atomic blocks and the three `C@@L` capability constructs. Each body runs
//! until the next token that opens a top-level construct; a block definition
//! additionally absorbs the capability blocks nested inside it.

use crate::memory::value::{Dict, Value};
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

/// Scope given to capability variables that do not declare one.
pub const DEFAULT_VARIABLE_SCOPE: &str = "global";

impl Parser {
    /// `@name[:] value`. Without a colon, a following atom starts the next
    /// parameter instead of becoming this one's value.
    pub(crate) fn parse_atom_param(&mut self) -> (String, Value) {
        let atom = self.advance();
        let name = atom.literal.trim_start_matches('@').to_string();

        let value = if self.match_token(TokenKind::Colon) || !self.check(TokenKind::At) {
            self.parse_value()
        } else {
            Value::Null
        };

        (name, value)
    }

    /// Collect `@param` pairs until the construct ends, skipping anything else.
    fn parse_params_until_end(&mut self) -> Dict {
        let mut params = Dict::new();
        while !self.at_construct_end() {
            if self.check(TokenKind::At) {
                let (name, value) = self.parse_atom_param();
                params.insert(name, value);
            } else {
                self.advance();
            }
        }
        params
    }

    /// `⟁Sek⟁ type @param ...`
    pub(crate) fn parse_control_vector(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let vector_type = self.expect(TokenKind::Ident, "control vector requires a type name")?;
        let params = self.parse_params_until_end();

        Some(SyntaxNode::ControlVector(ControlVector {
            vector_type: vector_type.literal,
            params,
            body: Vec::new(),
            location: marker.location,
        }))
    }

    /// `⟁Xul⟁ name @param ... [C@@L BLOCK ...]*`
    pub(crate) fn parse_block_definition(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = self.expect(TokenKind::Ident, "block definition requires a name")?;
        let mut params = Dict::new();
        let mut body = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::At => {
                    let (key, value) = self.parse_atom_param();
                    params.insert(key, value);
                }
                TokenKind::CoolBlock => {
                    if let Some(nested) = self.parse_capability_block() {
                        body.push(nested);
                    }
                }
                _ if self.at_construct_end() => break,
                _ => {
                    self.advance();
                }
            }
        }

        Some(SyntaxNode::BlockDefinition(BlockDefinition {
            name: name.literal,
            params,
            body,
            emit: None,
            location: marker.location,
        }))
    }

    /// `⟁Ch'en⟁ value` or `⟁Ch'en⟁ @name: value`
    pub(crate) fn parse_return(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let value = if self.check(TokenKind::At) {
            let (name, value) = self.parse_atom_param();
            Value::Dict(Dict::from([(name, value)]))
        } else {
            self.parse_value()
        };

        Some(SyntaxNode::Return(ReturnStatement {
            value,
            location: marker.location,
        }))
    }

    /// `⟁ ATOMIC_BLOCK_name⟁ {json} @param ...`; JSON objects and params
    /// merge into one content map.
    pub(crate) fn parse_atomic_block(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = marker.construct_name().unwrap_or("unknown").to_string();
        let mut content = Dict::new();

        while !self.at_construct_end() {
            match self.peek_kind() {
                TokenKind::At => {
                    let (key, value) = self.parse_atom_param();
                    content.insert(key, value);
                }
                TokenKind::Json => {
                    if let Some(Value::Dict(map)) = self.advance().value {
                        content.extend(map);
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        Some(SyntaxNode::AtomicBlock(AtomicBlock {
            name,
            content,
            location: marker.location,
        }))
    }

    /// `C@@L BLOCK name` followed by `@param`s and JSON body items.
    pub(crate) fn parse_capability_block(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = marker.construct_name().unwrap_or("unknown").to_string();
        let mut handler = None;
        let mut params = Dict::new();
        let mut body = Vec::new();

        while !self.at_construct_end() {
            match self.peek_kind() {
                TokenKind::At => {
                    let (key, value) = self.parse_atom_param();
                    if key == "handler" {
                        if let Value::Text(target) = &value {
                            handler = Some(target.clone());
                        }
                    }
                    params.insert(key, value);
                }
                TokenKind::Json => {
                    if let Some(value) = self.advance().value {
                        body.push(value);
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        Some(SyntaxNode::CapabilityBlock(CapabilityBlock {
            name,
            handler,
            params,
            body,
            location: marker.location,
        }))
    }

    /// `C@@L ATOMIC_VECTOR @name @param ...`
    pub(crate) fn parse_capability_vector(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = marker.construct_name().unwrap_or("@unknown").to_string();
        let params = self.parse_params_until_end();

        Some(SyntaxNode::CapabilityVector(CapabilityVector {
            name,
            params,
            location: marker.location,
        }))
    }

    /// `C@@L ATOMIC_VARIABLE @name @default: value @scope: name`
    pub(crate) fn parse_capability_variable(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = marker.construct_name().unwrap_or("@unknown").to_string();
        let mut params = self.parse_params_until_end();

        let default_value = params.remove("default").unwrap_or_default();
        let scope = match params.remove("scope") {
            Some(Value::Text(scope)) => scope,
            _ => DEFAULT_VARIABLE_SCOPE.to_string(),
        };

        Some(SyntaxNode::CapabilityVariable(CapabilityVariable {
            name,
            default_value,
            scope,
            location: marker.location,
        }))
    }
}
