// Syntax tree definitions for K'UHUL programs

use crate::memory::value::{Dict, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// `⟁Pop⟁ name {json}`: a named constant binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub value: Value,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `⟁Wo⟁ name = value`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub name: String,
    pub value: Value,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `⟁Sek⟁ kind @param ...`: parsed and kept, never executed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlVector {
    pub vector_type: String,
    pub params: Dict,
    pub body: Vec<SyntaxNode>,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `⟁Xul⟁ name @param ... C@@L BLOCK ... ⟁Ch'en⟁ {...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDefinition {
    pub name: String,
    pub params: Dict,
    /// Nested constructs; only capability blocks are executed.
    pub body: Vec<SyntaxNode>,
    /// Value of a `⟁Ch'en⟁` directly following the block.
    pub emit: Option<Value>,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `⟁Ch'en⟁ value`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatement {
    pub value: Value,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `⟁ ATOMIC_BLOCK_name⟁ {json} @param ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomicBlock {
    pub name: String,
    pub content: Dict,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `C@@L BLOCK name @handler: target @param ... {json} ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityBlock {
    pub name: String,
    pub handler: Option<String>,
    pub params: Dict,
    pub body: Vec<Value>,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl CapabilityBlock {
    /// Name the block registers under: the explicit handler, else a textual
    /// `handler` param, else the block's own name.
    pub fn handler_name(&self) -> &str {
        if let Some(handler) = &self.handler {
            return handler;
        }
        match self.params.get("handler") {
            Some(Value::Text(handler)) => handler,
            _ => &self.name,
        }
    }
}

/// `C@@L ATOMIC_VECTOR @name @param ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityVector {
    pub name: String,
    pub params: Dict,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// `C@@L ATOMIC_VARIABLE @name @default: value @scope: name`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityVariable {
    pub name: String,
    pub default_value: Value,
    pub scope: String,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// Every construct the parser can produce
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SyntaxNode {
    Declaration(Declaration),
    Assignment(Assignment),
    ControlVector(ControlVector),
    BlockDefinition(BlockDefinition),
    Return(ReturnStatement),
    AtomicBlock(AtomicBlock),
    CapabilityBlock(CapabilityBlock),
    CapabilityVector(CapabilityVector),
    CapabilityVariable(CapabilityVariable),
}

impl SyntaxNode {
    pub fn location(&self) -> SourceLocation {
        match self {
            SyntaxNode::Declaration(node) => node.location,
            SyntaxNode::Assignment(node) => node.location,
            SyntaxNode::ControlVector(node) => node.location,
            SyntaxNode::BlockDefinition(node) => node.location,
            SyntaxNode::Return(node) => node.location,
            SyntaxNode::AtomicBlock(node) => node.location,
            SyntaxNode::CapabilityBlock(node) => node.location,
            SyntaxNode::CapabilityVector(node) => node.location,
            SyntaxNode::CapabilityVariable(node) => node.location,
        }
    }
}

/// Program metadata lifted from a `manifest_ast` / `manifest` declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub law: String,
    pub capabilities: Vec<String>,
    pub tapes: Dict,
    pub folds: Dict,
    pub rest_mesh: Dict,
    pub site_content: Dict,
    /// The declaration payload exactly as written.
    #[serde(skip)]
    pub raw: Dict,
}

/// A parsed program: ordered statements plus name-keyed capability registries.
///
/// Name-keyed collections keep the last construct parsed under a given name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub manifest: Option<Manifest>,
    pub declarations: Vec<Declaration>,
    pub assignments: Vec<Assignment>,
    pub blocks: Vec<BlockDefinition>,
    pub control_vectors: Vec<ControlVector>,
    pub returns: Vec<ReturnStatement>,
    pub atomic_blocks: BTreeMap<String, AtomicBlock>,
    pub capability_blocks: BTreeMap<String, CapabilityBlock>,
    pub capability_vectors: BTreeMap<String, CapabilityVector>,
    pub capability_variables: BTreeMap<String, CapabilityVariable>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a parsed construct into the matching collection.
    ///
    /// Returns `true` when a name-keyed construct replaced an earlier one.
    pub fn insert(&mut self, node: SyntaxNode) -> bool {
        match node {
            SyntaxNode::Declaration(decl) => {
                self.declarations.push(decl);
                false
            }
            SyntaxNode::Assignment(assign) => {
                self.assignments.push(assign);
                false
            }
            SyntaxNode::ControlVector(vector) => {
                self.control_vectors.push(vector);
                false
            }
            SyntaxNode::BlockDefinition(block) => {
                self.blocks.push(block);
                false
            }
            SyntaxNode::Return(ret) => {
                self.returns.push(ret);
                false
            }
            SyntaxNode::AtomicBlock(block) => self
                .atomic_blocks
                .insert(block.name.clone(), block)
                .is_some(),
            SyntaxNode::CapabilityBlock(block) => self
                .capability_blocks
                .insert(block.name.clone(), block)
                .is_some(),
            SyntaxNode::CapabilityVector(vector) => self
                .capability_vectors
                .insert(vector.name.clone(), vector)
                .is_some(),
            SyntaxNode::CapabilityVariable(variable) => self
                .capability_variables
                .insert(variable.name.clone(), variable)
                .is_some(),
        }
    }

    /// Serialize the tree into a [`Value`] tagged `"type": "Program"`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = Value::from(serde_json::to_value(self)?);
        if let Value::Dict(map) = &mut value {
            map.insert("type".to_string(), Value::from("Program"));
        }
        Ok(value)
    }
}
