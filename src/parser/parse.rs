//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser is a recursive descent parser with one entry point per
//! top-level construct:
//! - This module: Parser struct, helper methods, and the top-level loop
//! - `declarations`: `⟁Pop⟁` declarations, `⟁Wo⟁` assignments and values
//! - `blocks`: `⟁Sek⟁`, `⟁Xul⟁`, `⟁Ch'en⟁`, atomic blocks and `C@@L` constructs
//!
//! Parsing never stops at the first problem. Missing tokens are recorded as
//! [`ParseError`]s and the parser resumes at the next token, so callers always
//! get a (possibly partial) [`Program`] together with every error found.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::declarations::manifest_from_declaration;
use crate::parser::lexer::{tokenize, Token, TokenKind};
use std::fmt;

/// Parser error type
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Every error from one parse, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Parse source text into a program plus any errors encountered.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    Parser::new(source).parse_program()
}

/// Recursive descent parser for K'UHUL
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self::from_tokens(tokenize(source))
    }

    /// Build a parser over an existing token stream. Comments and newlines
    /// are dropped; a trailing `Eof` is added if missing.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| !token.kind.is_trivia())
            .collect();

        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let location = tokens.last().map(|t| t.location).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", location));
        }

        Self {
            tokens,
            position: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the entire program
    pub fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::new();
        let mut after_block = false;

        while !self.is_at_end() {
            let node = match self.peek_kind() {
                TokenKind::Pop => self.parse_declaration(),
                TokenKind::Wo => self.parse_assignment(),
                TokenKind::Sek => self.parse_control_vector(),
                TokenKind::Xul => self.parse_block_definition(),
                TokenKind::Chen => self.parse_return(),
                TokenKind::AtomicBlock => self.parse_atomic_block(),
                TokenKind::CoolBlock => self.parse_capability_block(),
                TokenKind::CoolVector => self.parse_capability_vector(),
                TokenKind::CoolVariable => self.parse_capability_variable(),
                _ => {
                    self.advance();
                    continue;
                }
            };

            let Some(node) = node else {
                after_block = false;
                continue;
            };

            if let SyntaxNode::Return(ret) = &node {
                if after_block {
                    if let Some(block) = program.blocks.last_mut() {
                        if block.emit.is_none() {
                            block.emit = Some(ret.value.clone());
                            after_block = false;
                            continue;
                        }
                    }
                }
            }
            after_block = matches!(node, SyntaxNode::BlockDefinition(_));

            if let SyntaxNode::Declaration(decl) = &node {
                if let Some(manifest) = manifest_from_declaration(decl) {
                    program.manifest = Some(manifest);
                }
            }

            let location = node.location();
            if program.insert(node) {
                tracing::warn!(
                    line = location.line,
                    column = location.column,
                    "duplicate construct name, later definition wins"
                );
            }
        }

        (program, self.errors)
    }

    // ===== Helper methods =====

    pub(crate) fn peek(&self) -> &Token {
        // from_tokens guarantees a trailing Eof, and advance never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    /// True when the next token cannot continue the current construct.
    pub(crate) fn at_construct_end(&self) -> bool {
        self.is_at_end() || self.peek_kind().is_top_level_marker()
    }

    /// Consume a token of `kind`, or record `message` at the current token.
    pub(crate) fn expect(&mut self, kind: TokenKind, message: &str) -> Option<Token> {
        if self.check(kind) {
            return Some(self.advance());
        }
        let found = self.peek_kind();
        self.error(format!("{} (found {})", message, found));
        None
    }

    pub(crate) fn error(&mut self, message: String) {
        let location = self.peek().location;
        self.errors.push(ParseError { message, location });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::Value;

    #[test]
    fn test_empty_program() {
        let (program, errors) = parse("");
        assert!(errors.is_empty());
        assert_eq!(program, Program::new());
    }

    #[test]
    fn test_error_recovery() {
        let (program, errors) = parse("⟁Pop⟁ ⟁Wo⟁ x = 1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("declaration requires a following name"));
        assert_eq!(errors[0].location, SourceLocation::new(1, 7));
        assert_eq!(program.assignments.len(), 1);
    }

    #[test]
    fn test_stray_tokens_skipped() {
        let (program, errors) = parse("hello 1 2 ⟁Wo⟁ y = \"z\"");
        assert!(errors.is_empty());
        assert_eq!(program.assignments[0].value, Value::from("z"));
    }

    #[test]
    fn test_emit_attaches_to_block() {
        let (program, _) = parse("⟁Xul⟁ add @a: 1\n⟁Ch'en⟁ {\"result\": 30}\n⟁Ch'en⟁ 5");
        assert_eq!(
            program.blocks[0].emit.as_ref().and_then(|v| v.get("result")),
            Some(&Value::Number(30.0))
        );
        assert_eq!(program.returns.len(), 1);
    }

    #[test]
    fn test_parse_errors_display() {
        let (_, errors) = parse("⟁Wo⟁ = 1\n⟁Xul⟁");
        let joined = ParseErrors(errors).to_string();
        assert!(joined.contains("line 1, column 6: assignment requires a variable name"));
        assert!(joined.contains("; line 2"));
    }
}
