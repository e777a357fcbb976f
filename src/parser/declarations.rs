//! Declaration, assignment and value parsing
//!
//! Also lifts the program manifest out of its declaration.

use crate::memory::value::{Dict, Value};
use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::Parser;

/// Declaration names whose payload is the program manifest.
pub const MANIFEST_DECLARATIONS: &[&str] = &["manifest_ast", "manifest"];

impl Parser {
    /// `⟁Pop⟁ name [json]`
    pub(crate) fn parse_declaration(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = self.expect(TokenKind::Ident, "declaration requires a following name")?;

        let value = if self.check(TokenKind::Json) {
            self.advance().value.unwrap_or_default()
        } else {
            Value::Null
        };

        Some(SyntaxNode::Declaration(Declaration {
            name: name.literal,
            value,
            location: marker.location,
        }))
    }

    /// `⟁Wo⟁ name [=] value`
    pub(crate) fn parse_assignment(&mut self) -> Option<SyntaxNode> {
        let marker = self.advance();
        let name = self.expect(TokenKind::Ident, "assignment requires a variable name")?;
        self.match_token(TokenKind::Assign);
        let value = self.parse_value();

        Some(SyntaxNode::Assignment(Assignment {
            name: name.literal,
            value,
            location: marker.location,
        }))
    }

    /// Literal value in assignment or parameter position.
    ///
    /// Identifiers and atoms become text (`@name` keeps its sigil so it can be
    /// resolved later); `⟁Yax⟁ name` is a reference and also yields `@name`.
    /// Anything else yields null without consuming.
    pub(crate) fn parse_value(&mut self) -> Value {
        match self.peek_kind() {
            TokenKind::Json | TokenKind::String | TokenKind::Number => {
                self.advance().value.unwrap_or_default()
            }
            TokenKind::Ident | TokenKind::At => Value::Text(self.advance().literal),
            TokenKind::True => {
                self.advance();
                Value::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                Value::Bool(false)
            }
            TokenKind::Null => {
                self.advance();
                Value::Null
            }
            TokenKind::Yax => {
                self.advance();
                match self.peek_kind() {
                    TokenKind::Ident | TokenKind::At => {
                        let target = self.advance().literal;
                        Value::Text(format!("@{}", target.trim_start_matches('@')))
                    }
                    _ => Value::Null,
                }
            }
            _ => Value::Null,
        }
    }
}

/// Build the manifest when `decl` is a manifest declaration with a dict payload.
pub fn manifest_from_declaration(decl: &Declaration) -> Option<Manifest> {
    if !MANIFEST_DECLARATIONS.contains(&decl.name.as_str()) {
        return None;
    }
    let raw = decl.value.as_dict()?;

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| raw.get(*key))
            .map(Value::to_text)
            .unwrap_or_default()
    };
    let section = |key: &str| -> Dict { raw.get(key).and_then(Value::as_dict).cloned().unwrap_or_default() };

    let capabilities = ["packs", "capabilities"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_list))
        .map(|items| items.iter().map(Value::to_text).collect())
        .unwrap_or_default();

    Some(Manifest {
        name: text(&["n", "name"]),
        version: text(&["v", "version"]),
        law: text(&["atomic_law", "law"]),
        capabilities,
        tapes: section("tapes"),
        folds: section("kuhul_folds"),
        rest_mesh: section("rest_mesh"),
        site_content: section("site_content"),
        raw: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::memory::value::Value;
    use crate::parser::parse::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration() {
        let (program, errors) = parse(r#"⟁Pop⟁ config {"debug": true}"#);
        assert!(errors.is_empty());
        assert_eq!(program.declarations[0].name, "config");
        assert_eq!(
            program.declarations[0].value.get("debug"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_declaration_without_payload() {
        let (program, _) = parse("⟁Pop⟁ marker");
        assert_eq!(program.declarations[0].value, Value::Null);
    }

    #[test]
    fn test_assignment_values() {
        let (program, errors) = parse(
            "⟁Wo⟁ a = 10\n⟁Wo⟁ b \"text\"\n⟁Wo⟁ c = @a\n⟁Wo⟁ d = true\n⟁Wo⟁ e = ident\n⟁Wo⟁ f = ⟁Yax⟁ a",
        );
        assert!(errors.is_empty());
        let values: Vec<Value> = program.assignments.iter().map(|a| a.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::Number(10.0),
                Value::from("text"),
                Value::from("@a"),
                Value::Bool(true),
                Value::from("ident"),
                Value::from("@a"),
            ]
        );
    }

    #[test]
    fn test_manifest_short_keys() {
        let (program, _) = parse(
            r#"⟁Pop⟁ manifest_ast {"n": "os", "v": "2.0", "packs": ["gram", "cms"], "tapes": {"t1": {}}}"#,
        );
        let manifest = program.manifest.expect("manifest");
        assert_eq!(manifest.name, "os");
        assert_eq!(manifest.version, "2.0");
        assert_eq!(manifest.capabilities, vec!["gram", "cms"]);
        assert!(manifest.tapes.contains_key("t1"));
        assert_eq!(manifest.raw.len(), 4);
    }

    #[test]
    fn test_manifest_long_keys() {
        let (program, _) = parse(r#"⟁Pop⟁ manifest {"name": "demo", "version": "1.0.0"}"#);
        let manifest = program.manifest.expect("manifest");
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.version, "1.0.0");
    }

    #[test]
    fn test_non_dict_manifest_ignored() {
        let (program, _) = parse("⟁Pop⟁ manifest [1, 2]");
        assert!(program.manifest.is_none());
        assert_eq!(program.declarations.len(), 1);
    }
}
