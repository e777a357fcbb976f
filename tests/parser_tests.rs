// Integration tests for tokenizing and parsing whole programs

use kuhul::parser::ast::SyntaxNode;
use kuhul::parser::lexer::TokenKind;
use kuhul::{parse, tokenize, Value};
use pretty_assertions::assert_eq;

const SHELL_PROGRAM: &str = r#"
# K'UHUL shell program
⟁Pop⟁ manifest_ast {
  "n": "shell",
  "v": "1.2.0",
  "atomic_law": "xcfe",
  "packs": ["ram", "gram"],
  "tapes": {"t1": {"label": "Main", "role": "root"}}
}

⟁Wo⟁ greeting = "hello"
⟁Wo⟁ limit 10

C@@L ATOMIC_VARIABLE @counter
@default: 0
@scope: session

C@@L ATOMIC_VECTOR @route
@path: "/boot"

C@@L BLOCK boot
@handler: kernel_boot

⟁Xul⟁ startup @mode: fast
C@@L BLOCK first
@handler: ram_set
@key: greeting
@value: ⟁Yax⟁ greeting
⟁Ch'en⟁ {"done": true}
"#;

#[test]
fn test_tokenize_program_is_terminated_once() {
    let tokens = tokenize(SHELL_PROGRAM);
    let eof_count = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();

    assert_eq!(eof_count, 1);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Illegal));
}

#[test]
fn test_locations_survive_multiline_json() {
    let tokens = tokenize(SHELL_PROGRAM);
    let assignment = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Wo)
        .expect("assignment marker");

    // The manifest JSON spans lines 3-9.
    assert_eq!(assignment.location.line, 11);
    assert_eq!(assignment.location.column, 1);
}

#[test]
fn test_parse_full_program() {
    let (program, errors) = parse(SHELL_PROGRAM);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    let manifest = program.manifest.as_ref().expect("manifest");
    assert_eq!(manifest.name, "shell");
    assert_eq!(manifest.version, "1.2.0");
    assert_eq!(manifest.law, "xcfe");
    assert_eq!(manifest.capabilities, vec!["ram".to_string(), "gram".to_string()]);
    assert!(manifest.tapes.contains_key("t1"));

    assert_eq!(program.assignments.len(), 2);
    assert_eq!(program.assignments[0].value, Value::from("hello"));
    assert_eq!(program.assignments[1].value, Value::Number(10.0));

    let counter = &program.capability_variables["@counter"];
    assert_eq!(counter.default_value, Value::Number(0.0));
    assert_eq!(counter.scope, "session");

    assert_eq!(program.capability_vectors["@route"].params["path"], Value::from("/boot"));
    assert_eq!(program.capability_blocks["boot"].handler_name(), "kernel_boot");

    let block = &program.blocks[0];
    assert_eq!(block.name, "startup");
    assert_eq!(block.emit.as_ref().and_then(|v| v.get("done")), Some(&Value::Bool(true)));
    let SyntaxNode::CapabilityBlock(nested) = &block.body[0] else {
        panic!("expected nested capability block");
    };
    assert_eq!(nested.params["value"], Value::from("@greeting"));
}

#[test]
fn test_nested_block_is_not_registered_at_top_level() {
    let (program, _) = parse(SHELL_PROGRAM);
    assert!(!program.capability_blocks.contains_key("first"));
}

#[test]
fn test_parse_errors_are_collected() {
    let (program, errors) = parse("⟁Pop⟁\n⟁Wo⟁ = 1\n⟁Wo⟁ ok = 2");

    assert_eq!(errors.len(), 2);
    // Reported at the token that was found instead of the name.
    assert_eq!(errors[0].to_string(), "line 2, column 1: declaration requires a following name (found ⟁Wo⟁)");
    assert!(errors[1].message.starts_with("assignment requires a variable name"));
    assert_eq!(program.assignments.len(), 1);
    assert_eq!(program.assignments[0].name, "ok");
}

#[test]
fn test_program_value_is_tagged() {
    let (program, _) = parse(SHELL_PROGRAM);
    let value = program.to_value().expect("serializable");

    assert_eq!(value.get("type"), Some(&Value::from("Program")));
    assert!(value.get("capabilityBlocks").and_then(|b| b.get("boot")).is_some());
    assert!(value.get("capabilityVariables").is_some());
}
