//! K'UHUL source parser
//!
//! This module transforms K'UHUL source text into a [`ast::Program`]:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → program), with construct parsers split
//!   into `declarations` and `blocks`
//! - [`ast`]: Syntax tree node definitions
//!
//! # Language Surface
//!
//! - Glyph markers open constructs: `⟁Pop⟁` declarations, `⟁Wo⟁` assignments,
//!   `⟁Sek⟁` control vectors, `⟁Xul⟁` block definitions, `⟁Ch'en⟁` returns
//! - `C@@L` lines declare capability blocks, vectors and variables
//! - `@name: value` parameters attach to the construct above them
//! - Balanced `{…}` / `[…]` spans are embedded JSON
//!
//! Loops and conditionals are not executed; their markers tokenize and are
//! skipped or kept as inert data.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with error recovery. No external
//! parser generator dependencies.

pub mod ast;
mod blocks;
mod declarations;
pub mod lexer;
pub mod parse;

pub use declarations::{manifest_from_declaration, MANIFEST_DECLARATIONS};
pub use parse::{parse, ParseError, ParseErrors, Parser};
