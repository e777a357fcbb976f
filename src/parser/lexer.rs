//! Lexer (tokenizer) for K'UHUL source
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! The lexer never fails: characters it cannot classify become
//! [`TokenKind::Illegal`] tokens and the stream always ends with exactly one
//! [`TokenKind::Eof`].
//!
//! Recognition order at each position matters, because several constructs
//! share a first character:
//!
//! 1. glyph markers `⟁…⟁`
//! 2. block comments, then `//` and `#` line comments
//! 3. string literals
//! 4. balanced `{…}` / `[…]` spans, decoded as JSON when possible
//! 5. numbers (a leading `-` only when a digit follows)
//! 6. `@atom` references
//! 7. `C@@L` capability lines
//! 8. operators, two-character forms first
//! 9. identifiers and keywords
//! 10. newlines

use super::ast::SourceLocation;
use crate::memory::value::{dict, Value};
use std::fmt;

/// Delimiter of glyph markers such as `⟁Pop⟁`.
pub const GLYPH: char = '⟁';

/// Prefix of capability lines.
pub const COOL_PREFIX: &str = "C@@L";

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,
    Newline,
    Comment,
    BlockComment,

    // Glyph markers
    Pop,
    Wo,
    Sek,
    Xul,
    Chen,
    Yax,
    Kayab,
    Shen,
    Then,
    Else,
    Kumku,
    AtomicBlock,

    // Capability lines
    CoolBlock,
    CoolVector,
    CoolVariable,

    // Literals
    Ident,
    Number,
    String,
    Json,
    At,

    // Operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Keywords
    DefineFunction,
    DefineClass,
    DefineMacro,
    Return,
    If,
    For,
    While,
    In,
    From,
    To,
    New,
    True,
    False,
    Null,
    Map,
    Go,
    Channel,
    Observable,
    Subscribe,
    Query,
    AssertFact,
    DefineRule,
    MatrixMultiply,
    Transpose,
    Softmax,
}

impl TokenKind {
    /// Glyph markers and capability lines that open a top-level construct.
    pub fn is_top_level_marker(self) -> bool {
        matches!(
            self,
            TokenKind::Pop
                | TokenKind::Wo
                | TokenKind::Sek
                | TokenKind::Xul
                | TokenKind::Chen
                | TokenKind::AtomicBlock
                | TokenKind::CoolBlock
                | TokenKind::CoolVector
                | TokenKind::CoolVariable
        )
    }

    /// Tokens the parser never sees.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Comment | TokenKind::BlockComment | TokenKind::Newline
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Illegal => "illegal character",
            TokenKind::Eof => "end of file",
            TokenKind::Newline => "newline",
            TokenKind::Comment | TokenKind::BlockComment => "comment",
            TokenKind::Pop => "⟁Pop⟁",
            TokenKind::Wo => "⟁Wo⟁",
            TokenKind::Sek => "⟁Sek⟁",
            TokenKind::Xul => "⟁Xul⟁",
            TokenKind::Chen => "⟁Ch'en⟁",
            TokenKind::Yax => "⟁Yax⟁",
            TokenKind::Kayab => "⟁K'ayab⟁",
            TokenKind::Shen => "⟁Shen⟁",
            TokenKind::Then => "⟁then⟁",
            TokenKind::Else => "⟁else⟁",
            TokenKind::Kumku => "⟁Kumk'u⟁",
            TokenKind::AtomicBlock => "atomic block",
            TokenKind::CoolBlock => "C@@L BLOCK",
            TokenKind::CoolVector => "C@@L ATOMIC_VECTOR",
            TokenKind::CoolVariable => "C@@L ATOMIC_VARIABLE",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Json => "JSON literal",
            TokenKind::At => "@atom",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Caret => "'^'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Dot => "'.'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Question => "'?'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            keyword => return write!(f, "keyword '{}'", keyword_text(*keyword)),
        };
        write!(f, "{}", text)
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("define_function", TokenKind::DefineFunction),
    ("define_class", TokenKind::DefineClass),
    ("define_macro", TokenKind::DefineMacro),
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("for", TokenKind::For),
    ("while", TokenKind::While),
    ("in", TokenKind::In),
    ("from", TokenKind::From),
    ("to", TokenKind::To),
    ("new", TokenKind::New),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("map", TokenKind::Map),
    ("go", TokenKind::Go),
    ("channel", TokenKind::Channel),
    ("observable", TokenKind::Observable),
    ("subscribe", TokenKind::Subscribe),
    ("query", TokenKind::Query),
    ("assert_fact", TokenKind::AssertFact),
    ("define_rule", TokenKind::DefineRule),
    ("matrix_multiply", TokenKind::MatrixMultiply),
    ("transpose", TokenKind::Transpose),
    ("softmax", TokenKind::Softmax),
];

const GLYPHS: &[(&str, TokenKind)] = &[
    ("Pop", TokenKind::Pop),
    ("Wo", TokenKind::Wo),
    ("Sek", TokenKind::Sek),
    ("Xul", TokenKind::Xul),
    ("Ch'en", TokenKind::Chen),
    ("Yax", TokenKind::Yax),
    ("K'ayab", TokenKind::Kayab),
    ("Shen", TokenKind::Shen),
    ("then", TokenKind::Then),
    ("else", TokenKind::Else),
    ("Kumk'u", TokenKind::Kumku),
];

/// Keyword kind for an identifier, if it is reserved.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == ident)
        .map(|(_, kind)| *kind)
}

fn keyword_text(kind: TokenKind) -> &'static str {
    KEYWORDS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(text, _)| *text)
        .unwrap_or("?")
}

fn lookup_glyph(content: &str) -> Option<TokenKind> {
    GLYPHS
        .iter()
        .find(|(text, _)| *text == content)
        .map(|(_, kind)| *kind)
}

/// A scanned token. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token (decoded text for strings).
    pub literal: String,
    /// Decoded payload: JSON spans, numbers, strings, atoms, capability lines.
    pub value: Option<Value>,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            literal: literal.into(),
            value: None,
            location,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Construct name carried by capability-line and atomic-block tokens.
    pub fn construct_name(&self) -> Option<&str> {
        match &self.value {
            Some(Value::Text(name)) => Some(name),
            Some(value) => value.get("name").and_then(Value::as_str),
            None => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {:?} {:?}",
            self.location.line, self.location.column, self.kind, self.literal
        )
    }
}

/// Tokenize a whole source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Lexer for K'UHUL source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }

    /// Get next token
    fn next_token(&mut self) -> Token {
        let loc = self.current_location();
        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::Eof, "", loc);
        };

        match ch {
            GLYPH => self.glyph_marker(loc),
            '/' if self.peek_ahead(1) == Some('*') => self.block_comment(loc),
            '/' if self.peek_ahead(1) == Some('/') => self.line_comment(loc, 2),
            '#' => self.line_comment(loc, 1),
            '"' => self.string_literal(loc),
            '{' | '[' => self.structured_span(loc),
            '0'..='9' => self.number_literal(loc),
            '-' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(loc)
            }
            '@' => self.atom(loc),
            'C' if self.starts_with(COOL_PREFIX) => self.capability_line(loc),
            _ => {
                if let Some(token) = self.operator(loc) {
                    token
                } else if ch.is_alphabetic() || ch == '_' {
                    self.identifier_or_keyword(loc)
                } else if ch == '\n' {
                    self.advance();
                    Token::new(TokenKind::Newline, "\n", loc)
                } else {
                    self.advance();
                    Token::new(TokenKind::Illegal, ch.to_string(), loc)
                }
            }
        }
    }

    /// `⟁content⟁`: known glyph, atomic-block opener, or a plain identifier.
    fn glyph_marker(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // opening glyph
        let mut content = String::new();
        let mut closed = false;

        while let Some(ch) = self.advance() {
            if ch == GLYPH {
                closed = true;
                break;
            }
            content.push(ch);
        }

        if let Some(kind) = lookup_glyph(&content) {
            return Token::new(kind, format!("{GLYPH}{content}{GLYPH}"), loc);
        }

        if let Some(rest) = content.strip_prefix(" ATOMIC_BLOCK") {
            let name = rest.trim().trim_start_matches('_').to_string();
            return Token::new(TokenKind::AtomicBlock, content.trim(), loc)
                .with_value(Value::Text(name));
        }

        let mut literal = format!("{GLYPH}{content}");
        if closed {
            literal.push(GLYPH);
        }
        Token::new(TokenKind::Ident, literal, loc)
    }

    fn block_comment(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // '/'
        self.advance(); // '*'
        let mut text = String::new();

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                break;
            }
            if let Some(ch) = self.advance() {
                text.push(ch);
            }
        }

        Token::new(TokenKind::BlockComment, text.trim(), loc)
    }

    /// Line comment up to, not including, the newline.
    fn line_comment(&mut self, loc: SourceLocation, marker_len: usize) -> Token {
        for _ in 0..marker_len {
            self.advance();
        }
        let text = self.take_while(|ch| ch != '\n');
        Token::new(TokenKind::Comment, text.trim(), loc)
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => break,
                '\\' => match self.advance() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('r') => string.push('\r'),
                    Some(other) => string.push(other),
                    None => break,
                },
                _ => string.push(ch),
            }
        }

        Token::new(TokenKind::String, string.clone(), loc).with_value(Value::Text(string))
    }

    /// Balanced `{…}` or `[…]` span. Quoted text inside the span does not
    /// affect nesting. Valid JSON becomes a `Json` token, anything else a
    /// `String` token holding the raw text.
    fn structured_span(&mut self, loc: SourceLocation) -> Token {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        while let Some(ch) = self.advance() {
            text.push(ch);
            if in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => Token::new(TokenKind::Json, text, loc).with_value(Value::from(json)),
            Err(_) => Token::new(TokenKind::String, text.clone(), loc).with_value(Value::Text(text)),
        }
    }

    fn number_literal(&mut self, loc: SourceLocation) -> Token {
        let mut text = String::new();
        if self.peek() == Some('-') {
            self.advance();
            text.push('-');
        }
        text.push_str(&self.take_while(|ch| ch.is_ascii_digit()));

        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|ch| ch.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_ahead(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(ch) = self.advance() {
                        text.push(ch);
                    }
                }
                text.push_str(&self.take_while(|ch| ch.is_ascii_digit()));
            }
        }

        let number = text.parse::<f64>().unwrap_or(0.0);
        Token::new(TokenKind::Number, text, loc).with_value(Value::Number(number))
    }

    fn atom(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // '@'
        let name = self.take_while(|ch| ch.is_alphanumeric() || ch == '_');
        Token::new(TokenKind::At, format!("@{name}"), loc).with_value(Value::Text(name))
    }

    /// `C@@L ...` to end of line. The decoded value carries the construct
    /// kind and its extracted name.
    fn capability_line(&mut self, loc: SourceLocation) -> Token {
        let text = self.take_while(|ch| ch != '\n');
        let literal = text.trim().to_string();

        let (kind, keyword, name) = if literal.contains("ATOMIC_VECTOR") {
            let name = construct_name(&literal, "ATOMIC_VECTOR", true);
            (TokenKind::CoolVector, "ATOMIC_VECTOR", name)
        } else if literal.contains("ATOMIC_VARIABLE") {
            let name = construct_name(&literal, "ATOMIC_VARIABLE", true);
            (TokenKind::CoolVariable, "ATOMIC_VARIABLE", name)
        } else if literal.contains("BLOCK") {
            let name = construct_name(&literal, "BLOCK", false);
            (TokenKind::CoolBlock, "BLOCK", name)
        } else {
            return Token::new(TokenKind::Ident, literal, loc);
        };

        Token::new(kind, literal, loc).with_value(Value::Dict(dict([
            ("kind", keyword),
            ("name", name.as_str()),
        ])))
    }

    fn operator(&mut self, loc: SourceLocation) -> Option<Token> {
        let ch = self.peek()?;
        let two = self.peek_ahead(1).map(|next| (ch, next));

        let double = match two {
            Some(('=', '=')) => Some(TokenKind::EqEq),
            Some(('!', '=')) => Some(TokenKind::NotEq),
            Some(('<', '=')) => Some(TokenKind::Le),
            Some(('>', '=')) => Some(TokenKind::Ge),
            Some(('&', '&')) => Some(TokenKind::AndAnd),
            Some(('|', '|')) => Some(TokenKind::OrOr),
            _ => None,
        };
        if let Some(kind) = double {
            self.advance();
            self.advance();
            return Some(Token::new(kind, self.slice_back(2), loc));
        }

        let kind = match ch {
            '=' => TokenKind::Assign,
            '!' => TokenKind::Bang,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '?' => TokenKind::Question,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            _ => return None,
        };
        self.advance();
        Some(Token::new(kind, ch.to_string(), loc))
    }

    fn identifier_or_keyword(&mut self, loc: SourceLocation) -> Token {
        let ident = self.take_while(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.');
        let kind = lookup_keyword(&ident).unwrap_or(TokenKind::Ident);
        Token::new(kind, ident, loc)
    }

    /// Skip spaces, tabs and carriage returns. Newlines are tokens.
    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.advance();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn starts_with(&self, prefix: &str) -> bool {
        prefix
            .chars()
            .enumerate()
            .all(|(i, ch)| self.peek_ahead(i) == Some(ch))
    }

    fn slice_back(&self, n: usize) -> String {
        self.input[self.position - n..self.position].iter().collect()
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Name following `C@@L <keyword>`: a run of word characters, prefixed with
/// `@` for vectors and variables. Falls back to `unknown` / `@unknown`.
fn construct_name(literal: &str, keyword: &str, atom: bool) -> String {
    let fallback = if atom { "@unknown" } else { "unknown" };
    let mut words = literal.split_whitespace();

    if words.next() != Some(COOL_PREFIX) || words.next() != Some(keyword) {
        return fallback.to_string();
    }
    let Some(word) = words.next() else {
        return fallback.to_string();
    };

    let stem = if atom {
        match word.strip_prefix('@') {
            Some(stem) => stem,
            None => return fallback.to_string(),
        }
    } else {
        word
    };
    let name: String = stem
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect();

    match (name.is_empty(), atom) {
        (true, _) => fallback.to_string(),
        (false, true) => format!("@{name}"),
        (false, false) => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_assignment_tokens() {
        let tokens = tokenize("⟁Wo⟁ x = 42");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].kind, TokenKind::Wo);
        assert!(matches!(tokens[1].kind, TokenKind::Ident) && tokens[1].literal == "x");
        assert_eq!(tokens[2].kind, TokenKind::Assign);
        assert_eq!(tokens[3].value, Some(Value::Number(42.0)));
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_declaration_with_json() {
        let tokens = tokenize(r#"⟁Pop⟁ manifest_ast {"n": "test"}"#);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].kind, TokenKind::Pop);
        assert_eq!(tokens[2].kind, TokenKind::Json);
        assert_eq!(
            tokens[2].value.as_ref().and_then(|v| v.get("n")),
            Some(&Value::from("test"))
        );
    }

    #[test]
    fn test_glyph_table() {
        assert_eq!(
            kinds("⟁Sek⟁ ⟁Xul⟁ ⟁Ch'en⟁ ⟁Yax⟁ ⟁K'ayab⟁ ⟁Kumk'u⟁ ⟁then⟁"),
            vec![
                TokenKind::Sek,
                TokenKind::Xul,
                TokenKind::Chen,
                TokenKind::Yax,
                TokenKind::Kayab,
                TokenKind::Kumku,
                TokenKind::Then,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_glyph_is_identifier() {
        let tokens = tokenize("⟁Zip⟁");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].literal, "⟁Zip⟁");
    }

    #[test]
    fn test_atomic_block_glyph() {
        let tokens = tokenize("⟁ ATOMIC_BLOCK_boot⟁");
        assert_eq!(tokens[0].kind, TokenKind::AtomicBlock);
        assert_eq!(tokens[0].construct_name(), Some("boot"));
    }

    #[test]
    fn test_json_array_and_invalid_span() {
        let tokens = tokenize("[1, 2, 3]");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Json);

        let tokens = tokenize("{not json}");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "{not json}");
    }

    #[test]
    fn test_span_ignores_brackets_in_strings() {
        let tokens = tokenize(r#"{"a": "}"} x"#);
        assert_eq!(tokens[0].kind, TokenKind::Json);
        assert_eq!(tokens[1].literal, "x");
    }

    #[test]
    fn test_span_line_tracking() {
        let tokens = tokenize("{\n\"a\": 1\n}\n⟁Wo⟁ x");
        let wo = tokens.iter().find(|t| t.kind == TokenKind::Wo).unwrap();
        assert_eq!(wo.location, SourceLocation::new(4, 1));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("# comment\n⟁Wo⟁ x = 1"),
            vec![
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Wo,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
        let tokens = tokenize("/* a\nb */ x");
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert_eq!(tokens[1].location, SourceLocation::new(2, 6));
    }

    #[test]
    fn test_capability_lines() {
        let tokens = tokenize("C@@L BLOCK test_handler");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::CoolBlock);
        assert_eq!(tokens[0].construct_name(), Some("test_handler"));

        let tokens = tokenize("C@@L ATOMIC_VECTOR @vec_a\nC@@L ATOMIC_VARIABLE @count");
        assert_eq!(tokens[0].kind, TokenKind::CoolVector);
        assert_eq!(tokens[0].construct_name(), Some("@vec_a"));
        assert_eq!(tokens[2].kind, TokenKind::CoolVariable);
        assert_eq!(tokens[2].construct_name(), Some("@count"));

        let tokens = tokenize("C@@L BLOCK");
        assert_eq!(tokens[0].construct_name(), Some("unknown"));

        let tokens = tokenize("C@@L SOMETHING");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
    }

    #[test]
    fn test_atom_param() {
        assert_eq!(
            kinds("@handler: kernel_boot"),
            vec![TokenKind::At, TokenKind::Colon, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("-3.5e2 7. 1e");
        assert_eq!(tokens[0].value, Some(Value::Number(-350.0)));
        assert_eq!(tokens[1].value, Some(Value::Number(7.0)));
        assert_eq!(tokens[2].kind, TokenKind::Dot);
        assert_eq!(tokens[3].value, Some(Value::Number(1.0)));
        assert_eq!(tokens[4].literal, "e");
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            kinds("== != <= >= && || = ! ; true softmax x.y"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Assign,
                TokenKind::Bang,
                TokenKind::Semicolon,
                TokenKind::True,
                TokenKind::Softmax,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_illegal() {
        let tokens = tokenize(r#""a\"b\qc" $"#);
        assert_eq!(tokens[0].literal, "a\"bqc");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].literal, "$");
    }
}
