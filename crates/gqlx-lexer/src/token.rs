//! Token types for embedded expressions.
//!
//! Defines [`TokenKind`] for the supported JavaScript subset and [`Token`],
//! which pairs a kind with a byte [`Span`] and a line-break flag used for
//! automatic semicolon insertion.

use gqlx_types::ast::TemplatePart;
use gqlx_types::Span;
use std::fmt;

/// Punctuators, longest first so that scanning is maximal munch.
pub const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=",
    "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<", ">>",
    "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

/// Reserved words outside the supported subset.
///
/// They are lexed as [`TokenKind::Reserved`] so the parser can name them in
/// its error instead of reporting a free variable later.
pub const RESERVED_WORDS: &[&str] = &[
    "new", "class", "switch", "case", "default", "try", "catch", "finally", "throw",
    "yield", "import", "export", "extends", "super", "with", "of",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token of an embedded expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            newline_before,
        }
    }

    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    pub fn is_keyword(&self, k: Keyword) -> bool {
        self.kind == TokenKind::Keyword(k)
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// Numeric literal: `42`, `3.14`, `0xff`
    Number(f64),
    /// Quoted string literal with escapes resolved.
    String(String),
    /// `` `text` `` without substitutions.
    Template(TemplatePart),
    /// `` `text${ ``
    TemplateHead(TemplatePart),
    /// `` }text${ ``
    TemplateMiddle(TemplatePart),
    /// `` }text` ``
    TemplateTail(TemplatePart),

    // ── Names ─────────────────────────────────────────────────
    Identifier(String),
    Keyword(Keyword),
    /// A reserved word the subset does not support.
    Reserved(&'static str),

    /// Operator or punctuation, see [`PUNCTUATORS`].
    Punct(&'static str),

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::String(_) => write!(f, "string"),
            TokenKind::Template(_)
            | TokenKind::TemplateHead(_)
            | TokenKind::TemplateMiddle(_)
            | TokenKind::TemplateTail(_) => write!(f, "template"),
            TokenKind::Identifier(name) => write!(f, "'{name}'"),
            TokenKind::Keyword(k) => write!(f, "'{}'", k.as_str()),
            TokenKind::Reserved(word) => write!(f, "'{word}'"),
            TokenKind::Punct(p) => write!(f, "'{p}'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Keywords of the supported subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Const,
    Let,
    Var,
    If,
    Else,
    While,
    Do,
    For,
    Return,
    Break,
    Continue,
    Debugger,
    Function,
    This,
    Await,
    Async,
    Delete,
    Typeof,
    Void,
    In,
    Instanceof,
    True,
    False,
    Null,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let k = match word {
            "const" => Keyword::Const,
            "let" => Keyword::Let,
            "var" => Keyword::Var,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "for" => Keyword::For,
            "return" => Keyword::Return,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "function" => Keyword::Function,
            "this" => Keyword::This,
            "await" => Keyword::Await,
            "async" => Keyword::Async,
            "delete" => Keyword::Delete,
            "typeof" => Keyword::Typeof,
            "void" => Keyword::Void,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        };
        Some(k)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Const => "const",
            Keyword::Let => "let",
            Keyword::Var => "var",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::For => "for",
            Keyword::Return => "return",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Function => "function",
            Keyword::This => "this",
            Keyword::Await => "await",
            Keyword::Async => "async",
            Keyword::Delete => "delete",
            Keyword::Typeof => "typeof",
            Keyword::Void => "void",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuators_longest_first_within_prefix() {
        for (i, p) in PUNCTUATORS.iter().enumerate() {
            for q in &PUNCTUATORS[i + 1..] {
                assert!(
                    !(q.len() > p.len() && q.starts_with(p)),
                    "{q} must come before {p}"
                );
            }
        }
    }

    #[test]
    fn test_keyword_round_trip() {
        for word in ["const", "await", "instanceof", "null"] {
            let k = Keyword::from_word(word).unwrap();
            assert_eq!(k.as_str(), word);
        }
        assert_eq!(Keyword::from_word("get"), None);
    }
}
