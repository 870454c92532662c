//! Lexer for the declarative schema text (GraphQL SDL).
//!
//! Only the token stream is needed here: the region extractor walks it to
//! find container types and field bodies, and jumps over embedded
//! expressions with [`SdlLexer::reset`]. Commas and `#` comments are
//! insignificant and skipped.

use gqlx_types::{ErrorCode, GqlxError, SourceFile, Span};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SdlTokenKind {
    Bang,
    Dollar,
    Amp,
    LParen,
    RParen,
    Spread,
    Colon,
    Equals,
    At,
    LBracket,
    RBracket,
    LBrace,
    Pipe,
    RBrace,
    Name(String),
    Int(String),
    Float(String),
    String(String),
    BlockString(String),
    Eof,
}

impl fmt::Display for SdlTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdlTokenKind::Bang => "!",
            SdlTokenKind::Dollar => "$",
            SdlTokenKind::Amp => "&",
            SdlTokenKind::LParen => "(",
            SdlTokenKind::RParen => ")",
            SdlTokenKind::Spread => "...",
            SdlTokenKind::Colon => ":",
            SdlTokenKind::Equals => "=",
            SdlTokenKind::At => "@",
            SdlTokenKind::LBracket => "[",
            SdlTokenKind::RBracket => "]",
            SdlTokenKind::LBrace => "{",
            SdlTokenKind::Pipe => "|",
            SdlTokenKind::RBrace => "}",
            SdlTokenKind::Name(_) => "Name",
            SdlTokenKind::Int(_) => "Int",
            SdlTokenKind::Float(_) => "Float",
            SdlTokenKind::String(_) => "String",
            SdlTokenKind::BlockString(_) => "BlockString",
            SdlTokenKind::Eof => "<EOF>",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlToken {
    pub kind: SdlTokenKind,
    pub span: Span,
}

impl SdlToken {
    /// The name carried by a `Name` token.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            SdlTokenKind::Name(n) => Some(n),
            _ => None,
        }
    }
}

pub struct SdlLexer<'src> {
    source: &'src [u8],
    file: &'src SourceFile,
    pos: usize,
}

impl<'src> SdlLexer<'src> {
    pub fn new(file: &'src SourceFile) -> Self {
        Self {
            source: file.source.as_bytes(),
            file,
            pos: 0,
        }
    }

    /// Continue lexing from `offset`.
    pub fn reset(&mut self, offset: usize) {
        self.pos = offset.min(self.source.len());
    }

    pub fn next_token(&mut self) -> Result<SdlToken, GqlxError> {
        self.skip_ignored();
        let start = self.pos;
        let Some(ch) = self.source.get(self.pos).copied() else {
            return Ok(SdlToken {
                kind: SdlTokenKind::Eof,
                span: Span::point(start),
            });
        };

        let kind = match ch {
            b'!' => self.single(SdlTokenKind::Bang),
            b'$' => self.single(SdlTokenKind::Dollar),
            b'&' => self.single(SdlTokenKind::Amp),
            b'(' => self.single(SdlTokenKind::LParen),
            b')' => self.single(SdlTokenKind::RParen),
            b':' => self.single(SdlTokenKind::Colon),
            b'=' => self.single(SdlTokenKind::Equals),
            b'@' => self.single(SdlTokenKind::At),
            b'[' => self.single(SdlTokenKind::LBracket),
            b']' => self.single(SdlTokenKind::RBracket),
            b'{' => self.single(SdlTokenKind::LBrace),
            b'|' => self.single(SdlTokenKind::Pipe),
            b'}' => self.single(SdlTokenKind::RBrace),
            b'.' if self.source[self.pos..].starts_with(b"...") => {
                self.pos += 3;
                SdlTokenKind::Spread
            }
            b'"' if self.source[self.pos..].starts_with(b"\"\"\"") => self.block_string()?,
            b'"' => self.string()?,
            b'-' | b'0'..=b'9' => self.number()?,
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while self
                    .source
                    .get(self.pos)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
                {
                    self.pos += 1;
                }
                SdlTokenKind::Name(self.text(start).to_string())
            }
            _ => {
                let c = self.file.source[self.pos..].chars().next().unwrap_or('?');
                return Err(self.error(
                    format!("Syntax Error: Unexpected character '{c}'."),
                    Span::new(start, start + c.len_utf8()),
                ));
            }
        };

        Ok(SdlToken {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn single(&mut self, kind: SdlTokenKind) -> SdlTokenKind {
        self.pos += 1;
        kind
    }

    fn text(&self, start: usize) -> &'src str {
        self.file.source.get(start..self.pos).unwrap_or("")
    }

    fn error(&self, message: impl Into<String>, span: Span) -> GqlxError {
        GqlxError::new(ErrorCode::SCHEMA_SYNTAX, message, self.file.location(span))
    }

    fn skip_ignored(&mut self) {
        while let Some(&c) = self.source.get(self.pos) {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' | b',' => self.pos += 1,
                b'#' => {
                    while !matches!(self.source.get(self.pos), None | Some(b'\n' | b'\r')) {
                        self.pos += 1;
                    }
                }
                // byte order mark
                0xef if self.source[self.pos..].starts_with(&[0xef, 0xbb, 0xbf]) => {
                    self.pos += 3
                }
                _ => break,
            }
        }
    }

    fn number(&mut self) -> Result<SdlTokenKind, GqlxError> {
        let start = self.pos;
        if self.source[self.pos] == b'-' {
            self.pos += 1;
        }
        let digits = |lexer: &mut Self| {
            let from = lexer.pos;
            while lexer.source.get(lexer.pos).is_some_and(u8::is_ascii_digit) {
                lexer.pos += 1;
            }
            lexer.pos > from
        };
        if !digits(self) {
            return Err(self.error(
                "Syntax Error: Invalid number, expected digit.",
                Span::new(start, self.pos + 1),
            ));
        }
        let mut float = false;
        if self.source.get(self.pos) == Some(&b'.') {
            float = true;
            self.pos += 1;
            if !digits(self) {
                return Err(self.error(
                    "Syntax Error: Invalid number, expected digit.",
                    Span::new(start, self.pos),
                ));
            }
        }
        if matches!(self.source.get(self.pos), Some(b'e' | b'E')) {
            float = true;
            self.pos += 1;
            if matches!(self.source.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !digits(self) {
                return Err(self.error(
                    "Syntax Error: Invalid number, expected digit.",
                    Span::new(start, self.pos),
                ));
            }
        }
        let text = self.text(start).to_string();
        Ok(if float {
            SdlTokenKind::Float(text)
        } else {
            SdlTokenKind::Int(text)
        })
    }

    fn string(&mut self) -> Result<SdlTokenKind, GqlxError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let rest = &self.file.source[self.pos..];
            let Some(c) = rest.chars().next() else {
                return Err(self.error(
                    "Syntax Error: Unterminated string.",
                    Span::new(start, self.pos),
                ));
            };
            match c {
                '"' => {
                    self.pos += 1;
                    return Ok(SdlTokenKind::String(value));
                }
                '\n' | '\r' => {
                    return Err(self.error(
                        "Syntax Error: Unterminated string.",
                        Span::new(start, self.pos),
                    ))
                }
                '\\' => {
                    let escaped = rest[1..].chars().next().unwrap_or('\\');
                    self.pos += 1 + escaped.len_utf8();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'u' => {
                            let hex = self.file.source.get(self.pos..self.pos + 4).unwrap_or("");
                            let code = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
                            let Some(code) = code else {
                                return Err(self.error(
                                    "Syntax Error: Invalid Unicode escape sequence.",
                                    Span::new(self.pos - 2, self.pos),
                                ));
                            };
                            value.push(code);
                            self.pos += 4;
                        }
                        other => value.push(other),
                    }
                }
                other => {
                    value.push(other);
                    self.pos += other.len_utf8();
                }
            }
        }
    }

    fn block_string(&mut self) -> Result<SdlTokenKind, GqlxError> {
        let start = self.pos;
        self.pos += 3;
        let body_start = self.pos;
        loop {
            let rest = &self.source[self.pos..];
            if rest.is_empty() {
                return Err(self.error(
                    "Syntax Error: Unterminated string.",
                    Span::new(start, self.pos),
                ));
            }
            if rest.starts_with(b"\\\"\"\"") {
                self.pos += 4;
            } else if rest.starts_with(b"\"\"\"") {
                let raw = self.file.source[body_start..self.pos].replace("\\\"\"\"", "\"\"\"");
                self.pos += 3;
                return Ok(SdlTokenKind::BlockString(raw));
            } else {
                self.pos += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<SdlTokenKind> {
        let file = SourceFile::new("t", src);
        let mut lexer = SdlLexer::new(&file);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t.kind == SdlTokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn test_field_declaration() {
        let k = kinds("type Query { foo(id: ID!): [String] }");
        assert_eq!(k[0], SdlTokenKind::Name("type".into()));
        assert_eq!(k[2], SdlTokenKind::LBrace);
        assert!(k.contains(&SdlTokenKind::Bang));
        assert_eq!(k.last(), Some(&SdlTokenKind::RBrace));
    }

    #[test]
    fn test_commas_and_comments_ignored() {
        let k = kinds("a, b # comment, c\n d");
        assert_eq!(
            k,
            vec![
                SdlTokenKind::Name("a".into()),
                SdlTokenKind::Name("b".into()),
                SdlTokenKind::Name("d".into()),
            ]
        );
    }

    #[test]
    fn test_values() {
        let k = kinds(r#"-12 3.5e2 "a\"b" """block"""  ..."#);
        assert_eq!(k[0], SdlTokenKind::Int("-12".into()));
        assert_eq!(k[1], SdlTokenKind::Float("3.5e2".into()));
        assert_eq!(k[2], SdlTokenKind::String("a\"b".into()));
        assert_eq!(k[3], SdlTokenKind::BlockString("block".into()));
        assert_eq!(k[4], SdlTokenKind::Spread);
    }

    #[test]
    fn test_reset_skips_text() {
        let file = SourceFile::new("t", "a ??? b");
        let mut lexer = SdlLexer::new(&file);
        lexer.next_token().unwrap();
        lexer.reset(6);
        assert_eq!(lexer.next_token().unwrap().kind, SdlTokenKind::Name("b".into()));
    }

    #[test]
    fn test_unexpected_character() {
        let file = SourceFile::new("t", "type ?");
        let mut lexer = SdlLexer::new(&file);
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.code, ErrorCode::SCHEMA_SYNTAX);
        assert_eq!(err.location.column, 6);
    }
}
