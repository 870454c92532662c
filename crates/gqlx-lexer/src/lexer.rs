//! On-demand lexer for embedded resolver expressions.
//!
//! Features:
//! - Starts at any byte offset of the composite source and only scans as far
//!   as the parser asks, so the end of an expression is known exactly
//! - Template literals with `${expr}` via a mode stack
//! - `//` and `/* */` comments skipped, line breaks recorded for ASI
//! - No regular expression literals: `/` is always division
//! - Fail-fast: the first malformed lexeme is returned as an error

use gqlx_types::ast::TemplatePart;
use gqlx_types::{ErrorCode, GqlxError, SourceFile, Span};

use crate::token::{Keyword, Token, TokenKind, PUNCTUATORS, RESERVED_WORDS};

/// Lexer mode: tracks template interpolation nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Normal code scanning.
    Normal,
    /// Inside a `${...}` substitution. The `u32` tracks brace depth so we
    /// know when the substitution's closing `}` is reached.
    Interpolation { brace_depth: u32 },
}

/// The expression lexer.
pub struct Lexer<'src> {
    source: &'src [u8],
    file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    mode_stack: Vec<Mode>,
}

impl<'src> Lexer<'src> {
    /// Create a lexer positioned at `offset`.
    pub fn new(file: &'src SourceFile, offset: usize) -> Self {
        Self {
            source: file.source.as_bytes(),
            file,
            pos: offset.min(file.source.len()),
            mode_stack: vec![Mode::Normal],
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The source text covered by `span`.
    pub fn slice(&self, span: Span) -> &'src str {
        self.file.source.get(span.start..span.end).unwrap_or("")
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, GqlxError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, Span::point(start), newline_before));
        };

        let kind = match ch {
            b'"' | b'\'' => self.scan_string(ch)?,
            b'`' => {
                self.pos += 1;
                self.scan_template(start, true)?
            }
            b'0'..=b'9' => self.scan_number()?,
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.scan_number()?,
            b'}' if self.closes_interpolation() => {
                self.mode_stack.pop();
                self.pos += 1;
                self.scan_template(start, false)?
            }
            c if is_ident_start(c) => self.scan_word(),
            c if c >= 0x80 && self.peek_char().is_some_and(char::is_alphabetic) => {
                self.scan_word()
            }
            _ => self.scan_punct()?,
        };

        Ok(Token::new(kind, Span::new(start, self.pos), newline_before))
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.file.source.get(self.pos..)?.chars().next()
    }

    fn error(&self, message: impl Into<String>, span: Span) -> GqlxError {
        GqlxError::new(
            ErrorCode::EXPRESSION_SYNTAX,
            message,
            self.file.location(span),
        )
    }

    fn closes_interpolation(&self) -> bool {
        matches!(
            self.mode_stack.last(),
            Some(Mode::Interpolation { brace_depth: 0 })
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments. Returns `true` if a line break was seen.
    fn skip_trivia(&mut self) -> Result<bool, GqlxError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(b'\n') => {
                    newline = true;
                    self.pos += 1;
                }
                Some(b' ' | b'\t' | b'\r' | 0x0b | 0x0c) => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error(
                                    "Unterminated comment",
                                    Span::new(start, self.pos),
                                ))
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(b'\n') => {
                                newline = true;
                                self.pos += 1;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                Some(c) if c >= 0x80 => match self.peek_char() {
                    Some(c) if c.is_whitespace() => {
                        if matches!(c, '\u{2028}' | '\u{2029}') {
                            newline = true;
                        }
                        self.pos += c.len_utf8();
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(newline)
    }

    // ─────────────────────────────────────────────────────────────
    // Names
    // ─────────────────────────────────────────────────────────────

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let word = self.slice(Span::new(start, self.pos));

        if let Some(k) = Keyword::from_word(word) {
            TokenKind::Keyword(k)
        } else if let Some(r) = RESERVED_WORDS.iter().copied().find(|r| *r == word) {
            TokenKind::Reserved(r)
        } else {
            TokenKind::Identifier(word.to_string())
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Punctuation
    // ─────────────────────────────────────────────────────────────

    fn scan_punct(&mut self) -> Result<TokenKind, GqlxError> {
        let rest = &self.source[self.pos..];
        for p in PUNCTUATORS {
            if !rest.starts_with(p.as_bytes()) {
                continue;
            }
            // `a?.5:b` is a conditional, not optional chaining
            if *p == "?." && matches!(rest.get(2), Some(b'0'..=b'9')) {
                continue;
            }
            self.pos += p.len();
            match *p {
                "{" => {
                    if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                        *brace_depth += 1;
                    }
                }
                "}" => {
                    if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                        *brace_depth = brace_depth.saturating_sub(1);
                    }
                }
                _ => {}
            }
            return Ok(TokenKind::Punct(p));
        }

        let c = self.peek_char().unwrap_or('\u{fffd}');
        Err(self.error(
            format!("Unexpected character '{c}'"),
            Span::new(self.pos, self.pos + c.len_utf8()),
        ))
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self) -> Result<TokenKind, GqlxError> {
        let start = self.pos;

        if self.peek() == Some(b'0') {
            let radix = match self.peek_at(1) {
                Some(b'x' | b'X') => Some(16),
                Some(b'o' | b'O') => Some(8),
                Some(b'b' | b'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| (c as char).is_digit(radix) || c == b'_')
                {
                    self.pos += 1;
                }
                let digits: String = self
                    .slice(Span::new(digits_start, self.pos))
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = u64::from_str_radix(&digits, radix).map_err(|_| {
                    self.error("Invalid number literal", Span::new(start, self.pos))
                })?;
                return Ok(TokenKind::Number(value as f64));
            }
        }

        self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(b'0'..=b'9')) {
                self.eat_digits();
            } else {
                self.pos = save;
            }
        }

        let span = Span::new(start, self.pos);
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error(
                "Identifier directly after number",
                Span::new(start, self.pos + 1),
            ));
        }
        let text: String = self.slice(span).chars().filter(|c| *c != '_').collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error("Invalid number literal", span))?;
        Ok(TokenKind::Number(value))
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9' | b'_')) {
            self.pos += 1;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // String & template literals
    // ─────────────────────────────────────────────────────────────

    fn scan_string(&mut self, quote: u8) -> Result<TokenKind, GqlxError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.error(
                        "Unterminated string literal",
                        Span::new(start, self.pos),
                    ))
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(TokenKind::String(buf));
                }
                Some(b'\\') => self.scan_escape(&mut buf)?,
                Some(_) => self.push_char(&mut buf),
            }
        }
    }

    /// Scan template text after `` ` `` (`head`) or after a substitution's `}`.
    fn scan_template(&mut self, start: usize, head: bool) -> Result<TokenKind, GqlxError> {
        let text_start = self.pos;
        let mut cooked = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(self.error(
                        "Unterminated template literal",
                        Span::new(start, self.pos),
                    ))
                }
                Some(b'`') => {
                    let raw = self.slice(Span::new(text_start, self.pos)).to_string();
                    self.pos += 1;
                    let part = TemplatePart { raw, cooked };
                    return Ok(if head {
                        TokenKind::Template(part)
                    } else {
                        TokenKind::TemplateTail(part)
                    });
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    let raw = self.slice(Span::new(text_start, self.pos)).to_string();
                    self.pos += 2;
                    self.mode_stack.push(Mode::Interpolation { brace_depth: 0 });
                    let part = TemplatePart { raw, cooked };
                    return Ok(if head {
                        TokenKind::TemplateHead(part)
                    } else {
                        TokenKind::TemplateMiddle(part)
                    });
                }
                Some(b'\\') => self.scan_escape(&mut cooked)?,
                Some(b'\r') => {
                    // template text normalizes CRLF to LF
                    self.pos += 1;
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    cooked.push('\n');
                }
                Some(_) => self.push_char(&mut cooked),
            }
        }
    }

    fn push_char(&mut self, buf: &mut String) {
        if let Some(c) = self.peek_char() {
            buf.push(c);
            self.pos += c.len_utf8();
        } else {
            self.pos += 1;
        }
    }

    /// Scan an escape sequence starting at the `\`.
    fn scan_escape(&mut self, buf: &mut String) -> Result<(), GqlxError> {
        let start = self.pos;
        self.pos += 1; // consume the '\'

        let Some(c) = self.peek_char() else {
            return Err(self.error(
                "Unexpected end of input in escape sequence",
                Span::new(start, self.pos),
            ));
        };
        self.pos += c.len_utf8();

        match c {
            'n' => buf.push('\n'),
            't' => buf.push('\t'),
            'r' => buf.push('\r'),
            'b' => buf.push('\u{8}'),
            'f' => buf.push('\u{c}'),
            'v' => buf.push('\u{b}'),
            '0' if !matches!(self.peek(), Some(b'0'..=b'9')) => buf.push('\0'),
            'x' => {
                let code = self.scan_hex(2, start)?;
                buf.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = if self.peek() == Some(b'{') {
                    self.pos += 1;
                    let digits_start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let digits = self.slice(Span::new(digits_start, self.pos));
                    if self.peek() != Some(b'}') {
                        return Err(self.error(
                            "Invalid Unicode escape sequence",
                            Span::new(start, self.pos),
                        ));
                    }
                    self.pos += 1;
                    u32::from_str_radix(digits, 16).unwrap_or(0xfffd)
                } else {
                    self.scan_hex(4, start)?
                };
                buf.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // line continuation
            '\n' => {}
            '\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            other => buf.push(other),
        }
        Ok(())
    }

    fn scan_hex(&mut self, len: usize, start: usize) -> Result<u32, GqlxError> {
        let digits = self
            .file
            .source
            .get(self.pos..self.pos + len)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("Invalid hexadecimal escape sequence", Span::new(start, self.pos)))?;
        self.pos += len;
        Ok(u32::from_str_radix(digits, 16).unwrap_or(0xfffd))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}
