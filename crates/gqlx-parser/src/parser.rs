//! Core parser infrastructure: token cursor, error reporting, entry points.

use std::collections::VecDeque;

use gqlx_lexer::token::{Keyword, Token, TokenKind};
use gqlx_lexer::Lexer;
use gqlx_types::ast::{Expr, Ident};
use gqlx_types::{ErrorCode, GqlxError, Result, SourceFile, Span};

/// One parsed expression and the offset just past its last token.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub expr: Expr,
    pub end: usize,
}

/// Parse a single expression starting at `offset` of `file`.
///
/// Parsing stops at the first token that cannot continue the expression;
/// that token is not consumed. Grouping parentheses around the whole
/// expression are part of the grammar, so `(a) ? b : c` and `((a))` both
/// parse.
pub fn parse_expression_at(file: &SourceFile, offset: usize) -> Result<Parsed> {
    let mut parser = Parser::new(file, offset);
    let expr = parser.parse_expression()?;
    Ok(Parsed {
        expr,
        end: parser.prev_end,
    })
}

/// Parse a whole text as one expression; trailing tokens are an error.
pub fn parse_standalone(file: &SourceFile) -> Result<Expr> {
    let mut parser = Parser::new(file, 0);
    let expr = parser.parse_expression()?;
    if !parser.at_end()? {
        return Err(parser.unexpected()?);
    }
    Ok(expr)
}

/// The expression parser.
///
/// Pulls tokens lazily from the [`Lexer`], buffering only what lookahead
/// needs. Fail-fast: the first error aborts parsing.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    file: &'src SourceFile,
    /// Tokens scanned but not yet consumed.
    lookahead: VecDeque<Token>,
    /// End offset of the last consumed token.
    pub(crate) prev_end: usize,
}

impl<'src> Parser<'src> {
    pub fn new(file: &'src SourceFile, offset: usize) -> Self {
        Self {
            lexer: Lexer::new(file, offset),
            file,
            lookahead: VecDeque::new(),
            prev_end: offset,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Make sure at least `n + 1` tokens are buffered.
    fn fill(&mut self, n: usize) -> Result<()> {
        while self.lookahead.len() <= n {
            if self
                .lookahead
                .back()
                .is_some_and(|t| t.kind == TokenKind::Eof)
            {
                let eof = self.lookahead.back().cloned();
                self.lookahead.extend(eof);
                continue;
            }
            let token = self.lexer.next_token()?;
            self.lookahead.push_back(token);
        }
        Ok(())
    }

    /// Returns the current token without advancing.
    pub(crate) fn peek(&mut self) -> Result<&Token> {
        self.peek_nth(0)
    }

    /// Look ahead by `n` tokens from the current position.
    pub(crate) fn peek_nth(&mut self, n: usize) -> Result<&Token> {
        self.fill(n)?;
        Ok(&self.lookahead[n])
    }

    pub(crate) fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind.clone())
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Result<Token> {
        self.fill(0)?;
        let token = self
            .lookahead
            .pop_front()
            .ok_or_else(|| GqlxError::internal("token buffer unexpectedly empty"))?;
        if token.kind != TokenKind::Eof {
            self.prev_end = token.span.end;
        }
        Ok(token)
    }

    pub(crate) fn at_end(&mut self) -> Result<bool> {
        Ok(self.peek()?.kind == TokenKind::Eof)
    }

    pub(crate) fn check_punct(&mut self, p: &str) -> Result<bool> {
        Ok(self.peek()?.is_punct(p))
    }

    pub(crate) fn check_keyword(&mut self, k: Keyword) -> Result<bool> {
        Ok(self.peek()?.is_keyword(k))
    }

    /// If the current token is the punctuator `p`, consume it.
    pub(crate) fn eat_punct(&mut self, p: &str) -> Result<bool> {
        if self.check_punct(p)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn eat_keyword(&mut self, k: Keyword) -> Result<bool> {
        if self.check_keyword(k)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect_punct(&mut self, p: &str) -> Result<Token> {
        if self.check_punct(p)? {
            self.advance()
        } else {
            let token = self.peek()?.clone();
            Err(self.error_at(
                token.span,
                format!("Expected '{p}', but found {}", token.kind),
            ))
        }
    }

    /// Expect a binding identifier.
    pub(crate) fn expect_identifier(&mut self) -> Result<Ident> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(Ident::new(name, token.span))
            }
            TokenKind::Keyword(Keyword::Async) => {
                self.advance()?;
                Ok(Ident::new("async", token.span))
            }
            _ => Err(self.unexpected()?),
        }
    }

    /// Expect any word, keywords included, as used after `.` or as an
    /// object key.
    pub(crate) fn expect_property_name(&mut self) -> Result<Ident> {
        let token = self.peek()?.clone();
        let name = match &token.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Keyword(k) => k.as_str().to_string(),
            TokenKind::Reserved(word) => word.to_string(),
            _ => return Err(self.unexpected()?),
        };
        self.advance()?;
        Ok(Ident::new(name, token.span))
    }

    /// Consume a statement terminator, applying automatic semicolon
    /// insertion before `}`, end of input, or a line break.
    pub(crate) fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat_punct(";")? {
            return Ok(());
        }
        let token = self.peek()?;
        if token.is_punct("}") || token.kind == TokenKind::Eof || token.newline_before {
            return Ok(());
        }
        Err(self.unexpected()?)
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at(&self, span: Span, message: impl Into<String>) -> GqlxError {
        GqlxError::new(
            ErrorCode::EXPRESSION_SYNTAX,
            message,
            self.file.location(span),
        )
    }

    /// Error describing the current token as unexpected.
    pub(crate) fn unexpected(&mut self) -> Result<GqlxError> {
        let token = self.peek()?.clone();
        let message = match &token.kind {
            TokenKind::Reserved(word) => format!("Unsupported syntax: '{word}' is not allowed"),
            kind => format!("Unexpected token {kind}"),
        };
        Ok(self.error_at(token.span, message))
    }

    /// The source text of a span.
    pub(crate) fn text(&self, span: Span) -> &'src str {
        self.lexer.slice(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_types::ast::ExprKind;

    #[test]
    fn test_end_is_after_last_consumed_token() {
        let file = SourceFile::new("t", "{ foo(1)  }");
        let parsed = parse_expression_at(&file, 1).unwrap();
        assert_eq!(parsed.end, 8);
        assert!(matches!(parsed.expr.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_standalone_rejects_trailing_tokens() {
        let file = SourceFile::new("t", "a b");
        assert!(parse_standalone(&file).is_err());
    }

    #[test]
    fn test_reserved_word_error_message() {
        let file = SourceFile::new("t", "new Foo()");
        let err = parse_standalone(&file).unwrap_err();
        assert!(err.message.contains("'new' is not allowed"));
    }
}
