//! Region extractor: finds the embedded resolver expressions of a
//! composite source.
//!
//! The schema token stream is walked once. Inside a container type
//! (`type Query {`, `type Mutation {`, `type Subscription {`) every `{` at
//! parenthesis depth zero opens an embedded expression for the field named
//! in front of it. The expression is parsed in place and lexing resumes
//! after its closing `}`.
//!
//! Error codes emitted:
//! - E100: a token other than `}` after an embedded expression
//! - E101: no field name in front of an embedded expression
//! - E102: syntax error inside an embedded expression
//! - E103: surplus closing parentheses after an embedded expression

use std::fmt;

use gqlx_lexer::{SdlLexer, SdlToken, SdlTokenKind};
use gqlx_parser::parse_expression_at;
use gqlx_types::ast::Expr;
use gqlx_types::{ErrorCode, GqlxError, Result, SourceFile, Span};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ══════════════════════════════════════════════════════════════════════════════
// Containers
// ══════════════════════════════════════════════════════════════════════════════

/// The root types whose fields may carry embedded resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Container {
    Query,
    Mutation,
    Subscription,
}

impl Container {
    pub const ALL: [Container; 3] = [Container::Query, Container::Mutation, Container::Subscription];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Query" => Some(Container::Query),
            "Mutation" => Some(Container::Mutation),
            "Subscription" => Some(Container::Subscription),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Query => "Query",
            Container::Mutation => "Mutation",
            Container::Subscription => "Subscription",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Output
// ══════════════════════════════════════════════════════════════════════════════

/// One embedded expression block, from its `{` through its `}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub container: Container,
    pub field: String,
    pub span: Span,
}

/// The parsed body of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBody {
    pub container: Container,
    pub field: String,
    pub expr: Expr,
}

/// Everything the extractor found, in source order.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Every region, ordered by start offset and non-overlapping.
    pub regions: Vec<Region>,
    /// One body per `(container, field)`; a repeated field keeps its first
    /// position and its last body.
    pub bodies: Vec<FieldBody>,
}

impl Extraction {
    pub fn spans(&self) -> Vec<Span> {
        self.regions.iter().map(|r| r.span).collect()
    }

    pub fn body(&self, container: Container, field: &str) -> Option<&FieldBody> {
        self.bodies
            .iter()
            .find(|b| b.container == container && b.field == field)
    }

    fn insert(&mut self, body: FieldBody) {
        match self
            .bodies
            .iter_mut()
            .find(|b| b.container == body.container && b.field == body.field)
        {
            Some(existing) => existing.expr = body.expr,
            None => self.bodies.push(body),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Extraction
// ══════════════════════════════════════════════════════════════════════════════

/// Walk `file` and collect every embedded resolver expression.
pub fn extract(file: &SourceFile) -> Result<Extraction> {
    let mut lexer = SdlLexer::new(file);
    let mut history: Vec<SdlToken> = Vec::new();
    let mut mode: Option<Container> = None;
    let mut depth = 0usize;
    let mut out = Extraction::default();

    loop {
        let token = lexer.next_token()?;
        match (mode, &token.kind) {
            (_, SdlTokenKind::Eof) => break,
            (Some(container), SdlTokenKind::LBrace) if depth == 0 => {
                let field = field_name(&history).ok_or_else(|| {
                    GqlxError::new(
                        ErrorCode::MISSING_FIELD_NAME,
                        format!("Found invalid schema. Could not find a name for the {container}."),
                        file.location(token.span),
                    )
                })?;
                let (expr, close) = parse_body(file, &mut lexer, &token)?;
                let span = token.span.merge(close);
                trace!(container = %container, field = %field, %span, "embedded resolver");
                out.regions.push(Region {
                    container,
                    field: field.clone(),
                    span,
                });
                out.insert(FieldBody {
                    container,
                    field,
                    expr,
                });
                continue;
            }
            (Some(_), SdlTokenKind::RBrace) if depth == 0 => mode = None,
            (Some(_), SdlTokenKind::LParen) => depth += 1,
            (Some(_), SdlTokenKind::RParen) => depth = depth.saturating_sub(1),
            (None, SdlTokenKind::LBrace) => {
                mode = opened_container(&history);
                depth = 0;
            }
            _ => {}
        }
        history.push(token);
    }

    debug!(
        file = %file.name,
        regions = out.regions.len(),
        fields = out.bodies.len(),
        "extracted embedded resolvers"
    );
    Ok(out)
}

/// `type <Container>` right before a `{`.
fn opened_container(history: &[SdlToken]) -> Option<Container> {
    match history {
        [.., keyword, name] if keyword.name() == Some("type") => {
            name.name().and_then(Container::from_name)
        }
        _ => None,
    }
}

/// Scan backwards for the name of the field whose body starts next.
///
/// A name qualifies once a `:` has been passed and the parentheses passed
/// on the way are balanced, which covers `f: T` as well as `f(a: A): T`.
fn field_name(history: &[SdlToken]) -> Option<String> {
    let mut has_colon = false;
    let mut found_close = false;
    let mut found_open = false;

    for token in history.iter().rev() {
        match &token.kind {
            SdlTokenKind::Colon => {
                if has_colon && !found_close {
                    break;
                }
                has_colon = true;
            }
            SdlTokenKind::RParen => found_close = true,
            SdlTokenKind::LParen => {
                if !found_close {
                    break;
                }
                found_open = true;
            }
            SdlTokenKind::Name(name) if has_colon && found_close == found_open => {
                return Some(name.clone());
            }
            _ => {}
        }
    }
    None
}

/// Parse the expression after `open` and consume its closing `}`.
///
/// Returns the expression and the span of the closing brace; `lexer` is
/// left just past that brace.
fn parse_body(file: &SourceFile, lexer: &mut SdlLexer<'_>, open: &SdlToken) -> Result<(Expr, Span)> {
    let start = open.span.end;
    let parsed = parse_expression_at(file, start)?;
    lexer.reset(parsed.end);

    let mut surplus = 0usize;
    let mut token = lexer.next_token()?;
    while token.kind == SdlTokenKind::RParen {
        surplus += 1;
        token = lexer.next_token()?;
    }

    if surplus > 0 {
        return Err(GqlxError::new(
            ErrorCode::UNBALANCED_PARENS,
            format!(
                "Found invalid schema. Unbalanced parentheses (counted -{surplus}) detected starting at position {start}."
            ),
            file.location(Span::new(start, token.span.start)),
        ));
    }

    if token.kind != SdlTokenKind::RBrace {
        return Err(GqlxError::new(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("Found invalid token. Expected '}}', but found '{}'.", token.kind),
            file.location(token.span),
        ));
    }

    Ok((parsed.expr, token.span))
}
