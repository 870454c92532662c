//! Binding and assignment patterns.
//!
//! Binding patterns appear in declarations and parameter lists and are
//! parsed directly. Assignment targets are first parsed as expressions and
//! converted afterwards, since `[a, b] = c` is only known to be a pattern
//! once the `=` is seen.

use gqlx_lexer::token::TokenKind;
use gqlx_types::ast::*;
use gqlx_types::{GqlxError, Result, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `BindingElement = BindingTarget [ "=" Assignment ]`
    pub(crate) fn parse_binding_element(&mut self) -> Result<Pattern> {
        let target = self.parse_binding_target()?;
        if !self.eat_punct("=")? {
            return Ok(target);
        }
        let default = self.parse_assignment()?;
        Ok(Pattern::Assign {
            target: Box::new(target),
            default: Box::new(default),
        })
    }

    /// `BindingTarget = Ident | ArrayPattern | ObjectPattern`
    pub(crate) fn parse_binding_target(&mut self) -> Result<Pattern> {
        let token = self.peek()?.clone();
        match &token.kind {
            TokenKind::Punct("[") => self.parse_array_pattern(),
            TokenKind::Punct("{") => self.parse_object_pattern(),
            _ => Ok(Pattern::Ident(self.expect_identifier()?)),
        }
    }

    /// `ArrayPattern = "[" { [ BindingElement | "..." BindingTarget ] "," } "]"`
    fn parse_array_pattern(&mut self) -> Result<Pattern> {
        let start = self.expect_punct("[")?.span;
        let mut elements = Vec::new();
        loop {
            if self.check_punct("]")? {
                break;
            }
            if self.eat_punct(",")? {
                elements.push(None);
                continue;
            }
            if self.eat_punct("...")? {
                let rest = self.parse_binding_target()?;
                elements.push(Some(Pattern::Rest(Box::new(rest))));
            } else {
                elements.push(Some(self.parse_binding_element()?));
            }
            if !self.eat_punct(",")? {
                break;
            }
        }
        let end = self.expect_punct("]")?.span;
        Ok(Pattern::Array(elements, start.merge(end)))
    }

    /// `ObjectPattern = "{" [ PatternProp { "," PatternProp } [","] ] "}"`
    ///
    /// `PatternProp = "..." Ident | Key ":" BindingElement | Ident [ "=" Assignment ]`
    fn parse_object_pattern(&mut self) -> Result<Pattern> {
        let start = self.expect_punct("{")?.span;
        let mut props = Vec::new();
        while !self.check_punct("}")? {
            if self.eat_punct("...")? {
                let rest = Pattern::Ident(self.expect_identifier()?);
                props.push(PatternProp::Rest(rest));
            } else {
                let token = self.peek()?.clone();
                let key = self.parse_prop_key()?;
                if self.eat_punct(":")? {
                    let value = self.parse_binding_element()?;
                    props.push(PatternProp::Init {
                        key,
                        value,
                        shorthand: false,
                    });
                } else {
                    let PropKey::Ident(id) = &key else {
                        return Err(self.error_at(token.span, "Expected ':' after computed key"));
                    };
                    if !matches!(token.kind, TokenKind::Identifier(_)) {
                        return Err(self.error_at(
                            token.span,
                            format!("Unexpected token {} in binding pattern", token.kind),
                        ));
                    }
                    let mut value = Pattern::Ident(id.clone());
                    if self.eat_punct("=")? {
                        let default = self.parse_assignment()?;
                        value = Pattern::Assign {
                            target: Box::new(value),
                            default: Box::new(default),
                        };
                    }
                    props.push(PatternProp::Init {
                        key,
                        value,
                        shorthand: true,
                    });
                }
            }
            if !self.eat_punct(",")? {
                break;
            }
        }
        let end = self.expect_punct("}")?.span;
        Ok(Pattern::Object(props, start.merge(end)))
    }

    // ── Expression → Pattern ──────────────────────────────────────────────────

    /// Reinterpret an already parsed expression as the target of `=`.
    pub(crate) fn to_pattern(&self, expr: Expr) -> Result<Pattern> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Identifier(name) => Ok(Pattern::Ident(Ident::new(name, span))),
            ExprKind::Member {
                optional: false, ..
            } => Ok(Pattern::Member(Box::new(expr))),
            ExprKind::Array(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    out.push(match element {
                        ArrayElement::Hole => None,
                        ArrayElement::Spread(e) => Some(Pattern::Rest(Box::new(self.to_pattern(e)?))),
                        ArrayElement::Expr(e) => Some(self.to_pattern_element(e)?),
                    });
                }
                Ok(Pattern::Array(out, span))
            }
            ExprKind::Object(props) => {
                let mut out = Vec::with_capacity(props.len());
                for prop in props {
                    out.push(match prop {
                        Property::Spread(e) => PatternProp::Rest(self.to_pattern(e)?),
                        Property::Init {
                            key,
                            value,
                            shorthand,
                            ..
                        } => PatternProp::Init {
                            key,
                            value: self.to_pattern_element(value)?,
                            shorthand,
                        },
                    });
                }
                Ok(Pattern::Object(out, span))
            }
            _ => Err(self.invalid_target(span)),
        }
    }

    /// Like [`to_pattern`](Self::to_pattern), but `a = 1` becomes a default.
    fn to_pattern_element(&self, expr: Expr) -> Result<Pattern> {
        match expr.kind {
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Ok(Pattern::Assign {
                target,
                default: value,
            }),
            _ => self.to_pattern(expr),
        }
    }

    /// Targets of compound assignment and `++`/`--`: identifiers and members.
    pub(crate) fn to_simple_target(&self, expr: Expr) -> Result<Pattern> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Identifier(name) => Ok(Pattern::Ident(Ident::new(name, span))),
            ExprKind::Member {
                optional: false, ..
            } => Ok(Pattern::Member(Box::new(expr))),
            _ => Err(self.invalid_target(span)),
        }
    }

    fn invalid_target(&self, span: Span) -> GqlxError {
        self.error_at(span, "Invalid assignment target")
    }
}
