//! Expression parsing with JavaScript operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `,` (sequence)
//! 2. `=`, `op=` (assignment, right-assoc), `=>` (arrow functions)
//! 3. `? :` (conditional)
//! 4. `||`, `??`
//! 5. `&&`
//! 6. `|`, then `^`, then `&`
//! 7. `==`, `!=`, `===`, `!==`
//! 8. `<`, `>`, `<=`, `>=`, `in`, `instanceof`
//! 9. `<<`, `>>`, `>>>`
//! 10. `+`, `-`
//! 11. `*`, `/`, `%`
//! 12. `**` (right-assoc)
//! 13. prefix `!`, `-`, `+`, `~`, `typeof`, `void`, `delete`, `await`, `++`, `--`
//! 14. postfix `++`, `--`
//! 15. `.`, `?.`, `[]`, `()` (member access / call)

use gqlx_lexer::token::{Keyword, TokenKind};
use gqlx_types::ast::*;
use gqlx_types::{Result, Span};

use crate::parser::Parser;

/// A binary-level operator recognized by the precedence climber.
#[derive(Clone, Copy)]
enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix_op(kind: &TokenKind) -> Option<(u8, InfixOp)> {
    use BinaryOp::*;
    let op = match kind {
        TokenKind::Punct(p) => match *p {
            "||" => (1, InfixOp::Logical(LogicalOp::Or)),
            "??" => (1, InfixOp::Logical(LogicalOp::Nullish)),
            "&&" => (2, InfixOp::Logical(LogicalOp::And)),
            "|" => (3, InfixOp::Binary(BitOr)),
            "^" => (4, InfixOp::Binary(BitXor)),
            "&" => (5, InfixOp::Binary(BitAnd)),
            "==" => (6, InfixOp::Binary(Eq)),
            "!=" => (6, InfixOp::Binary(NotEq)),
            "===" => (6, InfixOp::Binary(StrictEq)),
            "!==" => (6, InfixOp::Binary(StrictNotEq)),
            "<" => (7, InfixOp::Binary(Less)),
            ">" => (7, InfixOp::Binary(Greater)),
            "<=" => (7, InfixOp::Binary(LessEq)),
            ">=" => (7, InfixOp::Binary(GreaterEq)),
            "<<" => (8, InfixOp::Binary(Shl)),
            ">>" => (8, InfixOp::Binary(Shr)),
            ">>>" => (8, InfixOp::Binary(UShr)),
            "+" => (9, InfixOp::Binary(Add)),
            "-" => (9, InfixOp::Binary(Sub)),
            "*" => (10, InfixOp::Binary(Mul)),
            "/" => (10, InfixOp::Binary(Div)),
            "%" => (10, InfixOp::Binary(Mod)),
            "**" => (11, InfixOp::Binary(Exp)),
            _ => return None,
        },
        TokenKind::Keyword(Keyword::In) => (7, InfixOp::Binary(In)),
        TokenKind::Keyword(Keyword::Instanceof) => (7, InfixOp::Binary(InstanceOf)),
        _ => return None,
    };
    Some(op)
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let TokenKind::Punct(p) = kind else {
        return None;
    };
    let op = match *p {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Binary(BinaryOp::Add),
        "-=" => AssignOp::Binary(BinaryOp::Sub),
        "*=" => AssignOp::Binary(BinaryOp::Mul),
        "/=" => AssignOp::Binary(BinaryOp::Div),
        "%=" => AssignOp::Binary(BinaryOp::Mod),
        "**=" => AssignOp::Binary(BinaryOp::Exp),
        "&=" => AssignOp::Binary(BinaryOp::BitAnd),
        "|=" => AssignOp::Binary(BinaryOp::BitOr),
        "^=" => AssignOp::Binary(BinaryOp::BitXor),
        "<<=" => AssignOp::Binary(BinaryOp::Shl),
        ">>=" => AssignOp::Binary(BinaryOp::Shr),
        ">>>=" => AssignOp::Binary(BinaryOp::UShr),
        "&&=" => AssignOp::Logical(LogicalOp::And),
        "||=" => AssignOp::Logical(LogicalOp::Or),
        "??=" => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    };
    Some(op)
}

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// `Expression = Assignment { "," Assignment }`
    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assignment()?;
        if !self.check_punct(",")? {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat_punct(",")? {
            exprs.push(self.parse_assignment()?);
        }
        let span = exprs[0].span.merge(exprs[exprs.len() - 1].span);
        Ok(Expr::new(ExprKind::Sequence(exprs), span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Assignment & Arrow Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `Assignment = Arrow | Conditional [ AssignOp Assignment ]`
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr> {
        if self.at_arrow()? {
            return self.parse_arrow();
        }

        let left = self.parse_conditional()?;
        let kind = self.peek_kind()?;
        let Some(op) = assign_op(&kind) else {
            return Ok(left);
        };

        let target = if op == AssignOp::Assign {
            self.to_pattern(left)?
        } else {
            self.to_simple_target(left)?
        };
        self.advance()?;
        let value = self.parse_assignment()?;
        let span = target.span().merge(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    /// Does an arrow function start at the current token?
    ///
    /// `x =>`, `async x =>`, `(...) =>` and `async (...) =>`. For the
    /// parenthesized forms the matching `)` is located by scanning ahead.
    fn at_arrow(&mut self) -> Result<bool> {
        let mut i = 0;
        if self.check_keyword(Keyword::Async)? {
            let next = self.peek_nth(1)?;
            if next.newline_before {
                return Ok(false);
            }
            if matches!(next.kind, TokenKind::Identifier(_)) || next.is_punct("(") {
                i = 1;
            } else if next.is_punct("=>") {
                return Ok(true);
            } else {
                return Ok(false);
            }
        }

        let first = self.peek_nth(i)?.clone();
        match &first.kind {
            TokenKind::Identifier(_) | TokenKind::Keyword(Keyword::Async) => {
                Ok(self.peek_nth(i + 1)?.is_punct("=>"))
            }
            TokenKind::Punct("(") => {
                let mut depth = 0usize;
                let mut j = i;
                loop {
                    let token = self.peek_nth(j)?;
                    match &token.kind {
                        TokenKind::Punct("(" | "[" | "{") => depth += 1,
                        TokenKind::Punct(")" | "]" | "}") => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                break;
                            }
                        }
                        TokenKind::TemplateHead(_) => depth += 1,
                        TokenKind::TemplateTail(_) => depth = depth.saturating_sub(1),
                        TokenKind::Eof => return Ok(false),
                        _ => {}
                    }
                    j += 1;
                }
                let next = self.peek_nth(j + 1)?;
                Ok(next.is_punct("=>") && !next.newline_before)
            }
            _ => Ok(false),
        }
    }

    /// `Arrow = [ "async" ] ( Ident | "(" Params ")" ) "=>" ( Block | Assignment )`
    fn parse_arrow(&mut self) -> Result<Expr> {
        let start = self.peek()?.span;
        let is_async = if self.check_keyword(Keyword::Async)? && !self.peek_nth(1)?.is_punct("=>")
        {
            self.advance()?;
            true
        } else {
            false
        };

        let params = if self.eat_punct("(")? {
            let mut params = Vec::new();
            while !self.check_punct(")")? {
                if self.eat_punct("...")? {
                    params.push(Pattern::Rest(Box::new(self.parse_binding_target()?)));
                } else {
                    params.push(self.parse_binding_element()?);
                }
                if !self.eat_punct(",")? {
                    break;
                }
            }
            self.expect_punct(")")?;
            params
        } else {
            vec![Pattern::Ident(self.expect_identifier()?)]
        };

        self.expect_punct("=>")?;

        let body = if self.check_punct("{")? {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };
        let span = start.merge(Span::point(self.prev_end));

        Ok(Expr::new(
            ExprKind::Arrow(Box::new(ArrowFn {
                params,
                body,
                is_async,
                span,
            })),
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Conditional = Binary [ "?" Assignment ":" Assignment ]`
    fn parse_conditional(&mut self) -> Result<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat_punct("?")? {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        let span = test.span.merge(alternate.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    /// Precedence climbing over the binary and logical operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let kind = self.peek_kind()?;
            let Some((prec, op)) = infix_op(&kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance()?;
            // `**` is right-associative
            let next_min = if matches!(op, InfixOp::Binary(BinaryOp::Exp)) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary(next_min)?;
            let span = left.span.merge(right.span);
            let kind = match op {
                InfixOp::Binary(op) => ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                InfixOp::Logical(op) => ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            left = Expr::new(kind, span);
        }
        Ok(left)
    }

    /// `Unary = PrefixOp Unary | Postfix`
    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.peek()?.clone();
        let op = match &token.kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::TypeOf),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let arg = self.parse_unary()?;
            let span = token.span.merge(arg.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    arg: Box::new(arg),
                },
                span,
            ));
        }

        if token.is_keyword(Keyword::Await) {
            self.advance()?;
            let arg = self.parse_unary()?;
            let span = token.span.merge(arg.span);
            return Ok(Expr::new(ExprKind::Await(Box::new(arg)), span));
        }

        if token.is_punct("++") || token.is_punct("--") {
            self.advance()?;
            let op = if token.is_punct("++") {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let arg = self.parse_unary()?;
            let target = self.to_simple_target(arg)?;
            let span = token.span.merge(target.span());
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                span,
            ));
        }

        self.parse_postfix()
    }

    /// `Postfix = CallMember [ "++" | "--" ]` (no line break before the operator)
    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_call_member()?;
        let token = self.peek()?.clone();
        if token.newline_before || !(token.is_punct("++") || token.is_punct("--")) {
            return Ok(expr);
        }
        self.advance()?;
        let op = if token.is_punct("++") {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        let target = self.to_simple_target(expr)?;
        let span = target.span().merge(token.span);
        Ok(Expr::new(
            ExprKind::Update {
                op,
                prefix: false,
                target: Box::new(target),
            },
            span,
        ))
    }

    /// `CallMember = Primary { "." Name | "?." (Name | "[" Expr "]" | Args) | "[" Expr "]" | Args }`
    fn parse_call_member(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.peek()?.clone();
            if token.is_punct(".") {
                self.advance()?;
                let name = self.expect_property_name()?;
                expr = self.member(expr, MemberProp::Ident(name), false);
            } else if token.is_punct("?.") {
                self.advance()?;
                if self.check_punct("(")? {
                    expr = self.parse_call_args(expr, true)?;
                } else if self.eat_punct("[")? {
                    let prop = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = self.member(expr, MemberProp::Computed(Box::new(prop)), true);
                } else {
                    let name = self.expect_property_name()?;
                    expr = self.member(expr, MemberProp::Ident(name), true);
                }
            } else if token.is_punct("[") {
                self.advance()?;
                let prop = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = self.member(expr, MemberProp::Computed(Box::new(prop)), false);
            } else if token.is_punct("(") {
                expr = self.parse_call_args(expr, false)?;
            } else if matches!(
                token.kind,
                TokenKind::Template(_) | TokenKind::TemplateHead(_)
            ) {
                return Err(self.error_at(token.span, "Tagged templates are not supported"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn member(&self, object: Expr, property: MemberProp, optional: bool) -> Expr {
        let span = object.span.merge(Span::point(self.prev_end));
        Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
                optional,
            },
            span,
        )
    }

    /// `Args = "(" [ ["..."] Assignment { "," ["..."] Assignment } [","] ] ")"`
    fn parse_call_args(&mut self, callee: Expr, optional: bool) -> Result<Expr> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.check_punct(")")? {
            if self.eat_punct("...")? {
                args.push(Argument::Spread(self.parse_assignment()?));
            } else {
                args.push(Argument::Expr(self.parse_assignment()?));
            }
            if !self.eat_punct(",")? {
                break;
            }
        }
        self.expect_punct(")")?;
        let span = callee.span.merge(Span::point(self.prev_end));
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                optional,
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek()?.clone();
        let span = token.span;
        match &token.kind {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(Expr::ident(name.clone(), span))
            }
            TokenKind::Keyword(Keyword::Async) => {
                self.advance()?;
                Ok(Expr::ident("async", span))
            }
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(self.literal(LitValue::Number(*n), span))
            }
            TokenKind::String(s) => {
                self.advance()?;
                Ok(self.literal(LitValue::String(s.clone()), span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(self.literal(LitValue::Bool(true), span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(self.literal(LitValue::Bool(false), span))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(self.literal(LitValue::Null, span))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expr::new(ExprKind::This, span))
            }
            TokenKind::Keyword(Keyword::Function) => {
                let function = self.parse_function()?;
                let span = function.span;
                Ok(Expr::new(ExprKind::Function(Box::new(function)), span))
            }
            TokenKind::Template(_) | TokenKind::TemplateHead(_) => self.parse_template(),
            TokenKind::Punct("(") => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => self.parse_array(),
            TokenKind::Punct("{") => self.parse_object(),
            _ => Err(self.unexpected()?),
        }
    }

    fn literal(&self, value: LitValue, span: Span) -> Expr {
        Expr::new(
            ExprKind::Literal(Literal {
                value,
                raw: self.text(span).to_string(),
            }),
            span,
        )
    }

    /// `` Template = `text` | `text${ Expr }text${ Expr }text` ``
    fn parse_template(&mut self) -> Result<Expr> {
        let head = self.advance()?;
        let start = head.span;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        match head.kind {
            TokenKind::Template(part) => {
                quasis.push(part);
                return Ok(Expr::new(ExprKind::Template { quasis, exprs }, start));
            }
            TokenKind::TemplateHead(part) => quasis.push(part),
            _ => return Err(self.error_at(head.span, "Expected template literal")),
        }
        loop {
            exprs.push(self.parse_expression()?);
            let token = self.advance()?;
            match token.kind {
                TokenKind::TemplateMiddle(part) => quasis.push(part),
                TokenKind::TemplateTail(part) => {
                    quasis.push(part);
                    let span = start.merge(token.span);
                    return Ok(Expr::new(ExprKind::Template { quasis, exprs }, span));
                }
                kind => {
                    return Err(self.error_at(
                        token.span,
                        format!("Expected '}}' to close template substitution, but found {kind}"),
                    ))
                }
            }
        }
    }

    /// `Array = "[" { [ ["..."] Assignment ] "," } "]"`
    fn parse_array(&mut self) -> Result<Expr> {
        let start = self.expect_punct("[")?.span;
        let mut elements = Vec::new();
        loop {
            if self.check_punct("]")? {
                break;
            }
            if self.eat_punct(",")? {
                elements.push(ArrayElement::Hole);
                continue;
            }
            if self.eat_punct("...")? {
                elements.push(ArrayElement::Spread(self.parse_assignment()?));
            } else {
                elements.push(ArrayElement::Expr(self.parse_assignment()?));
            }
            if !self.eat_punct(",")? {
                break;
            }
        }
        let end = self.expect_punct("]")?.span;
        Ok(Expr::new(ExprKind::Array(elements), start.merge(end)))
    }

    /// `Object = "{" [ Property { "," Property } [","] ] "}"`
    fn parse_object(&mut self) -> Result<Expr> {
        let start = self.expect_punct("{")?.span;
        let mut props = Vec::new();
        while !self.check_punct("}")? {
            props.push(self.parse_property()?);
            if !self.eat_punct(",")? {
                break;
            }
        }
        let end = self.expect_punct("}")?.span;
        Ok(Expr::new(ExprKind::Object(props), start.merge(end)))
    }

    /// `Property = "..." Assignment | Key ":" Assignment | Ident`
    fn parse_property(&mut self) -> Result<Property> {
        let token = self.peek()?.clone();
        if token.is_punct("...") {
            self.advance()?;
            return Ok(Property::Spread(self.parse_assignment()?));
        }

        let key = self.parse_prop_key()?;
        if self.eat_punct(":")? {
            let value = self.parse_assignment()?;
            let span = token.span.merge(value.span);
            return Ok(Property::Init {
                key,
                value,
                shorthand: false,
                span,
            });
        }

        if self.check_punct("(")? {
            let span = self.peek()?.span;
            return Err(self.error_at(
                span,
                "Object methods are not supported. Use arrow functions (\"=>\") instead.",
            ));
        }

        match (&key, &token.kind) {
            (PropKey::Ident(id), TokenKind::Identifier(_)) => {
                let value = Expr::ident(id.name.clone(), id.span);
                Ok(Property::Init {
                    key,
                    value,
                    shorthand: true,
                    span: token.span,
                })
            }
            _ => Err(self.unexpected()?),
        }
    }

    /// `Key = Name | String | Number | "[" Assignment "]"`
    pub(crate) fn parse_prop_key(&mut self) -> Result<PropKey> {
        let token = self.peek()?.clone();
        match &token.kind {
            TokenKind::Punct("[") => {
                self.advance()?;
                let expr = self.parse_assignment()?;
                self.expect_punct("]")?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            TokenKind::String(s) => {
                self.advance()?;
                Ok(PropKey::Literal(Literal {
                    value: LitValue::String(s.clone()),
                    raw: self.text(token.span).to_string(),
                }))
            }
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(PropKey::Literal(Literal {
                    value: LitValue::Number(*n),
                    raw: self.text(token.span).to_string(),
                }))
            }
            _ => Ok(PropKey::Ident(self.expect_property_name()?)),
        }
    }

    /// `Function = "function" [ Ident ] "(" Params ")" Block`
    pub(crate) fn parse_function(&mut self) -> Result<FunctionExpr> {
        let start = self.advance()?.span; // `function`
        let name = if self.check_punct("(")? {
            None
        } else {
            Some(self.expect_identifier()?)
        };
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.check_punct(")")? {
            if self.eat_punct("...")? {
                params.push(Pattern::Rest(Box::new(self.parse_binding_target()?)));
            } else {
                params.push(self.parse_binding_element()?);
            }
            if !self.eat_punct(",")? {
                break;
            }
        }
        self.expect_punct(")")?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(FunctionExpr {
            name,
            params,
            body,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_standalone;
    use gqlx_types::ast::*;
    use gqlx_types::SourceFile;

    fn parse(src: &str) -> Expr {
        parse_standalone(&SourceFile::new("t", src)).unwrap()
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let e = parse("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let e = parse("2 ** 3 ** 2");
        let ExprKind::Binary { right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn test_logical_and_binds_tighter_than_or() {
        let e = parse("a || b && c");
        assert!(matches!(e.kind, ExprKind::Logical { op: LogicalOp::Or, .. }));
    }

    #[test]
    fn test_parenthesized_conditional_test() {
        let e = parse("(a && b) ? c() : (d())");
        assert!(matches!(e.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn test_arrow_forms() {
        assert!(matches!(parse("x => x").kind, ExprKind::Arrow(_)));
        assert!(matches!(parse("() => 1").kind, ExprKind::Arrow(_)));
        assert!(matches!(parse("([a], { b }) => a").kind, ExprKind::Arrow(_)));
        let ExprKind::Arrow(arrow) = parse("async (x = 1, ...r) => { return x; }").kind else {
            panic!("expected arrow");
        };
        assert!(arrow.is_async);
        assert_eq!(arrow.params.len(), 2);
        assert!(matches!(arrow.body, ArrowBody::Block(_)));
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        assert!(matches!(parse("(a, b)").kind, ExprKind::Sequence(_)));
    }

    #[test]
    fn test_member_and_optional_chains() {
        let e = parse("a?.b.c[d](1)?.(2)");
        let ExprKind::Call { optional, .. } = e.kind else {
            panic!("expected call");
        };
        assert!(optional);
    }

    #[test]
    fn test_keywords_as_property_names() {
        let e = parse("x.default.delete");
        assert!(matches!(e.kind, ExprKind::Member { .. }));
        let e = parse("({ new: 1, if: 2 })");
        let ExprKind::Object(props) = e.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_object_shorthand_spread_and_computed() {
        let ExprKind::Object(props) = parse("{ a, b: 1, [c.id]: c, ...d }").kind else {
            panic!("expected object");
        };
        assert!(matches!(&props[0], Property::Init { shorthand: true, .. }));
        assert!(matches!(&props[2], Property::Init { key: PropKey::Computed(_), .. }));
        assert!(matches!(&props[3], Property::Spread(_)));
    }

    #[test]
    fn test_literal_raw_text_kept() {
        let ExprKind::Literal(lit) = parse("'api/foo'").kind else {
            panic!("expected literal");
        };
        assert_eq!(lit.raw, "'api/foo'");
        assert_eq!(lit.value, LitValue::String("api/foo".into()));
    }

    #[test]
    fn test_template_parts() {
        let ExprKind::Template { quasis, exprs } = parse("`api/${id}/x`").kind else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 2);
        assert_eq!(exprs.len(), 1);
        assert_eq!(quasis[1].raw, "/x");
    }

    #[test]
    fn test_assignment_targets() {
        assert!(matches!(parse("a = 1").kind, ExprKind::Assign { .. }));
        assert!(matches!(parse("a.b += 1").kind, ExprKind::Assign { .. }));
        assert!(matches!(parse("[a, b] = c").kind, ExprKind::Assign { .. }));
        let file = SourceFile::new("t", "a + b = 1");
        assert!(parse_standalone(&file).is_err());
    }

    #[test]
    fn test_update_expressions() {
        assert!(matches!(
            parse("i++").kind,
            ExprKind::Update { prefix: false, op: UpdateOp::Increment, .. }
        ));
        assert!(matches!(
            parse("--n").kind,
            ExprKind::Update { prefix: true, op: UpdateOp::Decrement, .. }
        ));
    }

    #[test]
    fn test_forbidden_constructs_still_parse() {
        assert!(matches!(parse("function () {}").kind, ExprKind::Function(_)));
        assert!(matches!(parse("this").kind, ExprKind::This));
        assert!(matches!(parse("await x").kind, ExprKind::Await(_)));
        assert!(matches!(
            parse("delete x.y").kind,
            ExprKind::Unary { op: UnaryOp::Delete, .. }
        ));
    }
}
