//! Statement parsing for block bodies of arrow functions.

use gqlx_lexer::token::{Keyword, TokenKind};
use gqlx_types::ast::*;
use gqlx_types::{Result, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `Block = "{" { Statement } "}"`
    pub(crate) fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect_punct("{")?.span;
        let mut stmts = Vec::new();
        while !self.check_punct("}")? {
            if self.at_end()? {
                return Err(self.unexpected()?);
            }
            stmts.push(self.parse_statement()?);
        }
        let end = self.expect_punct("}")?.span;
        Ok(Block::new(stmts, start.merge(end)))
    }

    /// Parse one statement.
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt> {
        let token = self.peek()?.clone();
        let start = token.span;
        match &token.kind {
            TokenKind::Punct("{") => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Stmt::new(StmtKind::Block(block), span))
            }
            TokenKind::Punct(";") => {
                self.advance()?;
                Ok(Stmt::new(StmtKind::Empty, start))
            }
            TokenKind::Keyword(Keyword::Const | Keyword::Let | Keyword::Var) => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Var(decl), start))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => {
                self.advance()?;
                let test = self.parse_paren_expr()?;
                let body = Box::new(self.parse_statement()?);
                Ok(self.finish(StmtKind::While { test, body }, start))
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                if !self.eat_keyword(Keyword::While)? {
                    return Err(self.unexpected()?);
                }
                let test = self.parse_paren_expr()?;
                // a `;` after `do ... while (...)` is optional
                self.eat_punct(";")?;
                Ok(self.finish(StmtKind::DoWhile { body, test }, start))
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => {
                self.advance()?;
                let next = self.peek()?;
                let bare = next.is_punct(";")
                    || next.is_punct("}")
                    || next.kind == TokenKind::Eof
                    || next.newline_before;
                let arg = if bare {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Return(arg), start))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Break, start))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Continue, start))
            }
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Debugger, start))
            }
            TokenKind::Keyword(Keyword::Function) if !self.peek_nth(1)?.is_punct("(") => {
                let function = self.parse_function()?;
                let span = function.span;
                Ok(Stmt::new(StmtKind::Function(Box::new(function)), span))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(self.finish(StmtKind::Expr(expr), start))
            }
        }
    }

    fn finish(&self, kind: StmtKind, start: Span) -> Stmt {
        Stmt::new(kind, start.merge(Span::point(self.prev_end)))
    }

    /// `"(" Expression ")"`
    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    /// `IfStatement = "if" "(" Expr ")" Statement [ "else" Statement ]`
    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.advance()?.span;
        let test = self.parse_paren_expr()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(self.finish(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    /// `ForStatement = "for" "(" [ VarDecl | Expr ] ";" [ Expr ] ";" [ Expr ] ")" Statement`
    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.advance()?.span;
        self.expect_punct("(")?;

        let init = if self.check_punct(";")? {
            None
        } else if self.check_keyword(Keyword::Const)?
            || self.check_keyword(Keyword::Let)?
            || self.check_keyword(Keyword::Var)?
        {
            Some(ForInit::Var(self.parse_var_decl()?))
        } else {
            Some(ForInit::Expr(self.parse_expression()?))
        };
        if self.check_keyword(Keyword::In)? || matches!(self.peek()?.kind, TokenKind::Reserved("of")) {
            let span = self.peek()?.span;
            return Err(self.error_at(
                span,
                "Unsupported syntax: only 'for (init; test; update)' loops are allowed",
            ));
        }
        self.expect_punct(";")?;

        let test = if self.check_punct(";")? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(";")?;

        let update = if self.check_punct(")")? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(")")?;

        let body = Box::new(self.parse_statement()?);
        Ok(self.finish(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    /// `VarDecl = ("const" | "let" | "var") Declarator { "," Declarator }`
    ///
    /// The terminating `;` is left to the caller.
    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let token = self.advance()?;
        let kind = match token.kind {
            TokenKind::Keyword(Keyword::Let) => VarKind::Let,
            TokenKind::Keyword(Keyword::Var) => VarKind::Var,
            _ => VarKind::Const,
        };
        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            let init = if self.eat_punct("=")? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            let span = target.span().merge(Span::point(self.prev_end));
            declarators.push(Declarator { target, init, span });
            if !self.eat_punct(",")? {
                break;
            }
        }
        Ok(VarDecl {
            kind,
            declarators,
            span: token.span.merge(Span::point(self.prev_end)),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_standalone;
    use gqlx_types::ast::*;
    use gqlx_types::SourceFile;

    fn body(src: &str) -> Vec<Stmt> {
        let file = SourceFile::new("t", src);
        let expr = parse_standalone(&file).unwrap();
        let ExprKind::Arrow(arrow) = expr.kind else {
            panic!("expected arrow");
        };
        match arrow.body {
            ArrowBody::Block(block) => block.stmts,
            ArrowBody::Expr(_) => panic!("expected block body"),
        }
    }

    #[test]
    fn test_control_flow_statements() {
        let stmts = body(
            "() => {
                const ids = [];
                let i = 0
                while (i < 3) i++;
                do { i--; } while (i > 0)
                for (let j = 0; j < 2; j++) { if (j) continue; else break; }
                for (;;) {}
                debugger;
                return ids
            }",
        );
        assert!(matches!(stmts[0].kind, StmtKind::Var(VarDecl { kind: VarKind::Const, .. })));
        assert!(matches!(stmts[1].kind, StmtKind::Var(VarDecl { kind: VarKind::Let, .. })));
        assert!(matches!(stmts[2].kind, StmtKind::While { .. }));
        assert!(matches!(stmts[3].kind, StmtKind::DoWhile { .. }));
        assert!(matches!(stmts[4].kind, StmtKind::For { init: Some(_), .. }));
        assert!(matches!(
            stmts[5].kind,
            StmtKind::For { init: None, test: None, update: None, .. }
        ));
        assert!(matches!(stmts[6].kind, StmtKind::Debugger));
        assert!(matches!(stmts[7].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_return_without_argument() {
        let stmts = body("() => { return; }");
        assert!(matches!(stmts[0].kind, StmtKind::Return(None)));
        let stmts = body("() => { return\n1 }");
        assert!(matches!(stmts[0].kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_destructuring_declaration() {
        let stmts = body("() => { const { snippets, languages } = res; }");
        let StmtKind::Var(decl) = &stmts[0].kind else {
            panic!("expected declaration");
        };
        assert_eq!(decl.declarators[0].target.bound_names(), vec!["snippets", "languages"]);
    }

    #[test]
    fn test_function_declaration_is_parsed() {
        let stmts = body("() => { function foo() {} }");
        assert!(matches!(stmts[0].kind, StmtKind::Function(_)));
    }

    #[test]
    fn test_for_of_is_rejected() {
        let file = SourceFile::new("t", "() => { for (const x of xs) {} }");
        let err = parse_standalone(&file).unwrap_err();
        assert!(err.message.contains("Unsupported syntax"));
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        let file = SourceFile::new("t", "() => { a b }");
        assert!(parse_standalone(&file).is_err());
    }
}
