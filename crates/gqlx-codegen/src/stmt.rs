//! Statement code generation.

use gqlx_types::ast::*;

use crate::error::{CodegenError, CodegenResult};
use crate::expr::{emit_expr, emit_pattern, PatternMode};
use crate::transpile::GenContext;

/// Emit `{ s1 s2 ... }` in a fresh scope.
pub fn emit_block(block: &Block, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    ctx.scopes.push();
    out.push_str("{ ");
    for (i, stmt) in block.stmts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        emit_stmt(stmt, ctx, out)?;
    }
    out.push_str(" }");
    ctx.scopes.pop();
    Ok(())
}

/// Emit a single statement.
pub fn emit_stmt(stmt: &Stmt, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            emit_expr(expr, ctx, out)?;
            out.push(';');
        }
        StmtKind::Var(decl) => {
            emit_var_decl(decl, ctx, out)?;
            out.push(';');
        }
        StmtKind::Return(arg) => match arg {
            Some(arg) => {
                out.push_str("return ");
                emit_expr(arg, ctx, out)?;
                out.push(';');
            }
            None => out.push_str("return;"),
        },
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            out.push_str("if (");
            emit_expr(test, ctx, out)?;
            out.push_str(") ");
            emit_stmt(consequent, ctx, out)?;
            if let Some(alternate) = alternate {
                out.push_str(" else ");
                emit_stmt(alternate, ctx, out)?;
            }
        }
        StmtKind::While { test, body } => {
            out.push_str("while (");
            emit_expr(test, ctx, out)?;
            out.push_str(") ");
            emit_stmt(body, ctx, out)?;
        }
        StmtKind::DoWhile { body, test } => {
            out.push_str("do ");
            emit_stmt(body, ctx, out)?;
            out.push_str(" while (");
            emit_expr(test, ctx, out)?;
            out.push_str(");");
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            // names declared in the init clause are visible to the body only
            ctx.scopes.push();
            out.push_str("for (");
            match init {
                Some(ForInit::Var(decl)) => emit_var_decl(decl, ctx, out)?,
                Some(ForInit::Expr(expr)) => emit_expr(expr, ctx, out)?,
                None => {}
            }
            out.push_str("; ");
            if let Some(test) = test {
                emit_expr(test, ctx, out)?;
            }
            out.push_str("; ");
            if let Some(update) = update {
                emit_expr(update, ctx, out)?;
            }
            out.push_str(") ");
            emit_stmt(body, ctx, out)?;
            ctx.scopes.pop();
        }
        StmtKind::Block(block) => emit_block(block, ctx, out)?,
        StmtKind::Break => out.push_str("break;"),
        StmtKind::Continue => out.push_str("continue;"),
        StmtKind::Debugger => out.push_str("debugger;"),
        StmtKind::Empty => out.push(';'),
        StmtKind::Function(_) => {
            return Err(CodegenError::Unsupported("function declaration".into()))
        }
    }
    Ok(())
}

/// `const a = 1, { b } = c` without the trailing `;`.
///
/// Each initializer is rendered before its names are bound, so
/// `const id = id` still reads the outer `id`.
fn emit_var_decl(decl: &VarDecl, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    out.push_str(decl.kind.as_str());
    out.push(' ');
    for (i, declarator) in decl.declarators.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let mut rendered = String::new();
        emit_pattern(&declarator.target, PatternMode::Bind, ctx, &mut rendered)?;
        if let Some(init) = &declarator.init {
            rendered.push_str(" = ");
            emit_expr(init, ctx, &mut rendered)?;
        }
        ctx.scopes.declare_all(declarator.target.bound_names());
        out.push_str(&rendered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_parser::parse_standalone;
    use gqlx_types::{Capabilities, SourceFile};

    fn render_body(src: &str, args: &[&str]) -> String {
        let caps = Capabilities::new().asynchronous("get");
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let expr = parse_standalone(&SourceFile::new("t", src)).unwrap();
        let ExprKind::Arrow(arrow) = expr.kind else {
            panic!("expected arrow");
        };
        let ArrowBody::Block(block) = &arrow.body else {
            panic!("expected block body");
        };
        let mut ctx = GenContext::new(&caps, &args);
        let mut out = String::new();
        emit_block(block, &mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            render_body("() => { for (let i = 0; i < n; i++) { ids.push(i); } }", &[]),
            "{ for (let i = 0; (i < n); (i++)) { ids.push(i); } }"
        );
        assert_eq!(
            render_body("() => { do { n--; } while (n > 0); }", &[]),
            "{ do { (n--); } while ((n > 0)); }"
        );
        assert_eq!(render_body("() => { for (;;) { break; } }", &[]), "{ for (; ; ) { break; } }");
    }

    #[test]
    fn test_empty_block_and_bare_return() {
        assert_eq!(render_body("() => {}", &[]), "{  }");
        assert_eq!(render_body("() => { return; }", &[]), "{ return; }");
    }

    #[test]
    fn test_declaration_reads_outer_name_before_binding() {
        assert_eq!(
            render_body("() => { const id = id; return id; }", &["id"]),
            "{ const id = $data.id; return id; }"
        );
    }

    #[test]
    fn test_block_scope_ends_at_closing_brace() {
        assert_eq!(
            render_body("() => { if (x) { const id = 1; } else { id; } return id; }", &["id"]),
            "{ if (x) { const id = 1; } else { $data.id; } return $data.id; }"
        );
    }

    #[test]
    fn test_for_init_is_scoped_to_loop() {
        assert_eq!(
            render_body("() => { for (let id = 0; id < 1; id++) {} return id; }", &["id"]),
            "{ for (let id = 0; (id < 1); (id++)) {  } return $data.id; }"
        );
    }
}
