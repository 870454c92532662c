//! Expression code generation.
//!
//! Binary, logical, conditional, assignment, unary, update and sequence
//! expressions are always wrapped in parentheses, so the output never
//! depends on operator precedence.

use gqlx_types::ast::*;

use crate::error::{CodegenError, CodegenResult};
use crate::stmt::emit_block;
use crate::transpile::GenContext;

/// Emit source text for an expression.
pub fn emit_expr(expr: &Expr, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    match &expr.kind {
        // ── Literals ──────────────────────────────────────────────────────
        ExprKind::Literal(lit) => out.push_str(&lit.raw),
        ExprKind::Template { quasis, exprs } => emit_template(quasis, exprs, ctx, out)?,
        ExprKind::Array(elements) => emit_array(elements, ctx, out)?,
        ExprKind::Object(props) => emit_object(props, ctx, out)?,

        // ── Identifiers & Access ─────────────────────────────────────────
        ExprKind::Identifier(name) => out.push_str(&ctx.resolve(name)),
        ExprKind::Member {
            object,
            property,
            optional,
        } => {
            emit_operand(object, ctx, out)?;
            match property {
                MemberProp::Ident(id) => {
                    out.push_str(if *optional { "?." } else { "." });
                    out.push_str(&id.name);
                }
                MemberProp::Computed(prop) => {
                    out.push_str(if *optional { "?.[" } else { "[" });
                    emit_expr(prop, ctx, out)?;
                    out.push(']');
                }
            }
        }
        ExprKind::Call {
            callee,
            args,
            optional,
        } => {
            emit_operand(callee, ctx, out)?;
            out.push_str(if *optional { "?.(" } else { "(" });
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Argument::Spread(_) = arg {
                    out.push_str("...");
                }
                emit_expr(arg.expr(), ctx, out)?;
            }
            out.push(')');
        }

        // ── Functions ────────────────────────────────────────────────────
        ExprKind::Arrow(arrow) => emit_arrow(arrow, ctx, out)?,
        ExprKind::Function(_) => {
            return Err(CodegenError::Unsupported("function expression".into()))
        }
        ExprKind::This => return Err(CodegenError::Unsupported("this".into())),
        ExprKind::Await(inner) => {
            out.push_str("await ");
            emit_expr(inner, ctx, out)?;
        }

        // ── Operators ────────────────────────────────────────────────────
        ExprKind::Unary { op, arg } => {
            out.push('(');
            out.push_str(op.as_str());
            if op.is_word() {
                out.push(' ');
            }
            emit_expr(arg, ctx, out)?;
            out.push(')');
        }
        ExprKind::Update { op, prefix, target } => {
            out.push('(');
            if *prefix {
                out.push_str(op.as_str());
            }
            emit_pattern(target, PatternMode::Assign, ctx, out)?;
            if !*prefix {
                out.push_str(op.as_str());
            }
            out.push(')');
        }
        ExprKind::Binary { op, left, right } => {
            emit_infix(left, op.as_str(), right, ctx, out)?
        }
        ExprKind::Logical { op, left, right } => {
            emit_infix(left, op.as_str(), right, ctx, out)?
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            out.push_str("((");
            emit_expr(test, ctx, out)?;
            out.push_str(") ? (");
            emit_expr(consequent, ctx, out)?;
            out.push_str(") : (");
            emit_expr(alternate, ctx, out)?;
            out.push_str("))");
        }
        ExprKind::Assign { op, target, value } => {
            out.push('(');
            emit_pattern(target, PatternMode::Assign, ctx, out)?;
            out.push(' ');
            out.push_str(&op.as_string());
            out.push(' ');
            emit_expr(value, ctx, out)?;
            out.push(')');
        }
        ExprKind::Sequence(exprs) => {
            out.push('(');
            for (i, e) in exprs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_expr(e, ctx, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

/// Member objects and callees: an `await` there needs parentheses.
fn emit_operand(expr: &Expr, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    if let ExprKind::Await(_) = expr.kind {
        out.push('(');
        emit_expr(expr, ctx, out)?;
        out.push(')');
        Ok(())
    } else {
        emit_expr(expr, ctx, out)
    }
}

fn emit_infix(
    left: &Expr,
    op: &str,
    right: &Expr,
    ctx: &mut GenContext,
    out: &mut String,
) -> CodegenResult<()> {
    out.push('(');
    emit_expr(left, ctx, out)?;
    out.push(' ');
    out.push_str(op);
    out.push(' ');
    emit_expr(right, ctx, out)?;
    out.push(')');
    Ok(())
}

fn emit_template(
    quasis: &[TemplatePart],
    exprs: &[Expr],
    ctx: &mut GenContext,
    out: &mut String,
) -> CodegenResult<()> {
    out.push('`');
    for (i, quasi) in quasis.iter().enumerate() {
        out.push_str(&quasi.raw);
        if let Some(e) = exprs.get(i) {
            out.push_str("${");
            emit_expr(e, ctx, out)?;
            out.push('}');
        }
    }
    out.push('`');
    Ok(())
}

fn emit_array(elements: &[ArrayElement], ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    out.push('[');
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match element {
            ArrayElement::Expr(e) => emit_expr(e, ctx, out)?,
            ArrayElement::Spread(e) => {
                out.push_str("...");
                emit_expr(e, ctx, out)?;
            }
            ArrayElement::Hole => {}
        }
    }
    // a trailing hole needs its own comma to survive
    if let Some(ArrayElement::Hole) = elements.last() {
        out.push(',');
    }
    out.push(']');
    Ok(())
}

/// `({ a: 1, b, [k]: v, ...(rest) })`
fn emit_object(props: &[Property], ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    out.push_str("({ ");
    for (i, prop) in props.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match prop {
            Property::Init {
                key,
                value,
                shorthand: true,
                ..
            } => match key {
                PropKey::Ident(id) if ctx.expands_shorthand(&id.name) => {
                    out.push_str(&id.name);
                    out.push_str(": ");
                    emit_expr(value, ctx, out)?;
                }
                _ => emit_expr(value, ctx, out)?,
            },
            Property::Init { key, value, .. } => {
                emit_prop_key(key, ctx, out)?;
                out.push_str(": ");
                emit_expr(value, ctx, out)?;
            }
            Property::Spread(e) => {
                out.push_str("...(");
                emit_expr(e, ctx, out)?;
                out.push(')');
            }
        }
    }
    out.push_str(" })");
    Ok(())
}

fn emit_prop_key(key: &PropKey, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    match key {
        PropKey::Ident(id) => out.push_str(&id.name),
        PropKey::Literal(lit) => out.push_str(&lit.raw),
        PropKey::Computed(e) => {
            out.push('[');
            emit_expr(e, ctx, out)?;
            out.push(']');
        }
    }
    Ok(())
}

/// `(async (a, b) => body)`
fn emit_arrow(arrow: &ArrowFn, ctx: &mut GenContext, out: &mut String) -> CodegenResult<()> {
    ctx.scopes.push();
    out.push('(');
    if arrow.is_async {
        out.push_str("async ");
    }
    out.push('(');
    for (i, param) in arrow.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        emit_pattern(param, PatternMode::Bind, ctx, out)?;
        ctx.scopes.declare_all(param.bound_names());
    }
    out.push_str(") => ");
    match &arrow.body {
        ArrowBody::Block(block) => emit_block(block, ctx, out)?,
        ArrowBody::Expr(body) => emit_expr(body, ctx, out)?,
    }
    out.push(')');
    ctx.scopes.pop();
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Patterns
// ══════════════════════════════════════════════════════════════════════════════

/// How identifiers inside a pattern are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    /// Declarations and parameters: names are new bindings, kept as written.
    Bind,
    /// Assignment and update targets: names resolve like any identifier.
    Assign,
}

/// Emit a binding or assignment pattern.
pub fn emit_pattern(
    pattern: &Pattern,
    mode: PatternMode,
    ctx: &mut GenContext,
    out: &mut String,
) -> CodegenResult<()> {
    match pattern {
        Pattern::Ident(id) => match mode {
            PatternMode::Bind => out.push_str(&id.name),
            PatternMode::Assign => out.push_str(&ctx.resolve(&id.name)),
        },
        Pattern::Array(elements, _) => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(element) = element {
                    emit_pattern(element, mode, ctx, out)?;
                }
            }
            if let Some(None) = elements.last() {
                out.push(',');
            }
            out.push(']');
        }
        Pattern::Object(props, _) => {
            out.push_str("{ ");
            for (i, prop) in props.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match prop {
                    PatternProp::Init {
                        key,
                        value,
                        shorthand,
                    } => {
                        let spelled_out = !*shorthand
                            || (mode == PatternMode::Assign
                                && matches!(key, PropKey::Ident(id) if ctx.resolve(&id.name) != id.name));
                        if spelled_out {
                            emit_prop_key(key, ctx, out)?;
                            out.push_str(": ");
                        }
                        emit_pattern(value, mode, ctx, out)?;
                    }
                    PatternProp::Rest(rest) => {
                        out.push_str("...");
                        emit_pattern(rest, mode, ctx, out)?;
                    }
                }
            }
            out.push_str(" }");
        }
        Pattern::Assign { target, default } => {
            emit_pattern(target, mode, ctx, out)?;
            out.push_str(" = ");
            emit_expr(default, ctx, out)?;
        }
        Pattern::Rest(inner) => {
            out.push_str("...");
            emit_pattern(inner, mode, ctx, out)?;
        }
        Pattern::Member(expr) => emit_expr(expr, ctx, out)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_parser::parse_standalone;
    use gqlx_types::{Capabilities, SourceFile};

    fn render(src: &str) -> String {
        let caps = Capabilities::new().asynchronous("get");
        let args = vec!["id".to_string()];
        let expr = parse_standalone(&SourceFile::new("t", src)).unwrap();
        let mut ctx = GenContext::new(&caps, &args);
        let mut out = String::new();
        emit_expr(&expr, &mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn test_full_parenthesization() {
        assert_eq!(render("{ a: (((3))) + (((4) - 5)), b: (('foo')) }"), "({ a: (3 + (4 - 5)), b: 'foo' })");
        assert_eq!(render("a ? b : c"), "((a) ? (b) : (c))");
        assert_eq!(render("!a"), "(!a)");
        assert_eq!(render("typeof a"), "(typeof a)");
        assert_eq!(render("--n"), "(--n)");
        assert_eq!(render("i++"), "(i++)");
        assert_eq!(render("a += 1"), "(a += 1)");
    }

    #[test]
    fn test_object_forms() {
        assert_eq!(render("{}"), "({  })");
        assert_eq!(render("{ [c.id]: c }"), "({ [c.id]: c })");
        assert_eq!(render("{ x, y }"), "({ x, y })");
        assert_eq!(render("{ id, 'k': 1 }"), "({ id: $data.id, 'k': 1 })");
        assert_eq!(render("{ ...x }"), "({ ...(x) })");
    }

    #[test]
    fn test_member_and_call_forms() {
        assert_eq!(render("a?.b?.[c]?.(d)"), "a?.b?.[c]?.(d)");
        assert_eq!(render("f(...xs)"), "f(...xs)");
        assert_eq!(render("[a, , ...b]"), "[a, , ...b]");
        assert_eq!(render("[a, ,]"), "[a, ,]");
    }

    #[test]
    fn test_template_keeps_raw_text() {
        assert_eq!(render("`api/${id}/x\\n`"), "`api/${$data.id}/x\\n`");
    }

    #[test]
    fn test_assignment_targets_resolve() {
        assert_eq!(render("id = 1"), "($data.id = 1)");
        assert_eq!(render("[id, x] = y"), "([$data.id, x] = y)");
        assert_eq!(render("({ id } = y)"), "({ id: $data.id } = y)");
    }

    #[test]
    fn test_patterns_bind_raw_names() {
        assert_eq!(
            render("({ a, b: [c], d = 1, ...e }, id) => id"),
            "(({ a, b: [c], d = 1, ...e }, id) => id)"
        );
    }

    #[test]
    fn test_function_and_this_rejected() {
        let caps = Capabilities::new();
        let mut ctx = GenContext::new(&caps, &[]);
        let expr = parse_standalone(&SourceFile::new("t", "this")).unwrap();
        let mut out = String::new();
        assert!(emit_expr(&expr, &mut ctx, &mut out).is_err());
    }
}
