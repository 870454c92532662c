//! Capability validator: walks one field body and rejects everything a
//! resolver is not allowed to do.
//!
//! Entry point: [`validate`].
//!
//! Error codes emitted:
//! - E400: reference to a name that is not in scope
//! - E401: `function`, `this`, `await`, `delete` or (outside debug mode)
//!   `debugger`

use gqlx_codegen::inbuilt::HELPERS;
use gqlx_types::ast::*;
use gqlx_types::{Capabilities, ErrorCode, GqlxError, Result, SourceFile, Span};

use crate::env::NameEnv;

/// Globals every body may use.
pub const STANDARD_NAMES: [&str; 5] = ["null", "undefined", "Array", "Object", "Math"];

/// Globals admitted only in debug mode.
pub const DEBUG_NAMES: [&str; 2] = ["console", "assert"];

/// Check `body` of a field declaring `args` against `capabilities`.
///
/// Locations are resolved against `file`, the composite source.
pub fn validate(
    file: &SourceFile,
    body: &Expr,
    capabilities: &Capabilities,
    args: &[String],
    debug: bool,
) -> Result<()> {
    let helpers = HELPERS.iter().map(|(name, _)| *name);
    let debug_names = DEBUG_NAMES.iter().copied().filter(|_| debug);
    let seed = capabilities
        .names()
        .chain(args.iter().map(String::as_str))
        .chain(helpers)
        .chain(STANDARD_NAMES)
        .chain(debug_names);

    let mut validator = Validator {
        file,
        env: NameEnv::new(seed),
        debug,
    };
    validator.check_expr(body)
}

// ══════════════════════════════════════════════════════════════════════════════
// Validator
// ══════════════════════════════════════════════════════════════════════════════

struct Validator<'a> {
    file: &'a SourceFile,
    env: NameEnv,
    debug: bool,
}

impl Validator<'_> {
    fn forbidden(&self, message: &str, span: Span) -> GqlxError {
        GqlxError::new(ErrorCode::FORBIDDEN_CONSTRUCT, message, self.file.location(span))
    }

    fn check_name(&self, name: &str, span: Span) -> Result<()> {
        if self.env.is_bound(name) {
            return Ok(());
        }
        let available = self.env.visible().join(", ");
        Err(GqlxError::new(
            ErrorCode::FREE_VARIABLE,
            format!(
                "The variable \"{name}\" is not available in the current context. Available: {available}."
            ),
            self.file.location(span),
        ))
    }

    // ── Statements ──

    fn check_block(&mut self, block: &Block) -> Result<()> {
        self.env.push_scope();
        let result = block.stmts.iter().try_for_each(|stmt| self.check_stmt(stmt));
        self.env.pop_scope();
        result
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::Var(decl) => self.check_var_decl(decl),
            StmtKind::Return(arg) => arg.as_ref().map_or(Ok(()), |e| self.check_expr(e)),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test)?;
                self.check_stmt(consequent)?;
                alternate.as_ref().map_or(Ok(()), |alt| self.check_stmt(alt))
            }
            StmtKind::While { test, body } => {
                self.check_expr(test)?;
                self.check_stmt(body)
            }
            StmtKind::DoWhile { body, test } => {
                self.check_stmt(body)?;
                self.check_expr(test)
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.env.push_scope();
                let result = self.check_for(init.as_ref(), test.as_ref(), update.as_ref(), body);
                self.env.pop_scope();
                result
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => Ok(()),
            StmtKind::Debugger if self.debug => Ok(()),
            StmtKind::Debugger => Err(self.forbidden(
                "The debugger statement can only be used with enabled debug option.",
                stmt.span,
            )),
            StmtKind::Function(_) => Err(self.forbidden(
                "Declaring a new `function` is not allowed. Only anonymous functions (\"=>\") can be used.",
                stmt.span,
            )),
        }
    }

    fn check_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<()> {
        match init {
            Some(ForInit::Var(decl)) => self.check_var_decl(decl)?,
            Some(ForInit::Expr(expr)) => self.check_expr(expr)?,
            None => {}
        }
        if let Some(test) = test {
            self.check_expr(test)?;
        }
        if let Some(update) = update {
            self.check_expr(update)?;
        }
        self.check_stmt(body)
    }

    /// Names become visible after their own declarator.
    fn check_var_decl(&mut self, decl: &VarDecl) -> Result<()> {
        for declarator in &decl.declarators {
            if let Some(init) = &declarator.init {
                self.check_expr(init)?;
            }
            self.check_pattern(&declarator.target)?;
            for name in declarator.target.bound_names() {
                self.env.declare(name);
            }
        }
        Ok(())
    }

    // ── Patterns ──

    /// Check the expressions inside a pattern: defaults, computed keys and
    /// member targets. Bound identifiers themselves are not looked up.
    fn check_pattern(&mut self, pattern: &Pattern) -> Result<()> {
        match pattern {
            Pattern::Ident(_) => Ok(()),
            Pattern::Array(elements, _) => elements
                .iter()
                .flatten()
                .try_for_each(|element| self.check_pattern(element)),
            Pattern::Object(props, _) => {
                for prop in props {
                    match prop {
                        PatternProp::Init { key, value, .. } => {
                            self.check_key(key)?;
                            self.check_pattern(value)?;
                        }
                        PatternProp::Rest(rest) => self.check_pattern(rest)?,
                    }
                }
                Ok(())
            }
            Pattern::Assign { target, default } => {
                self.check_pattern(target)?;
                self.check_expr(default)
            }
            Pattern::Rest(inner) => self.check_pattern(inner),
            Pattern::Member(expr) => self.check_expr(expr),
        }
    }

    fn check_key(&mut self, key: &PropKey) -> Result<()> {
        match key {
            PropKey::Computed(expr) => self.check_expr(expr),
            PropKey::Ident(_) | PropKey::Literal(_) => Ok(()),
        }
    }

    // ── Expressions ──

    fn check_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Identifier(name) => self.check_name(name, expr.span),
            ExprKind::Template { exprs, .. } => exprs.iter().try_for_each(|e| self.check_expr(e)),
            ExprKind::Array(elements) => {
                for element in elements {
                    match element {
                        ArrayElement::Expr(e) | ArrayElement::Spread(e) => self.check_expr(e)?,
                        ArrayElement::Hole => {}
                    }
                }
                Ok(())
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Property::Init { key, value, .. } => {
                            self.check_key(key)?;
                            self.check_expr(value)?;
                        }
                        Property::Spread(e) => self.check_expr(e)?,
                    }
                }
                Ok(())
            }
            ExprKind::Member {
                object, property, ..
            } => {
                self.check_expr(object)?;
                match property {
                    MemberProp::Computed(key) => self.check_expr(key),
                    MemberProp::Ident(_) => Ok(()),
                }
            }
            ExprKind::Call { callee, args, .. } => {
                self.check_expr(callee)?;
                args.iter().try_for_each(|arg| self.check_expr(arg.expr()))
            }
            ExprKind::Arrow(arrow) => self.check_arrow(arrow),
            ExprKind::Function(_) => Err(self.forbidden(
                "Using `function` is not allowed. Use arrow functions (\"=>\") instead.",
                expr.span,
            )),
            ExprKind::This => Err(self.forbidden(
                "Using `this` is not allowed. The context is only given explicitly.",
                expr.span,
            )),
            ExprKind::Await(_) => Err(self.forbidden(
                "Using `await` is not allowed. Asynchronous calls are automatically wrapped.",
                expr.span,
            )),
            ExprKind::Unary {
                op: UnaryOp::Delete,
                ..
            } => Err(self.forbidden(
                "Using `delete` is not allowed. Use the spread operator instead.",
                expr.span,
            )),
            ExprKind::Unary { arg, .. } => self.check_expr(arg),
            ExprKind::Update { target, .. } => match target.as_ref() {
                Pattern::Ident(id) => self.check_name(&id.name, id.span),
                other => self.check_pattern(other),
            },
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test)?;
                self.check_expr(consequent)?;
                self.check_expr(alternate)
            }
            ExprKind::Assign { target, value, .. } => {
                self.check_pattern(target)?;
                self.check_expr(value)
            }
            ExprKind::Sequence(exprs) => exprs.iter().try_for_each(|e| self.check_expr(e)),
        }
    }

    /// Parameters are bound one after another, so a default may refer to
    /// the parameters before it.
    fn check_arrow(&mut self, arrow: &ArrowFn) -> Result<()> {
        self.env.push_scope();
        let result = self.check_arrow_inner(arrow);
        self.env.pop_scope();
        result
    }

    fn check_arrow_inner(&mut self, arrow: &ArrowFn) -> Result<()> {
        for param in &arrow.params {
            self.check_pattern(param)?;
            for name in param.bound_names() {
                self.env.declare(name);
            }
        }
        match &arrow.body {
            ArrowBody::Expr(body) => self.check_expr(body),
            ArrowBody::Block(block) => self.check_block(block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_parser::parse_standalone;
    use gqlx_types::ErrorKind;

    fn check(src: &str, args: &[&str], debug: bool) -> Result<()> {
        let file = SourceFile::new("body", src);
        let expr = parse_standalone(&file).unwrap();
        let caps = Capabilities::new().asynchronous("get").sync("listen");
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        validate(&file, &expr, &caps, &args, debug)
    }

    fn rejection(src: &str) -> GqlxError {
        let err = check(src, &["id"], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
        err
    }

    #[test]
    fn test_accepts_bound_names() {
        check("get('a/' + id).items.map(x => x.name)", &["id"], false).unwrap();
        check("either(id, Math.max(1, 2))", &["id"], false).unwrap();
        check("use(listen(id), ({ a, b: [c], ...d }) => a + c + d.e)", &["id"], false).unwrap();
    }

    #[test]
    fn test_free_variable_lists_available_names() {
        let err = rejection("id + bar");
        assert_eq!(err.code, ErrorCode::FREE_VARIABLE);
        assert_eq!(
            err.message,
            "The variable \"bar\" is not available in the current context. \
             Available: get, listen, id, either, use, cq, null, undefined, Array, Object, Math."
        );
        assert_eq!(err.location.range, [5, 8]);
    }

    #[test]
    fn test_unknown_callee_is_free() {
        assert_eq!(rejection("fetch(id)").code, ErrorCode::FREE_VARIABLE);
    }

    #[test]
    fn test_member_names_and_keys_are_not_checked() {
        check("({ foo: id.bar.baz })", &["id"], false).unwrap();
        assert_eq!(rejection("id[bar]").code, ErrorCode::FREE_VARIABLE);
    }

    #[test]
    fn test_locals_follow_declaration_order() {
        check("use(1, x => { const y = x; return y; })", &[], false).unwrap();
        assert_eq!(
            rejection("use(1, x => { const y = z; const z = 1; return y; })").code,
            ErrorCode::FREE_VARIABLE
        );
    }

    #[test]
    fn test_block_locals_do_not_escape() {
        assert_eq!(
            rejection("use(1, x => { if (x) { const y = 1; } return y; })").code,
            ErrorCode::FREE_VARIABLE
        );
        assert_eq!(
            rejection("use(1, x => { for (let i = 0; i < x; i++) {} return i; })").code,
            ErrorCode::FREE_VARIABLE
        );
    }

    #[test]
    fn test_parameters_do_not_escape_their_arrow() {
        assert_eq!(rejection("[use(1, x => x), x]").code, ErrorCode::FREE_VARIABLE);
    }

    #[test]
    fn test_default_sees_earlier_parameters() {
        check("use(1, (a, b = a) => b)", &[], false).unwrap();
    }

    #[test]
    fn test_forbidden_constructs() {
        let cases = [
            ("function () { return 1; }", "Using `function` is not allowed. Use arrow functions (\"=>\") instead."),
            ("this.id", "Using `this` is not allowed. The context is only given explicitly."),
            ("await get(id)", "Using `await` is not allowed. Asynchronous calls are automatically wrapped."),
            ("delete id.x", "Using `delete` is not allowed. Use the spread operator instead."),
            (
                "use(1, x => { function f() {} return x; })",
                "Declaring a new `function` is not allowed. Only anonymous functions (\"=>\") can be used.",
            ),
        ];
        for (src, message) in cases {
            let err = rejection(src);
            assert_eq!(err.code, ErrorCode::FORBIDDEN_CONSTRUCT, "{src}");
            assert_eq!(err.message, message, "{src}");
        }
    }

    #[test]
    fn test_nested_forbidden_construct() {
        let err = rejection("id.map(x => x.filter(y => this.ok))");
        assert_eq!(err.code, ErrorCode::FORBIDDEN_CONSTRUCT);
    }

    #[test]
    fn test_debug_mode() {
        let src = "use(1, x => { debugger; console.log(x); return x; })";
        let err = check(src, &[], false).unwrap_err();
        assert_eq!(
            err.message,
            "The debugger statement can only be used with enabled debug option."
        );
        check(src, &[], true).unwrap();
        assert_eq!(
            check("assert(1)", &[], false).unwrap_err().code,
            ErrorCode::FREE_VARIABLE
        );
    }
}
