//! Async-correctness rewrite.
//!
//! Resolver bodies are written as if every capability call returned its
//! result directly. This pass turns such a body into a block in which every
//! asynchronous result is awaited before it is used:
//!
//! - A pending call in a value position (return, operand, argument,
//!   property value, spread, assignment value, branch, ...) is awaited in
//!   place.
//! - A pending call used as the object of a member access is hoisted into
//!   `const _n = await <call>;` in front of the statement that uses it, and
//!   the access is rewritten to `_n`.
//! - Hoisting never moves work out of a lazily evaluated position (ternary
//!   branch, right operand of `&&`/`||`/`??`, loop test or update,
//!   parameter default), nor in front of an operand it depends on (later
//!   declarators of a `for` header, later operands of a comma sequence).
//!   Such a position gets its own async thunk instead:
//!   `await (async () => { const _n = ...; return <expr>; })()`.
//! - A parameter whose default needs an `await` is bound at the start of
//!   the body instead, together with every parameter after it.
//! - `.map` with an asynchronous callback becomes `Promise.all(<map>)`,
//!   which is pending in turn.
//! - A function that ends up containing an `await` is marked `async`. A
//!   call is itself pending when it takes an async callback, calls an async
//!   arrow directly, or calls a local bound to one.
//!
//! The walk is a plain recursive descent. Its stacks stand in for the
//! ancestor chain: `frames` tracks the innermost function, `hoists` the
//! innermost place where temporaries can be declared.

use gqlx_types::ast::*;
use gqlx_types::{Capabilities, Span};
use tracing::trace;

use crate::error::CodegenResult;
use crate::inbuilt::{helper_declaration, is_helper, HELPERS};
use crate::scope::Scopes;

/// Rewrite one resolver body into its async-correct top-level block.
///
/// The body becomes `{ return <body>; }` first, then referenced built-in
/// helpers are prepended to that block.
pub fn rewrite(body: Expr, capabilities: &Capabilities, args: &[String]) -> CodegenResult<Block> {
    let span = body.span;
    let mut block = Block::new(vec![Stmt::new(StmtKind::Return(Some(body)), span)], span);

    let mut rewriter = Rewriter::new(capabilities, args);
    rewriter.frames.push(false);
    rewriter.visit_block(&mut block);

    let mut prelude = Vec::new();
    for (name, _) in HELPERS {
        if rewriter.helpers.iter().any(|h| h == name) {
            prelude.push(helper_declaration(name)?);
        }
    }
    trace!(
        temporaries = rewriter.temporaries,
        helpers = ?rewriter.helpers,
        "rewrote resolver body"
    );
    prelude.append(&mut block.stmts);
    block.stmts = prelude;
    Ok(block)
}

struct Rewriter<'a> {
    capabilities: &'a Capabilities,
    args: &'a [String],
    scopes: Scopes,
    /// One entry per enclosing function: does it contain an `await`?
    frames: Vec<bool>,
    /// Declarations waiting to be placed in front of the current statement
    /// or lazy position.
    hoists: Vec<Vec<Stmt>>,
    temporaries: usize,
    helpers: Vec<String>,
}

impl<'a> Rewriter<'a> {
    fn new(capabilities: &'a Capabilities, args: &'a [String]) -> Self {
        let mut scopes = Scopes::new();
        scopes.push();
        Self {
            capabilities,
            args,
            scopes,
            frames: Vec::new(),
            hoists: Vec::new(),
            temporaries: 0,
            helpers: Vec::new(),
        }
    }

    fn temporary(&mut self) -> String {
        let name = format!("_{}", self.temporaries);
        self.temporaries += 1;
        name
    }

    /// Replace the innermost frame's flag, returning the previous one.
    fn swap_frame(&mut self, value: bool) -> bool {
        match self.frames.last_mut() {
            Some(frame) => std::mem::replace(frame, value),
            None => false,
        }
    }

    fn mark_async(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            *frame = true;
        }
    }

    /// A call to an asynchronous capability that no local shadows.
    fn calls_async_capability(&self, callee: &Expr) -> bool {
        callee
            .as_identifier()
            .is_some_and(|name| self.capabilities.is_async(name) && !self.scopes.contains(name))
    }

    fn note_identifier(&mut self, name: &str) {
        if is_helper(name)
            && !self.scopes.contains(name)
            && !self.capabilities.contains(name)
            && !self.args.iter().any(|a| a == name)
            && !self.helpers.iter().any(|h| h == name)
        {
            self.helpers.push(name.to_string());
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Settling pending calls
    // ══════════════════════════════════════════════════════════════════════════

    /// Visit an expression whose value is consumed directly.
    fn value(&mut self, expr: &mut Expr) {
        if self.visit_expr(expr) {
            self.await_in_place(expr);
        }
    }

    /// Visit the object of a member access.
    fn member_object(&mut self, expr: &mut Expr) {
        if self.visit_expr(expr) {
            self.hoist(expr);
        }
    }

    /// Visit an expression that may not be evaluated at all.
    fn lazy(&mut self, expr: &mut Expr) {
        self.hoists.push(Vec::new());
        self.value(expr);
        let decls = self.hoists.pop().unwrap_or_default();
        if decls.is_empty() {
            return;
        }

        let span = expr.span;
        let inner = std::mem::replace(expr, Expr::placeholder());
        let mut stmts = decls;
        stmts.push(Stmt::new(StmtKind::Return(Some(inner)), span));
        let thunk = ArrowFn {
            params: Vec::new(),
            body: ArrowBody::Block(Block::new(stmts, span)),
            is_async: true,
            span,
        };
        let call = Expr::new(
            ExprKind::Call {
                callee: Box::new(Expr::new(ExprKind::Arrow(Box::new(thunk)), span)),
                args: Vec::new(),
                optional: false,
            },
            span,
        );
        *expr = call.awaited();
        self.mark_async();
    }

    fn await_in_place(&mut self, expr: &mut Expr) {
        let inner = std::mem::replace(expr, Expr::placeholder());
        *expr = inner.awaited();
        self.mark_async();
    }

    /// Move a pending call into `const _n = await <call>;` and leave `_n`.
    fn hoist(&mut self, expr: &mut Expr) {
        if self.hoists.is_empty() {
            self.await_in_place(expr);
            return;
        }
        let name = self.temporary();
        let span = expr.span;
        let call = std::mem::replace(expr, Expr::ident(name.clone(), span));
        let declarator = Declarator {
            target: Pattern::Ident(Ident::new(name, span)),
            init: Some(call.awaited()),
            span,
        };
        let decl = Stmt::new(
            StmtKind::Var(VarDecl {
                kind: VarKind::Const,
                declarators: vec![declarator],
                span,
            }),
            span,
        );
        if let Some(target) = self.hoists.last_mut() {
            target.push(decl);
        }
        self.mark_async();
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn visit_block(&mut self, block: &mut Block) {
        self.scopes.push();
        let stmts = std::mem::take(&mut block.stmts);
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let span = stmt.span;
            match stmt.kind {
                StmtKind::Var(decl) => self.visit_declaration(decl, span, &mut out),
                kind => {
                    let mut stmt = Stmt::new(kind, span);
                    self.hoists.push(Vec::new());
                    self.visit_stmt(&mut stmt);
                    out.extend(self.hoists.pop().unwrap_or_default());
                    out.push(stmt);
                }
            }
        }
        block.stmts = out;
        self.scopes.pop();
    }

    /// A declaration statement. Declarators are evaluated in order, so when
    /// a later declarator needs a temporary the statement is split there.
    fn visit_declaration(&mut self, decl: VarDecl, span: Span, out: &mut Vec<Stmt>) {
        let kind = decl.kind;
        let mut pending: Vec<Declarator> = Vec::new();
        for mut declarator in decl.declarators {
            self.hoists.push(Vec::new());
            self.visit_declarator(&mut declarator);
            let decls = self.hoists.pop().unwrap_or_default();
            if !decls.is_empty() && !pending.is_empty() {
                out.push(declaration(kind, std::mem::take(&mut pending), span));
            }
            out.extend(decls);
            pending.push(declarator);
        }
        if !pending.is_empty() {
            out.push(declaration(kind, pending, span));
        }
    }

    fn visit_declarator(&mut self, declarator: &mut Declarator) {
        self.visit_pattern(&mut declarator.target);
        if let Some(init) = &mut declarator.init {
            self.value(init);
        }
        self.scopes.declare_all(declarator.target.bound_names());
        self.note_async_function(declarator);
    }

    fn note_async_function(&mut self, declarator: &Declarator) {
        if let (Pattern::Ident(id), Some(init)) = (&declarator.target, &declarator.init) {
            if is_async_arrow(init) {
                self.scopes.declare_async_function(id.name.clone());
            }
        }
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) => self.value(expr),
            StmtKind::Var(decl) => {
                for declarator in &mut decl.declarators {
                    self.visit_declarator(declarator);
                }
            }
            StmtKind::Return(Some(expr)) => self.value(expr),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.value(test);
                ensure_block(consequent);
                self.visit_stmt(consequent);
                if let Some(alternate) = alternate {
                    ensure_block(alternate);
                    self.visit_stmt(alternate);
                }
            }
            StmtKind::While { test, body } => {
                self.lazy(test);
                ensure_block(body);
                self.visit_stmt(body);
            }
            StmtKind::DoWhile { body, test } => {
                ensure_block(body);
                self.visit_stmt(body);
                self.lazy(test);
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.scopes.push();
                match init {
                    Some(ForInit::Var(decl)) => {
                        // temporaries of later declarators cannot move in
                        // front of the loop, where earlier ones are unbound
                        for (i, declarator) in decl.declarators.iter_mut().enumerate() {
                            if i == 0 {
                                self.visit_declarator(declarator);
                            } else {
                                self.visit_pattern(&mut declarator.target);
                                if let Some(init) = &mut declarator.init {
                                    self.lazy(init);
                                }
                                self.scopes.declare_all(declarator.target.bound_names());
                                self.note_async_function(declarator);
                            }
                        }
                    }
                    Some(ForInit::Expr(expr)) => self.value(expr),
                    None => {}
                }
                if let Some(test) = test {
                    self.lazy(test);
                }
                if let Some(update) = update {
                    self.lazy(update);
                }
                ensure_block(body);
                self.visit_stmt(body);
                self.scopes.pop();
            }
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Debugger
            | StmtKind::Empty
            | StmtKind::Function(_) => {}
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Visit an expression; returns `true` when it is a call whose result
    /// is still pending and must be settled by the caller's position.
    fn visit_expr(&mut self, expr: &mut Expr) -> bool {
        if matches!(expr.kind, ExprKind::Call { .. }) {
            return self.visit_call(expr);
        }
        match &mut expr.kind {
            ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::Function(_)
            | ExprKind::Call { .. } => false,
            ExprKind::Identifier(name) => {
                self.note_identifier(name);
                false
            }
            ExprKind::Template { exprs, .. } => {
                for e in exprs {
                    self.value(e);
                }
                false
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    match element {
                        ArrayElement::Expr(e) | ArrayElement::Spread(e) => self.value(e),
                        ArrayElement::Hole => {}
                    }
                }
                false
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Property::Init { key, value, .. } => {
                            if let PropKey::Computed(k) = key {
                                self.value(k);
                            }
                            self.value(value);
                        }
                        Property::Spread(e) => self.value(e),
                    }
                }
                false
            }
            ExprKind::Member {
                object, property, ..
            } => {
                self.member_object(object);
                if let MemberProp::Computed(prop) = property {
                    self.value(prop);
                }
                false
            }
            ExprKind::Arrow(arrow) => {
                self.visit_arrow(arrow);
                false
            }
            ExprKind::Await(inner) => {
                self.value(inner);
                self.mark_async();
                false
            }
            ExprKind::Unary { arg, .. } => {
                self.value(arg);
                false
            }
            ExprKind::Update { target, .. } => {
                self.visit_pattern(target);
                false
            }
            ExprKind::Binary { left, right, .. } => {
                self.value(left);
                self.value(right);
                false
            }
            ExprKind::Logical { left, right, .. } => {
                self.value(left);
                self.lazy(right);
                false
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.value(test);
                self.lazy(consequent);
                self.lazy(alternate);
                false
            }
            ExprKind::Assign { target, value, .. } => {
                self.visit_pattern(target);
                self.value(value);
                false
            }
            ExprKind::Sequence(exprs) => {
                // later operands may depend on earlier ones, so their
                // temporaries stay in place
                for (i, e) in exprs.iter_mut().enumerate() {
                    if i == 0 {
                        self.value(e);
                    } else {
                        self.lazy(e);
                    }
                }
                false
            }
        }
    }

    fn visit_call(&mut self, expr: &mut Expr) -> bool {
        let (pending, parallel) = {
            let ExprKind::Call { callee, args, .. } = &mut expr.kind else {
                return false;
            };

            let capability = self.calls_async_capability(callee)
                || callee
                    .as_identifier()
                    .is_some_and(|name| self.scopes.is_async_function(name));
            if self.visit_expr(callee) {
                self.await_in_place(callee);
            }
            let async_callee = is_async_arrow(callee);

            let mut async_callback = false;
            for arg in args.iter_mut() {
                match arg {
                    Argument::Expr(e) if matches!(e.kind, ExprKind::Arrow(_)) => {
                        self.visit_expr(e);
                        async_callback |= is_async_arrow(e);
                    }
                    Argument::Expr(e) | Argument::Spread(e) => self.value(e),
                }
            }

            let parallel = is_map_call(callee) && args.first().is_some_and(|a| is_async_arrow(a.expr()));
            (capability || async_callee || async_callback, parallel)
        };

        if parallel {
            wrap_in_promise_all(expr);
            return true;
        }
        pending
    }

    fn visit_arrow(&mut self, arrow: &mut ArrowFn) {
        self.frames.push(arrow.is_async);
        self.scopes.push();

        // `await` is not allowed in a parameter list: once a parameter
        // needs one, it and every later parameter are bound in the body
        let mut prelude = Vec::new();
        for param in &mut arrow.params {
            let outer = self.swap_frame(false);
            self.hoists.push(Vec::new());
            self.visit_pattern(param);
            let decls = self.hoists.pop().unwrap_or_default();
            let awaits = self.swap_frame(outer) || !decls.is_empty();
            if awaits {
                self.mark_async();
            }
            let names = param.bound_names();
            if awaits || !prelude.is_empty() {
                prelude.extend(decls);
                prelude.push(self.move_param(param));
            }
            self.scopes.declare_all(names);
        }

        normalize_arrow_body(arrow);
        let decls = match &mut arrow.body {
            ArrowBody::Block(block) => {
                self.visit_block(block);
                Vec::new()
            }
            ArrowBody::Expr(body) => {
                self.hoists.push(Vec::new());
                self.value(body);
                self.hoists.pop().unwrap_or_default()
            }
        };
        if !decls.is_empty() {
            // an expression body that needs temporaries becomes a block
            let mut stmts = decls;
            stmts.push(take_expr_body(arrow));
            arrow.body = ArrowBody::Block(Block::new(stmts, arrow.span));
        }
        if !prelude.is_empty() {
            let mut stmts = prelude;
            match take_expr_body(arrow) {
                Stmt {
                    kind: StmtKind::Block(block),
                    ..
                } => stmts.extend(block.stmts),
                stmt => stmts.push(stmt),
            }
            arrow.body = ArrowBody::Block(Block::new(stmts, arrow.span));
        }

        self.scopes.pop();
        arrow.is_async = self.frames.pop().unwrap_or(arrow.is_async);
    }

    /// Replace `param` by a temporary and return the declaration binding the
    /// original pattern from it: `let <pattern> = _n === undefined ? <default> : _n;`.
    fn move_param(&mut self, param: &mut Pattern) -> Stmt {
        let span = param.span();
        let name = self.temporary();
        let temp = Pattern::Ident(Ident::new(name.clone(), span));
        let pattern = match std::mem::replace(param, temp) {
            Pattern::Rest(inner) => {
                *param = Pattern::Rest(Box::new(Pattern::Ident(Ident::new(name.clone(), span))));
                *inner
            }
            other => other,
        };
        let value = Expr::ident(name, span);
        let (target, init) = match pattern {
            Pattern::Assign { target, default } => {
                let test = Expr::new(
                    ExprKind::Binary {
                        op: BinaryOp::StrictEq,
                        left: Box::new(value.clone()),
                        right: Box::new(Expr::ident("undefined", span)),
                    },
                    span,
                );
                let init = Expr::new(
                    ExprKind::Conditional {
                        test: Box::new(test),
                        consequent: default,
                        alternate: Box::new(value),
                    },
                    span,
                );
                (*target, init)
            }
            other => (other, value),
        };
        let declarator = Declarator {
            target,
            init: Some(init),
            span,
        };
        declaration(VarKind::Let, vec![declarator], span)
    }

    /// Visit the expressions inside a pattern: defaults are lazy, member
    /// targets are ordinary member accesses.
    fn visit_pattern(&mut self, pattern: &mut Pattern) {
        match pattern {
            Pattern::Ident(_) => {}
            Pattern::Array(elements, _) => {
                for element in elements.iter_mut().flatten() {
                    self.visit_pattern(element);
                }
            }
            Pattern::Object(props, _) => {
                for prop in props {
                    match prop {
                        PatternProp::Init { key, value, .. } => {
                            if let PropKey::Computed(k) = key {
                                self.value(k);
                            }
                            self.visit_pattern(value);
                        }
                        PatternProp::Rest(rest) => self.visit_pattern(rest),
                    }
                }
            }
            Pattern::Assign { target, default } => {
                self.visit_pattern(target);
                self.lazy(default);
            }
            Pattern::Rest(inner) => self.visit_pattern(inner),
            Pattern::Member(expr) => {
                self.visit_expr(expr);
            }
        }
    }
}

// ── Tree helpers ──────────────────────────────────────────────────────────────

fn declaration(kind: VarKind, declarators: Vec<Declarator>, span: Span) -> Stmt {
    Stmt::new(
        StmtKind::Var(VarDecl {
            kind,
            declarators,
            span,
        }),
        span,
    )
}

/// Wrap a non-block body so temporaries can be declared inside it.
fn ensure_block(stmt: &mut Box<Stmt>) {
    if matches!(stmt.kind, StmtKind::Block(_)) {
        return;
    }
    let span = stmt.span;
    let inner = std::mem::replace(&mut **stmt, Stmt::new(StmtKind::Empty, span));
    **stmt = Stmt::new(StmtKind::Block(inner.into_block()), span);
}

/// `x => f(x)` and `x => x.y` become `x => { return ...; }`.
fn normalize_arrow_body(arrow: &mut ArrowFn) {
    if !matches!(&arrow.body, ArrowBody::Expr(body) if body.is_member_or_call()) {
        return;
    }
    let ret = take_expr_body(arrow);
    arrow.body = ArrowBody::Block(Block::new(vec![ret], arrow.span));
}

/// Move an expression body out as `return <body>;`.
fn take_expr_body(arrow: &mut ArrowFn) -> Stmt {
    let empty = ArrowBody::Block(Block::new(Vec::new(), arrow.span));
    match std::mem::replace(&mut arrow.body, empty) {
        ArrowBody::Expr(body) => {
            let span = body.span;
            Stmt::new(StmtKind::Return(Some(*body)), span)
        }
        ArrowBody::Block(block) => {
            let span = block.span;
            Stmt::new(StmtKind::Block(block), span)
        }
    }
}

fn is_async_arrow(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Arrow(arrow) if arrow.is_async)
}

fn is_map_call(callee: &Expr) -> bool {
    matches!(
        &callee.kind,
        ExprKind::Member { property: MemberProp::Ident(id), .. } if id.name == "map"
    )
}

fn wrap_in_promise_all(expr: &mut Expr) {
    let span = expr.span;
    let call = std::mem::replace(expr, Expr::placeholder());
    let all = Expr::new(
        ExprKind::Member {
            object: Box::new(Expr::ident("Promise", span)),
            property: MemberProp::Ident(Ident::new("all", span)),
            optional: false,
        },
        span,
    );
    *expr = Expr::new(
        ExprKind::Call {
            callee: Box::new(all),
            args: vec![Argument::Expr(call)],
            optional: false,
        },
        span,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_parser::parse_standalone;
    use gqlx_types::SourceFile;

    fn rewritten(src: &str) -> Block {
        let caps = Capabilities::new().asynchronous("get").asynchronous("post");
        let expr = parse_standalone(&SourceFile::new("t", src)).unwrap();
        rewrite(expr, &caps, &[]).unwrap()
    }

    fn returned(block: &Block) -> &Expr {
        match block.stmts.last().map(|s| &s.kind) {
            Some(StmtKind::Return(Some(e))) => e,
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn test_returned_call_is_awaited() {
        let block = rewritten("get('a')");
        assert_eq!(block.stmts.len(), 1);
        assert!(matches!(returned(&block).kind, ExprKind::Await(_)));
    }

    #[test]
    fn test_member_object_is_hoisted() {
        let block = rewritten("get('a').items");
        assert_eq!(block.stmts.len(), 2);
        assert!(matches!(block.stmts[0].kind, StmtKind::Var(_)));
        let ExprKind::Member { object, .. } = &returned(&block).kind else {
            panic!("expected member");
        };
        assert_eq!(object.as_identifier(), Some("_0"));
    }

    #[test]
    fn test_sync_capability_untouched() {
        let caps = Capabilities::new().sync("foo");
        let expr = parse_standalone(&SourceFile::new("t", "foo(1).x")).unwrap();
        let block = rewrite(expr, &caps, &[]).unwrap();
        assert_eq!(block.stmts.len(), 1);
    }

    #[test]
    fn test_shadowed_capability_is_not_awaited() {
        let block = rewritten("[1].map(get => get(1))");
        assert!(!matches!(returned(&block).kind, ExprKind::Await(_)));
    }

    #[test]
    fn test_ternary_branch_gets_thunk_only_when_hoisting() {
        let block = rewritten("a ? get('x').y : get('z')");
        let ExprKind::Conditional {
            consequent,
            alternate,
            ..
        } = &returned(&block).kind
        else {
            panic!("expected conditional");
        };
        let ExprKind::Await(thunk_call) = &consequent.kind else {
            panic!("expected awaited thunk");
        };
        assert!(matches!(thunk_call.kind, ExprKind::Call { .. }));
        let ExprKind::Await(plain) = &alternate.kind else {
            panic!("expected awaited call");
        };
        assert!(matches!(plain.kind, ExprKind::Call { .. }));
        // nothing was hoisted out of the branch
        assert_eq!(block.stmts.len(), 1);
    }

    #[test]
    fn test_async_map_wrapped_in_promise_all() {
        let block = rewritten("xs.map(x => get(x))");
        let ExprKind::Await(inner) = &returned(&block).kind else {
            panic!("expected await");
        };
        let ExprKind::Call { callee, .. } = &inner.kind else {
            panic!("expected call");
        };
        assert!(matches!(
            &callee.kind,
            ExprKind::Member { property: MemberProp::Ident(id), .. } if id.name == "all"
        ));
    }

    #[test]
    fn test_helpers_prepended_in_canonical_order() {
        let block = rewritten("cq(use(1, x => x), either(a, 2))");
        let names: Vec<_> = block
            .stmts
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::Var(decl) => decl.declarators[0].target.bound_names().pop(),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["either", "use", "cq"]);
    }

    #[test]
    fn test_split_declaration_keeps_order() {
        let block = rewritten("() => { const a = 1, b = get(a).c; return b; }");
        let ExprKind::Arrow(arrow) = &returned(&block).kind else {
            panic!("expected arrow");
        };
        let ArrowBody::Block(body) = &arrow.body else {
            panic!("expected block");
        };
        // const a = 1; const _0 = await get(a); const b = _0.c; return b;
        assert_eq!(body.stmts.len(), 4);
        assert!(arrow.is_async);
    }
}
