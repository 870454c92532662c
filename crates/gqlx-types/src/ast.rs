//! AST node types for embedded resolver expressions.
//!
//! The grammar is a restricted JavaScript expression/statement subset.
//! Every node carries a [`Span`] of byte offsets into the composite source.
//! Grouping parentheses are not represented; generated code is fully
//! parenthesized on render instead.
//!
//! A few node kinds exist only so that they can be rejected with a precise
//! location (`function`, `this`) or only as rewrite output (`await`).

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// `{ stmts... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Wrap a statement into a block statement unless it already is one.
    pub fn into_block(self) -> Block {
        match self.kind {
            StmtKind::Block(block) => block,
            _ => {
                let span = self.span;
                Block::new(vec![self], span)
            }
        }
    }
}

/// The kind of statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// A bare expression followed by `;`.
    Expr(Expr),
    /// `const a = 1, b;`
    Var(VarDecl),
    /// `return [expr];`
    Return(Option<Expr>),
    /// `if (test) stmt [else stmt]`
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    /// `while (test) stmt`
    While { test: Expr, body: Box<Stmt> },
    /// `do stmt while (test);`
    DoWhile { body: Box<Stmt>, test: Expr },
    /// `for (init; test; update) stmt`
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Block(Block),
    Break,
    Continue,
    Debugger,
    /// A lone `;`.
    Empty,
    /// `function name(params) { ... }`, parsed only to be rejected.
    Function(Box<FunctionExpr>),
}

/// Variable declaration keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

/// `target [= init]`
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

/// The first clause of a `for` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Identifier(name.into()), span)
    }

    /// `await <self>`
    pub fn awaited(self) -> Self {
        let span = self.span;
        Self::new(ExprKind::Await(Box::new(self)), span)
    }

    /// Placeholder used while a node is temporarily moved out of the tree.
    pub fn placeholder() -> Self {
        Self::ident("undefined", Span::default())
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// `true` for bare member accesses and calls.
    pub fn is_member_or_call(&self) -> bool {
        matches!(self.kind, ExprKind::Member { .. } | ExprKind::Call { .. })
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// Number, string, boolean or `null`, with its raw source text.
    Literal(Literal),
    /// `` `a ${b} c` ``: `quasis.len() == exprs.len() + 1`
    Template {
        quasis: Vec<TemplatePart>,
        exprs: Vec<Expr>,
    },
    /// `[a, ...b, , c]`
    Array(Vec<ArrayElement>),
    /// `{ a, b: 1, [k]: v, ...rest }`
    Object(Vec<Property>),

    // ── Identifiers & Access ──
    Identifier(String),
    /// `obj.prop`, `obj[expr]`, `obj?.prop`
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    /// `callee(args...)`, `callee?.(args...)`
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        optional: bool,
    },

    // ── Functions ──
    Arrow(Box<ArrowFn>),
    /// `function (...) {...}`, parsed only to be rejected.
    Function(Box<FunctionExpr>),
    This,
    Await(Box<Expr>),

    // ── Operators ──
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    /// `++x`, `x--`
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Pattern>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `&&`, `||`, `??`: the right side is evaluated lazily.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    /// `a, b, c`
    Sequence(Vec<Expr>),
}

/// A literal with its decoded value and the exact source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LitValue,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

/// One literal chunk of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePart {
    /// Text as written, escapes untouched.
    pub raw: String,
    /// Text with escapes resolved.
    pub cooked: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

impl Argument {
    pub fn expr(&self) -> &Expr {
        match self {
            Argument::Expr(e) | Argument::Spread(e) => e,
        }
    }

    pub fn expr_mut(&mut self) -> &mut Expr {
        match self {
            Argument::Expr(e) | Argument::Spread(e) => e,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    /// `.name`
    Ident(Ident),
    /// `[expr]`
    Computed(Box<Expr>),
}

/// An entry in an object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// `key: value`, or `key` when `shorthand`.
    Init {
        key: PropKey,
        value: Expr,
        shorthand: bool,
        span: Span,
    },
    /// `...expr`
    Spread(Expr),
}

/// The key of an object literal or object pattern entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(Ident),
    /// String or numeric key, kept as written.
    Literal(Literal),
    /// `[expr]`
    Computed(Box<Expr>),
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    In,
    InstanceOf,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    /// Returns the operator as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEq => "<=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    /// Keyword operators need a space before their operand.
    pub fn is_word(&self) -> bool {
        matches!(self, UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// `=` or a compound assignment such as `+=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    /// `op=` for an arithmetic or bitwise operator.
    Binary(BinaryOp),
    /// `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}

impl AssignOp {
    pub fn as_string(&self) -> String {
        match self {
            AssignOp::Assign => "=".to_string(),
            AssignOp::Binary(op) => format!("{}=", op.as_str()),
            AssignOp::Logical(op) => format!("{}=", op.as_str()),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// `(params) => body`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFn {
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// A `function` expression or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub name: Option<Ident>,
    pub params: Vec<Pattern>,
    pub body: Block,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Patterns
// ══════════════════════════════════════════════════════════════════════════════

/// A binding or assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Ident),
    /// `[a, , ...rest]`; `None` marks a hole.
    Array(Vec<Option<Pattern>>, Span),
    Object(Vec<PatternProp>, Span),
    /// `target = default`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// `...target`
    Rest(Box<Pattern>),
    /// `obj.prop` / `obj[k]`: only valid as an assignment target.
    Member(Box<Expr>),
}

/// One entry of an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternProp {
    /// `key: value`, or `value` alone when `shorthand`.
    Init {
        key: PropKey,
        value: Pattern,
        shorthand: bool,
    },
    /// `...rest`
    Rest(Pattern),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident(id) => id.span,
            Pattern::Array(_, span) | Pattern::Object(_, span) => *span,
            Pattern::Assign { target, default } => target.span().merge(default.span),
            Pattern::Rest(inner) => inner.span(),
            Pattern::Member(expr) => expr.span,
        }
    }

    /// Names introduced by this pattern, in source order.
    ///
    /// Default values are not scanned and member targets bind nothing.
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.push_names(&mut names);
        names
    }

    fn push_names(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Ident(id) => out.push(id.name.clone()),
            Pattern::Array(elements, _) => {
                for element in elements.iter().flatten() {
                    element.push_names(out);
                }
            }
            Pattern::Object(props, _) => {
                for prop in props {
                    match prop {
                        PatternProp::Init { value, .. } => value.push_names(out),
                        PatternProp::Rest(rest) => rest.push_names(out),
                    }
                }
            }
            Pattern::Assign { target, .. } => target.push_names(out),
            Pattern::Rest(inner) => inner.push_names(out),
            Pattern::Member(_) => {}
        }
    }
}

/// Collect the bound names of a list of patterns (e.g. arrow parameters).
pub fn bound_names<'a>(patterns: impl IntoIterator<Item = &'a Pattern>) -> Vec<String> {
    let mut names = Vec::new();
    for pattern in patterns {
        pattern.push_names(&mut names);
    }
    names
}
