//! Async tree-walking interpreter for rewritten resolver bodies.
//!
//! The interpreter executes the same tree the code generator renders, and
//! resolves names the same way: local bindings, then capabilities, then
//! field arguments, then standard globals. Calling an async arrow function
//! runs its body up to the first suspension and yields a promise; an
//! asynchronous capability is invoked at the call and its future runs once
//! something awaits it.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use gqlx_types::ast::*;
use gqlx_types::Capabilities;
use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::{debug, trace, warn};

use crate::api::{ApiFunction, ApiImplementations};
use crate::builtins::{self, arg, iterate, own_entries, ARRAY_CALLBACK_METHODS};
use crate::env::Scope;
use crate::error::{EvalError, EvalResult, RuntimeFault};
use crate::json;
use crate::value::{array_length, number_to_string, Closure, Function, ObjectRef, Promise, Value};

/// How a statement finished.
enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// What binding a pattern does.
#[derive(Clone, Copy)]
enum BindMode {
    /// `const`/`let`/`var` or a parameter: introduce names in the scope.
    Declare { constant: bool },
    /// Assignment: update existing bindings or properties.
    Assign,
}

// ══════════════════════════════════════════════════════════════════════════════
// Runtime
// ══════════════════════════════════════════════════════════════════════════════

/// Executes compiled resolver bodies against one set of API implementations.
///
/// Values are reference counted and not thread safe, so a runtime and the
/// futures it returns stay on the thread that created them.
#[derive(Debug, Clone)]
pub struct Runtime {
    capabilities: Rc<Capabilities>,
    api: Rc<ApiImplementations>,
}

impl Runtime {
    pub fn new(capabilities: Capabilities, api: ApiImplementations) -> Self {
        Self {
            capabilities: Rc::new(capabilities),
            api: Rc::new(api),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn api(&self) -> &ApiImplementations {
        &self.api
    }

    /// Run a rewritten body with the given field arguments.
    ///
    /// `args` are the declared argument names; `data` holds their values.
    /// Anything the body throws, or any rejection it awaits, becomes a
    /// single [`RuntimeFault`].
    pub async fn invoke(&self, block: &Block, args: &[String], data: &Json) -> Result<Json, RuntimeFault> {
        let data = match json::from_json(data) {
            Value::Object(entries) => entries,
            _ => Rc::new(RefCell::new(IndexMap::new())),
        };
        let interpreter = Interpreter {
            inner: Rc::new(Inner {
                capabilities: Rc::clone(&self.capabilities),
                api: Rc::clone(&self.api),
                args: args.to_vec(),
                data,
                pending: RefCell::new(Vec::new()),
            }),
        };
        debug!(statements = block.stmts.len(), "invoking resolver body");

        let outcome = interpreter.run(block).await;
        interpreter.drain().await;

        match outcome {
            Ok(value) => Ok(json::to_json(&value)),
            Err(error) => {
                let fault = RuntimeFault::from_error(error);
                debug!(message = %fault.message, "resolver body failed");
                Err(fault)
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Interpreter
// ══════════════════════════════════════════════════════════════════════════════

struct Inner {
    capabilities: Rc<Capabilities>,
    api: Rc<ApiImplementations>,
    args: Vec<String>,
    data: ObjectRef,
    /// Promises created during the invocation, settled before it returns.
    pending: RefCell<Vec<Promise>>,
}

/// State of one invocation. Cheap to clone so that promise futures can own
/// a handle to it.
#[derive(Clone)]
struct Interpreter {
    inner: Rc<Inner>,
}

impl Interpreter {
    async fn run(&self, block: &Block) -> EvalResult<Value> {
        let scope = Scope::root();
        let value = match self.exec_block(block, &scope).await? {
            Completion::Return(value) => value,
            _ => Value::Undefined,
        };
        self.await_value(value).await
    }

    /// Settle every promise nobody awaited. Their rejections are not
    /// observable by the body and are only logged.
    async fn drain(&self) {
        loop {
            let batch = std::mem::take(&mut *self.inner.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for promise in batch {
                if let Err(reason) = promise.settle().await {
                    warn!(reason = ?reason, "unobserved promise rejection");
                }
            }
        }
    }

    fn track(&self, promise: &Promise) {
        self.inner.pending.borrow_mut().push(promise.clone());
    }

    async fn await_value(&self, value: Value) -> EvalResult<Value> {
        match value {
            Value::Promise(promise) => promise.settle().await.map_err(EvalError::Thrown),
            other => Ok(other),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Names
    // ══════════════════════════════════════════════════════════════════════

    fn is_argument(&self, name: &str) -> bool {
        self.inner.args.iter().any(|a| a == name)
    }

    fn lookup(&self, name: &str, scope: &Rc<Scope>) -> EvalResult<Value> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        if self.inner.capabilities.contains(name) {
            return Ok(Value::Function(Function::Capability(Rc::from(name))));
        }
        if self.is_argument(name) {
            let data = self.inner.data.borrow();
            return Ok(data.get(name).cloned().unwrap_or(Value::Undefined));
        }
        builtins::global(name).ok_or_else(|| EvalError::Reference(format!("{name} is not defined")))
    }

    fn assign_name(&self, name: &str, value: Value, scope: &Rc<Scope>) -> EvalResult<()> {
        if scope.assign(name, value.clone())? {
            return Ok(());
        }
        if self.inner.capabilities.contains(name) {
            return Err(EvalError::Type(format!("Cannot assign to capability '{name}'")));
        }
        if self.is_argument(name) {
            self.inner.data.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        Err(EvalError::Reference(format!("{name} is not defined")))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_block<'a>(&'a self, block: &'a Block, scope: &'a Rc<Scope>) -> LocalBoxFuture<'a, EvalResult<Completion>> {
        async move {
            let inner = Scope::child(scope);
            for stmt in &block.stmts {
                let completion = self.exec_stmt(stmt, &inner).await?;
                if !matches!(completion, Completion::Normal) {
                    return Ok(completion);
                }
            }
            Ok(Completion::Normal)
        }
        .boxed_local()
    }

    fn exec_stmt<'a>(&'a self, stmt: &'a Stmt, scope: &'a Rc<Scope>) -> LocalBoxFuture<'a, EvalResult<Completion>> {
        async move {
            match &stmt.kind {
                StmtKind::Expr(expr) => {
                    self.eval_expr(expr, scope).await?;
                    Ok(Completion::Normal)
                }
                StmtKind::Var(decl) => {
                    self.exec_var_decl(decl, scope).await?;
                    Ok(Completion::Normal)
                }
                StmtKind::Return(value) => {
                    let value = match value {
                        Some(expr) => self.eval_expr(expr, scope).await?,
                        None => Value::Undefined,
                    };
                    Ok(Completion::Return(value))
                }
                StmtKind::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval_expr(test, scope).await?.is_truthy() {
                        self.exec_stmt(consequent, scope).await
                    } else if let Some(alternate) = alternate {
                        self.exec_stmt(alternate, scope).await
                    } else {
                        Ok(Completion::Normal)
                    }
                }
                StmtKind::While { test, body } => {
                    while self.eval_expr(test, scope).await?.is_truthy() {
                        match self.exec_stmt(body, scope).await? {
                            Completion::Break => break,
                            Completion::Return(value) => return Ok(Completion::Return(value)),
                            Completion::Normal | Completion::Continue => {}
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::DoWhile { body, test } => {
                    loop {
                        match self.exec_stmt(body, scope).await? {
                            Completion::Break => break,
                            Completion::Return(value) => return Ok(Completion::Return(value)),
                            Completion::Normal | Completion::Continue => {}
                        }
                        if !self.eval_expr(test, scope).await?.is_truthy() {
                            break;
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::For {
                    init,
                    test,
                    update,
                    body,
                } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope).await,
                StmtKind::Block(block) => self.exec_block(block, scope).await,
                StmtKind::Break => Ok(Completion::Break),
                StmtKind::Continue => Ok(Completion::Continue),
                StmtKind::Debugger | StmtKind::Empty => Ok(Completion::Normal),
                StmtKind::Function(_) => Err(EvalError::Type("function declarations are not supported".into())),
            }
        }
        .boxed_local()
    }

    async fn exec_var_decl(&self, decl: &VarDecl, scope: &Rc<Scope>) -> EvalResult<()> {
        let mode = BindMode::Declare {
            constant: decl.kind == VarKind::Const,
        };
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => self.eval_expr(init, scope).await?,
                None => Value::Undefined,
            };
            self.bind_pattern(&declarator.target, value, mode, scope).await?;
        }
        Ok(())
    }

    /// `let` bindings of the init clause get a fresh copy per iteration, so
    /// closures created in the body see the value of their own iteration.
    async fn exec_for(
        &self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> EvalResult<Completion> {
        let mut current = Scope::child(scope);
        let mut per_iteration = Vec::new();
        match init {
            Some(ForInit::Var(decl)) => {
                self.exec_var_decl(decl, &current).await?;
                if decl.kind == VarKind::Let {
                    per_iteration = bound_names(decl.declarators.iter().map(|d| &d.target));
                }
            }
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(expr, &current).await?;
            }
            None => {}
        }

        loop {
            if let Some(test) = test {
                if !self.eval_expr(test, &current).await?.is_truthy() {
                    break;
                }
            }
            match self.exec_stmt(body, &current).await? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
            if !per_iteration.is_empty() {
                let next = Scope::child(scope);
                for name in &per_iteration {
                    next.declare(name, current.lookup(name).unwrap_or(Value::Undefined), false);
                }
                current = next;
            }
            if let Some(update) = update {
                self.eval_expr(update, &current).await?;
            }
        }
        Ok(Completion::Normal)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval_expr<'a>(&'a self, expr: &'a Expr, scope: &'a Rc<Scope>) -> LocalBoxFuture<'a, EvalResult<Value>> {
        async move {
            match &expr.kind {
                // ── Literals ──
                ExprKind::Literal(lit) => Ok(match &lit.value {
                    LitValue::Number(n) => Value::Number(*n),
                    LitValue::String(s) => Value::String(s.clone()),
                    LitValue::Bool(b) => Value::Bool(*b),
                    LitValue::Null => Value::Null,
                }),
                ExprKind::Template { quasis, exprs } => {
                    let mut out = String::new();
                    for (i, quasi) in quasis.iter().enumerate() {
                        out.push_str(&quasi.cooked);
                        if let Some(expr) = exprs.get(i) {
                            out.push_str(&self.eval_expr(expr, scope).await?.to_js_string());
                        }
                    }
                    Ok(Value::String(out))
                }
                ExprKind::Array(elements) => {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        match element {
                            ArrayElement::Expr(e) => items.push(self.eval_expr(e, scope).await?),
                            ArrayElement::Spread(e) => {
                                items.extend(iterate(&self.eval_expr(e, scope).await?)?)
                            }
                            ArrayElement::Hole => items.push(Value::Undefined),
                        }
                    }
                    Ok(Value::array(items))
                }
                ExprKind::Object(props) => self.eval_object(props, scope).await,

                // ── Identifiers & Access ──
                ExprKind::Identifier(name) => self.lookup(name, scope),
                ExprKind::Member { .. } | ExprKind::Call { .. } => {
                    Ok(self.eval_chain(expr, scope).await?.unwrap_or(Value::Undefined))
                }

                // ── Functions ──
                ExprKind::Arrow(arrow) => Ok(Value::Function(Function::Closure(Rc::new(Closure {
                    arrow: (**arrow).clone(),
                    scope: Rc::clone(scope),
                })))),
                ExprKind::Function(_) => Err(EvalError::Type("function expressions are not supported".into())),
                ExprKind::This => Err(EvalError::Type("'this' is not supported".into())),
                ExprKind::Await(inner) => {
                    let value = self.eval_expr(inner, scope).await?;
                    self.await_value(value).await
                }

                // ── Operators ──
                ExprKind::Unary { op, arg } => self.eval_unary(*op, arg, scope).await,
                ExprKind::Update { op, prefix, target } => {
                    let old = self.read_target(target, scope).await?.to_number();
                    let new = match op {
                        UpdateOp::Increment => old + 1.0,
                        UpdateOp::Decrement => old - 1.0,
                    };
                    self.bind_pattern(target, Value::Number(new), BindMode::Assign, scope).await?;
                    Ok(Value::Number(if *prefix { new } else { old }))
                }
                ExprKind::Binary { op, left, right } => {
                    let left = self.eval_expr(left, scope).await?;
                    let right = self.eval_expr(right, scope).await?;
                    binary_op(*op, &left, &right)
                }
                ExprKind::Logical { op, left, right } => {
                    let left = self.eval_expr(left, scope).await?;
                    if short_circuits(*op, &left) {
                        Ok(left)
                    } else {
                        self.eval_expr(right, scope).await
                    }
                }
                ExprKind::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval_expr(test, scope).await?.is_truthy() {
                        self.eval_expr(consequent, scope).await
                    } else {
                        self.eval_expr(alternate, scope).await
                    }
                }
                ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value, scope).await,
                ExprKind::Sequence(exprs) => {
                    let mut last = Value::Undefined;
                    for e in exprs {
                        last = self.eval_expr(e, scope).await?;
                    }
                    Ok(last)
                }
            }
        }
        .boxed_local()
    }

    async fn eval_object(&self, props: &[Property], scope: &Rc<Scope>) -> EvalResult<Value> {
        let mut entries = IndexMap::new();
        for prop in props {
            match prop {
                Property::Init { key, value, .. } => {
                    let key = self.prop_key(key, scope).await?;
                    let value = self.eval_expr(value, scope).await?;
                    entries.insert(key, value);
                }
                Property::Spread(expr) => {
                    let source = self.eval_expr(expr, scope).await?;
                    entries.extend(own_entries(&source));
                }
            }
        }
        Ok(Value::object(entries))
    }

    async fn eval_unary(&self, op: UnaryOp, arg: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match op {
            UnaryOp::TypeOf => {
                let value = match self.eval_expr(arg, scope).await {
                    Err(EvalError::Reference(_)) if arg.as_identifier().is_some() => Value::Undefined,
                    other => other?,
                };
                Ok(Value::string(value.type_of()))
            }
            UnaryOp::Delete => {
                if let ExprKind::Member { object, property, .. } = &arg.kind {
                    let object = self.eval_expr(object, scope).await?;
                    let key = self.member_key(property, scope).await?;
                    if let Value::Object(entries) = &object {
                        entries.borrow_mut().shift_remove(&key);
                    }
                }
                Ok(Value::Bool(true))
            }
            _ => {
                let value = self.eval_expr(arg, scope).await?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::BitNot => Value::Number(f64::from(!value.to_int32())),
                    _ => Value::Undefined,
                })
            }
        }
    }

    async fn eval_assign(&self, op: AssignOp, target: &Pattern, value: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        let result = match op {
            AssignOp::Assign => self.eval_expr(value, scope).await?,
            AssignOp::Binary(op) => {
                let current = self.read_target(target, scope).await?;
                let rhs = self.eval_expr(value, scope).await?;
                binary_op(op, &current, &rhs)?
            }
            AssignOp::Logical(op) => {
                let current = self.read_target(target, scope).await?;
                if short_circuits(op, &current) {
                    return Ok(current);
                }
                self.eval_expr(value, scope).await?
            }
        };
        self.bind_pattern(target, result.clone(), BindMode::Assign, scope).await?;
        Ok(result)
    }

    /// Current value of a simple assignment target.
    async fn read_target(&self, target: &Pattern, scope: &Rc<Scope>) -> EvalResult<Value> {
        match target {
            Pattern::Ident(id) => self.lookup(&id.name, scope),
            Pattern::Member(expr) => self.eval_expr(expr, scope).await,
            _ => Err(EvalError::Type("Invalid left-hand side in assignment".into())),
        }
    }

    // ── Member access and calls ───────────────────────────────────────────

    /// Evaluate a member/call chain; `None` when an optional link
    /// short-circuited.
    fn eval_chain<'a>(&'a self, expr: &'a Expr, scope: &'a Rc<Scope>) -> LocalBoxFuture<'a, EvalResult<Option<Value>>> {
        async move {
            match &expr.kind {
                ExprKind::Member {
                    object,
                    property,
                    optional,
                } => {
                    let Some(object) = self.eval_chain(object, scope).await? else {
                        return Ok(None);
                    };
                    if *optional && object.is_nullish() {
                        return Ok(None);
                    }
                    let key = self.member_key(property, scope).await?;
                    get_property(&object, &key).map(Some)
                }
                ExprKind::Call { callee, args, optional } => {
                    let Some(func) = self.eval_chain(callee, scope).await? else {
                        return Ok(None);
                    };
                    if *optional && func.is_nullish() {
                        return Ok(None);
                    }
                    let args = self.eval_args(args, scope).await?;
                    let Value::Function(func) = func else {
                        return Err(EvalError::Type(format!("{} is not a function", callee_name(callee))));
                    };
                    self.call_function(func, args).await.map(Some)
                }
                _ => self.eval_expr(expr, scope).await.map(Some),
            }
        }
        .boxed_local()
    }

    async fn eval_args(&self, args: &[Argument], scope: &Rc<Scope>) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for argument in args {
            match argument {
                Argument::Expr(e) => values.push(self.eval_expr(e, scope).await?),
                Argument::Spread(e) => values.extend(iterate(&self.eval_expr(e, scope).await?)?),
            }
        }
        Ok(values)
    }

    async fn member_key(&self, property: &MemberProp, scope: &Rc<Scope>) -> EvalResult<String> {
        match property {
            MemberProp::Ident(id) => Ok(id.name.clone()),
            MemberProp::Computed(expr) => Ok(property_key(&self.eval_expr(expr, scope).await?)),
        }
    }

    async fn prop_key(&self, key: &PropKey, scope: &Rc<Scope>) -> EvalResult<String> {
        match key {
            PropKey::Ident(id) => Ok(id.name.clone()),
            PropKey::Literal(lit) => Ok(match &lit.value {
                LitValue::String(s) => s.clone(),
                LitValue::Number(n) => number_to_string(*n),
                _ => lit.raw.clone(),
            }),
            PropKey::Computed(expr) => Ok(property_key(&self.eval_expr(expr, scope).await?)),
        }
    }

    fn call_function(&self, func: Function, args: Vec<Value>) -> LocalBoxFuture<'_, EvalResult<Value>> {
        async move {
            match func {
                Function::Closure(closure) if closure.arrow.is_async => {
                    let this = self.clone();
                    let future = async move {
                        let value = this.run_closure(&closure, args).await.map_err(EvalError::into_value)?;
                        match value {
                            Value::Promise(promise) => promise.settle().await,
                            other => Ok(other),
                        }
                    };
                    let promise = Promise::started(future.boxed_local());
                    self.track(&promise);
                    Ok(Value::Promise(promise))
                }
                Function::Closure(closure) => self.run_closure(&closure, args).await,
                Function::Builtin(builtin) => {
                    let value = builtins::call_builtin(builtin, &args)?;
                    if let Value::Promise(promise) = &value {
                        self.track(promise);
                    }
                    Ok(value)
                }
                Function::Method { receiver, name } => self.call_method(&receiver, &name, args).await,
                Function::Capability(name) => self.call_capability(&name, args),
            }
        }
        .boxed_local()
    }

    async fn call_value(&self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Function(func) => self.call_function(func.clone(), args).await,
            other => Err(EvalError::Type(format!("{} is not a function", other.type_of()))),
        }
    }

    async fn run_closure(&self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let scope = Scope::child(&closure.scope);
        for (i, param) in closure.arrow.params.iter().enumerate() {
            match param {
                Pattern::Rest(inner) => {
                    let rest = args.get(i..).map(<[Value]>::to_vec).unwrap_or_default();
                    self.bind_pattern(inner, Value::array(rest), BindMode::Declare { constant: false }, &scope)
                        .await?;
                }
                _ => {
                    self.bind_pattern(param, arg(&args, i), BindMode::Declare { constant: false }, &scope)
                        .await?
                }
            }
        }
        match &closure.arrow.body {
            ArrowBody::Expr(expr) => self.eval_expr(expr, &scope).await,
            ArrowBody::Block(block) => match self.exec_block(block, &scope).await? {
                Completion::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    fn call_capability(&self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let Some(function) = self.inner.api.get(name) else {
            return Err(EvalError::Type(format!("$api.{name} is not a function")));
        };
        let args: Vec<Json> = args.iter().map(json::to_json).collect();
        trace!(capability = name, args = args.len(), "calling capability");
        match function {
            ApiFunction::Sync(f) => f(args)
                .map(|v| json::from_json(&v))
                .map_err(|e| EvalError::Thrown(json::from_json(&e))),
            ApiFunction::Async(f) => {
                // the implementation is invoked now, its future runs once awaited
                let future = f(args).map(|r| r.map(|v| json::from_json(&v)).map_err(|e| json::from_json(&e)));
                let promise = Promise::new(future.boxed_local());
                self.track(&promise);
                Ok(Value::Promise(promise))
            }
        }
    }

    // ── Methods with callbacks ────────────────────────────────────────────

    async fn call_method(&self, receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        match receiver {
            Value::String(s) => builtins::string_method(s, name, &args),
            Value::Number(n) => builtins::number_method(*n, name, &args),
            Value::Array(_) if ARRAY_CALLBACK_METHODS.contains(&name) => {
                self.array_callback_method(receiver, name, args).await
            }
            Value::Array(_) => builtins::array_method(receiver, name, &args),
            Value::Promise(promise) => Ok(self.promise_method(promise, name, args)),
            other => Err(EvalError::Type(format!("{}.{name} is not a function", other.type_of()))),
        }
    }

    async fn array_callback_method(&self, receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let Value::Array(array) = receiver else {
            return Err(EvalError::Type(format!("{name} called on a non-array")));
        };
        // callbacks may mutate the array, iterate over a snapshot
        let items = array.borrow().clone();
        let callback = arg(&args, 0);
        let call = |item: &Value, index: usize| {
            vec![item.clone(), Value::Number(index as f64), receiver.clone()]
        };

        let result = match name {
            "map" | "flatMap" => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.call_value(&callback, call(item, i)).await?);
                }
                if name == "flatMap" {
                    out = builtins::flatten(&out, 1);
                }
                Value::array(out)
            }
            "filter" => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if self.call_value(&callback, call(item, i)).await?.is_truthy() {
                        out.push(item.clone());
                    }
                }
                Value::array(out)
            }
            "forEach" => {
                for (i, item) in items.iter().enumerate() {
                    self.call_value(&callback, call(item, i)).await?;
                }
                Value::Undefined
            }
            "find" | "findIndex" => {
                let mut found = None;
                for (i, item) in items.iter().enumerate() {
                    if self.call_value(&callback, call(item, i)).await?.is_truthy() {
                        found = Some((i, item.clone()));
                        break;
                    }
                }
                match (name, found) {
                    ("find", Some((_, item))) => item,
                    ("find", None) => Value::Undefined,
                    (_, Some((i, _))) => Value::Number(i as f64),
                    (_, None) => Value::Number(-1.0),
                }
            }
            "some" | "every" => {
                let want = name == "some";
                for (i, item) in items.iter().enumerate() {
                    if self.call_value(&callback, call(item, i)).await?.is_truthy() == want {
                        return Ok(Value::Bool(want));
                    }
                }
                Value::Bool(!want)
            }
            "reduce" => {
                let mut iter = items.iter().enumerate();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first.clone(),
                        None => {
                            return Err(EvalError::Type("Reduce of empty array with no initial value".into()))
                        }
                    },
                };
                for (i, item) in iter {
                    let mut call_args = call(item, i);
                    call_args.insert(0, acc);
                    acc = self.call_value(&callback, call_args).await?;
                }
                acc
            }
            "sort" => {
                let mut sorted: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let mut at = sorted.len();
                    while at > 0 {
                        let before = &sorted[at - 1];
                        let greater = match &callback {
                            Value::Undefined => before.to_js_string() > item.to_js_string(),
                            cmp => {
                                self.call_value(cmp, vec![before.clone(), item.clone()])
                                    .await?
                                    .to_number()
                                    > 0.0
                            }
                        };
                        if !greater {
                            break;
                        }
                        at -= 1;
                    }
                    sorted.insert(at, item);
                }
                *array.borrow_mut() = sorted;
                receiver.clone()
            }
            _ => return Err(EvalError::Type(format!("array.{name} is not a function"))),
        };
        Ok(result)
    }

    /// `then`/`catch`: a new promise settling with the handler's result.
    fn promise_method(&self, promise: &Promise, name: &str, args: Vec<Value>) -> Value {
        let (on_fulfilled, on_rejected) = match name {
            "then" => (arg(&args, 0), arg(&args, 1)),
            _ => (Value::Undefined, arg(&args, 0)),
        };
        let this = self.clone();
        let source = promise.clone();
        let future = async move {
            let (handler, input) = match source.settle().await {
                Ok(value) => (on_fulfilled, Ok(value)),
                Err(reason) => (on_rejected, Err(reason)),
            };
            if !matches!(handler, Value::Function(_)) {
                return input;
            }
            let value = match input {
                Ok(v) | Err(v) => v,
            };
            let result = this.call_value(&handler, vec![value]).await.map_err(EvalError::into_value)?;
            match result {
                Value::Promise(inner) => inner.settle().await,
                other => Ok(other),
            }
        };
        let chained = Promise::started(future.boxed_local());
        self.track(&chained);
        Value::Promise(chained)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Patterns
    // ══════════════════════════════════════════════════════════════════════

    fn bind_pattern<'a>(
        &'a self,
        pattern: &'a Pattern,
        value: Value,
        mode: BindMode,
        scope: &'a Rc<Scope>,
    ) -> LocalBoxFuture<'a, EvalResult<()>> {
        async move {
            match pattern {
                Pattern::Ident(id) => match mode {
                    BindMode::Declare { constant } => {
                        scope.declare(&id.name, value, constant);
                        Ok(())
                    }
                    BindMode::Assign => self.assign_name(&id.name, value, scope),
                },
                Pattern::Assign { target, default } => {
                    let value = match value {
                        Value::Undefined => self.eval_expr(default, scope).await?,
                        other => other,
                    };
                    self.bind_pattern(target, value, mode, scope).await
                }
                Pattern::Array(elements, _) => {
                    let items = iterate(&value)?;
                    for (i, element) in elements.iter().enumerate() {
                        match element {
                            None => {}
                            Some(Pattern::Rest(inner)) => {
                                let rest = items.get(i..).map(<[Value]>::to_vec).unwrap_or_default();
                                self.bind_pattern(inner, Value::array(rest), mode, scope).await?;
                            }
                            Some(element) => {
                                let item = items.get(i).cloned().unwrap_or(Value::Undefined);
                                self.bind_pattern(element, item, mode, scope).await?;
                            }
                        }
                    }
                    Ok(())
                }
                Pattern::Object(props, _) => {
                    if value.is_nullish() {
                        return Err(EvalError::Type(format!(
                            "Cannot destructure '{}' as it is {}.",
                            value.to_js_string(),
                            value.to_js_string()
                        )));
                    }
                    let mut used = Vec::new();
                    for prop in props {
                        match prop {
                            PatternProp::Init { key, value: target, .. } => {
                                let key = self.prop_key(key, scope).await?;
                                let item = get_property(&value, &key)?;
                                used.push(key);
                                self.bind_pattern(target, item, mode, scope).await?;
                            }
                            PatternProp::Rest(target) => {
                                let rest: IndexMap<String, Value> = own_entries(&value)
                                    .into_iter()
                                    .filter(|(k, _)| !used.contains(k))
                                    .collect();
                                self.bind_pattern(target, Value::object(rest), mode, scope).await?;
                            }
                        }
                    }
                    Ok(())
                }
                Pattern::Rest(inner) => self.bind_pattern(inner, value, mode, scope).await,
                Pattern::Member(expr) => {
                    let BindMode::Assign = mode else {
                        return Err(EvalError::Type("Invalid destructuring target".into()));
                    };
                    let ExprKind::Member { object, property, .. } = &expr.kind else {
                        return Err(EvalError::Type("Invalid left-hand side in assignment".into()));
                    };
                    let object = self.eval_expr(object, scope).await?;
                    let key = self.member_key(property, scope).await?;
                    set_property(&object, &key, value)
                }
            }
        }
        .boxed_local()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Properties and operators
// ══════════════════════════════════════════════════════════════════════════════

fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => number_to_string(*n),
        other => other.to_js_string(),
    }
}

/// Parse a canonical array index such as `"3"`, but not `"03"`.
fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

fn get_property(object: &Value, key: &str) -> EvalResult<Value> {
    if object.is_nullish() {
        return Err(EvalError::Type(format!(
            "Cannot read properties of {} (reading '{key}')",
            object.to_js_string()
        )));
    }
    if builtins::has_method(object, key) {
        return Ok(Value::Function(Function::Method {
            receiver: Box::new(object.clone()),
            name: Rc::from(key),
        }));
    }
    let value = match object {
        Value::Object(entries) => entries.borrow().get(key).cloned(),
        Value::Array(items) => {
            let items = items.borrow();
            match key {
                "length" => Some(Value::Number(items.len() as f64)),
                _ => array_index(key).and_then(|i| items.get(i).cloned()),
            }
        }
        Value::String(s) => match key {
            "length" => Some(Value::Number(s.chars().count() as f64)),
            _ => array_index(key).and_then(|i| s.chars().nth(i)).map(|c| Value::String(c.to_string())),
        },
        _ => None,
    };
    Ok(value.unwrap_or(Value::Undefined))
}

fn set_property(object: &Value, key: &str, value: Value) -> EvalResult<()> {
    match object {
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "Cannot set properties of {} (setting '{key}')",
            object.to_js_string()
        ))),
        Value::Object(entries) => {
            entries.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let len = array_length(value.to_number())?;
                items.resize(len, Value::Undefined);
            } else if let Some(index) = array_index(key) {
                if index >= items.len() {
                    let len = array_length(index as f64 + 1.0)?;
                    items.resize(len, Value::Undefined);
                }
                items[index] = value;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Objects and arrays take part in `+` and comparisons through their string
/// form.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Promise(_) => {
            Value::String(value.to_js_string())
        }
        other => other.clone(),
    }
}

fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let int = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(left.to_int32(), right.to_int32())));
    let result = match op {
        BinaryOp::Add => match (to_primitive(left), to_primitive(right)) {
            (l @ Value::String(_), r) | (l, r @ Value::String(_)) => {
                Value::String(l.to_js_string() + &r.to_js_string())
            }
            (l, r) => Value::Number(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Mod => num(|a, b| a % b),
        BinaryOp::Exp => num(f64::powf),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq => {
            Value::Bool(compare(op, &to_primitive(left), &to_primitive(right)))
        }
        BinaryOp::In => match right {
            Value::Object(entries) => Value::Bool(entries.borrow().contains_key(&property_key(left))),
            Value::Array(items) => Value::Bool(
                property_key(left) == "length"
                    || array_index(&property_key(left)).is_some_and(|i| i < items.borrow().len()),
            ),
            other => {
                return Err(EvalError::Type(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    property_key(left),
                    other.to_js_string()
                )))
            }
        },
        BinaryOp::InstanceOf => return Err(EvalError::Type("'instanceof' is not supported".into())),
        BinaryOp::BitAnd => int(|a, b| a & b),
        BinaryOp::BitOr => int(|a, b| a | b),
        BinaryOp::BitXor => int(|a, b| a ^ b),
        BinaryOp::Shl => int(|a, b| a.wrapping_shl(b as u32 & 31)),
        BinaryOp::Shr => int(|a, b| a.wrapping_shr(b as u32 & 31)),
        BinaryOp::UShr => {
            let shift = right.to_int32() as u32 & 31;
            Value::Number(f64::from((left.to_int32() as u32) >> shift))
        }
    };
    Ok(result)
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::LessEq => ordering.is_le(),
        _ => ordering.is_ge(),
    }
}

/// Name of a callee for error messages, e.g. `items.map`.
fn callee_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member {
            object,
            property: MemberProp::Ident(id),
            ..
        } => format!("{}.{}", callee_name(object), id.name),
        _ => "expression".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addition_concatenates_strings() {
        let r = binary_op(BinaryOp::Add, &Value::string("a"), &Value::Number(1.0)).unwrap();
        assert_eq!(r.to_js_string(), "a1");
        let r = binary_op(BinaryOp::Add, &Value::Number(2.0), &Value::Bool(true)).unwrap();
        assert_eq!(r.to_number(), 3.0);
        let arr = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let r = binary_op(BinaryOp::Add, &arr, &Value::Number(3.0)).unwrap();
        assert_eq!(r.to_js_string(), "1,23");
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(BinaryOp::Less, &Value::string("a"), &Value::string("b")));
        assert!(compare(BinaryOp::Less, &Value::string("2"), &Value::Number(10.0)));
        assert!(!compare(BinaryOp::GreaterEq, &Value::Number(f64::NAN), &Value::Number(0.0)));
    }

    #[test]
    fn test_bitwise() {
        let r = binary_op(BinaryOp::UShr, &Value::Number(-1.0), &Value::Number(28.0)).unwrap();
        assert_eq!(r.to_number(), 15.0);
        let r = binary_op(BinaryOp::Shl, &Value::Number(1.0), &Value::Number(33.0)).unwrap();
        assert_eq!(r.to_number(), 2.0);
    }

    #[test]
    fn test_property_access() {
        let arr = Value::array(vec![Value::string("x")]);
        assert_eq!(get_property(&arr, "length").unwrap().to_number(), 1.0);
        assert_eq!(get_property(&arr, "0").unwrap().to_js_string(), "x");
        assert!(matches!(get_property(&arr, "00").unwrap(), Value::Undefined));
        assert!(matches!(get_property(&arr, "map").unwrap(), Value::Function(_)));
        let err = get_property(&Value::Undefined, "a").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot read properties of undefined (reading 'a')");
    }

    #[test]
    fn test_set_property_extends_arrays() {
        let arr = Value::array(vec![]);
        set_property(&arr, "2", Value::Number(1.0)).unwrap();
        assert_eq!(arr.to_js_string(), ",,1");
        set_property(&arr, "length", Value::Number(1.0)).unwrap();
        assert_eq!(get_property(&arr, "length").unwrap().to_number(), 1.0);
        assert!(set_property(&Value::Null, "a", Value::Null).is_err());
    }
}
