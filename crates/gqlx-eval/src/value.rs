//! Runtime values.
//!
//! Values follow JavaScript semantics closely enough for compiled resolver
//! bodies: arrays and objects are shared, mutable references; promises are
//! shared futures that settle once and can be awaited any number of times.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::task::Context;

use futures::future::{LocalBoxFuture, Shared};
use futures::task::noop_waker_ref;
use futures::FutureExt;
use gqlx_types::ast::ArrowFn;
use indexmap::IndexMap;

use crate::builtins::Builtin;
use crate::env::Scope;
use crate::error::{EvalError, EvalResult};

/// A shared, mutable array.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A shared, mutable object with insertion-ordered keys.
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Function),
    Promise(Promise),
}

/// Anything callable.
#[derive(Clone)]
pub enum Function {
    /// An arrow function together with the scope it closes over.
    Closure(Rc<Closure>),
    /// A global function such as `Object.keys` or `encodeURIComponent`.
    Builtin(Builtin),
    /// A method looked up on an array, string or number, bound to it.
    Method { receiver: Box<Value>, name: Rc<str> },
    /// A capability, dispatched to the caller's API implementation.
    Capability(Rc<str>),
}

pub struct Closure {
    pub arrow: ArrowFn,
    pub scope: Rc<Scope>,
}

/// What a promise settles to: a value, or the rejection value.
pub type Settled = Result<Value, Value>;

/// A lazily driven, shareable promise.
#[derive(Clone)]
pub struct Promise(Shared<LocalBoxFuture<'static, Settled>>);

impl Promise {
    pub fn new(future: LocalBoxFuture<'static, Settled>) -> Self {
        Self(future.shared())
    }

    /// Create a promise and run it until it first has to wait, the way an
    /// async function starts executing as soon as it is called.
    pub fn started(future: LocalBoxFuture<'static, Settled>) -> Self {
        let promise = Self::new(future);
        let mut first_poll = promise.0.clone();
        let _ = first_poll.poll_unpin(&mut Context::from_waker(noop_waker_ref()));
        promise
    }

    pub fn resolved(value: Value) -> Self {
        Self::new(futures::future::ready(Ok(value)).boxed_local())
    }

    pub fn rejected(value: Value) -> Self {
        Self::new(futures::future::ready(Err(value)).boxed_local())
    }

    /// Wait for the promise to settle.
    pub async fn settle(&self) -> Settled {
        self.0.clone().await
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The result of `typeof`.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Promise(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// `ToNumber`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// `ToString`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".into(),
            Value::Function(_) => "function () { [native code] }".into(),
            Value::Promise(_) => "[object Promise]".into(),
        }
    }

    /// `ToInt32`, for bitwise operators.
    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        (n.trunc() as i64 as u64 as u32) as i32
    }

    /// Arrays, objects and functions compare by identity.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same(b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
                Value::String(self.to_js_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_equals(&Value::String(other.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// `SameValueZero`, used by `includes`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

impl Function {
    fn same(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            (Function::Builtin(a), Function::Builtin(b)) => a == b,
            (Function::Capability(a), Function::Capability(b)) => a == b,
            _ => false,
        }
    }

    /// A short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Function::Closure(_) => "anonymous".into(),
            Function::Builtin(b) => b.name().into(),
            Function::Method { name, .. } => name.to_string(),
            Function::Capability(name) => format!("$api.{name}"),
        }
    }
}

/// Longest array the runtime materializes. Arrays are dense, so this sits
/// well below the 2^32 - 1 JavaScript admits.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Longest string, in chars, a builtin may produce.
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

/// Validate a requested array length.
pub fn array_length(n: f64) -> EvalResult<usize> {
    if !(n >= 0.0 && n.fract() == 0.0 && n <= MAX_ARRAY_LENGTH as f64) {
        return Err(EvalError::Range("Invalid array length".into()));
    }
    Ok(n as usize)
}

/// Validate the char length of a string about to be built.
pub fn string_length(len: usize) -> EvalResult<usize> {
    if len > MAX_STRING_LENGTH {
        return Err(EvalError::Range("Invalid string length".into()));
    }
    Ok(len)
}

/// Format a number the way JavaScript's `String(n)` does for the common
/// cases: integers without a fraction, `NaN`, `Infinity`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.into()
    } else if n == 0.0 {
        "0".into()
    } else {
        format!("{n}")
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
                return i64::from_str_radix(hex, 16).map(|v| v as f64).unwrap_or(f64::NAN);
            }
            // Rust accepts "inf" and "nan", JavaScript does not
            if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return f64::NAN;
            }
            trimmed.parse().unwrap_or(f64::NAN)
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(entries) => f.debug_map().entries(entries.borrow().iter()).finish(),
            Value::Function(func) => write!(f, "[Function: {}]", func.describe()),
            Value::Promise(_) => write!(f, "Promise"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.describe())
    }
}
