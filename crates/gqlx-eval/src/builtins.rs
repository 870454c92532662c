//! Standard globals and methods available to resolver bodies.
//!
//! Global namespaces (`Promise`, `Object`, `Array`, `Math`, `JSON`,
//! `console`) are plain objects whose members are [`Builtin`] functions.
//! Methods on strings and numbers, and the array methods that do not take
//! a callback, are implemented here as plain functions; callback-taking
//! array methods live with the interpreter.

use std::fmt::Write as _;

use futures::future::try_join_all;
use futures::FutureExt;
use indexmap::IndexMap;
use tracing::info;

use crate::error::{EvalError, EvalResult};
use crate::json;
use crate::value::{array_length, number_to_string, string_length, Function, Promise, Value};

/// A native global function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    PromiseAll,
    PromiseResolve,
    PromiseReject,
    ObjectKeys,
    ObjectValues,
    ObjectEntries,
    ObjectAssign,
    ObjectFromEntries,
    ArrayIsArray,
    ArrayFrom,
    MathAbs,
    MathCeil,
    MathFloor,
    MathRound,
    MathTrunc,
    MathSign,
    MathSqrt,
    MathPow,
    MathMax,
    MathMin,
    JsonStringify,
    JsonParse,
    EncodeUriComponent,
    DecodeUriComponent,
    ParseInt,
    ParseFloat,
    IsNaN,
    Number,
    String,
    Boolean,
    ConsoleLog,
    Assert,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::PromiseAll => "Promise.all",
            Builtin::PromiseResolve => "Promise.resolve",
            Builtin::PromiseReject => "Promise.reject",
            Builtin::ObjectKeys => "Object.keys",
            Builtin::ObjectValues => "Object.values",
            Builtin::ObjectEntries => "Object.entries",
            Builtin::ObjectAssign => "Object.assign",
            Builtin::ObjectFromEntries => "Object.fromEntries",
            Builtin::ArrayIsArray => "Array.isArray",
            Builtin::ArrayFrom => "Array.from",
            Builtin::MathAbs => "Math.abs",
            Builtin::MathCeil => "Math.ceil",
            Builtin::MathFloor => "Math.floor",
            Builtin::MathRound => "Math.round",
            Builtin::MathTrunc => "Math.trunc",
            Builtin::MathSign => "Math.sign",
            Builtin::MathSqrt => "Math.sqrt",
            Builtin::MathPow => "Math.pow",
            Builtin::MathMax => "Math.max",
            Builtin::MathMin => "Math.min",
            Builtin::JsonStringify => "JSON.stringify",
            Builtin::JsonParse => "JSON.parse",
            Builtin::EncodeUriComponent => "encodeURIComponent",
            Builtin::DecodeUriComponent => "decodeURIComponent",
            Builtin::ParseInt => "parseInt",
            Builtin::ParseFloat => "parseFloat",
            Builtin::IsNaN => "isNaN",
            Builtin::Number => "Number",
            Builtin::String => "String",
            Builtin::Boolean => "Boolean",
            Builtin::ConsoleLog => "console.log",
            Builtin::Assert => "assert",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Globals
// ══════════════════════════════════════════════════════════════════════════════

fn namespace(members: &[(&str, Builtin)], constants: &[(&str, f64)]) -> Value {
    let mut entries = IndexMap::new();
    for (name, builtin) in members {
        entries.insert(name.to_string(), Value::Function(Function::Builtin(*builtin)));
    }
    for (name, value) in constants {
        entries.insert(name.to_string(), Value::Number(*value));
    }
    Value::object(entries)
}

/// Resolve a standard global name.
pub fn global(name: &str) -> Option<Value> {
    let builtin = |b| Some(Value::Function(Function::Builtin(b)));
    match name {
        "undefined" => Some(Value::Undefined),
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        "Promise" => Some(namespace(
            &[
                ("all", Builtin::PromiseAll),
                ("resolve", Builtin::PromiseResolve),
                ("reject", Builtin::PromiseReject),
            ],
            &[],
        )),
        "Object" => Some(namespace(
            &[
                ("keys", Builtin::ObjectKeys),
                ("values", Builtin::ObjectValues),
                ("entries", Builtin::ObjectEntries),
                ("assign", Builtin::ObjectAssign),
                ("fromEntries", Builtin::ObjectFromEntries),
            ],
            &[],
        )),
        "Array" => Some(namespace(
            &[("isArray", Builtin::ArrayIsArray), ("from", Builtin::ArrayFrom)],
            &[],
        )),
        "Math" => Some(namespace(
            &[
                ("abs", Builtin::MathAbs),
                ("ceil", Builtin::MathCeil),
                ("floor", Builtin::MathFloor),
                ("round", Builtin::MathRound),
                ("trunc", Builtin::MathTrunc),
                ("sign", Builtin::MathSign),
                ("sqrt", Builtin::MathSqrt),
                ("pow", Builtin::MathPow),
                ("max", Builtin::MathMax),
                ("min", Builtin::MathMin),
            ],
            &[("PI", std::f64::consts::PI), ("E", std::f64::consts::E)],
        )),
        "JSON" => Some(namespace(
            &[("stringify", Builtin::JsonStringify), ("parse", Builtin::JsonParse)],
            &[],
        )),
        "console" => Some(namespace(
            &[
                ("log", Builtin::ConsoleLog),
                ("info", Builtin::ConsoleLog),
                ("warn", Builtin::ConsoleLog),
                ("error", Builtin::ConsoleLog),
            ],
            &[],
        )),
        "encodeURIComponent" => builtin(Builtin::EncodeUriComponent),
        "decodeURIComponent" => builtin(Builtin::DecodeUriComponent),
        "parseInt" => builtin(Builtin::ParseInt),
        "parseFloat" => builtin(Builtin::ParseFloat),
        "isNaN" => builtin(Builtin::IsNaN),
        "Number" => builtin(Builtin::Number),
        "String" => builtin(Builtin::String),
        "Boolean" => builtin(Builtin::Boolean),
        "assert" => builtin(Builtin::Assert),
        _ => None,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Calling builtins
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn number_arg(args: &[Value], index: usize) -> f64 {
    arg(args, index).to_number()
}

/// The elements of an array, or the characters of a string.
pub(crate) fn iterate(value: &Value) -> EvalResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(EvalError::Type(format!("{} is not iterable", other.type_of()))),
    }
}

/// Own enumerable keys in insertion order.
pub(crate) fn own_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(entries) => entries.borrow().keys().cloned().collect(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn own_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(entries) => entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn error_value(name: &str, message: String) -> Value {
    let mut entries = IndexMap::new();
    entries.insert("name".to_string(), Value::string(name));
    entries.insert("message".to_string(), Value::String(message));
    Value::object(entries)
}

/// Call a builtin with already evaluated arguments.
pub fn call_builtin(builtin: Builtin, args: &[Value]) -> EvalResult<Value> {
    let result = match builtin {
        Builtin::PromiseAll => Value::Promise(promise_all(iterate(&arg(args, 0))?)),
        Builtin::PromiseResolve => match arg(args, 0) {
            Value::Promise(p) => Value::Promise(p),
            other => Value::Promise(Promise::resolved(other)),
        },
        Builtin::PromiseReject => Value::Promise(Promise::rejected(arg(args, 0))),

        Builtin::ObjectKeys => {
            Value::array(own_keys(&arg(args, 0)).into_iter().map(Value::String).collect())
        }
        Builtin::ObjectValues => {
            Value::array(own_entries(&arg(args, 0)).into_iter().map(|(_, v)| v).collect())
        }
        Builtin::ObjectEntries => Value::array(
            own_entries(&arg(args, 0))
                .into_iter()
                .map(|(k, v)| Value::array(vec![Value::String(k), v]))
                .collect(),
        ),
        Builtin::ObjectAssign => {
            let target = arg(args, 0);
            let Value::Object(entries) = &target else {
                return Err(EvalError::Type("Object.assign target must be an object".into()));
            };
            for source in args.iter().skip(1) {
                for (k, v) in own_entries(source) {
                    entries.borrow_mut().insert(k, v);
                }
            }
            target
        }
        Builtin::ObjectFromEntries => {
            let mut entries = IndexMap::new();
            for pair in iterate(&arg(args, 0))? {
                let pair = iterate(&pair)?;
                let key = pair.first().cloned().unwrap_or(Value::Undefined);
                let value = pair.get(1).cloned().unwrap_or(Value::Undefined);
                entries.insert(key.to_js_string(), value);
            }
            Value::object(entries)
        }

        Builtin::ArrayIsArray => Value::Bool(matches!(arg(args, 0), Value::Array(_))),
        Builtin::ArrayFrom => match arg(args, 0) {
            Value::Array(_) | Value::String(_) => Value::array(iterate(&arg(args, 0))?),
            Value::Object(entries) => {
                let len = entries
                    .borrow()
                    .get("length")
                    .map(|v| v.to_number())
                    .unwrap_or(0.0);
                let len = if len.is_nan() { 0.0 } else { len.trunc().max(0.0) };
                Value::array(vec![Value::Undefined; array_length(len)?])
            }
            _ => Value::array(Vec::new()),
        },

        Builtin::MathAbs => Value::Number(number_arg(args, 0).abs()),
        Builtin::MathCeil => Value::Number(number_arg(args, 0).ceil()),
        Builtin::MathFloor => Value::Number(number_arg(args, 0).floor()),
        // JavaScript rounds half up, Rust rounds half away from zero
        Builtin::MathRound => Value::Number((number_arg(args, 0) + 0.5).floor()),
        Builtin::MathTrunc => Value::Number(number_arg(args, 0).trunc()),
        Builtin::MathSign => {
            let n = number_arg(args, 0);
            Value::Number(if n.is_nan() || n == 0.0 { n } else { n.signum() })
        }
        Builtin::MathSqrt => Value::Number(number_arg(args, 0).sqrt()),
        Builtin::MathPow => Value::Number(number_arg(args, 0).powf(number_arg(args, 1))),
        Builtin::MathMax => Value::Number(args.iter().map(Value::to_number).fold(
            f64::NEG_INFINITY,
            |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
        )),
        Builtin::MathMin => Value::Number(args.iter().map(Value::to_number).fold(
            f64::INFINITY,
            |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
        )),

        Builtin::JsonStringify => {
            let pretty = args.len() > 2 && !arg(args, 2).is_nullish();
            let text = if pretty {
                json::stringify_pretty(&arg(args, 0))
            } else {
                json::stringify(&arg(args, 0))
            };
            text.map(Value::String).unwrap_or(Value::Undefined)
        }
        Builtin::JsonParse => {
            let text = arg(args, 0).to_js_string();
            let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                EvalError::Thrown(error_value("SyntaxError", format!("JSON.parse: {e}")))
            })?;
            json::from_json(&parsed)
        }

        Builtin::EncodeUriComponent => {
            Value::String(encode_uri_component(&arg(args, 0).to_js_string()))
        }
        Builtin::DecodeUriComponent => {
            let text = arg(args, 0).to_js_string();
            let decoded = decode_uri_component(&text)
                .ok_or_else(|| EvalError::Thrown(error_value("URIError", "URI malformed".into())))?;
            Value::String(decoded)
        }
        Builtin::ParseInt => {
            let radix = match arg(args, 1) {
                Value::Undefined => 0,
                other => other.to_number() as u32,
            };
            Value::Number(parse_int(&arg(args, 0).to_js_string(), radix))
        }
        Builtin::ParseFloat => Value::Number(parse_float(&arg(args, 0).to_js_string())),
        Builtin::IsNaN => Value::Bool(number_arg(args, 0).is_nan()),
        Builtin::Number => Value::Number(if args.is_empty() { 0.0 } else { number_arg(args, 0) }),
        Builtin::String => Value::String(if args.is_empty() {
            String::new()
        } else {
            arg(args, 0).to_js_string()
        }),
        Builtin::Boolean => Value::Bool(arg(args, 0).is_truthy()),

        Builtin::ConsoleLog => {
            let line = args
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => json::stringify(other).unwrap_or_else(|| other.to_js_string()),
                })
                .collect::<Vec<_>>()
                .join(" ");
            info!(target: "gqlx::console", "{line}");
            Value::Undefined
        }
        Builtin::Assert => {
            if !arg(args, 0).is_truthy() {
                let message = match arg(args, 1) {
                    Value::Undefined => "Assertion failed".to_string(),
                    other => other.to_js_string(),
                };
                return Err(EvalError::Thrown(error_value("AssertionError", message)));
            }
            Value::Undefined
        }
    };
    Ok(result)
}

/// `Promise.all`: settles once every element has, rejects with the first
/// rejection and drops the remaining results.
pub fn promise_all(items: Vec<Value>) -> Promise {
    let futures = items.into_iter().map(|item| async move {
        match item {
            Value::Promise(p) => p.settle().await,
            other => Ok(other),
        }
    });
    Promise::new(try_join_all(futures).map(|r| r.map(Value::array)).boxed_local())
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

const STRING_METHODS: &[&str] = &[
    "split", "toUpperCase", "toLowerCase", "trim", "trimStart", "trimEnd", "includes",
    "startsWith", "endsWith", "indexOf", "lastIndexOf", "slice", "substring", "replace",
    "replaceAll", "charAt", "padStart", "padEnd", "repeat", "concat", "toString",
];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Array methods that take a callback.
pub(crate) const ARRAY_CALLBACK_METHODS: &[&str] = &[
    "map", "filter", "forEach", "find", "findIndex", "some", "every", "reduce", "flatMap", "sort",
];

const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "join", "includes", "indexOf", "lastIndexOf", "slice",
    "concat", "reverse", "flat", "toString",
];

/// Is `name` a method of `receiver`?
pub fn has_method(receiver: &Value, name: &str) -> bool {
    match receiver {
        Value::String(_) => STRING_METHODS.contains(&name),
        Value::Number(_) => NUMBER_METHODS.contains(&name),
        Value::Array(_) => ARRAY_METHODS.contains(&name) || ARRAY_CALLBACK_METHODS.contains(&name),
        Value::Promise(_) => matches!(name, "then" | "catch"),
        _ => false,
    }
}

/// Clamp a relative index (negative counts from the end) into `0..=len`.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

pub fn string_method(s: &str, name: &str, args: &[Value]) -> EvalResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let text = |i: usize| arg(args, i).to_js_string();
    let result = match name {
        "split" => match arg(args, 0) {
            Value::Undefined => Value::array(vec![Value::string(s)]),
            sep => {
                let sep = sep.to_js_string();
                let parts: Vec<Value> = if sep.is_empty() {
                    chars.iter().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::string).collect()
                };
                Value::array(parts)
            }
        },
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::string(s.trim()),
        "trimStart" => Value::string(s.trim_start()),
        "trimEnd" => Value::string(s.trim_end()),
        "includes" => Value::Bool(s.contains(text(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(text(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(text(0).as_str())),
        "indexOf" | "lastIndexOf" => {
            let needle = text(0);
            let found = if name == "indexOf" { s.find(&needle) } else { s.rfind(&needle) };
            Value::Number(found.map(|b| s[..b].chars().count() as f64).unwrap_or(-1.0))
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), chars.len(), 0);
            let end = relative_index(&arg(args, 1), chars.len(), chars.len());
            Value::String(if start < end { chars[start..end].iter().collect() } else { String::new() })
        }
        "substring" => {
            let clamp = |v: Value, default: usize| match v {
                Value::Undefined => default,
                v => {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 { 0 } else { (n as usize).min(chars.len()) }
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), chars.len());
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::String(chars[start..end].iter().collect())
        }
        "replace" => Value::String(s.replacen(text(0).as_str(), &text(1), 1)),
        "replaceAll" => Value::String(s.replace(text(0).as_str(), &text(1))),
        "charAt" => {
            let i = number_arg(args, 0);
            let i = if i.is_nan() { 0 } else { i as usize };
            Value::String(chars.get(i).map(|c| c.to_string()).unwrap_or_default())
        }
        "padStart" | "padEnd" => {
            let width = number_arg(args, 0).max(0.0) as usize;
            let fill = match arg(args, 1) {
                Value::Undefined => " ".to_string(),
                v => v.to_js_string(),
            };
            if chars.len() >= width || fill.is_empty() {
                Value::string(s)
            } else {
                string_length(width)?;
                let pad: String = fill.chars().cycle().take(width - chars.len()).collect();
                Value::String(if name == "padStart" { pad + s } else { format!("{s}{pad}") })
            }
        }
        "repeat" => {
            let n = number_arg(args, 0);
            if n < 0.0 || n.is_infinite() {
                return Err(EvalError::Range(format!("Invalid count value: {}", number_to_string(n))));
            }
            let count = if n.is_nan() { 0 } else { n as usize };
            if chars.is_empty() || count == 0 {
                Value::String(String::new())
            } else {
                string_length(chars.len().saturating_mul(count))?;
                Value::String(s.repeat(count))
            }
        }
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_js_string());
            }
            Value::String(out)
        }
        "toString" => Value::string(s),
        _ => return Err(EvalError::Type(format!("string.{name} is not a function"))),
    };
    Ok(result)
}

pub fn number_method(n: f64, name: &str, args: &[Value]) -> EvalResult<Value> {
    match name {
        "toFixed" => {
            let digits = number_arg(args, 0);
            let digits = if digits.is_nan() { 0 } else { digits as usize };
            if digits > 100 {
                return Err(EvalError::Range("toFixed() digits argument must be between 0 and 100".into()));
            }
            Ok(Value::String(format!("{n:.digits$}")))
        }
        "toString" => Ok(Value::String(number_to_string(n))),
        _ => Err(EvalError::Type(format!("number.{name} is not a function"))),
    }
}

/// Array methods without callbacks.
pub fn array_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    let Value::Array(items) = receiver else {
        return Err(EvalError::Type(format!("{name} called on a non-array")));
    };
    let result = match name {
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Value::Number(items.len() as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() { Value::Undefined } else { items.remove(0) }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            for (i, a) in args.iter().enumerate() {
                items.insert(i, a.clone());
            }
            Value::Number(items.len() as f64)
        }
        "join" => {
            let sep = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                v => v.to_js_string(),
            };
            Value::String(
                items
                    .borrow()
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "toString" => Value::String(receiver.to_js_string()),
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.borrow().iter().any(|v| v.same_value_zero(&needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let pos = items.borrow().iter().position(|v| v.strict_equals(&needle));
            Value::Number(pos.map(|p| p as f64).unwrap_or(-1.0))
        }
        "lastIndexOf" => {
            let needle = arg(args, 0);
            let pos = items.borrow().iter().rposition(|v| v.strict_equals(&needle));
            Value::Number(pos.map(|p| p as f64).unwrap_or(-1.0))
        }
        "slice" => {
            let items = items.borrow();
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            Value::array(if start < end { items[start..end].to_vec() } else { Vec::new() })
        }
        "concat" => {
            let mut out = items.borrow().clone();
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::array(out)
        }
        "reverse" => {
            items.borrow_mut().reverse();
            receiver.clone()
        }
        "flat" => {
            let depth = match arg(args, 0) {
                Value::Undefined => 1,
                v => v.to_number().max(0.0) as usize,
            };
            Value::array(flatten(&items.borrow(), depth))
        }
        _ => return Err(EvalError::Type(format!("array.{name} is not a function"))),
    };
    Ok(result)
}

pub(crate) fn flatten(items: &[Value], depth: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => out.extend(flatten(&inner.borrow(), depth - 1)),
            other => out.push(other.clone()),
        }
    }
    out
}

// ══════════════════════════════════════════════════════════════════════════════
// Text helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `encodeURIComponent`: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
/// is percent-encoded as UTF-8.
pub fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

pub fn decode_uri_component(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn parse_int(s: &str, radix: u32) -> f64 {
    let mut rest = s.trim_start();
    let negative = rest.starts_with('-');
    if rest.starts_with('-') || rest.starts_with('+') {
        rest = &rest[1..];
    }
    let mut radix = radix;
    if radix == 0 || radix == 16 {
        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = hex;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = rest.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    if negative { -value } else { value }
}

fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        let ok = match c {
            b'0'..=b'9' => true,
            b'+' | b'-' => end == 0 || matches!(bytes[end - 1], b'e' | b'E'),
            b'.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            b'e' | b'E' if !seen_exp && end > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        end += 1;
    }
    // back off a dangling exponent or sign
    let mut candidate = &s[..end];
    while !candidate.is_empty() && candidate.parse::<f64>().is_err() {
        candidate = &candidate[..candidate.len() - 1];
    }
    if candidate.is_empty() {
        if s.starts_with("Infinity") || s.starts_with("+Infinity") {
            return f64::INFINITY;
        }
        if s.starts_with("-Infinity") {
            return f64::NEG_INFINITY;
        }
        return f64::NAN;
    }
    candidate.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> Value {
        call_builtin(builtin, &args).unwrap()
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("a b&c=d/é"), "a%20b%26c%3Dd%2F%C3%A9");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(decode_uri_component("a%20b%C3%A9").as_deref(), Some("a bé"));
        assert_eq!(decode_uri_component("%zz"), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_int("  42px", 0), 42.0);
        assert_eq!(parse_int("-0x1A", 0), -26.0);
        assert_eq!(parse_int("101", 2), 5.0);
        assert!(parse_int("px", 10).is_nan());
        assert_eq!(parse_float("3.5e2kg"), 350.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn test_math() {
        assert_eq!(call(Builtin::MathRound, vec![Value::Number(2.5)]).to_number(), 3.0);
        assert_eq!(call(Builtin::MathRound, vec![Value::Number(-2.5)]).to_number(), -2.0);
        assert_eq!(
            call(Builtin::MathMax, vec![Value::Number(1.0), Value::Number(7.0)]).to_number(),
            7.0
        );
        assert_eq!(call(Builtin::MathMin, vec![]).to_number(), f64::INFINITY);
    }

    #[test]
    fn test_object_helpers() {
        let obj = json::from_json(&serde_json::json!({ "a": 1, "b": null }));
        assert_eq!(call(Builtin::ObjectKeys, vec![obj.clone()]).to_js_string(), "a,b");
        let entries = call(Builtin::ObjectEntries, vec![obj.clone()]);
        assert_eq!(json::to_json(&entries), serde_json::json!([["a", 1], ["b", null]]));
        let back = call(Builtin::ObjectFromEntries, vec![entries]);
        assert_eq!(json::to_json(&back), serde_json::json!({ "a": 1, "b": null }));
    }

    #[test]
    fn test_string_methods() {
        let split = string_method("a,b,c", "split", &[Value::string(",")]).unwrap();
        assert_eq!(json::to_json(&split), serde_json::json!(["a", "b", "c"]));
        let sliced = string_method("hello", "slice", &[Value::Number(-3.0)]).unwrap();
        assert_eq!(sliced.to_js_string(), "llo");
        let padded = string_method("7", "padStart", &[Value::Number(3.0), Value::string("0")]).unwrap();
        assert_eq!(padded.to_js_string(), "007");
        assert_eq!(
            string_method("héllo", "indexOf", &[Value::string("l")]).unwrap().to_number(),
            2.0
        );
    }

    #[test]
    fn test_array_methods() {
        let arr = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        array_method(&arr, "push", &[Value::Number(3.0)]).unwrap();
        assert_eq!(array_method(&arr, "join", &[Value::string("-")]).unwrap().to_js_string(), "1-2-3");
        assert_eq!(array_method(&arr, "slice", &[Value::Number(1.0)]).unwrap().to_js_string(), "2,3");
        let nested = Value::array(vec![arr.clone(), Value::Number(4.0)]);
        assert_eq!(array_method(&nested, "flat", &[]).unwrap().to_js_string(), "1,2,3,4");
        assert_eq!(number_method(1.005, "toFixed", &[Value::Number(1.0)]).unwrap().to_js_string(), "1.0");
    }

    #[test]
    fn test_assert_throws_error_object() {
        let err = call_builtin(Builtin::Assert, &[Value::Bool(false), Value::string("nope")]).unwrap_err();
        let value = err.into_value();
        assert_eq!(json::stringify(&value).as_deref(), Some(r#"{"name":"AssertionError","message":"nope"}"#));
    }
}
