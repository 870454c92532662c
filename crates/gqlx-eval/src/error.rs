//! Runtime error types.

use indexmap::IndexMap;
use thiserror::Error;

use crate::json;
use crate::value::Value;

/// A failure raised while executing a resolver body.
///
/// Everything that JavaScript would `throw` ends up here: type and
/// reference errors raised by the interpreter itself, and rejection values
/// coming from API implementations.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("TypeError: {0}")]
    Type(String),

    #[error("ReferenceError: {0}")]
    Reference(String),

    #[error("RangeError: {0}")]
    Range(String),

    /// A value thrown or rejected as-is.
    #[error("uncaught {0:?}")]
    Thrown(Value),
}

impl EvalError {
    /// The value a `catch` clause would observe.
    pub fn into_value(self) -> Value {
        let (name, message) = match self {
            EvalError::Thrown(value) => return value,
            EvalError::Type(m) => ("TypeError", m),
            EvalError::Reference(m) => ("ReferenceError", m),
            EvalError::Range(m) => ("RangeError", m),
        };
        let mut entries = IndexMap::new();
        entries.insert("name".to_string(), Value::string(name));
        entries.insert("message".to_string(), Value::string(message));
        Value::object(entries)
    }
}

/// Result alias for interpreter operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// The fault envelope.
///
/// Whatever a resolver throws or rejects with is replaced by exactly one
/// fault whose message is the JSON serialization of the original value,
/// including all of its own properties.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuntimeFault {
    pub message: String,
}

impl RuntimeFault {
    pub fn from_error(error: EvalError) -> Self {
        let value = error.into_value();
        Self {
            message: json::stringify(&value).unwrap_or_default(),
        }
    }

    /// The serialized original value, parsed back into JSON.
    pub fn description(&self) -> serde_json::Value {
        serde_json::from_str(&self.message).unwrap_or(serde_json::Value::Null)
    }
}
