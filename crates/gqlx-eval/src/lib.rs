//! gqlx runtime: executes compiled resolver bodies.
//!
//! A [`Runtime`] pairs a capability descriptor with live
//! [`ApiImplementations`] and runs rewritten resolver blocks against field
//! arguments given as JSON. Asynchronous capabilities and async arrow
//! functions yield promises that are driven by whatever executor polls
//! [`Runtime::invoke`].

pub mod api;
pub mod builtins;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod json;
pub mod value;

pub use api::{ApiFunction, ApiImplementations, ApiResult};
pub use error::{EvalError, EvalResult, RuntimeFault};
pub use interpreter::Runtime;
pub use value::Value;
