//! Live API implementations bound to a service.
//!
//! Each capability name maps to a host function taking the call arguments
//! as JSON. Synchronous functions return their result directly;
//! asynchronous ones return a future. An `Err` is the rejection value.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value as Json;

/// Outcome of one API call: the result, or the value it rejected with.
pub type ApiResult = Result<Json, Json>;

type SyncFn = dyn Fn(Vec<Json>) -> ApiResult;
type AsyncFn = dyn Fn(Vec<Json>) -> LocalBoxFuture<'static, ApiResult>;

/// One host function.
#[derive(Clone)]
pub enum ApiFunction {
    Sync(Rc<SyncFn>),
    Async(Rc<AsyncFn>),
}

/// The API object handed to compiled resolvers as `$api`.
#[derive(Clone, Default)]
pub struct ApiImplementations {
    functions: BTreeMap<String, ApiFunction>,
}

impl ApiImplementations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function that answers immediately.
    pub fn with_sync<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Json>) -> ApiResult + 'static,
    {
        self.functions.insert(name.into(), ApiFunction::Sync(Rc::new(f)));
        self
    }

    /// Register a function that answers with a future.
    pub fn with_async<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Json>) -> Fut + 'static,
        Fut: Future<Output = ApiResult> + 'static,
    {
        let wrapped = move |args: Vec<Json>| f(args).boxed_local();
        self.functions
            .insert(name.into(), ApiFunction::Async(Rc::new(wrapped)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ApiFunction> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for ApiImplementations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
