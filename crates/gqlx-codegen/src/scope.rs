//! Lexically scoped local names.
//!
//! Both the rewriter and the generator mostly need to know whether a name is
//! bound locally, since a local binding shadows capabilities and field
//! arguments of the same name. The rewriter also remembers which locals hold
//! async arrow functions, so calls through them are awaited.

use std::collections::HashMap;

/// A stack of scopes; each name maps to "holds an async function".
#[derive(Debug, Default)]
pub struct Scopes {
    scopes: Vec<HashMap<String, bool>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Bind `name` in the innermost scope.
    pub fn declare(&mut self, name: impl Into<String>) {
        self.bind(name.into(), false);
    }

    /// Bind `name` in the innermost scope to an async function.
    pub fn declare_async_function(&mut self, name: impl Into<String>) {
        self.bind(name.into(), true);
    }

    fn bind(&mut self, name: String, is_async: bool) {
        if self.scopes.is_empty() {
            self.push();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, is_async);
        }
    }

    pub fn declare_all<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.declare(name);
        }
    }

    /// Is `name` bound in any enclosing scope?
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains_key(name))
    }

    /// Does the innermost binding of `name` hold an async function?
    pub fn is_async_function(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_scope_is_dropped_on_pop() {
        let mut scopes = Scopes::new();
        scopes.push();
        scopes.declare("outer");
        scopes.push();
        scopes.declare("inner");
        assert!(scopes.contains("outer"));
        assert!(scopes.contains("inner"));
        scopes.pop();
        assert!(!scopes.contains("inner"));
        assert!(scopes.contains("outer"));
    }

    #[test]
    fn test_async_function_is_shadowed() {
        let mut scopes = Scopes::new();
        scopes.push();
        scopes.declare_async_function("f");
        assert!(scopes.is_async_function("f"));
        scopes.push();
        scopes.declare("f");
        assert!(!scopes.is_async_function("f"));
        scopes.pop();
        assert!(scopes.is_async_function("f"));
        assert!(!scopes.is_async_function("g"));
    }
}
