//! Name environment with lexically scoped bindings.
//!
//! [`NameEnv`] manages a stack of scopes used by the capability validator.
//! The bottom scope holds everything a field body may reference without
//! declaring it; inner scopes hold locals in declaration order.

// ══════════════════════════════════════════════════════════════════════════════
// NameEnv
// ══════════════════════════════════════════════════════════════════════════════

/// A stack of scopes for name resolution; each scope lists its names in
/// declaration order.
#[derive(Debug)]
pub struct NameEnv {
    scopes: Vec<Vec<String>>,
}

impl NameEnv {
    /// Create an environment whose field scope holds `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut env = Self {
            scopes: vec![Vec::new()],
        };
        for name in names {
            env.declare(name);
        }
        env
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Pop the innermost scope. The field scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind `name` in the innermost scope.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.contains(&name) {
                scope.push(name);
            }
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .any(|scope| scope.iter().any(|n| n == name))
    }

    /// Every visible name, outermost scope first, without repeats.
    pub fn visible(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for name in self.scopes.iter().flatten() {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoping() {
        let mut env = NameEnv::new(["get", "id"]);
        env.push_scope();
        env.declare("x");
        assert!(env.is_bound("x"));
        assert!(env.is_bound("get"));
        assert_eq!(env.visible(), vec!["get", "id", "x"]);
        env.pop_scope();
        assert!(!env.is_bound("x"));
        // the field scope stays
        env.pop_scope();
        assert!(env.is_bound("id"));
    }

    #[test]
    fn test_visible_skips_repeats() {
        let mut env = NameEnv::new(["a", "b", "a"]);
        env.push_scope();
        env.declare("b");
        assert_eq!(env.visible(), vec!["a", "b"]);
    }
}
