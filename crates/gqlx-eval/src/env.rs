//! Lexical scopes for the interpreter.
//!
//! Scopes form a parent chain so that closures can keep the scope they
//! were created in alive after the enclosing call returns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

struct Binding {
    value: Value,
    constant: bool,
}

/// One lexical scope.
#[derive(Default)]
pub struct Scope {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// The outermost scope of one invocation.
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A scope nested in `parent`.
    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    pub fn declare(&self, name: &str, value: Value, constant: bool) {
        self.bindings
            .borrow_mut()
            .insert(name.to_string(), Binding { value, constant });
    }

    /// Look up a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Update the innermost binding of `name`.
    ///
    /// Returns `Ok(false)` when no scope binds it.
    pub fn assign(&self, name: &str, value: Value) -> EvalResult<bool> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            if binding.constant {
                return Err(EvalError::Type("Assignment to constant variable.".into()));
            }
            binding.value = value;
            return Ok(true);
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_shadows_and_falls_back() {
        let root = Scope::root();
        root.declare("a", Value::Number(1.0), false);
        root.declare("b", Value::Number(2.0), false);
        let child = Scope::child(&root);
        child.declare("a", Value::Number(10.0), false);
        assert_eq!(child.lookup("a").map(|v| v.to_number()), Some(10.0));
        assert_eq!(child.lookup("b").map(|v| v.to_number()), Some(2.0));
        assert!(child.lookup("c").is_none());
    }

    #[test]
    fn test_assign_updates_defining_scope() {
        let root = Scope::root();
        root.declare("a", Value::Number(1.0), false);
        let child = Scope::child(&root);
        assert!(child.assign("a", Value::Number(5.0)).unwrap());
        assert_eq!(root.lookup("a").map(|v| v.to_number()), Some(5.0));
        assert!(!child.assign("missing", Value::Null).unwrap());
    }

    #[test]
    fn test_const_cannot_be_reassigned() {
        let root = Scope::root();
        root.declare("a", Value::Number(1.0), true);
        assert!(root.assign("a", Value::Number(2.0)).is_err());
    }
}
