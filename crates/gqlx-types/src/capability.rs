//! The capability descriptor: which external functions compiled code may
//! call, and which of them are asynchronous.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from callable function name to "is asynchronous".
///
/// Serializes as a plain JSON object, e.g. `{"get": true, "listen": false}`.
/// Iteration order is the sorted name order, which keeps every derived
/// artifact deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<String, bool>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a synchronous capability.
    pub fn sync(mut self, name: impl Into<String>) -> Self {
        self.insert(name, false);
        self
    }

    /// Add an asynchronous capability.
    pub fn asynchronous(mut self, name: impl Into<String>) -> Self {
        self.insert(name, true);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, is_async: bool) {
        self.0.insert(name.into(), is_async);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// `true` only for names registered as asynchronous.
    pub fn is_async(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn async_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, is_async)| **is_async)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for Capabilities {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let caps = Capabilities::new().asynchronous("get").sync("listen");
        assert!(caps.contains("get"));
        assert!(caps.is_async("get"));
        assert!(!caps.is_async("listen"));
        assert!(!caps.is_async("missing"));
        assert_eq!(caps.async_names().collect::<Vec<_>>(), vec!["get"]);
    }

    #[test]
    fn test_json_shape() {
        let caps: Capabilities = serde_json::from_str(r#"{"post": true, "form": false}"#).unwrap();
        assert_eq!(caps.names().collect::<Vec<_>>(), vec!["form", "post"]);
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"{"form":false,"post":true}"#);
    }
}
