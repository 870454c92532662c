//! Conversion between runtime values and JSON.
//!
//! JSON is the boundary format: field arguments come in as JSON, API
//! implementations receive and return JSON, and resolver results leave as
//! JSON. Conversion follows `JSON.stringify`: `undefined` and functions are
//! dropped from objects and become `null` inside arrays.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use crate::value::Value;

/// Convert a runtime value to JSON. `undefined` at the top level maps to
/// `null`.
pub fn to_json(value: &Value) -> Json {
    convert(value).unwrap_or(Json::Null)
}

/// `JSON.stringify(value)`; `None` where JavaScript returns `undefined`.
pub fn stringify(value: &Value) -> Option<String> {
    convert(value).map(|json| json.to_string())
}

/// `JSON.stringify(value, null, indent)`.
pub fn stringify_pretty(value: &Value) -> Option<String> {
    convert(value).and_then(|json| serde_json::to_string_pretty(&json).ok())
}

fn convert(value: &Value) -> Option<Json> {
    match value {
        Value::Undefined | Value::Function(_) => None,
        Value::Null => Some(Json::Null),
        Value::Bool(b) => Some(Json::Bool(*b)),
        Value::Number(n) => Some(number(*n)),
        Value::String(s) => Some(Json::String(s.clone())),
        Value::Array(items) => Some(Json::Array(
            items
                .borrow()
                .iter()
                .map(|item| convert(item).unwrap_or(Json::Null))
                .collect(),
        )),
        Value::Object(entries) => {
            let mut map = Map::new();
            for (key, item) in entries.borrow().iter() {
                if let Some(json) = convert(item) {
                    map.insert(key.clone(), json);
                }
            }
            Some(Json::Object(map))
        }
        Value::Promise(_) => Some(Json::Object(Map::new())),
    }
}

/// Integral numbers serialize without a fraction, non-finite ones as `null`.
fn number(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

/// Convert JSON into a fresh runtime value.
pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::array(items.iter().map(from_json).collect()),
        Json::Object(map) => {
            let entries: IndexMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect();
            Value::object(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undefined_is_dropped_from_objects() {
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), Value::Number(1.0));
        entries.insert("b".to_string(), Value::Undefined);
        entries.insert("c".to_string(), Value::array(vec![Value::Undefined, Value::Number(0.5)]));
        assert_eq!(to_json(&Value::object(entries)), json!({ "a": 1, "c": [null, 0.5] }));
    }

    #[test]
    fn test_key_order_is_preserved() {
        let value = from_json(&json!({ "z": 1, "a": 2 }));
        assert_eq!(stringify(&value).as_deref(), Some(r#"{"z":1,"a":2}"#));
    }

    #[test]
    fn test_top_level_undefined() {
        assert_eq!(stringify(&Value::Undefined), None);
        assert_eq!(to_json(&Value::Undefined), Json::Null);
        assert_eq!(to_json(&Value::Number(f64::NAN)), Json::Null);
    }
}
