//! Helpers for working with decoded response values.
//!
//! The transport decodes SOAP responses into nested `serde_json::Value`
//! structures with snake_cased keys. The server collapses single-element
//! lists into bare maps, so anything list-shaped goes through
//! [`ensure_array`] before iteration.

use serde_json::Value;

/// Normalize a response node that is logically a list. A missing node is an
/// empty list, a bare map is a one-element list.
pub fn ensure_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// Walk a chain of object keys, `None` as soon as one is missing.
pub fn dig<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in keys {
        current = current.get(key)?;
    }
    Some(current)
}

/// Integer coercion over the wire representation: SOAP leaves arrive as
/// strings, mocked values may be numbers.
pub fn value_to_i64(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text rendering of a value for XML emission.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a success flag, covering both boolean and string forms.
pub fn value_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Presence check used for primary keys and validations: `Null` and the
/// empty string are absent, anything else counts.
pub fn value_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
