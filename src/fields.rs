//! Shape probing for untyped attribute bags.
//!
//! The same logical field shows up as a bare scalar, as `{"value": scalar}`, as a list of
//! either, or not at all. [`probe`] classifies a bag entry once; the resolvers below work
//! on the resulting [`FieldShape`] instead of probing the JSON ad hoc.

use crate::error::FieldError;
use crate::sanitize::sanitize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldShape<'a> {
    /// Missing or `null`.
    Absent,
    /// String, number or boolean.
    Scalar(&'a Value),
    /// An object carrying a `value` key; holds the inner value.
    Wrapped(&'a Value),
    List(&'a [Value]),
    /// Any other object.
    Object(&'a Map<String, Value>),
}

pub fn probe<'a>(bag: &'a Map<String, Value>, key: &str) -> FieldShape<'a> {
    bag.get(key).map_or(FieldShape::Absent, shape_of)
}

pub fn shape_of(value: &Value) -> FieldShape<'_> {
    match value {
        Value::Null => FieldShape::Absent,
        Value::Array(items) => FieldShape::List(items),
        Value::Object(map) => match map.get("value") {
            Some(inner) => FieldShape::Wrapped(inner),
            None => FieldShape::Object(map),
        },
        scalar => FieldShape::Scalar(scalar),
    }
}

/// Text of a scalar JSON value, sanitized. `None` for null, lists and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(sanitize(s).into_owned()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Compact JSON of a value whose shape was unexpected, made safe for one column.
fn raw_fallback(value: &Value) -> String {
    sanitize(&value.to_string()).into_owned()
}

/// Resolves one scalar column. Absent fields are empty; lists and plain objects fall back
/// to their raw JSON text; a `{"value": ..}` wrapper around a non-scalar is an error.
pub fn resolve_scalar(bag: &Map<String, Value>, key: &'static str) -> Result<String, FieldError> {
    match probe(bag, key) {
        FieldShape::Absent => Ok(String::new()),
        FieldShape::Scalar(v) => Ok(scalar_text(v).unwrap_or_default()),
        FieldShape::Wrapped(Value::Null) => Ok(String::new()),
        FieldShape::Wrapped(v) => scalar_text(v).ok_or(FieldError::NestedValue {
            field: key,
            found: kind_name(v),
        }),
        FieldShape::List(_) | FieldShape::Object(_) => {
            let raw = &bag[key];
            debug!(field = key, found = kind_name(raw), "Unexpected shape for scalar field");
            Ok(raw_fallback(raw))
        }
    }
}

/// Elements of a repeated field. A lone value counts as a one-element list.
pub fn elements<'a>(bag: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match bag.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(single) => std::slice::from_ref(single),
    }
}

/// Text of an element, unwrapping `{"value": ..}`.
pub fn element_text(value: &Value) -> Option<String> {
    match shape_of(value) {
        FieldShape::Scalar(v) | FieldShape::Wrapped(v) => scalar_text(v),
        _ => None,
    }
}

/// Final `/`-separated segment of a path-like key.
pub fn key_tail(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
