//! Display and validation helpers shared by the aggregation and extraction paths.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::extract::ScalarValue;

/// Display length after which strings are truncated by [`format_value`].
const MAX_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Null => "null",
        };
        f.write_str(s)
    }
}

pub fn value_type(value: &Value) -> ValueType {
    match value {
        Value::Null => ValueType::Null,
        Value::Bool(_) => ValueType::Boolean,
        Value::Number(_) => ValueType::Number,
        Value::String(_) => ValueType::String,
        Value::Array(_) => ValueType::Array,
        Value::Object(_) => ValueType::Object,
    }
}

/// Short human-readable rendering of any JSON node.
///
/// Containers are summarized (`Array(3)`, `Object(2 keys)`), strings are quoted
/// and cut at 50 characters.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Array(items) => format!("Array({})", items.len()),
        Value::Object(map) => format!("Object({} keys)", map.len()),
        Value::String(s) if s.chars().count() > MAX_PREVIEW_CHARS => {
            let head: String = s.chars().take(MAX_PREVIEW_CHARS).collect();
            format!("\"{head}...\"")
        }
        Value::String(s) => format!("\"{s}\""),
        Value::Number(n) if n.is_f64() => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    }
}

/// Fixed-precision rendering for a computed oracle value.
///
/// Non-finite values render as `NaN`, `inf` or `-inf` so they can never be
/// mistaken for a reading.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        value.to_string()
    }
}

/// Renders an extracted value: numbers at fixed precision, text and booleans as-is.
pub fn format_scalar(value: &ScalarValue, decimals: usize) -> String {
    match value {
        ScalarValue::Number(n) => format_fixed(*n, decimals),
        other => other.to_string(),
    }
}

/// Accepts only absolute `http`/`https` URLs.
pub fn is_valid_url(candidate: &str) -> bool {
    match reqwest::Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}
