use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::extract::transform::{TransformStep, apply_transforms};

/// A leaf value located in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl ScalarValue {
    /// Converts a JSON leaf. Objects, arrays and null yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_f64()
                    .map(ScalarValue::Number)
                    .unwrap_or_else(|| ScalarValue::Text(n.to_string())),
            ),
            Value::String(s) => Some(ScalarValue::Text(s.clone())),
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Numeric reading of the value: booleans as 1/0, strings only when the
    /// trimmed text parses to a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            ScalarValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ScalarValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Runs the transform chain over the numeric reading of this value.
    ///
    /// Non-numeric text is returned unchanged; every step passes it through.
    pub fn apply(&self, steps: &[TransformStep]) -> ScalarValue {
        match self.as_number() {
            Some(n) => ScalarValue::Number(apply_transforms(n, steps)),
            None => self.clone(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Number(n) => write!(f, "{n}"),
            ScalarValue::Text(s) => write!(f, "{s}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_rejects_containers_and_null() {
        assert_eq!(ScalarValue::from_json(&json!({"a": 1})), None);
        assert_eq!(ScalarValue::from_json(&json!([1])), None);
        assert_eq!(ScalarValue::from_json(&Value::Null), None);
        assert_eq!(ScalarValue::from_json(&json!(3)), Some(ScalarValue::Number(3.0)));
    }

    #[test]
    fn test_numeric_string_and_bool_are_coerced() {
        let steps = [TransformStep::Multiply { factor: 2.0 }];
        assert_eq!(ScalarValue::Text("25".into()).apply(&steps), ScalarValue::Number(50.0));
        assert_eq!(ScalarValue::Text(" 1.5 ".into()).apply(&steps), ScalarValue::Number(3.0));
        assert_eq!(ScalarValue::Bool(true).apply(&steps), ScalarValue::Number(2.0));
    }

    #[test]
    fn test_non_numeric_text_passes_through() {
        let steps = [TransformStep::Percentage, TransformStep::Round { decimals: 2 }];
        let text = ScalarValue::Text("United States".into());
        assert_eq!(text.apply(&steps), text);
        let nan_text = ScalarValue::Text("NaN".into());
        assert_eq!(nan_text.apply(&steps), nan_text);
    }

    #[test]
    fn test_display() {
        assert_eq!(ScalarValue::Number(15234.0).to_string(), "15234");
        assert_eq!(ScalarValue::Number(0.25).to_string(), "0.25");
        assert_eq!(ScalarValue::Text("x".into()).to_string(), "x");
    }
}
