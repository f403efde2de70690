use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-friendly representation of a single cell value.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable
/// persistence of raw row data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Empty / unset cell value.
    Null,
    /// Boolean.
    Bool(bool),
    /// IEEE-754 double precision number.
    Number(f64),
    /// Plain string.
    Text(String),
    /// Date/time without a timezone.
    DateTime(NaiveDateTime),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Returns true if the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                // Integral numbers render without a trailing `.0`.
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_renders_integral_numbers_without_fraction() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn serde_round_trip() {
        let v = Value::Text("ashton".into());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"ashton"}"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }
}
