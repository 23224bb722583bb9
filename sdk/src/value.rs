use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dynamic value of one payload field.
///
/// Integer fields decode to [Int](#variant.Int) or [UInt](#variant.UInt)
/// depending on signedness, `char[N]` fields decode to
/// [Text](#variant.Text) and other arrays to [Array](#variant.Array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Double(f64),
    Float(f32),
    Text(String),
    Array(Vec<Value>),
}

/// Field values keyed by field name.
pub type Payload = BTreeMap<String, Value>;

impl Value {
    /// Returns the value as `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(value) => Some(value),
            Value::UInt(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(value) => u64::try_from(value).ok(),
            Value::UInt(value) => Some(value),
            _ => None,
        }
    }

    /// Any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(value) => Some(value as f64),
            Value::UInt(value) => Some(value as f64),
            Value::Float(value) => Some(value as f64),
            Value::Double(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::UInt(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{}", value),
            Value::Text(text) => write!(f, "{:?}", text),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_views() {
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Int(7).as_u64(), Some(7));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Text("x".into()).as_f64(), None);
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn json_shape() {
        let payload: Payload =
            serde_json::from_str(r#"{ "a": 5, "b": -2, "c": 1.25, "d": "hi", "e": [1, 2] }"#).unwrap();
        assert_eq!(payload["a"], Value::Int(5));
        assert_eq!(payload["b"], Value::Int(-2));
        assert_eq!(payload["c"], Value::Double(1.25));
        assert_eq!(payload["d"], Value::Text("hi".to_string()));
        assert_eq!(payload["e"], Value::Array(vec![Value::Int(1), Value::Int(2)]));

        let big: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(big, Value::UInt(u64::MAX));
        assert_eq!(serde_json::to_string(&Value::Text("ok".into())).unwrap(), "\"ok\"");
    }

    #[test]
    fn display() {
        let value = Value::Array(vec![Value::Int(1), Value::Text("a".into())]);
        assert_eq!(value.to_string(), "[1, \"a\"]");
    }
}
