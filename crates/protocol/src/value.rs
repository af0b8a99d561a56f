use std::collections::BTreeMap;
use std::fmt;

/// A metadata value restricted to the primitives the store boundary accepts.
///
/// Chunk metadata in the source system is a free-form map mixing primitives
/// with nested structures; this type is the enforcement point that only
/// strings, numbers, and booleans ever reach the vector store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(n) => Some(*n),
            Value::I64(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::F64(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Error returned when a JSON value cannot be represented as a primitive [`Value`].
#[derive(Debug, thiserror::Error)]
#[error("metadata value is not a primitive (string, number, or boolean): {0}")]
pub struct NotPrimitive(pub serde_json::Value);

impl TryFrom<serde_json::Value> for Value {
    type Error = NotPrimitive;

    fn try_from(raw: serde_json::Value) -> Result<Self, Self::Error> {
        match raw {
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::I64(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::F64(f))
                } else {
                    Err(NotPrimitive(serde_json::Value::Number(n)))
                }
            }
            other => Err(NotPrimitive(other)),
        }
    }
}

/// Filters a raw JSON metadata object down to primitive fields only,
/// dropping arrays/objects/null rather than failing.
pub fn project_primitives(raw: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, Value> {
    raw.iter()
        .filter_map(|(k, v)| Value::try_from(v.clone()).ok().map(|v| (k.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_only_primitives() {
        let raw = serde_json::json!({
            "language": "rust",
            "lines": 40,
            "ratio": 1.5,
            "is_test": false,
            "segments": [1, 2, 3],
            "nested": {"a": 1},
            "nothing": null,
        });
        let projected = project_primitives(raw.as_object().unwrap());
        assert_eq!(projected.len(), 4);
        assert_eq!(projected.get("language"), Some(&Value::String("rust".into())));
        assert_eq!(projected.get("lines"), Some(&Value::I64(40)));
        assert!(!projected.contains_key("segments"));
        assert!(!projected.contains_key("nested"));
        assert!(!projected.contains_key("nothing"));
    }

    #[test]
    fn rejects_array_and_object() {
        assert!(Value::try_from(serde_json::json!([1, 2])).is_err());
        assert!(Value::try_from(serde_json::json!({"a": 1})).is_err());
        assert!(Value::try_from(serde_json::Value::Null).is_err());
    }
}
