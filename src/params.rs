//! Lenient accessors over a layer's `parameters` map
//!
//! Every accessor returns `Option` so a missing or oddly typed parameter
//! degrades to "unresolved" in the caller instead of an error.

use serde::Serialize;
use serde_json::{Map, Value};

/// Operator parameters of one layer
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Parameters {
    values: Map<String, Value>,
}

impl Parameters {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw JSON value of a parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether the parameter is present at all (even if null)
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Present and not `null`
    pub fn is_set(&self, key: &str) -> bool {
        !matches!(self.values.get(key), None | Some(Value::Null))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(as_int)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Truthiness in the sense the exporters use it: `true`, non-zero
    /// numbers and non-empty strings count as set. Missing is `false`.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
            Some(Value::Null) | None => false,
        }
    }

    /// Integer list, given either as a JSON array or a whitespace separated string
    pub fn int_list(&self, key: &str) -> Option<Vec<i64>> {
        match self.get(key)? {
            Value::Array(items) => items.iter().map(as_int).collect(),
            Value::String(s) => s
                .split_whitespace()
                .map(|item| item.parse::<i64>().ok())
                .collect(),
            _ => None,
        }
    }

    /// List of `[a, b]` pairs such as `padding_value`
    pub fn int_pairs(&self, key: &str) -> Option<Vec<(i64, i64)>> {
        match self.get(key)? {
            Value::Array(items) => items
                .iter()
                .map(|pair| match pair.as_array()?.as_slice() {
                    [a, b, ..] => Some((as_int(a)?, as_int(b)?)),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// Integral JSON number (floats with no fractional part included)
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}
