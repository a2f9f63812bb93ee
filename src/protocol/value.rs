//! Argument and result values.
//!
//! The wire format is JSON, which has no representation for infinities.
//! [`Value`] can hold them; conversion to and from the wire substitutes
//! `±f64::MAX` for `±∞` anywhere in the tree.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

// ============================================================================
// Value
// ============================================================================

/// A JSON-representable value that may also hold `±∞`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `null`.
    #[default]
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integral number, kept exact.
    Integer(i64),
    /// Floating point number, possibly infinite.
    Float(f64),
    /// String.
    String(String),
    /// Ordered list.
    Array(Vec<Value>),
    /// Key/value map.
    Object(BTreeMap<String, Value>),
}

// ============================================================================
// Wire Conversion
// ============================================================================

impl Value {
    /// Converts to a JSON tree, escaping infinities.
    ///
    /// `NaN` has no JSON form and becomes `null`.
    #[must_use]
    pub fn to_wire(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::Number(Number::from(*i)),
            Self::Float(f) => escape_float(*f),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(items) => JsonValue::Array(items.iter().map(Self::to_wire).collect()),
            Self::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_wire()))
                    .collect(),
            ),
        }
    }

    /// Converts from a JSON tree, restoring infinities.
    #[must_use]
    pub fn from_wire(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(unescape_float(n.as_f64().unwrap_or(f64::NAN))),
            },
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from_wire).collect()),
            JsonValue::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from_wire(value)))
                    .collect(),
            ),
        }
    }
}

fn escape_float(f: f64) -> JsonValue {
    let finite = if f == f64::INFINITY {
        f64::MAX
    } else if f == f64::NEG_INFINITY {
        -f64::MAX
    } else {
        f
    };

    Number::from_f64(finite)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn unescape_float(f: f64) -> f64 {
    if f == f64::MAX {
        f64::INFINITY
    } else if f == -f64::MAX {
        f64::NEG_INFINITY
    } else {
        f
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Self::from_wire)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Value {
    /// Returns `true` for `null`.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns any number as `f64`.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items, if this is an array.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map, if this is an object.
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            other => write!(f, "{}", other.to_wire()),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Object(map)
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Self::from_wire(json)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infinity_escapes_to_max() {
        assert_eq!(Value::Float(f64::INFINITY).to_wire(), json!(f64::MAX));
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_wire(), json!(-f64::MAX));
    }

    #[test]
    fn test_max_unescapes_to_infinity() {
        assert_eq!(Value::from_wire(json!(f64::MAX)), Value::Float(f64::INFINITY));
        assert_eq!(
            Value::from_wire(json!(-f64::MAX)),
            Value::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_nested_infinities() {
        let mut map = BTreeMap::new();
        map.insert("max".to_string(), Value::Float(f64::INFINITY));
        let value = Value::Array(vec![Value::Object(map), Value::Float(f64::NEG_INFINITY)]);

        let wire = value.to_wire();
        assert_eq!(wire, json!([{"max": f64::MAX}, -f64::MAX]));
        assert_eq!(Value::from_wire(wire), value);
    }

    #[test]
    fn test_finite_numbers_pass_through() {
        assert_eq!(Value::from_wire(Value::Float(42.5).to_wire()), Value::Float(42.5));
        assert_eq!(Value::from_wire(json!(-3.5)), Value::Float(-3.5));
        assert_eq!(Value::from_wire(json!(7)), Value::Integer(7));
    }

    #[test]
    fn test_nan_becomes_null() {
        assert_eq!(Value::Float(f64::NAN).to_wire(), JsonValue::Null);
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Value::Array(vec![Value::from("a"), Value::Float(f64::INFINITY)]);
        let text = serde_json::to_string(&value).expect("serialize");
        let back: Value = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, value);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Float(0.5).as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert_eq!(Value::from(vec![1_i64, 2]).as_array().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::from(Some(1_i64)).to_string(), "1");
        assert_eq!(Value::from(None::<i64>).to_string(), "null");
    }
}
