//! Bindable scalar values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar that can be bound to a statement parameter or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as integer, parsing integral text.
    ///
    /// Floats convert only when integral and within `i64` range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Tries to get as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Tries to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values the way a loosely typed record would: numbers and
    /// numeric text compare by value, so `"1"`, `"1.0"` and `1` are all
    /// equal. Other text compares exactly.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(a), Value::Text(b)) if a == b => true,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Numeric reading used by loose comparison. Text only counts when it
    /// parses to a finite number.
    fn as_number(&self) -> Option<f64> {
        self.as_f64().filter(|f| f.is_finite())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// How a parameter is handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Bind as an integer.
    Integer,
    /// Bind as text.
    Text,
}

impl ParamType {
    /// Picks the parameter type for `field` given the integer-typed field set.
    pub fn for_field<S: AsRef<str>>(field: &str, int_fields: &[S]) -> Self {
        if int_fields.iter().any(|f| f.as_ref() == field) {
            ParamType::Integer
        } else {
            ParamType::Text
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Integer => write!(f, "int"),
            ParamType::Text => write!(f, "str"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let int_val = Value::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));
        assert!(int_val.as_str().is_none());

        let str_val = Value::from("17");
        assert_eq!(str_val.as_str(), Some("17"));
        assert_eq!(str_val.as_i64(), Some(17));

        assert_eq!(Value::Float(2.5).as_i64(), None);
        assert_eq!(Value::Float(-2.0).as_i64(), Some(-2));
        assert_eq!(Value::Float(1e20).as_i64(), None);
        assert_eq!(Value::Float(-1e20).as_i64(), None);
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
        assert!(Value::from(None::<i64>).is_null());
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Integer(1).loosely_equals(&Value::from("1")));
        assert!(Value::Float(3.0).loosely_equals(&Value::Integer(3)));
        assert!(!Value::from("a").loosely_equals(&Value::from("b")));
        assert!(!Value::Null.loosely_equals(&Value::from("")));
        assert!(Value::Null.loosely_equals(&Value::Null));
        assert!(Value::from("1").loosely_equals(&Value::from("1.0")));
        assert!(Value::from("100").loosely_equals(&Value::from("1e2")));
        assert!(!Value::from("1").loosely_equals(&Value::from("1.5")));
        assert!(!Value::from("inf").loosely_equals(&Value::from("infinity")));
        assert!(Value::from("nan").loosely_equals(&Value::from("nan")));
    }

    #[test]
    fn test_param_type_for_field() {
        let ints = ["id", "age"];
        assert_eq!(ParamType::for_field("age", &ints), ParamType::Integer);
        assert_eq!(ParamType::for_field("name", &ints), ParamType::Text);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(-4).to_string(), "-4");
        assert_eq!(Value::from("x").to_string(), "x");
    }
}
