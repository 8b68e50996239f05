//! Field-named records used as bind data and by-example templates.
//!
//! A [`Record`] is an ordered list of `(name, Datum)` pairs. Field order is
//! preserved and determines the column order of generated INSERT and UPDATE
//! statements.

use serde_json::Value as JsonValue;

use super::value::Value;
use crate::error::{CrudError, CrudResult};

/// The value of a single record field.
///
/// The variants keep "no data for this field", "a real value" and "project
/// this column" apart at the type level.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// No data: the field is skipped when deriving columns or filters.
    Absent,
    /// A concrete value.
    Value(Value),
    /// By-example SELECT flag: project this column.
    Select,
    /// A shape that cannot be bound (nested array, object, boolean false).
    Unsupported(String),
}

impl Datum {
    /// Returns true if the field carries bindable data (text or a number).
    pub fn is_present(&self) -> bool {
        matches!(self, Datum::Value(v) if !v.is_null())
    }

    /// Returns the value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Datum::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Converts the datum into the value bound for it.
    ///
    /// Absent fields bind NULL; projection flags and unsupported shapes
    /// cannot be bound.
    pub fn to_bind_value(&self, field: &str) -> CrudResult<Value> {
        match self {
            Datum::Absent => Ok(Value::Null),
            Datum::Value(v) => Ok(v.clone()),
            Datum::Select | Datum::Unsupported(_) => Err(CrudError::invalid_spec(format!(
                "Invalid field value for field: {}",
                field
            ))),
        }
    }

    /// Compares two datums loosely; absent and NULL are the same.
    pub fn loosely_equals(&self, other: &Datum) -> bool {
        match (self.bindable(), other.bindable()) {
            (Some(a), Some(b)) => a.loosely_equals(&b),
            _ => self == other,
        }
    }

    fn bindable(&self) -> Option<Value> {
        match self {
            Datum::Absent => Some(Value::Null),
            Datum::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Converts a JSON value into a datum.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Datum::Absent,
            JsonValue::Bool(true) => Datum::Select,
            JsonValue::Bool(false) => Datum::Unsupported("false".to_string()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Datum::Value(Value::Integer(i)),
                None => Datum::Value(Value::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            JsonValue::String(s) => Datum::Value(Value::Text(s.clone())),
            JsonValue::Array(_) => Datum::Unsupported("array".to_string()),
            JsonValue::Object(_) => Datum::Unsupported("object".to_string()),
        }
    }
}

impl<T: Into<Value>> From<T> for Datum {
    fn from(v: T) -> Self {
        match v.into() {
            Value::Null => Datum::Absent,
            other => Datum::Value(other),
        }
    }
}

/// An ordered, field-named record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Datum)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, keeping its original position if it already exists.
    pub fn with(mut self, name: impl Into<String>, datum: impl Into<Datum>) -> Self {
        self.set(name, datum);
        self
    }

    /// Marks a field as a projected column for by-example SELECT.
    pub fn with_select(self, name: impl Into<String>) -> Self {
        self.with(name, Datum::Select)
    }

    /// Sets a field in place.
    pub fn set(&mut self, name: impl Into<String>, datum: impl Into<Datum>) {
        let name = name.into();
        let datum = datum.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = datum,
            None => self.fields.push((name, datum)),
        }
    }

    /// Returns the datum for a field.
    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Returns the concrete value of a field.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Datum::as_value)
    }

    /// Returns true if the record has a field with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a field, returning its datum.
    pub fn remove(&mut self, name: &str) -> Option<Datum> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Returns the field names in order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies every field of `other` that this record does not have yet.
    pub fn merge_missing(&mut self, other: &Record) {
        for (name, datum) in &other.fields {
            if !self.contains(name) {
                self.fields.push((name.clone(), datum.clone()));
            }
        }
    }

    /// Builds a record from a JSON object, keeping key order.
    pub fn from_json(value: &JsonValue) -> CrudResult<Self> {
        let JsonValue::Object(map) = value else {
            return Err(CrudError::invalid_spec("record must be a JSON object"));
        };
        Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), Datum::from_json(v)))
            .collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Datum)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Datum)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, datum) in iter {
            record.set(name, datum);
        }
        record
    }
}
