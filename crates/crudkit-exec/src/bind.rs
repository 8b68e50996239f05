//! Parameter binding.
//!
//! Each bind field gets a parameter type from the integer-field set, then
//! its value is pulled from the carrier: by name from a record, or the same
//! bare value for every field when the carrier is a scalar.

use crudkit_common::{CrudError, CrudResult, Datum, ParamType, Value};
use crudkit_query::Carrier;

use crate::driver::BoundParam;

/// Converts a value to the representation its parameter type requires.
///
/// Integer parameters accept integers, integral floats and integer text.
/// Text parameters bind numbers as their decimal text. NULL passes through.
pub fn coerce(field: &str, value: Value, param_type: ParamType) -> CrudResult<Value> {
    match (param_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ParamType::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
        (ParamType::Integer, other) => other.as_i64().map(Value::Integer).ok_or_else(|| {
            CrudError::invalid_spec(format!(
                "value '{}' for integer field '{}' is not an integer",
                other, field
            ))
        }),
        (ParamType::Text, Value::Text(s)) => Ok(Value::Text(s)),
        (ParamType::Text, other) => Ok(Value::Text(other.to_string())),
    }
}

/// Builds the parameters for one execution.
pub fn bind_params<S: AsRef<str>>(
    bind_fields: &[String],
    carrier: &Carrier,
    int_fields: &[S],
) -> CrudResult<Vec<BoundParam>> {
    let mut params = Vec::with_capacity(bind_fields.len());
    for field in bind_fields {
        let raw = match carrier {
            Carrier::Record(record) => record
                .get(field)
                .unwrap_or(&Datum::Absent)
                .to_bind_value(field)?,
            Carrier::Scalar(value) => value.clone(),
        };
        let param_type = ParamType::for_field(field, int_fields);
        let value = coerce(field, raw, param_type)?;
        params.push(BoundParam::new(field.as_str(), value, param_type));
    }
    Ok(params)
}

/// Formats parameters for the SQL log: `name=Ada; age=36; email=NULL`.
pub fn format_params(params: &[BoundParam]) -> String {
    params
        .iter()
        .map(|p| {
            let value = match &p.value {
                Value::Null => "NULL".to_string(),
                Value::Text(s) if s.is_empty() => "''".to_string(),
                other => other.to_string(),
            };
            format!("{}={}", p.name, value)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_common::Record;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce("a", Value::from("42"), ParamType::Integer).unwrap(), Value::Integer(42));
        assert_eq!(coerce("a", Value::Float(3.0), ParamType::Integer).unwrap(), Value::Integer(3));
        assert_eq!(coerce("a", Value::Null, ParamType::Integer).unwrap(), Value::Null);
        assert!(coerce("a", Value::from("4x"), ParamType::Integer).is_err());
        assert!(coerce("a", Value::Float(2.5), ParamType::Integer).is_err());
    }

    #[test]
    fn test_coerce_integer_out_of_range() {
        let err = coerce("age", Value::Float(1e20), ParamType::Integer).unwrap_err();
        assert_eq!(err.code(), crudkit_common::ErrorCode::InvalidSpec);
        assert!(err.to_string().contains("'age'"));

        assert!(coerce("age", Value::Float(-1e20), ParamType::Integer).is_err());
        assert!(coerce("age", Value::Float(f64::INFINITY), ParamType::Integer).is_err());
        assert!(coerce("age", Value::from("99999999999999999999"), ParamType::Integer).is_err());
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce("a", Value::Integer(7), ParamType::Text).unwrap(), Value::from("7"));
        assert_eq!(coerce("a", Value::Float(1.5), ParamType::Text).unwrap(), Value::from("1.5"));
    }

    #[test]
    fn test_bind_from_record() {
        let record = Record::new()
            .with("name", "Ada")
            .with("age", "36")
            .with("email", None::<String>);
        let params = bind_params(&fields(&["name", "age", "email", "city"]), &Carrier::Record(record), &["age"]).unwrap();

        assert_eq!(params[0].value, Value::from("Ada"));
        assert_eq!(params[0].param_type, ParamType::Text);
        assert_eq!(params[1].value, Value::Integer(36));
        assert_eq!(params[1].param_type, ParamType::Integer);
        assert_eq!(params[2].value, Value::Null);
        assert_eq!(params[3].value, Value::Null);
    }

    #[test]
    fn test_bind_scalar_to_every_field() {
        let params =
            bind_params(&fields(&["a", "b"]), &Carrier::Scalar(Value::Integer(5)), &["a"]).unwrap();
        assert_eq!(params[0].value, Value::Integer(5));
        assert_eq!(params[1].value, Value::from("5"));
    }

    #[test]
    fn test_bind_rejects_flags() {
        let record = Record::new().with_select("name");
        let err = bind_params(&fields(&["name"]), &Carrier::Record(record), &[] as &[&str]).unwrap_err();
        assert!(err.to_string().contains("Invalid field value for field: name"));
    }

    #[test]
    fn test_format_params() {
        let params = vec![
            BoundParam::new("name", Value::from(""), ParamType::Text),
            BoundParam::new("age", Value::Integer(3), ParamType::Integer),
            BoundParam::new("email", Value::Null, ParamType::Text),
        ];
        assert_eq!(format_params(&params), "name=''; age=3; email=NULL");
    }
}
