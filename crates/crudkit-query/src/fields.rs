//! Field-name lists and the field-name grammar.
//!
//! Field lists can be given as a comma-separated string (`"id,name"`) or as
//! a collection of names. Names are trimmed and checked against the grammar
//! when a query is compiled; duplicates are dropped keeping the first
//! occurrence.

use std::sync::OnceLock;

use crudkit_common::constants::SELECT_ALL;
use crudkit_common::{CrudError, CrudResult};
use regex::Regex;

fn field_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("field name pattern"))
}

fn projection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Allows aggregate and function projections such as `count(id)`.
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_()\s]*$").expect("projection pattern"))
}

/// Which grammar a field list is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Column and bind-field names.
    Column,
    /// SELECT projections: also `*` and function-call shaped tokens.
    Projection,
}

/// Returns true if `name` is a valid column or bind-field name.
pub fn is_valid_field_name(name: &str) -> bool {
    field_name_regex().is_match(name)
}

/// Returns true if `name` is a valid SELECT projection.
pub fn is_valid_projection(name: &str) -> bool {
    name == SELECT_ALL || projection_regex().is_match(name)
}

/// An unvalidated list of field names as supplied to a setter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no names were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|f| f.trim().is_empty())
    }

    /// Returns the raw names.
    pub fn raw(&self) -> &[String] {
        &self.0
    }

    /// Appends the names of another list.
    pub fn extend(&mut self, other: FieldList) {
        self.0.extend(other.0);
    }

    /// Trims and validates every name, keeping duplicates.
    pub fn parse(&self, kind: FieldKind) -> CrudResult<Vec<String>> {
        let mut out = Vec::with_capacity(self.0.len());
        for field in &self.0 {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let valid = match kind {
                FieldKind::Column => is_valid_field_name(field),
                FieldKind::Projection => is_valid_projection(field),
            };
            if !valid {
                return Err(CrudError::invalid_spec(format!(
                    "Invalid SQL field name: {}",
                    field
                )));
            }
            out.push(field.to_string());
        }
        Ok(out)
    }

    /// Trims, validates and de-duplicates the names, preserving order.
    pub fn normalize(&self, kind: FieldKind) -> CrudResult<Vec<String>> {
        Ok(dedupe(self.parse(kind)?))
    }
}

/// Drops repeated names, keeping the first occurrence.
pub fn dedupe(fields: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        if !out.contains(&field) {
            out.push(field);
        }
    }
    out
}

/// Appends `extra` to `base`, skipping names already present.
pub fn merge_unique(base: &[String], extra: &[String]) -> Vec<String> {
    dedupe(base.iter().chain(extra).cloned().collect())
}

/// Conversion into a [`FieldList`].
pub trait IntoFields {
    /// Converts self into a field list.
    fn into_fields(self) -> FieldList;
}

impl IntoFields for FieldList {
    fn into_fields(self) -> FieldList {
        self
    }
}

impl IntoFields for &str {
    fn into_fields(self) -> FieldList {
        if self.trim().is_empty() {
            return FieldList::new();
        }
        FieldList(self.split(',').map(str::to_string).collect())
    }
}

impl IntoFields for String {
    fn into_fields(self) -> FieldList {
        self.as_str().into_fields()
    }
}

impl IntoFields for &String {
    fn into_fields(self) -> FieldList {
        self.as_str().into_fields()
    }
}

impl IntoFields for Vec<String> {
    fn into_fields(self) -> FieldList {
        FieldList(self)
    }
}

impl IntoFields for Vec<&str> {
    fn into_fields(self) -> FieldList {
        FieldList(self.into_iter().map(str::to_string).collect())
    }
}

impl IntoFields for &[&str] {
    fn into_fields(self) -> FieldList {
        FieldList(self.iter().map(|s| s.to_string()).collect())
    }
}

impl IntoFields for &[String] {
    fn into_fields(self) -> FieldList {
        FieldList(self.to_vec())
    }
}

impl<const N: usize> IntoFields for [&str; N] {
    fn into_fields(self) -> FieldList {
        FieldList(self.iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_grammar() {
        assert!(is_valid_field_name("user_id"));
        assert!(is_valid_field_name("A1"));
        assert!(!is_valid_field_name("1abc"));
        assert!(!is_valid_field_name("_id"));
        assert!(!is_valid_field_name("id; DROP TABLE user"));
        assert!(!is_valid_field_name("*"));
    }

    #[test]
    fn test_projection_grammar() {
        assert!(is_valid_projection("*"));
        assert!(is_valid_projection("count(id)"));
        assert!(is_valid_projection("version()"));
        assert!(is_valid_projection("max(age)"));
        assert!(!is_valid_projection("count(*)"));
        assert!(!is_valid_projection("a,b"));
        assert!(!is_valid_projection("(id)"));
    }

    #[test]
    fn test_comma_string() {
        let fields = " id, name ,,email ".into_fields();
        assert_eq!(
            fields.normalize(FieldKind::Column).unwrap(),
            vec!["id", "name", "email"]
        );
        assert!("".into_fields().is_empty());
        assert!(" , ".into_fields().is_empty());
    }

    #[test]
    fn test_dedupe_preserves_order() {
        let fields = vec!["b", "a", "b", "c", "a"].into_fields();
        assert_eq!(fields.normalize(FieldKind::Column).unwrap(), vec!["b", "a", "c"]);
        assert_eq!(fields.parse(FieldKind::Column).unwrap().len(), 5);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = ["id", "na-me"].into_fields().normalize(FieldKind::Column).unwrap_err();
        assert!(err.is_spec_error());
        assert!(err.to_string().contains("na-me"));

        assert!(["count(id)"].into_fields().normalize(FieldKind::Column).is_err());
        assert!(["count(id)"].into_fields().normalize(FieldKind::Projection).is_ok());
    }

    #[test]
    fn test_merge_unique() {
        let base = vec!["a".to_string(), "b".to_string()];
        let extra = vec!["b".to_string(), "c".to_string()];
        assert_eq!(merge_unique(&base, &extra), vec!["a", "b", "c"]);
    }
}
