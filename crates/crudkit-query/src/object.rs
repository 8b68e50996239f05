//! Data-object mode.
//!
//! These constructors derive column lists and filters from a [`Record`]
//! instead of explicit field names:
//!
//! - INSERT and UPDATE take every field that carries a value
//! - SELECT projects fields marked [`Datum::Select`] and filters on every
//!   field that carries a value
//! - DELETE filters on every field that carries a value
//!
//! Absent fields are skipped. A projection flag or unsupported shape where
//! a value is expected is rejected immediately.

use crudkit_common::{CrudError, CrudResult, Datum, Record};

use crate::fields::IntoFields;
use crate::spec::{BindData, Operation, QuerySpec};

/// Returns whether a field carries data, rejecting shapes that cannot be bound.
fn has_data(field: &str, datum: &Datum) -> CrudResult<bool> {
    match datum {
        Datum::Absent => Ok(false),
        Datum::Value(v) => Ok(!v.is_null()),
        Datum::Select | Datum::Unsupported(_) => Err(CrudError::invalid_spec(format!(
            "Invalid field value for field: {}",
            field
        ))),
    }
}

/// Column list for INSERT and UPDATE from a record.
fn write_fields(record: &Record, skip_field: Option<&str>) -> CrudResult<Vec<String>> {
    if record.is_empty() {
        return Err(CrudError::invalid_spec("Empty record for write fields"));
    }
    let mut fields = Vec::new();
    for (name, datum) in record.iter() {
        if !has_data(name, datum)? || skip_field == Some(name) {
            continue;
        }
        fields.push(name.to_string());
    }
    if fields.is_empty() {
        return Err(CrudError::invalid_spec("No data for fields"));
    }
    Ok(fields)
}

/// Projections and filter fields from a by-example record.
fn read_fields(record: &Record, collect_projection: bool) -> CrudResult<(Vec<String>, Vec<String>)> {
    if record.is_empty() {
        return Err(CrudError::invalid_spec("Empty record for read fields"));
    }
    let mut projection = Vec::new();
    let mut filter = Vec::new();
    for (name, datum) in record.iter() {
        if collect_projection && *datum == Datum::Select {
            projection.push(name.to_string());
            continue;
        }
        if has_data(name, datum)? {
            filter.push(name.to_string());
        }
    }
    Ok((projection, filter))
}

/// Fields of `updated` whose value differs from `reference`.
///
/// Only fields present in both records are compared; `skip_field` is never
/// reported.
pub fn changed_fields(updated: &Record, reference: &Record, skip_field: &str) -> Vec<String> {
    updated
        .iter()
        .filter(|(name, _)| *name != skip_field)
        .filter(|(name, datum)| {
            reference
                .get(name)
                .is_some_and(|old| !old.loosely_equals(datum))
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

impl QuerySpec {
    fn read_by_example(
        mut self,
        record: &Record,
        collect_projection: bool,
    ) -> CrudResult<Self> {
        let (projection, filter) = read_fields(record, collect_projection)?;
        if collect_projection {
            self.cru_fields = if projection.is_empty() {
                "*".into_fields()
            } else {
                projection.into_fields()
            };
        }
        self.bind_data = BindData::from(record);
        self.bind_fields = Default::default();
        Ok(self.where_fields(filter))
    }

    fn write_from_record(mut self, record: &Record, skip_pk: bool) -> CrudResult<Self> {
        let skip = skip_pk.then_some(self.schema.primary_key.as_str());
        self.cru_fields = write_fields(record, skip)?.into_fields();
        Ok(self.with_data(record))
    }

    fn write_from_records(self, records: Vec<Record>, skip_pk: bool) -> CrudResult<Self> {
        let first = records
            .first()
            .ok_or_else(|| CrudError::invalid_spec("Invalid record batch for write fields"))?
            .clone();
        Ok(self
            .write_from_record(&first, skip_pk)?
            .with_data(records))
    }

    /// SELECT by example: fields marked [`Datum::Select`] are projected
    /// (`*` when none are), fields with values become equality filters.
    pub fn select_object(mut self, record: &Record) -> CrudResult<Self> {
        self.operation = Some(Operation::Select);
        self.read_by_example(record, true)
    }

    /// SELECT explicit projections, filtering on the record's values.
    pub fn select_object_fields(
        mut self,
        record: &Record,
        fields: impl IntoFields,
    ) -> CrudResult<Self> {
        self.operation = Some(Operation::Select);
        self.cru_fields = fields.into_fields();
        self.read_by_example(record, false)
    }

    /// `SELECT count(<field>)` filtered on the record's values.
    pub fn count_object(mut self, record: &Record, field: &str) -> CrudResult<Self> {
        self.operation = Some(Operation::Select);
        self.set_count_field(field)?;
        self.read_by_example(record, false)
    }

    /// INSERT every field of the record that carries a value, except the
    /// primary key.
    pub fn insert_object(mut self, record: &Record) -> CrudResult<Self> {
        self.operation = Some(Operation::Insert);
        self.write_from_record(record, true)
    }

    /// INSERT every field of the record that carries a value, including a
    /// caller-assigned primary key.
    pub fn insert_object_with_key(mut self, record: &Record) -> CrudResult<Self> {
        self.operation = Some(Operation::Insert);
        self.write_from_record(record, false)
    }

    /// Batch INSERT. Columns are taken from the first record.
    pub fn insert_objects(mut self, records: Vec<Record>) -> CrudResult<Self> {
        self.operation = Some(Operation::Insert);
        self.write_from_records(records, true)
    }

    /// UPDATE every non-key field of the record that carries a value,
    /// filtered by primary key.
    pub fn update_object(mut self, record: &Record) -> CrudResult<Self> {
        self.operation = Some(Operation::Update);
        self.update_sql = None;
        self.write_from_record(record, true)
    }

    /// Batch UPDATE by primary key. Columns are taken from the first record.
    pub fn update_objects(mut self, records: Vec<Record>) -> CrudResult<Self> {
        self.operation = Some(Operation::Update);
        self.update_sql = None;
        self.write_from_records(records, true)
    }

    /// UPDATE only the fields whose values differ from `reference`.
    ///
    /// Returns `Ok(None)` when nothing differs, in which case there is
    /// nothing to execute.
    pub fn update_object_against(
        mut self,
        record: &Record,
        reference: &Record,
    ) -> CrudResult<Option<Self>> {
        self.operation = Some(Operation::Update);
        self.update_sql = None;
        let fields = changed_fields(record, reference, &self.schema.primary_key);
        if fields.is_empty() {
            return Ok(None);
        }
        self.cru_fields = fields.into_fields();
        Ok(Some(self.with_data(record)))
    }

    /// DELETE by example: fields with values become equality filters.
    pub fn delete_object(mut self, record: &Record) -> CrudResult<Self> {
        self.operation = Some(Operation::Delete);
        self.read_by_example(record, false)
    }
}
