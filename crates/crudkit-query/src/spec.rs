//! The query specification builder.
//!
//! A [`QuerySpec`] captures one CRUD intent against one table together with
//! its modifiers and bind data. It knows nothing about SQL text; rendering
//! happens in [`QuerySpec::compile`].

use std::fmt;

use crudkit_common::constants::DEFAULT_LOCK_CLAUSE;
use crudkit_common::{CrudError, CrudResult, Entity, Record, TableSchema, Value};

use crate::fields::{is_valid_field_name, FieldList, IntoFields};

// =============================================================================
// Operation
// =============================================================================

/// The CRUD kind of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// INSERT.
    Insert,
    /// SELECT.
    Select,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl Operation {
    /// Returns the SQL keyword.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Select => "SELECT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Bind data
// =============================================================================

/// One unit of bind data.
#[derive(Debug, Clone, PartialEq)]
pub enum Carrier {
    /// Values looked up by field name.
    Record(Record),
    /// A bare value, bound to every bind field.
    Scalar(Value),
}

impl Carrier {
    /// Returns true for field-named carriers.
    pub fn is_record(&self) -> bool {
        matches!(self, Carrier::Record(_))
    }
}

impl From<Record> for Carrier {
    fn from(r: Record) -> Self {
        Carrier::Record(r)
    }
}

impl From<Value> for Carrier {
    fn from(v: Value) -> Self {
        Carrier::Scalar(v)
    }
}

/// Data bound to a statement's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BindData {
    /// No data supplied. Distinct from a single NULL scalar.
    #[default]
    Absent,
    /// A single carrier; the statement runs once.
    One(Carrier),
    /// A batch; the statement runs once per element, in order.
    Batch(Vec<Carrier>),
}

impl BindData {
    /// A single scalar.
    pub fn scalar(value: impl Into<Value>) -> Self {
        BindData::One(Carrier::Scalar(value.into()))
    }

    /// A batch of scalars, also used as a positional list against
    /// multi-field bind lists.
    pub fn scalars<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        BindData::Batch(values.into_iter().map(|v| Carrier::Scalar(v.into())).collect())
    }

    /// A batch of records.
    pub fn records<I: IntoIterator<Item = Record>>(records: I) -> Self {
        BindData::Batch(records.into_iter().map(Carrier::Record).collect())
    }

    /// Returns true if no data was supplied.
    pub fn is_absent(&self) -> bool {
        matches!(self, BindData::Absent)
    }

    /// Returns true for an absent or empty-batch value.
    pub fn is_empty(&self) -> bool {
        match self {
            BindData::Absent => true,
            BindData::One(_) => false,
            BindData::Batch(items) => items.is_empty(),
        }
    }

    /// Returns true for batch data.
    pub fn is_batch(&self) -> bool {
        matches!(self, BindData::Batch(_))
    }

    /// Checks that a batch is all records or all scalars.
    pub fn check_shape(&self) -> CrudResult<()> {
        let BindData::Batch(items) = self else {
            return Ok(());
        };
        let Some(first) = items.first() else {
            return Ok(());
        };
        let want_record = first.is_record();
        if let Some(pos) = items.iter().position(|c| c.is_record() != want_record) {
            return Err(CrudError::invalid_spec(format!(
                "batch mixes records and scalar values (element {})",
                pos
            )));
        }
        Ok(())
    }
}

impl From<Record> for BindData {
    fn from(r: Record) -> Self {
        BindData::One(Carrier::Record(r))
    }
}

impl From<&Record> for BindData {
    fn from(r: &Record) -> Self {
        BindData::One(Carrier::Record(r.clone()))
    }
}

impl From<Vec<Record>> for BindData {
    fn from(records: Vec<Record>) -> Self {
        BindData::records(records)
    }
}

impl From<Value> for BindData {
    fn from(v: Value) -> Self {
        BindData::One(Carrier::Scalar(v))
    }
}

impl From<Vec<Value>> for BindData {
    fn from(values: Vec<Value>) -> Self {
        BindData::scalars(values)
    }
}

impl From<Carrier> for BindData {
    fn from(c: Carrier) -> Self {
        BindData::One(c)
    }
}

// =============================================================================
// Modifiers
// =============================================================================

/// A SELECT row limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Row cap only. Zero renders no clause.
    Rows(i64),
    /// Row cap with offset.
    Page {
        /// Row cap, or the rows skipped under MySQL.
        count: i64,
        /// Rows skipped, or the row cap under MySQL.
        offset: i64,
    },
}

/// A SELECT row-lock clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LockClause {
    /// No lock.
    #[default]
    None,
    /// `FOR UPDATE`.
    ForUpdate,
    /// Caller-supplied clause text, e.g. `FOR SHARE`.
    Custom(String),
}

impl LockClause {
    /// Returns the clause text, if any.
    pub fn as_sql(&self) -> Option<&str> {
        match self {
            LockClause::None => None,
            LockClause::ForUpdate => Some(DEFAULT_LOCK_CLAUSE),
            LockClause::Custom(s) => Some(s.as_str()),
        }
    }
}

impl From<bool> for LockClause {
    fn from(lock: bool) -> Self {
        if lock {
            LockClause::ForUpdate
        } else {
            LockClause::None
        }
    }
}

impl From<&str> for LockClause {
    fn from(clause: &str) -> Self {
        if clause.trim().is_empty() {
            LockClause::None
        } else {
            LockClause::Custom(clause.to_string())
        }
    }
}

impl From<String> for LockClause {
    fn from(clause: String) -> Self {
        LockClause::from(clause.as_str())
    }
}

// =============================================================================
// QuerySpec
// =============================================================================

/// A mutable description of one CRUD query.
///
/// # Example
///
/// ```rust
/// use crudkit_common::{Dialect, TableSchema};
/// use crudkit_query::QuerySpec;
///
/// let spec = QuerySpec::new(TableSchema::new("user", "id"))
///     .unwrap()
///     .select("id,name")
///     .where_clause("age > :age", "age")
///     .order_by("name")
///     .limit_offset(10, 20)
///     .with_data(crudkit_common::Value::from(18))
///     .return_multiple_rows(true);
///
/// let compiled = spec.compile(Dialect::Postgres).unwrap();
/// assert_eq!(
///     compiled.sql,
///     "SELECT id,name FROM user WHERE age > :age ORDER BY name LIMIT 10 OFFSET 20"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub(crate) schema: TableSchema,
    pub(crate) operation: Option<Operation>,
    pub(crate) cru_fields: FieldList,
    pub(crate) update_sql: Option<String>,
    pub(crate) where_sql: Option<String>,
    pub(crate) where_fields: FieldList,
    pub(crate) patch_sql: Vec<String>,
    pub(crate) patch_fields: FieldList,
    pub(crate) no_where: bool,
    pub(crate) order_by: Option<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) limit: Option<Limit>,
    pub(crate) lock: LockClause,
    pub(crate) bind_data: BindData,
    pub(crate) bind_fields: FieldList,
    pub(crate) multi_row: bool,
    pub(crate) return_insert_id: bool,
    pub(crate) return_affected_count: bool,
}

impl QuerySpec {
    /// Creates a spec for a table.
    ///
    /// Fails with a configuration error if the schema has no table name or
    /// no primary key, or if either is not a valid identifier. The table may
    /// be schema-qualified (`public.user`).
    pub fn new(schema: TableSchema) -> CrudResult<Self> {
        schema.validate()?;
        if !schema.table.split('.').all(is_valid_field_name) {
            return Err(CrudError::configuration(format!(
                "invalid table name: {}",
                schema.table
            )));
        }
        if !is_valid_field_name(&schema.primary_key) {
            return Err(CrudError::configuration(format!(
                "invalid primary key field for table '{}': {}",
                schema.table, schema.primary_key
            )));
        }
        Ok(Self {
            schema,
            operation: None,
            cru_fields: FieldList::new(),
            update_sql: None,
            where_sql: None,
            where_fields: FieldList::new(),
            patch_sql: Vec::new(),
            patch_fields: FieldList::new(),
            no_where: false,
            order_by: None,
            group_by: None,
            limit: None,
            lock: LockClause::None,
            bind_data: BindData::Absent,
            bind_fields: FieldList::new(),
            multi_row: false,
            return_insert_id: false,
            return_affected_count: false,
        })
    }

    /// Creates a spec for an entity's table.
    pub fn for_entity<E: Entity>() -> CrudResult<Self> {
        Self::new(E::table_schema())
    }

    /// Clears the operation, every modifier and the data, keeping the table.
    pub fn reset(&mut self) {
        let schema = self.schema.clone();
        *self = Self {
            schema,
            operation: None,
            cru_fields: FieldList::new(),
            update_sql: None,
            where_sql: None,
            where_fields: FieldList::new(),
            patch_sql: Vec::new(),
            patch_fields: FieldList::new(),
            no_where: false,
            order_by: None,
            group_by: None,
            limit: None,
            lock: LockClause::None,
            bind_data: BindData::Absent,
            bind_fields: FieldList::new(),
            multi_row: false,
            return_insert_id: false,
            return_affected_count: false,
        };
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Starts a SELECT of the given projections. Empty selects `*`.
    pub fn select(mut self, fields: impl IntoFields) -> Self {
        self.operation = Some(Operation::Select);
        self.cru_fields = fields.into_fields();
        self
    }

    /// Starts a `SELECT count(<field>)`. An empty field counts the primary key.
    pub fn count(mut self, field: &str) -> CrudResult<Self> {
        self.operation = Some(Operation::Select);
        self.set_count_field(field)?;
        Ok(self)
    }

    /// Starts an INSERT of the given columns.
    pub fn insert(mut self, fields: impl IntoFields) -> Self {
        self.operation = Some(Operation::Insert);
        self.cru_fields = fields.into_fields();
        self
    }

    /// Starts an UPDATE of the given columns, optionally with an explicit
    /// SET clause that replaces the generated `field=:field` pairs.
    pub fn update(mut self, fields: impl IntoFields, set_sql: Option<&str>) -> Self {
        self.operation = Some(Operation::Update);
        self.cru_fields = fields.into_fields();
        self.update_sql = set_sql.map(str::to_string);
        self
    }

    /// Starts a DELETE.
    pub fn delete(mut self) -> Self {
        self.operation = Some(Operation::Delete);
        self
    }

    // -------------------------------------------------------------------------
    // Filter
    // -------------------------------------------------------------------------

    /// Sets the filter text and the fields it binds.
    pub fn where_clause(mut self, sql: &str, fields: impl IntoFields) -> Self {
        self.where_sql = Some(sql.to_string());
        self.where_fields = fields.into_fields();
        self.no_where = false;
        self
    }

    /// Sets the filter text, keeping any previously set filter fields.
    pub fn where_sql(mut self, sql: &str) -> Self {
        self.where_sql = Some(sql.to_string());
        self.no_where = false;
        self
    }

    /// Filters on equality of each field: `a=:a AND b=:b`.
    pub fn where_fields(mut self, fields: impl IntoFields) -> Self {
        self.where_sql = None;
        self.where_fields = fields.into_fields();
        self.no_where = false;
        self
    }

    /// Appends filter text and fields after the main filter.
    ///
    /// Patch text is joined to the main text with a single space, so it
    /// usually starts with `AND`.
    pub fn append_where(mut self, sql: &str, fields: impl IntoFields) -> Self {
        if !sql.trim().is_empty() {
            self.patch_sql.push(sql.to_string());
        }
        self.patch_fields.extend(fields.into_fields());
        self
    }

    /// Opts out of any filter. Enabling it clears all filter state.
    pub fn no_where(mut self, yes: bool) -> Self {
        self.no_where = yes;
        if yes {
            self.where_sql = None;
            self.where_fields = FieldList::new();
            self.patch_sql.clear();
            self.patch_fields = FieldList::new();
        }
        self
    }

    // -------------------------------------------------------------------------
    // Modifiers
    // -------------------------------------------------------------------------

    /// Replaces the generated SET clause of an UPDATE.
    pub fn set_update_sql(mut self, sql: &str) -> Self {
        self.update_sql = Some(sql.to_string());
        self
    }

    /// Sets the ORDER BY text.
    pub fn order_by(mut self, sql: &str) -> Self {
        self.order_by = Some(sql.to_string());
        self
    }

    /// Sets the GROUP BY text.
    pub fn group_by(mut self, sql: &str) -> Self {
        self.group_by = Some(sql.to_string());
        self
    }

    /// Caps the number of rows.
    pub fn limit(mut self, count: i64) -> Self {
        self.limit = Some(Limit::Rows(count));
        self
    }

    /// Caps the number of rows with a second paging number.
    ///
    /// Renders `LIMIT count OFFSET offset` for Postgres and SQLite. MySQL
    /// renders `LIMIT count,offset`, where MySQL reads the first number as
    /// the rows to skip and the second as the row cap.
    pub fn limit_offset(mut self, count: i64, offset: i64) -> Self {
        self.limit = Some(Limit::Page { count, offset });
        self
    }

    /// Sets the row-lock clause: `true` for `FOR UPDATE`, `false` or an empty
    /// string for none, any other string verbatim.
    pub fn for_lock(mut self, lock: impl Into<LockClause>) -> Self {
        self.lock = lock.into();
        self
    }

    /// Returns all matching rows instead of the first.
    pub fn return_multiple_rows(mut self, yes: bool) -> Self {
        self.multi_row = yes;
        self
    }

    /// Returns the last inserted id from an INSERT.
    pub fn return_insert_id(mut self, yes: bool) -> Self {
        self.return_insert_id = yes;
        self
    }

    /// Returns the affected row count from an UPDATE or DELETE.
    pub fn return_affected_count(mut self, yes: bool) -> Self {
        self.return_affected_count = yes;
        self
    }

    /// Sets the bind data.
    pub fn with_data(mut self, data: impl Into<BindData>) -> Self {
        self.bind_data = data.into();
        self.bind_fields = FieldList::new();
        self
    }

    /// Sets the bind data together with the field names it binds
    /// positionally.
    ///
    /// With two or more fields the data must be a batch of scalars of the
    /// same length; it is packed into a single record at compile time.
    pub fn with_positional_data(
        mut self,
        data: impl Into<BindData>,
        fields: impl IntoFields,
    ) -> Self {
        self.bind_data = data.into();
        self.bind_fields = fields.into_fields();
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the table schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.schema.table
    }

    /// Returns the primary-key field.
    pub fn primary_key(&self) -> &str {
        &self.schema.primary_key
    }

    /// Returns the operation, if one was chosen.
    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    /// Returns the bind data.
    pub fn bind_data(&self) -> &BindData {
        &self.bind_data
    }

    /// Returns the operation fields as supplied.
    pub fn cru_fields(&self) -> &[String] {
        self.cru_fields.raw()
    }

    /// Returns the main filter fields as supplied.
    pub fn filter_fields(&self) -> &[String] {
        self.where_fields.raw()
    }

    /// Returns true if the spec opts out of filtering.
    pub fn is_no_where(&self) -> bool {
        self.no_where
    }

    /// Returns the limit.
    pub fn limit_value(&self) -> Option<Limit> {
        self.limit
    }

    /// Returns the lock clause.
    pub fn lock(&self) -> &LockClause {
        &self.lock
    }

    pub(crate) fn set_count_field(&mut self, field: &str) -> CrudResult<()> {
        let field = field.trim();
        let field = if field.is_empty() {
            self.schema.primary_key.as_str()
        } else {
            field
        };
        if !is_valid_field_name(field) {
            return Err(CrudError::invalid_spec(format!(
                "Invalid count field: {}",
                field
            )));
        }
        self.cru_fields = vec![format!("count({})", field)].into_fields();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_common::ErrorCode;

    fn user_spec() -> QuerySpec {
        QuerySpec::new(TableSchema::new("user", "id")).unwrap()
    }

    #[test]
    fn test_new_requires_primary_key() {
        let err = QuerySpec::new(TableSchema::new("user", "")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }

    #[test]
    fn test_new_rejects_bad_identifiers() {
        let err = QuerySpec::new(TableSchema::new("user", "id OR 1=1 --")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);

        let err = QuerySpec::new(TableSchema::new("user; DROP TABLE x", "id")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);

        assert!(QuerySpec::new(TableSchema::new("public..user", "id")).is_err());
        assert!(QuerySpec::new(TableSchema::new("public.user", "user_id")).is_ok());
    }

    #[test]
    fn test_no_where_clears_filter() {
        let spec = user_spec()
            .delete()
            .where_clause("age > :age", "age")
            .append_where("AND active=1", "")
            .no_where(true);

        assert!(spec.is_no_where());
        assert!(spec.filter_fields().is_empty());
        assert!(spec.where_sql.is_none());
        assert!(spec.patch_sql.is_empty());
    }

    #[test]
    fn test_explicit_filter_clears_no_where() {
        let spec = user_spec().delete().no_where(true).where_clause("id=:id", "id");
        assert!(!spec.is_no_where());
    }

    #[test]
    fn test_for_lock_variants() {
        assert_eq!(user_spec().for_lock(true).lock(), &LockClause::ForUpdate);
        assert_eq!(user_spec().for_lock(false).lock(), &LockClause::None);
        assert_eq!(user_spec().for_lock("").lock(), &LockClause::None);
        assert_eq!(
            user_spec().for_lock("FOR SHARE").lock(),
            &LockClause::Custom("FOR SHARE".into())
        );
        assert_eq!(LockClause::ForUpdate.as_sql(), Some("FOR UPDATE"));
    }

    #[test]
    fn test_count_field() {
        let spec = user_spec().count("").unwrap();
        assert_eq!(spec.cru_fields(), &["count(id)".to_string()]);

        let spec = user_spec().count(" age ").unwrap();
        assert_eq!(spec.cru_fields(), &["count(age)".to_string()]);

        assert!(user_spec().count("age)").is_err());
    }

    #[test]
    fn test_reset_keeps_table() {
        let mut spec = user_spec()
            .select("id")
            .limit(3)
            .with_data(Value::from(1))
            .return_multiple_rows(true);
        spec.reset();

        assert_eq!(spec, user_spec());
        assert_eq!(spec.table(), "user");
    }

    #[test]
    fn test_bind_data_shapes() {
        assert!(BindData::Absent.is_empty());
        assert!(BindData::Batch(vec![]).is_empty());
        assert!(!BindData::scalar(Value::Null).is_absent());
        assert!(BindData::scalars([1, 2]).is_batch());
        assert!(Carrier::from(Record::new()).is_record());
    }
}
