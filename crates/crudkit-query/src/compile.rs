//! The validation and compilation pipeline.
//!
//! [`QuerySpec::compile`] runs a fixed sequence of stages, each depending on
//! the normalization done by the previous ones:
//!
//! 1. trim free-text fragments; empty text counts as absent
//! 2. normalize the positional bind-field list
//! 3. pack positional scalars into a single record
//! 4. check the batch shape
//! 5. resolve the operation's column list
//! 6. resolve the filter
//! 7. render the LIMIT clause for the dialect
//! 8. render the SQL text and the ordered bind fields
//!
//! Compilation never mutates the spec, and any failure aborts before SQL
//! text is produced.

use crudkit_common::constants::SELECT_ALL;
use crudkit_common::{CrudError, CrudResult, Datum, Dialect, Record};
use tracing::trace;

use crate::fields::{merge_unique, FieldKind};
use crate::filter::{resolve_filter, Filter};
use crate::render::{render, render_limit, RenderParts};
use crate::spec::{BindData, Carrier, Operation, QuerySpec};

/// How the executor shapes the result of a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Nothing is returned.
    Nothing,
    /// The last inserted id.
    InsertId,
    /// The affected row count.
    Affected,
    /// The first row, if any.
    Row,
    /// Every row.
    Rows,
    /// The first column of the first row, if any.
    Scalar,
    /// The first column of every row.
    Column,
}

/// SQL text plus everything the executor needs to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Rendered SQL with `:field` placeholders.
    pub sql: String,
    /// The operation.
    pub operation: Operation,
    /// Placeholder names in bind order.
    pub bind_fields: Vec<String>,
    /// Bind data after positional packing.
    pub bind_data: BindData,
    /// Fields that bind as integers.
    pub int_fields: Vec<String>,
    /// Result shape.
    pub shape: ResultShape,
}

fn trimmed(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Free-text fragments after stage 1.
struct Fragments {
    update_sql: Option<String>,
    order_by: Option<String>,
    group_by: Option<String>,
    lock: Option<String>,
    where_sql: Option<String>,
}

impl QuerySpec {
    /// Validates the spec and renders it for `dialect`.
    pub fn compile(&self, dialect: Dialect) -> CrudResult<CompiledQuery> {
        let operation = self
            .operation
            .ok_or_else(|| CrudError::invalid_spec("no operation selected"))?;

        let text = Fragments {
            update_sql: trimmed(self.update_sql.as_deref()),
            order_by: trimmed(self.order_by.as_deref()),
            group_by: trimmed(self.group_by.as_deref()),
            lock: trimmed(self.lock.as_sql()),
            where_sql: trimmed(self.where_sql.as_deref()),
        };

        let bind_data = self.pack_positional()?;
        bind_data.check_shape()?;

        let cru_fields = self.resolve_cru_fields(operation, text.update_sql.is_some())?;

        let filter = match operation {
            Operation::Insert => Filter::default(),
            _ => resolve_filter(self, operation, text.where_sql, &bind_data)?,
        };

        let limit = match operation {
            Operation::Select => render_limit(self.limit, dialect)?,
            _ => String::new(),
        };

        let rendered = render(&RenderParts {
            operation,
            table: self.table(),
            cru_fields: &cru_fields,
            update_sql: text.update_sql.as_deref(),
            filter: &filter,
            group_by: text.group_by.as_deref(),
            order_by: text.order_by.as_deref(),
            limit: &limit,
            lock: text.lock.as_deref(),
        });

        let shape = match operation {
            Operation::Insert if self.return_insert_id => ResultShape::InsertId,
            Operation::Update | Operation::Delete if self.return_affected_count => {
                ResultShape::Affected
            }
            Operation::Select => match (rendered.single_column, self.multi_row) {
                (true, true) => ResultShape::Column,
                (true, false) => ResultShape::Scalar,
                (false, true) => ResultShape::Rows,
                (false, false) => ResultShape::Row,
            },
            _ => ResultShape::Nothing,
        };

        trace!(sql = %rendered.sql, bind_fields = ?rendered.bind_fields, %dialect, "compiled query");

        Ok(CompiledQuery {
            sql: rendered.sql,
            operation,
            bind_fields: rendered.bind_fields,
            bind_data,
            int_fields: self.schema.int_field_list(),
            shape,
        })
    }

    /// Packs a positional scalar list into one record keyed by field name.
    ///
    /// The names come from the explicit bind-field list when it has two or
    /// more entries, otherwise from a filter with two or more fields when
    /// the data is a list of scalars.
    fn pack_positional(&self) -> CrudResult<BindData> {
        let explicit = self.bind_fields.parse(FieldKind::Column)?;
        let names = if explicit.len() >= 2 {
            let mut seen: Vec<&String> = Vec::with_capacity(explicit.len());
            for name in &explicit {
                if seen.contains(&name) {
                    return Err(CrudError::invalid_spec(format!(
                        "bind field '{}' appears more than once in a positional list",
                        name
                    )));
                }
                seen.push(name);
            }
            explicit
        } else {
            let filter_fields = merge_unique(
                &self.where_fields.normalize(FieldKind::Column)?,
                &self.patch_fields.normalize(FieldKind::Column)?,
            );
            let scalar_list = matches!(
                &self.bind_data,
                BindData::Batch(items) if !items.is_empty() && items.iter().all(|c| !c.is_record())
            );
            if filter_fields.len() < 2 || !scalar_list {
                return Ok(self.bind_data.clone());
            }
            filter_fields
        };

        let BindData::Batch(items) = &self.bind_data else {
            return Err(CrudError::invalid_spec(
                "bind data does not match bind fields: expected a list of values",
            ));
        };
        if items.len() != names.len() {
            return Err(CrudError::invalid_spec(format!(
                "bind data does not match bind fields: {} values for {} fields",
                items.len(),
                names.len()
            )));
        }

        let mut record = Record::new();
        for (name, item) in names.into_iter().zip(items) {
            match item {
                Carrier::Scalar(v) => record.set(name, Datum::Value(v.clone())),
                Carrier::Record(_) => {
                    return Err(CrudError::invalid_spec(
                        "positional bind data must not contain records",
                    ))
                }
            }
        }
        Ok(BindData::One(Carrier::Record(record)))
    }

    fn resolve_cru_fields(&self, operation: Operation, has_update_sql: bool) -> CrudResult<Vec<String>> {
        let kind = match operation {
            Operation::Delete => return Ok(Vec::new()),
            Operation::Select => FieldKind::Projection,
            Operation::Insert | Operation::Update => FieldKind::Column,
        };
        let fields = self.cru_fields.normalize(kind)?;
        if !fields.is_empty() {
            return Ok(fields);
        }
        match operation {
            Operation::Select => Ok(vec![SELECT_ALL.to_string()]),
            Operation::Update if has_update_sql => Ok(fields),
            _ => Err(CrudError::invalid_spec(format!(
                "{} needs at least one field",
                operation
            ))),
        }
    }
}
