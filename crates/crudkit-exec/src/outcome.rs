//! Shaped execution results.

use crudkit_common::{CrudResult, FromRow, Row, Value};

use crate::driver::StatementOutput;

/// The result of one executed query, shaped by its operation and flags.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing was requested.
    None,
    /// The last inserted id.
    InsertId(Value),
    /// The affected row count.
    Affected(u64),
    /// The first row, if any matched.
    Row(Option<Row>),
    /// Every matching row.
    Rows(Vec<Row>),
    /// The single projected value of the first row, if any matched.
    Scalar(Option<Value>),
    /// The single projected value of every row.
    Column(Vec<Value>),
    /// Unshaped output of a raw statement.
    Raw(StatementOutput),
    /// One outcome per batch element, in input order.
    Batch(Vec<Outcome>),
}

impl Outcome {
    /// Returns true for [`Outcome::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Outcome::None)
    }

    /// Returns the inserted id.
    pub fn insert_id(&self) -> Option<&Value> {
        match self {
            Outcome::InsertId(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the affected row count.
    pub fn affected(&self) -> Option<u64> {
        match self {
            Outcome::Affected(n) => Some(*n),
            Outcome::Raw(out) => Some(out.rows_affected),
            _ => None,
        }
    }

    /// Returns the scalar value.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            Outcome::Scalar(v) => v.as_ref(),
            Outcome::Raw(out) => out.first_value(),
            _ => None,
        }
    }

    /// Returns the rows carried by a row-shaped or raw outcome.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Outcome::Row(row) => row.into_iter().collect(),
            Outcome::Rows(rows) => rows,
            Outcome::Raw(out) => out.into_rows(),
            _ => Vec::new(),
        }
    }

    /// Returns the values of a column-shaped outcome.
    pub fn into_column(self) -> Vec<Value> {
        match self {
            Outcome::Scalar(v) => v.into_iter().collect(),
            Outcome::Column(values) => values,
            Outcome::Raw(out) => out.first_column(),
            _ => Vec::new(),
        }
    }

    /// Returns the elements of a batch outcome, or the outcome itself.
    pub fn into_batch(self) -> Vec<Outcome> {
        match self {
            Outcome::Batch(items) => items,
            other => vec![other],
        }
    }

    /// Maps the first row into a typed value.
    pub fn into_entity<T: FromRow>(self) -> CrudResult<Option<T>> {
        self.into_rows().first().map(T::from_row).transpose()
    }

    /// Maps every row into typed values.
    pub fn into_entities<T: FromRow>(self) -> CrudResult<Vec<T>> {
        self.into_rows().iter().map(T::from_row).collect()
    }
}
