//! Result rows.

use std::sync::Arc;

use super::value::Value;
use crate::error::{CrudError, CrudResult};

/// A single result row with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row. Column names are shared between rows of one result.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Gets a value by column index.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Gets a value by column name, failing if the column is missing.
    pub fn require(&self, column: &str) -> CrudResult<&Value> {
        self.get(column).ok_or_else(|| {
            CrudError::execution(format!("column '{}' not present in result row", column))
        })
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Maps a result row into a typed value.
pub trait FromRow: Sized {
    /// Converts a row.
    fn from_row(row: &Row) -> CrudResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> CrudResult<Self> {
        Ok(row.clone())
    }
}
