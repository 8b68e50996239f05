//! Database driver abstraction.
//!
//! The executor talks to the database through two traits: a
//! [`Connection`] that prepares statements and controls transactions, and
//! the [`PreparedStatement`] handles it returns. Handles are reusable and
//! are what the statement cache stores.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crudkit_common::{CrudResult, ParamType, Row, Value};

pub use memory::{ExecutionRecord, MemoryConnection, MemoryStatement, TransactionEvent};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteStatement};

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    /// Placeholder name without the leading colon.
    pub name: String,
    /// The value after type coercion.
    pub value: Value,
    /// How the value is handed to the driver.
    pub param_type: ParamType,
}

impl BoundParam {
    /// Creates a bound parameter.
    pub fn new(name: impl Into<String>, value: Value, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            value,
            param_type,
        }
    }

    /// Returns the placeholder as it appears in SQL text.
    pub fn placeholder(&self) -> String {
        format!(":{}", self.name)
    }
}

/// Everything one execution of a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementOutput {
    /// Result column names. Empty for statements that return no rows.
    pub columns: Arc<[String]>,
    /// Result rows in column order.
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by an INSERT, UPDATE or DELETE.
    pub rows_affected: u64,
}

impl StatementOutput {
    /// An output with no rows.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            columns: Arc::from(Vec::<String>::new()),
            rows: Vec::new(),
            rows_affected,
        }
    }

    /// An output with rows.
    pub fn with_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        Self {
            columns: columns.into(),
            rows,
            rows_affected: 0,
        }
    }

    /// Converts the raw rows into named rows.
    pub fn into_rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect()
    }

    /// Returns the first column of the first row.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }

    /// Returns the first column of every row.
    pub fn first_column(self) -> Vec<Value> {
        self.rows
            .into_iter()
            .filter_map(|r| r.into_iter().next())
            .collect()
    }
}

/// A prepared, reusable statement handle.
pub trait PreparedStatement {
    /// Returns the SQL text the handle was prepared from.
    fn sql(&self) -> &str;

    /// Executes the statement once with the given parameters.
    fn execute(&self, params: &[BoundParam]) -> CrudResult<StatementOutput>;
}

/// A live database connection.
pub trait Connection {
    /// The prepared statement handle type.
    type Statement: PreparedStatement;

    /// Prepares a statement.
    fn prepare(&mut self, sql: &str) -> CrudResult<Self::Statement>;

    /// Starts a transaction.
    fn begin(&mut self) -> CrudResult<()>;

    /// Commits the open transaction.
    fn commit(&mut self) -> CrudResult<()>;

    /// Rolls back the open transaction.
    fn rollback(&mut self) -> CrudResult<()>;

    /// Returns the id generated by the most recent INSERT.
    fn last_insert_id(&self) -> CrudResult<Value>;
}
