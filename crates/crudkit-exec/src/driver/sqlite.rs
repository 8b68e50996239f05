//! SQLite driver backed by `rusqlite`.
//!
//! A [`SqliteStatement`] holds the SQL text and a shared handle to the
//! connection. Each execution goes through rusqlite's own prepared
//! statement cache, so a handle can outlive any borrow of the connection
//! while the statement is still compiled only once.

use std::path::Path;
use std::sync::Arc;

use crudkit_common::{CrudError, CrudResult, Value};
use parking_lot::Mutex;
use rusqlite::types::{Null, ValueRef};

use super::{BoundParam, Connection, PreparedStatement, StatementOutput};

/// Statements rusqlite keeps compiled per connection.
const SQLITE_STATEMENT_CACHE_CAPACITY: usize = 256;

/// A SQLite connection.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteConnection {
    /// Opens or creates a database file.
    pub fn open(path: impl AsRef<Path>) -> CrudResult<Self> {
        let conn = rusqlite::Connection::open(path).map_err(CrudError::driver)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> CrudResult<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(CrudError::driver)?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an existing rusqlite connection.
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(SQLITE_STATEMENT_CACHE_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs one or more semicolon-separated statements without parameters,
    /// e.g. schema setup.
    pub fn execute_batch(&self, sql: &str) -> CrudResult<()> {
        self.conn.lock().execute_batch(sql).map_err(CrudError::driver)
    }

    /// Runs a closure against the underlying rusqlite connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> T) -> T {
        f(&self.conn.lock())
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl Connection for SqliteConnection {
    type Statement = SqliteStatement;

    fn prepare(&mut self, sql: &str) -> CrudResult<SqliteStatement> {
        // Compiling here surfaces syntax errors at prepare time.
        self.conn
            .lock()
            .prepare_cached(sql)
            .map_err(CrudError::driver)?;
        Ok(SqliteStatement {
            conn: Arc::clone(&self.conn),
            sql: sql.to_string(),
        })
    }

    fn begin(&mut self) -> CrudResult<()> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> CrudResult<()> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> CrudResult<()> {
        self.execute_batch("ROLLBACK")
    }

    fn last_insert_id(&self) -> CrudResult<Value> {
        Ok(Value::Integer(self.conn.lock().last_insert_rowid()))
    }
}

/// A statement prepared on a [`SqliteConnection`].
pub struct SqliteStatement {
    conn: Arc<Mutex<rusqlite::Connection>>,
    sql: String,
}

impl std::fmt::Debug for SqliteStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.sql)
            .finish()
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl PreparedStatement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(&self, params: &[BoundParam]) -> CrudResult<StatementOutput> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&self.sql).map_err(CrudError::driver)?;

        for param in params {
            let placeholder = param.placeholder();
            let index = stmt
                .parameter_index(&placeholder)
                .map_err(CrudError::driver)?
                .ok_or_else(|| {
                    CrudError::execution(format!(
                        "parameter {} not found in statement",
                        placeholder
                    ))
                })?;
            let bound = match &param.value {
                Value::Null => stmt.raw_bind_parameter(index, Null),
                Value::Integer(i) => stmt.raw_bind_parameter(index, *i),
                Value::Float(f) => stmt.raw_bind_parameter(index, *f),
                Value::Text(s) => stmt.raw_bind_parameter(index, s.as_str()),
            };
            bound.map_err(CrudError::driver)?;
        }

        let column_count = stmt.column_count();
        if column_count == 0 {
            let affected = stmt.raw_execute().map_err(CrudError::driver)?;
            return Ok(StatementOutput::affected(affected as u64));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut output = StatementOutput::with_rows(&columns, Vec::new());
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next().map_err(CrudError::driver)? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(from_sql_value(row.get_ref(idx).map_err(CrudError::driver)?));
            }
            output.rows.push(values);
        }
        Ok(output)
    }
}
