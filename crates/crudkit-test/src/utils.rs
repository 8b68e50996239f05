use std::sync::{Arc, Once};

use crudkit_common::{
    CrudError, CrudResult, Dialect, Entity, FromRow, Record, Row, TableSchema, Value,
};
use crudkit_exec::{Executor, SqliteConnection};
use parking_lot::Mutex;

/// DDL for the `user` table used by the SQLite tests.
pub const USER_TABLE_DDL: &str = "CREATE TABLE user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    age INTEGER
)";

/// Installs a `tracing` subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The `user` table descriptor.
pub fn user_schema() -> TableSchema {
    TableSchema::new("user", "id").with_int_fields(["id", "age"])
}

/// A row of the `user` table.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Primary key; `None` before the row is inserted.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Optional e-mail address.
    pub email: Option<String>,
    /// Age in years.
    pub age: Option<i64>,
}

impl User {
    /// A new, not yet inserted user.
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: None,
            age: Some(age),
        }
    }
}

impl Entity for User {
    fn table_schema() -> TableSchema {
        user_schema()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("email", self.email.clone())
            .with("age", self.age)
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> CrudResult<Self> {
        let text = |column: &str| -> CrudResult<Option<String>> {
            match row.require(column)? {
                Value::Null => Ok(None),
                Value::Text(s) => Ok(Some(s.clone())),
                other => Err(CrudError::execution(format!(
                    "column '{}' holds {}, expected text",
                    column, other
                ))),
            }
        };
        Ok(Self {
            id: row.require("id")?.as_i64(),
            name: text("name")?.unwrap_or_default(),
            email: text("email")?,
            age: row.require("age")?.as_i64(),
        })
    }
}

/// Opens an in-memory SQLite database with the `user` table.
pub fn sqlite_executor() -> anyhow::Result<Executor<SqliteConnection>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(USER_TABLE_DDL)?;
    Ok(Executor::new(conn, Dialect::Sqlite))
}

/// Messages seen by a SQL observer, with their trace ids.
pub type SqlLog = Arc<Mutex<Vec<(String, String)>>>;

/// Installs a SQL observer on `exec` that records into the returned log.
pub fn record_sql<C: crudkit_exec::Connection>(exec: &mut Executor<C>) -> SqlLog {
    let log: SqlLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    exec.set_sql_observer(move |message: &str, trace_id: &str| {
        sink.lock().push((message.to_string(), trace_id.to_string()));
    });
    log
}

/// Installs an error observer on `exec` that records error codes and
/// trace ids into the returned log.
pub fn record_errors<C: crudkit_exec::Connection>(
    exec: &mut Executor<C>,
) -> Arc<Mutex<Vec<(crudkit_common::ErrorCode, String)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    exec.set_error_observer(move |error: &CrudError, trace_id: &str| {
        sink.lock().push((error.code(), trace_id.to_string()));
    });
    log
}
