//! # crudkit-exec
//!
//! Runs compiled query specs and raw SQL against a database connection.
//!
//! This crate provides:
//!
//! - **Executor**: statement caching, parameter binding, batches and
//!   result shaping
//! - **Drivers**: the `Connection` / `PreparedStatement` traits, an
//!   in-memory recording driver and a SQLite driver
//! - **Transactions**: idempotent begin/commit/rollback with per-transaction
//!   statement counters
//! - **Hooks**: SQL and error observers keyed by trace id
//!
//! ## Example
//!
//! ```rust
//! use crudkit_common::{Dialect, Record, TableSchema, Value};
//! use crudkit_exec::{Executor, MemoryConnection};
//! use crudkit_query::QuerySpec;
//!
//! let conn = MemoryConnection::new();
//! let mut exec = Executor::new(conn.clone(), Dialect::Sqlite);
//!
//! let spec = QuerySpec::new(TableSchema::new("user", "id"))?
//!     .update_object(&Record::new().with("id", 3).with("name", "Grace"))?
//!     .return_affected_count(true);
//!
//! let updated = exec.run_in_transaction(|exec| exec.execute(&spec))?;
//! assert_eq!(updated.affected(), Some(1));
//! assert_eq!(exec.transaction_cud_sql_count(), 1);
//!
//! let executed = conn.executions();
//! assert_eq!(executed[0].sql, "UPDATE user SET name=:name WHERE id=:id");
//! assert_eq!(executed[0].param("id"), Some(&Value::from("3")));
//! # Ok::<(), crudkit_common::CrudError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bind;
pub mod driver;
pub mod executor;
pub mod hooks;
pub mod outcome;
pub mod transaction;

pub use driver::{BoundParam, Connection, MemoryConnection, PreparedStatement, StatementOutput};
#[cfg(feature = "sqlite")]
pub use driver::SqliteConnection;
pub use executor::Executor;
pub use hooks::{ErrorObserver, SqlObserver, TracingObserver};
pub use outcome::Outcome;
pub use transaction::TransactionState;
