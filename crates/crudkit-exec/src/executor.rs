//! The statement executor.
//!
//! An [`Executor`] owns one connection, its statement cache and its
//! transaction state. Every statement goes through the same steps: compile
//! (or take raw SQL), fetch or prepare the handle, bind each carrier, run,
//! shape the result.

use std::sync::Arc;

use crudkit_cache::{CacheStats, StatementCache};
use crudkit_common::constants::{
    CACHED_TAG, MANUAL_TAG, TRANSACTION_BEGIN_MARKER, TRANSACTION_END_MARKER,
};
use crudkit_common::{CrudError, CrudResult, Dialect, ExecutorConfig, Value};
use crudkit_query::fields::{is_valid_field_name, FieldKind};
use crudkit_query::{BindData, Carrier, CompiledQuery, IntoFields, QuerySpec, ResultShape};
use tracing::{debug, info, trace, warn};

use crate::bind::{bind_params, format_params};
use crate::driver::{BoundParam, Connection, PreparedStatement, StatementOutput};
use crate::hooks::{generate_trace_id, ErrorObserver, SqlObserver};
use crate::outcome::Outcome;
use crate::transaction::TransactionState;

/// How the output of one execution is returned.
#[derive(Debug, Clone, Copy)]
enum Shaping {
    Shaped(ResultShape),
    Raw,
}

/// Runs query specs and raw SQL against one connection.
///
/// # Example
///
/// ```rust
/// use crudkit_common::{Dialect, Record, TableSchema};
/// use crudkit_exec::{Executor, MemoryConnection};
/// use crudkit_query::QuerySpec;
///
/// let conn = MemoryConnection::new();
/// let mut exec = Executor::new(conn.clone(), Dialect::MySql);
///
/// let spec = QuerySpec::new(TableSchema::new("user", "id"))?
///     .insert_object(&Record::new().with("name", "Ada"))?
///     .return_insert_id(true);
/// let id = exec.execute(&spec)?;
///
/// assert_eq!(id.insert_id(), Some(&crudkit_common::Value::Integer(1)));
/// assert_eq!(conn.prepared_sql(), vec!["INSERT INTO user (name) VALUES (:name)"]);
/// # Ok::<(), crudkit_common::CrudError>(())
/// ```
pub struct Executor<C: Connection> {
    conn: C,
    config: ExecutorConfig,
    cache: Option<StatementCache<C::Statement>>,
    transaction: TransactionState,
    last_sql: String,
    trace_id: String,
    sql_observer: Option<Arc<dyn SqlObserver>>,
    error_observer: Option<Arc<dyn ErrorObserver>>,
}

impl<C: Connection> Executor<C> {
    /// Creates an executor with default settings for `dialect`.
    pub fn new(conn: C, dialect: Dialect) -> Self {
        Self::build(conn, ExecutorConfig::for_dialect(dialect))
    }

    /// Creates an executor from a configuration.
    pub fn with_config(conn: C, config: &ExecutorConfig) -> CrudResult<Self> {
        config.validate()?;
        Ok(Self::build(conn, config.clone()))
    }

    fn build(conn: C, config: ExecutorConfig) -> Self {
        let cache = config.cache_statements.then(StatementCache::new);
        Self {
            conn,
            config,
            cache,
            transaction: TransactionState::new(),
            last_sql: String::new(),
            trace_id: String::new(),
            sql_observer: None,
            error_observer: None,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Installs the SQL observer.
    pub fn set_sql_observer(&mut self, observer: impl SqlObserver + 'static) {
        self.sql_observer = Some(Arc::new(observer));
    }

    /// Installs the error observer.
    pub fn set_error_observer(&mut self, observer: impl ErrorObserver + 'static) {
        self.error_observer = Some(Arc::new(observer));
    }

    /// Removes both observers.
    pub fn clear_observers(&mut self) {
        self.sql_observer = None;
        self.error_observer = None;
    }

    /// Enables or disables statement caching.
    ///
    /// Either way the current cache is dropped and, when enabled, replaced
    /// by an empty one.
    pub fn set_statement_caching(&mut self, enabled: bool) {
        self.config.cache_statements = enabled;
        self.cache = enabled.then(StatementCache::new);
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the dialect.
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Returns the connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Returns the connection mutably.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Consumes the executor, returning the connection.
    pub fn into_connection(self) -> C {
        self.conn
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns the most recently prepared SQL text.
    pub fn last_sql(&self) -> &str {
        &self.last_sql
    }

    /// Returns the trace id of the most recent statement.
    pub fn last_trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Returns statement cache statistics, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(StatementCache::stats)
    }

    /// Returns the number of cached statements.
    pub fn cached_statement_count(&self) -> usize {
        self.cache.as_ref().map_or(0, StatementCache::len)
    }

    /// Returns true while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_active()
    }

    /// Statements prepared in the latest transaction.
    pub fn transaction_sql_count(&self) -> u64 {
        self.transaction.sql_count()
    }

    /// INSERT, UPDATE and DELETE statements prepared in the latest transaction.
    pub fn transaction_cud_sql_count(&self) -> u64 {
        self.transaction.cud_sql_count()
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Compiles and runs a query spec, shaping the result by its operation
    /// and flags.
    pub fn execute(&mut self, spec: &QuerySpec) -> CrudResult<Outcome> {
        self.observed(|exec| {
            let compiled = spec.compile(exec.config.dialect)?;
            exec.run_query(&compiled)
        })
    }

    /// Runs an already compiled query.
    pub fn run_compiled(&mut self, query: &CompiledQuery) -> CrudResult<Outcome> {
        self.observed(|exec| exec.run_query(query))
    }

    /// Runs hand-written SQL.
    ///
    /// The SQL is trimmed. `bind_fields` name the `:field` placeholders to
    /// bind from `data`; `int_fields` lists those that bind as integers.
    /// The result is the unshaped statement output.
    pub fn execute_raw(
        &mut self,
        sql: &str,
        data: impl Into<BindData>,
        bind_fields: impl IntoFields,
        int_fields: impl IntoFields,
    ) -> CrudResult<Outcome> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(CrudError::invalid_spec("SQL string is empty"));
        }
        let data = data.into();
        let bind_fields = bind_fields.into_fields();
        let int_fields = int_fields.into_fields();

        self.observed(|exec| {
            data.check_shape()?;
            let bind_fields = bind_fields.normalize(FieldKind::Column)?;
            let int_fields = int_fields.normalize(FieldKind::Column)?;
            exec.query_database(sql, &data, &bind_fields, &int_fields, Shaping::Raw, true)
        })
    }

    /// Fetches the next value of a PostgreSQL sequence.
    pub fn next_sequence_value(&mut self, sequence: &str) -> CrudResult<i64> {
        self.observed(|exec| {
            if !exec.config.dialect.supports_sequences() {
                return Err(CrudError::configuration(format!(
                    "dialect '{}' has no sequences",
                    exec.config.dialect
                )));
            }
            if !sequence.split('.').all(is_valid_field_name) {
                return Err(CrudError::invalid_spec(format!(
                    "Invalid sequence name: {}",
                    sequence
                )));
            }

            let sql = format!("SELECT nextval('{}')", sequence);
            let stmt = exec.prepare_statement(&sql, true)?;
            let output = exec.run_statement(stmt.as_ref(), &[])?;
            match output.first_value().and_then(Value::as_i64) {
                Some(id) if id != 0 => Ok(id),
                _ => Err(CrudError::SequenceExhausted {
                    sequence: sequence.to_string(),
                }),
            }
        })
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Starts a transaction.
    ///
    /// Returns `Ok(false)` without doing anything if one is already open.
    pub fn begin(&mut self) -> CrudResult<bool> {
        self.observed(|exec| {
            if exec.transaction.is_active() {
                return Ok(false);
            }
            exec.notify_sql("beginTransaction", TRANSACTION_BEGIN_MARKER);
            exec.conn.begin()?;
            exec.transaction.begin();
            info!("transaction started");
            Ok(true)
        })
    }

    /// Commits the open transaction.
    ///
    /// Returns `Ok(false)` without doing anything if none is open.
    pub fn commit(&mut self) -> CrudResult<bool> {
        self.observed(|exec| {
            if !exec.transaction.is_active() {
                return Ok(false);
            }
            exec.notify_sql("commit", TRANSACTION_END_MARKER);
            exec.conn.commit()?;
            exec.transaction.end();
            info!(
                statements = exec.transaction.sql_count(),
                writes = exec.transaction.cud_sql_count(),
                "transaction committed"
            );
            Ok(true)
        })
    }

    /// Rolls back the open transaction.
    ///
    /// Returns `Ok(false)` without doing anything if none is open.
    pub fn rollback(&mut self) -> CrudResult<bool> {
        self.observed(|exec| {
            if !exec.transaction.is_active() {
                return Ok(false);
            }
            exec.notify_sql("rollback", TRANSACTION_END_MARKER);
            exec.conn.rollback()?;
            exec.transaction.end();
            info!(
                statements = exec.transaction.sql_count(),
                "transaction rolled back"
            );
            Ok(true)
        })
    }

    /// Runs a closure within a transaction.
    ///
    /// Commits if the closure returns `Ok`, rolls back if it returns `Err`
    /// or if the commit itself fails. Inside an already open transaction the
    /// closure joins it and neither commits nor rolls back.
    pub fn run_in_transaction<T, F>(&mut self, f: F) -> CrudResult<T>
    where
        F: FnOnce(&mut Self) -> CrudResult<T>,
    {
        let started = self.begin()?;
        let result = f(self);
        if !started {
            return result;
        }

        let err = match result {
            Ok(value) => match self.commit() {
                Ok(_) => return Ok(value),
                Err(e) => e,
            },
            Err(e) => e,
        };
        if let Err(rollback_err) = self.rollback() {
            warn!(error = %rollback_err, cause = %err, "rollback failed after transaction error");
        }
        Err(err)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Runs `f`, reporting any error to the error observer before returning it.
    fn observed<T>(&mut self, f: impl FnOnce(&mut Self) -> CrudResult<T>) -> CrudResult<T> {
        let result = f(self);
        if let Err(e) = &result {
            warn!(trace_id = %self.trace_id, code = %e.code(), error = %e, "statement failed");
            if let Some(observer) = &self.error_observer {
                observer.observe_error(e, &self.trace_id);
            }
        }
        result
    }

    fn notify_sql(&self, message: &str, trace_id: &str) {
        if let Some(observer) = &self.sql_observer {
            observer.observe_sql(message, trace_id);
        }
    }

    fn run_query(&mut self, query: &CompiledQuery) -> CrudResult<Outcome> {
        self.query_database(
            &query.sql,
            &query.bind_data,
            &query.bind_fields,
            &query.int_fields,
            Shaping::Shaped(query.shape),
            false,
        )
    }

    fn query_database(
        &mut self,
        sql: &str,
        data: &BindData,
        bind_fields: &[String],
        int_fields: &[String],
        shaping: Shaping,
        manual: bool,
    ) -> CrudResult<Outcome> {
        if !bind_fields.is_empty() && data.is_empty() {
            return Err(CrudError::invalid_spec("SQL fields and data do not match"));
        }

        let stmt = self.prepare_statement(sql, manual)?;
        match data {
            BindData::Batch(items) => {
                let mut outcomes = Vec::with_capacity(items.len());
                for carrier in items {
                    outcomes.push(self.execute_one(
                        stmt.as_ref(),
                        Some(carrier),
                        bind_fields,
                        int_fields,
                        shaping,
                    )?);
                }
                Ok(Outcome::Batch(outcomes))
            }
            BindData::One(carrier) => {
                self.execute_one(stmt.as_ref(), Some(carrier), bind_fields, int_fields, shaping)
            }
            BindData::Absent => {
                self.execute_one(stmt.as_ref(), None, bind_fields, int_fields, shaping)
            }
        }
    }

    /// Fetches the cached handle for `sql` or prepares a new one, logging
    /// the SQL before preparing so a failing prepare can be traced.
    fn prepare_statement(&mut self, sql: &str, manual: bool) -> CrudResult<Arc<C::Statement>> {
        self.last_sql = sql.to_string();
        self.trace_id = generate_trace_id(self.config.trace_id_length);

        let prepared = match &self.cache {
            Some(cache) => {
                let conn = &mut self.conn;
                cache.get_or_prepare(sql, || conn.prepare(sql))
            }
            None => self.conn.prepare(sql).map(|stmt| (Arc::new(stmt), false)),
        };
        let cached = matches!(prepared, Ok((_, true)));

        let mut log_line = sql.to_string();
        if manual {
            log_line.push_str(MANUAL_TAG);
        }
        if cached {
            log_line.push_str(CACHED_TAG);
        }
        debug!(trace_id = %self.trace_id, cached, manual, "{}", sql);
        self.notify_sql(&log_line, &self.trace_id);

        let (stmt, _) = prepared?;

        self.transaction.record_statement(sql);
        Ok(stmt)
    }

    fn execute_one(
        &self,
        stmt: &C::Statement,
        carrier: Option<&Carrier>,
        bind_fields: &[String],
        int_fields: &[String],
        shaping: Shaping,
    ) -> CrudResult<Outcome> {
        let params = match carrier {
            Some(carrier) if !bind_fields.is_empty() => {
                bind_params(bind_fields, carrier, int_fields)?
            }
            _ => Vec::new(),
        };

        if !params.is_empty() {
            let dump = format_params(&params);
            trace!(trace_id = %self.trace_id, params = %dump, "bound parameters");
            if self.config.log_parameters {
                self.notify_sql(&dump, &self.trace_id);
            }
        }

        let output = self.run_statement(stmt, &params)?;
        match shaping {
            Shaping::Raw => Ok(Outcome::Raw(output)),
            Shaping::Shaped(shape) => self.shape(shape, output),
        }
    }

    fn run_statement(
        &self,
        stmt: &C::Statement,
        params: &[BoundParam],
    ) -> CrudResult<StatementOutput> {
        stmt.execute(params).map_err(|e| {
            self.notify_sql(&e.to_string(), &self.trace_id);
            e
        })
    }

    fn shape(&self, shape: ResultShape, output: StatementOutput) -> CrudResult<Outcome> {
        Ok(match shape {
            ResultShape::Nothing => Outcome::None,
            ResultShape::InsertId => Outcome::InsertId(self.conn.last_insert_id()?),
            ResultShape::Affected => Outcome::Affected(output.rows_affected),
            ResultShape::Row => Outcome::Row(output.into_rows().into_iter().next()),
            ResultShape::Rows => Outcome::Rows(output.into_rows()),
            ResultShape::Scalar => Outcome::Scalar(output.first_value().cloned()),
            ResultShape::Column => Outcome::Column(output.first_column()),
        })
    }
}

impl<C: Connection> std::fmt::Debug for Executor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("cached_statements", &self.cached_statement_count())
            .field("transaction", &self.transaction)
            .field("last_sql", &self.last_sql)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MemoryConnection, StatementOutput, TransactionEvent};
    use crudkit_common::{ErrorCode, Record, TableSchema};
    use parking_lot::Mutex;

    fn user_spec() -> QuerySpec {
        QuerySpec::new(TableSchema::new("user", "id").with_int_fields(["id", "age"])).unwrap()
    }

    fn executor(dialect: Dialect) -> (Executor<MemoryConnection>, MemoryConnection) {
        let conn = MemoryConnection::new();
        (Executor::new(conn.clone(), dialect), conn)
    }

    fn recorded_sql(exec: &mut Executor<MemoryConnection>) -> Arc<Mutex<Vec<(String, String)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        exec.set_sql_observer(move |msg: &str, id: &str| {
            sink.lock().push((msg.to_string(), id.to_string()))
        });
        log
    }

    #[test]
    fn test_execute_caches_statement() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let spec = user_spec().select("name").with_data(Value::from(1));

        exec.execute(&spec).unwrap();
        exec.execute(&spec).unwrap();

        assert_eq!(conn.prepare_count(), 1);
        assert_eq!(conn.execution_count(), 2);
        let stats = exec.cache_stats().unwrap();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.duplicate_puts, 0);
        assert_eq!(exec.last_sql(), "SELECT name FROM user WHERE id=:id");
    }

    #[test]
    fn test_caching_disabled() {
        let (mut exec, conn) = executor(Dialect::MySql);
        exec.set_statement_caching(false);
        let spec = user_spec().delete().with_data(Value::from(1));

        exec.execute(&spec).unwrap();
        exec.execute(&spec).unwrap();

        assert_eq!(conn.prepare_count(), 2);
        assert!(exec.cache_stats().is_none());
    }

    #[test]
    fn test_sql_log_tags() {
        let (mut exec, _conn) = executor(Dialect::MySql);
        let log = recorded_sql(&mut exec);
        let spec = user_spec().select("*").where_fields("age").with_data(Record::new().with("age", 3));

        exec.execute(&spec).unwrap();
        exec.execute(&spec).unwrap();
        exec.execute_raw(" SELECT 1 ", BindData::Absent, "", "").unwrap();

        let log = log.lock();
        let lines: Vec<&str> = log.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            lines,
            vec![
                "SELECT * FROM user WHERE age=:age",
                "age=3",
                "SELECT * FROM user WHERE age=:age (cached)",
                "age=3",
                "SELECT 1 (manual)",
            ]
        );
        assert_eq!(log[0].1.len(), 6);
        assert_eq!(log[0].1, log[1].1);
        assert_ne!(log[0].1, log[2].1);
    }

    #[test]
    fn test_log_parameters_disabled() {
        let conn = MemoryConnection::new();
        let config = ExecutorConfig::builder().log_parameters(false).build().unwrap();
        let mut exec = Executor::with_config(conn, &config).unwrap();
        let log = recorded_sql(&mut exec);

        exec.execute(&user_spec().delete().with_data(Value::from(1))).unwrap();
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_binding_uses_int_fields() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let spec = user_spec()
            .insert("name,age")
            .with_data(Record::new().with("name", 42).with("age", "36"));
        exec.execute(&spec).unwrap();

        let execution = &conn.executions()[0];
        assert_eq!(execution.param("name"), Some(&Value::from("42")));
        assert_eq!(execution.param("age"), Some(&Value::Integer(36)));
    }

    #[test]
    fn test_fields_without_data() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let err = exec
            .execute_raw("DELETE FROM user WHERE id=:id", BindData::Absent, "id", "")
            .unwrap_err();
        assert!(err.is_spec_error());
        assert_eq!(conn.prepare_count(), 0);
    }

    #[test]
    fn test_empty_raw_sql() {
        let (mut exec, _) = executor(Dialect::MySql);
        assert!(exec.execute_raw("  ", BindData::Absent, "", "").is_err());
    }

    #[test]
    fn test_result_shapes() {
        let (mut exec, conn) = executor(Dialect::MySql);

        conn.respond_rows("SELECT count(id) FROM user", &["count(id)"], vec![vec![Value::Integer(5)]]);
        let count = exec.execute(&user_spec().count("").unwrap()).unwrap();
        assert_eq!(count.scalar(), Some(&Value::Integer(5)));

        let sql = "SELECT name FROM user";
        conn.respond_rows(sql, &["name"], vec![vec![Value::from("a")], vec![Value::from("b")]]);
        let names = exec.execute(&user_spec().select("name").return_multiple_rows(true)).unwrap();
        assert_eq!(names, Outcome::Column(vec![Value::from("a"), Value::from("b")]));

        let deleted = exec
            .execute(&user_spec().delete().with_data(Value::from(1)).return_affected_count(true))
            .unwrap();
        assert_eq!(deleted.affected(), Some(1));

        let silent = exec.execute(&user_spec().delete().with_data(Value::from(1))).unwrap();
        assert!(silent.is_none());
    }

    #[test]
    fn test_batch_runs_in_order() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let records = vec![
            Record::new().with("name", "a"),
            Record::new().with("name", "b"),
            Record::new().with("name", "c"),
        ];
        let outcome = exec
            .execute(&user_spec().insert_objects(records).unwrap().return_insert_id(true))
            .unwrap();

        let ids: Vec<Value> = outcome
            .into_batch()
            .into_iter()
            .filter_map(|o| o.insert_id().cloned())
            .collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);

        let names: Vec<Value> = conn
            .executions()
            .iter()
            .filter_map(|e| e.param("name").cloned())
            .collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b"), Value::from("c")]);
        assert_eq!(conn.prepare_count(), 1);
    }

    #[test]
    fn test_batch_aborts_on_failure() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let sql = "INSERT INTO user (name) VALUES (:name)";
        conn.respond(sql, StatementOutput::affected(1));
        conn.fail_execute(sql, "UNIQUE constraint failed");

        let records = vec![
            Record::new().with("name", "a"),
            Record::new().with("name", "a"),
            Record::new().with("name", "b"),
        ];
        let err = exec.execute(&user_spec().insert_objects(records).unwrap()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExecutionFailed);
        assert_eq!(conn.execution_count(), 2);
    }

    #[test]
    fn test_error_observer_sees_failures() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        exec.set_error_observer(move |e: &CrudError, id: &str| {
            sink.lock().push((e.code(), id.to_string()))
        });
        let log = recorded_sql(&mut exec);

        conn.fail_execute("DELETE FROM user WHERE id=:id", "database is locked");
        let result = exec.execute(&user_spec().delete().with_data(Value::from(1)));

        assert!(result.is_err());
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ErrorCode::ExecutionFailed);
        assert_eq!(errors[0].1, exec.last_trace_id());
        assert!(log.lock().last().unwrap().0.contains("database is locked"));

        drop(errors);
        assert!(exec.execute(&user_spec().delete()).is_err());
    }

    #[test]
    fn test_transaction_counters() {
        let (mut exec, conn) = executor(Dialect::MySql);
        let log = recorded_sql(&mut exec);

        assert!(!exec.commit().unwrap());
        assert!(exec.begin().unwrap());
        assert!(!exec.begin().unwrap());

        exec.execute(&user_spec().select("*")).unwrap();
        exec.execute(&user_spec().delete().with_data(Value::from(1))).unwrap();
        exec.execute(&user_spec().delete().with_data(Value::from(2))).unwrap();
        assert_eq!(exec.transaction_sql_count(), 3);
        assert_eq!(exec.transaction_cud_sql_count(), 2);

        assert!(exec.commit().unwrap());
        assert!(!exec.in_transaction());
        assert!(!exec.rollback().unwrap());
        assert_eq!(exec.transaction_sql_count(), 3);

        assert!(exec.begin().unwrap());
        assert_eq!(exec.transaction_sql_count(), 0);
        assert!(exec.rollback().unwrap());

        assert_eq!(
            conn.transaction_events(),
            vec![
                TransactionEvent::Begin,
                TransactionEvent::Commit,
                TransactionEvent::Begin,
                TransactionEvent::Rollback
            ]
        );
        let log = log.lock();
        assert_eq!(log[0], ("beginTransaction".to_string(), "----->".to_string()));
        assert!(log.contains(&("commit".to_string(), "<-----".to_string())));
    }

    #[test]
    fn test_run_in_transaction() {
        let (mut exec, conn) = executor(Dialect::MySql);

        let value = exec
            .run_in_transaction(|exec| {
                exec.execute(&user_spec().delete().with_data(Value::from(1)))?;
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);

        let result: CrudResult<()> = exec.run_in_transaction(|exec| {
            exec.execute(&user_spec().delete())?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!exec.in_transaction());
        assert_eq!(
            conn.transaction_events(),
            vec![
                TransactionEvent::Begin,
                TransactionEvent::Commit,
                TransactionEvent::Begin,
                TransactionEvent::Rollback
            ]
        );
    }

    #[test]
    fn test_run_in_transaction_rolls_back_failed_commit() {
        let (mut exec, conn) = executor(Dialect::MySql);
        conn.fail_commit("database is locked");

        let result = exec.run_in_transaction(|exec| {
            exec.execute(&user_spec().delete().with_data(Value::from(1)))?;
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("database is locked"));
        assert!(!exec.in_transaction());
        assert_eq!(
            conn.transaction_events(),
            vec![TransactionEvent::Begin, TransactionEvent::Rollback]
        );
    }

    #[test]
    fn test_nested_run_in_transaction_joins_outer() {
        let (mut exec, conn) = executor(Dialect::MySql);
        exec.begin().unwrap();
        exec.run_in_transaction(|_| Ok(())).unwrap();
        assert!(exec.in_transaction());
        assert_eq!(conn.transaction_events(), vec![TransactionEvent::Begin]);
    }

    #[test]
    fn test_next_sequence_value() {
        let (mut exec, conn) = executor(Dialect::Postgres);
        let sql = "SELECT nextval('user_id_seq')";
        conn.respond_rows(sql, &["nextval"], vec![vec![Value::Integer(41)]]);
        assert_eq!(exec.next_sequence_value("user_id_seq").unwrap(), 41);

        let err = exec.next_sequence_value("user_id_seq").unwrap_err();
        assert_eq!(err.code(), ErrorCode::SequenceExhausted);

        assert!(exec.next_sequence_value("seq'; DROP TABLE user; --").is_err());
    }

    #[test]
    fn test_sequences_need_postgres() {
        let (mut exec, _) = executor(Dialect::MySql);
        let err = exec.next_sequence_value("user_id_seq").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }
}
