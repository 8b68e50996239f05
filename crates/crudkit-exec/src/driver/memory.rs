//! In-memory recording driver.
//!
//! [`MemoryConnection`] never touches a database. It records every
//! prepare, execution and transaction boundary, and answers executions with
//! scripted outputs. Clones share state, so a test can keep one clone for
//! inspection after handing another to an executor.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crudkit_common::{CrudError, CrudResult, Value};
use parking_lot::Mutex;

use super::{BoundParam, Connection, PreparedStatement, StatementOutput};

/// One recorded statement execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// The statement's SQL text.
    pub sql: String,
    /// The parameters it was executed with.
    pub params: Vec<BoundParam>,
}

impl ExecutionRecord {
    /// Returns the value bound to `name`.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// A recorded transaction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    /// BEGIN.
    Begin,
    /// COMMIT.
    Commit,
    /// ROLLBACK.
    Rollback,
}

#[derive(Debug, Default)]
struct MemoryState {
    prepared: Vec<String>,
    executions: Vec<ExecutionRecord>,
    transactions: Vec<TransactionEvent>,
    responses: HashMap<String, VecDeque<CrudResult<StatementOutput>>>,
    prepare_failures: HashMap<String, String>,
    commit_failure: Option<String>,
    last_insert_id: i64,
}

impl MemoryState {
    fn respond(&mut self, sql: &str) -> CrudResult<StatementOutput> {
        let is_insert = sql
            .get(..6)
            .is_some_and(|p| p.eq_ignore_ascii_case("INSERT"));
        if is_insert {
            self.last_insert_id += 1;
        }

        if let Some(result) = self.responses.get_mut(sql).and_then(VecDeque::pop_front) {
            return result;
        }

        let is_select = sql
            .get(..6)
            .is_some_and(|p| p.eq_ignore_ascii_case("SELECT"));
        Ok(if is_select {
            StatementOutput::affected(0)
        } else {
            StatementOutput::affected(1)
        })
    }
}

/// An in-memory connection that records what the executor does.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnection {
    /// Creates a connection with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an output for the next execution of `sql`.
    ///
    /// Queued outputs are consumed in order. Without one, SELECTs return no
    /// rows and other statements report one affected row.
    pub fn respond(&self, sql: &str, output: StatementOutput) {
        self.state
            .lock()
            .responses
            .entry(sql.to_string())
            .or_default()
            .push_back(Ok(output));
    }

    /// Queues rows for the next execution of `sql`.
    pub fn respond_rows<S: AsRef<str>>(&self, sql: &str, columns: &[S], rows: Vec<Vec<Value>>) {
        self.respond(sql, StatementOutput::with_rows(columns, rows));
    }

    /// Makes the next execution of `sql` fail.
    pub fn fail_execute(&self, sql: &str, message: &str) {
        self.state
            .lock()
            .responses
            .entry(sql.to_string())
            .or_default()
            .push_back(Err(CrudError::execution(message)));
    }

    /// Makes every prepare of `sql` fail.
    pub fn fail_prepare(&self, sql: &str, message: &str) {
        self.state
            .lock()
            .prepare_failures
            .insert(sql.to_string(), message.to_string());
    }

    /// Makes the next commit fail without ending the transaction.
    pub fn fail_commit(&self, message: &str) {
        self.state.lock().commit_failure = Some(message.to_string());
    }

    /// Returns every prepared SQL text, in order.
    pub fn prepared_sql(&self) -> Vec<String> {
        self.state.lock().prepared.clone()
    }

    /// Returns the number of prepares.
    pub fn prepare_count(&self) -> usize {
        self.state.lock().prepared.len()
    }

    /// Returns every execution, in order.
    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.state.lock().executions.clone()
    }

    /// Returns the number of executions.
    pub fn execution_count(&self) -> usize {
        self.state.lock().executions.len()
    }

    /// Returns the recorded transaction boundaries.
    pub fn transaction_events(&self) -> Vec<TransactionEvent> {
        self.state.lock().transactions.clone()
    }

    /// Forgets recorded prepares, executions and transaction boundaries.
    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.prepared.clear();
        state.executions.clear();
        state.transactions.clear();
    }
}

impl Connection for MemoryConnection {
    type Statement = MemoryStatement;

    fn prepare(&mut self, sql: &str) -> CrudResult<MemoryStatement> {
        let mut state = self.state.lock();
        if let Some(message) = state.prepare_failures.get(sql) {
            return Err(CrudError::execution(message.clone()));
        }
        state.prepared.push(sql.to_string());
        Ok(MemoryStatement {
            sql: sql.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn begin(&mut self) -> CrudResult<()> {
        self.state.lock().transactions.push(TransactionEvent::Begin);
        Ok(())
    }

    fn commit(&mut self) -> CrudResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.commit_failure.take() {
            return Err(CrudError::execution(message));
        }
        state.transactions.push(TransactionEvent::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> CrudResult<()> {
        self.state.lock().transactions.push(TransactionEvent::Rollback);
        Ok(())
    }

    fn last_insert_id(&self) -> CrudResult<Value> {
        Ok(Value::Integer(self.state.lock().last_insert_id))
    }
}

/// A statement prepared on a [`MemoryConnection`].
#[derive(Debug)]
pub struct MemoryStatement {
    sql: String,
    state: Arc<Mutex<MemoryState>>,
}

impl PreparedStatement for MemoryStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(&self, params: &[BoundParam]) -> CrudResult<StatementOutput> {
        let mut state = self.state.lock();
        state.executions.push(ExecutionRecord {
            sql: self.sql.clone(),
            params: params.to_vec(),
        });
        state.respond(&self.sql)
    }
}
