//! Observer hooks and trace ids.
//!
//! Observers see every SQL text the executor is about to run, the bound
//! parameters, transaction boundaries and every error it propagates. They
//! cannot change control flow.

use crudkit_common::CrudError;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Receives SQL text and log messages with the current trace id.
///
/// Implemented for any `Fn(&str, &str)` closure.
pub trait SqlObserver: Send + Sync {
    /// Called with a SQL line or message and its trace id.
    fn observe_sql(&self, message: &str, trace_id: &str);
}

impl<F> SqlObserver for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn observe_sql(&self, message: &str, trace_id: &str) {
        self(message, trace_id)
    }
}

/// Receives every error the executor propagates.
///
/// Implemented for any `Fn(&CrudError, &str)` closure.
pub trait ErrorObserver: Send + Sync {
    /// Called with the error and the trace id of the statement that caused it.
    fn observe_error(&self, error: &CrudError, trace_id: &str);
}

impl<F> ErrorObserver for F
where
    F: Fn(&CrudError, &str) + Send + Sync,
{
    fn observe_error(&self, error: &CrudError, trace_id: &str) {
        self(error, trace_id)
    }
}

/// Forwards observations to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SqlObserver for TracingObserver {
    fn observe_sql(&self, message: &str, trace_id: &str) {
        tracing::info!(target: "crudkit::sql", trace_id, "{}", message);
    }
}

impl ErrorObserver for TracingObserver {
    fn observe_error(&self, error: &CrudError, trace_id: &str) {
        tracing::error!(target: "crudkit::sql", trace_id, code = %error.code(), "{}", error);
    }
}

/// Generates an alphanumeric trace id.
pub fn generate_trace_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
