//! System-wide constants and defaults.

/// Length of the random trace id attached to each prepared statement.
pub const DEFAULT_TRACE_ID_LENGTH: usize = 6;

/// Lock clause rendered by `for_lock(true)`.
pub const DEFAULT_LOCK_CLAUSE: &str = "FOR UPDATE";

/// Projection used when a SELECT names no columns.
pub const SELECT_ALL: &str = "*";

/// Trace id logged alongside a transaction begin.
pub const TRANSACTION_BEGIN_MARKER: &str = "----->";

/// Trace id logged alongside a commit or rollback.
pub const TRANSACTION_END_MARKER: &str = "<-----";

/// Tag appended to traced SQL served from the statement cache.
pub const CACHED_TAG: &str = " (cached)";

/// Tag appended to traced SQL that bypassed the query builder.
pub const MANUAL_TAG: &str = " (manual)";
