//! Prepared statement cache.
//!
//! Preparing a statement costs a round trip to the database, so the
//! executor keeps every handle it prepares and reuses it the next time the
//! same SQL text is executed on the same connection.

use std::collections::HashMap;
use std::sync::Arc;

use crudkit_common::{CrudError, CrudResult};
use parking_lot::RwLock;

use crate::stats::{CacheStats, Counters};

/// A cache of prepared statement handles keyed by exact SQL text.
///
/// Handles are shared as `Arc<S>` so a cached statement can be executed
/// while the cache itself stays available to other lookups.
pub struct StatementCache<S> {
    /// Cached handles.
    entries: RwLock<HashMap<String, Arc<S>>>,
    /// Usage counters.
    stats: Counters,
}

impl<S> Default for StatementCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StatementCache<S> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: Counters::default(),
        }
    }

    /// Looks up the handle prepared for `sql`.
    pub fn get(&self, sql: &str) -> Option<Arc<S>> {
        let found = self.entries.read().get(sql).cloned();
        self.stats.lookup(found.is_some());
        found
    }

    /// Stores a handle for `sql`.
    ///
    /// Returns `Ok(false)` without replacing anything if a handle for the
    /// same text already exists.
    pub fn put(&self, sql: &str, statement: S) -> CrudResult<bool> {
        self.put_shared(sql, Arc::new(statement))
    }

    /// Stores an already shared handle for `sql`.
    pub fn put_shared(&self, sql: &str, statement: Arc<S>) -> CrudResult<bool> {
        if sql.trim().is_empty() {
            return Err(CrudError::invalid_spec("cannot cache an empty SQL statement"));
        }

        let mut entries = self.entries.write();
        let stored = !entries.contains_key(sql);
        if stored {
            entries.insert(sql.to_string(), statement);
        }
        self.stats.put(stored);
        Ok(stored)
    }

    /// Returns the cached handle for `sql`, preparing and storing one on a miss.
    ///
    /// `prepare` runs without the cache lock held. If another caller stores a
    /// handle for the same text in the meantime, theirs is kept and returned.
    pub fn get_or_prepare<F>(&self, sql: &str, prepare: F) -> CrudResult<(Arc<S>, bool)>
    where
        F: FnOnce() -> CrudResult<S>,
    {
        if let Some(statement) = self.get(sql) {
            return Ok((statement, true));
        }

        let statement = Arc::new(prepare()?);
        if self.put_shared(sql, Arc::clone(&statement))? {
            return Ok((statement, false));
        }
        let winner = self.entries.read().get(sql).cloned();
        Ok((winner.unwrap_or(statement), false))
    }

    /// Returns true if a handle for `sql` is cached.
    pub fn contains(&self, sql: &str) -> bool {
        self.entries.read().contains_key(sql)
    }

    /// Drops every cached handle.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.stats.clear();
    }

    /// Returns the number of cached statements.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

impl<S> std::fmt::Debug for StatementCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementCache")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
