//! Prepared statement caching for crudkit.
//!
//! The executor keeps one [`StatementCache`] per connection. Entries are
//! keyed by the exact rendered SQL text and live until the cache is
//! cleared or dropped:
//!
//! - **No normalization**: two statements that differ only in whitespace
//!   are cached separately
//! - **No eviction**: the cache is unbounded
//! - **First writer wins**: a second `put` for the same text is ignored
//!
//! # Example
//!
//! ```rust
//! use crudkit_cache::StatementCache;
//!
//! let cache: StatementCache<String> = StatementCache::new();
//! let sql = "SELECT * FROM user WHERE id=:id";
//!
//! assert!(cache.get(sql).is_none());
//! assert!(cache.put(sql, "handle-1".to_string()).unwrap());
//! assert!(!cache.put(sql, "handle-2".to_string()).unwrap());
//! assert_eq!(*cache.get(sql).unwrap(), "handle-1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod statement_cache;
pub mod stats;

pub use statement_cache::StatementCache;
pub use stats::CacheStats;
