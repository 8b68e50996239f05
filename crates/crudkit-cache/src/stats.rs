//! Statement cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a [`StatementCache`](crate::StatementCache) at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a statement.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Statements stored.
    pub inserts: u64,
    /// Stores ignored because the text was already cached.
    pub duplicate_puts: u64,
    /// Times the cache was cleared.
    pub clears: u64,
}

/// Live counters updated by the cache under shared access.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    duplicate_puts: AtomicU64,
    clears: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn lookup(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn put(&self, stored: bool) {
        let counter = if stored {
            &self.inserts
        } else {
            &self.duplicate_puts
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            duplicate_puts: self.duplicate_puts.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}
