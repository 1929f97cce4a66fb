//! Short-lived in-process read cache.
//!
//! A [`ReadCache`] keeps values for a fixed time-to-live and is shared by
//! reference between callers. It never refreshes on its own: writers must
//! call [`ReadCache::invalidate`] or [`ReadCache::clear`] after changing
//! the underlying documents.

use core::hash::Hash;
use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Default time-to-live of cached loads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// A cached value and when it was stored.
#[derive(Debug)]
struct Entry<V> {
    /// Cached value.
    value: V,
    /// Insertion time.
    stored_at: Instant,
}

/// Thread-safe map whose entries expire after a fixed TTL.
#[derive(Debug)]
pub struct ReadCache<K, V> {
    /// Time-to-live of every entry.
    ttl: Duration,
    /// Entries by key.
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> Default for ReadCache<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K: Eq + Hash, V: Clone> ReadCache<K, V> {
    /// Creates an empty cache with the given TTL.
    #[inline]
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured TTL.
    #[inline]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Locks the map. A panic in another holder cannot leave the map in
    /// a broken state, so a poisoned lock is recovered.
    fn entries(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a fresh value for `key`, dropping it if expired.
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries();
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)?;
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            let _expired = entries.remove(key);
            None
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    #[inline]
    pub fn insert(&self, key: K, value: V) {
        let _old = self.entries().insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops the entry for `key`.
    #[inline]
    pub fn invalidate(&self, key: &K) {
        let _old = self.entries().remove(key);
    }

    /// Drops every entry.
    #[inline]
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, including expired ones not yet dropped.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
