//! Small in-process TTL cache
//!
//! Provides a consistent read-side caching strategy for aggregate views with:
//! - Key → (value, expiry) entries with a per-cache default TTL
//! - Per-insert TTL override
//! - Explicit invalidation (single key or whole cache)
//!
//! Values served from here are time-boxed snapshots and must never be treated
//! as authoritative inputs to scoring.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A concurrent map of `key → (value, expiry)`.
///
/// Expired entries are dropped lazily on read and eagerly via
/// [`TtlCache::purge_expired`].
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Get a value if present and not past its expiry.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }
        // Expired entries are removed on the read path so a dead key does
        // not pin memory until the next write.
        self.entries
            .remove_if(key, |_, e| e.expires_at <= Instant::now());
        None
    }

    /// Insert with the cache-wide default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL for this entry.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop a single entry regardless of its expiry.
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Remove entries whose expiry has passed. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
