use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use thiserror::Error;

use super::key::CacheKey;

/// Errors raised while constructing a [`ResponseCache`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be greater than 0")]
    ZeroCapacity,

    #[error("cache TTL must be greater than 0")]
    ZeroTtl,
}

/// Sizing and expiry settings for the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCacheConfig {
    /// Maximum number of entries held at once.
    pub max_entries: usize,
    /// Age at which an entry stops being served.
    pub ttl: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self { max_entries: 1000, ttl: Duration::from_secs(1) }
    }
}

/// Point-in-time counters for the response cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Lookups that found an entry but discarded it for being too old.
    pub expirations: u64,
    pub insertions: u64,
    /// Entries pushed out to make room for a new key.
    pub evictions: u64,
}

struct CacheEntry {
    body: Bytes,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
}

/// Bounded, time-expiring store of raw upstream response bodies.
///
/// Capacity is enforced with least-recently-used eviction on [`store`](Self::store).
/// Independently, every entry expires `ttl` after it was stored: [`lookup`](Self::lookup)
/// treats an entry whose age is `>= ttl` as absent and drops it on the spot, so a
/// stale body is never served even if eviction has not reached it yet.
///
/// The LRU list lives behind a single `parking_lot::Mutex`. Every operation holds the
/// lock only for a map operation and a `Bytes` clone, so a `store` is never partially
/// visible to a concurrent `lookup`.
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
    counters: CacheCounters,
}

impl ResponseCache {
    /// Creates an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if `max_entries` or `ttl` is zero.
    pub fn new(config: &ResponseCacheConfig) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(config.max_entries).ok_or(CacheError::ZeroCapacity)?;
        if config.ttl.is_zero() {
            return Err(CacheError::ZeroTtl);
        }

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            counters: CacheCounters::default(),
        })
    }

    /// Returns the cached body for `key`, or `None` if absent or expired.
    ///
    /// A hit also marks the entry as most recently used.
    pub fn lookup(&self, key: &CacheKey) -> Option<Bytes> {
        let mut entries = self.entries.lock();

        let found = entries.get(key).map(|entry| (entry.inserted_at.elapsed(), entry.body.clone()));
        match found {
            Some((age, body)) if age < self.ttl => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(body)
            }
            Some((age, _)) => {
                entries.pop(key);
                drop(entries);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, age_ms = age.as_millis(), "cache entry expired");
                None
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `body` under `key`, replacing any previous entry and restarting its TTL.
    ///
    /// If the cache is full the least recently used entry is evicted.
    pub fn store(&self, key: CacheKey, body: Bytes) {
        let entry = CacheEntry { body, inserted_at: Instant::now() };

        let displaced = {
            let mut entries = self.entries.lock();
            entries.push(key.clone(), entry)
        };

        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
        if let Some((evicted_key, _)) = displaced {
            if evicted_key != key {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %evicted_key, "cache entry evicted");
            }
        }
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        let removed = {
            let mut entries = self.entries.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        tracing::debug!(removed_entries = removed, "response cache invalidated");
    }

    /// Number of entries physically held, including ones that have expired but
    /// not yet been looked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}
