//! Bounded, time-expiring response cache.
//!
//! [`ResponseCache`] stores parsed operation results keyed on
//! `(operation, sorted parameters)`. It is a leaf component: the
//! orchestrator decides which operations read and write through it.
//!
//! # Expiry
//!
//! Expiry is lazy: an entry past its `expires_at` is removed the next time
//! it is looked up. [`ResponseCache::spawn_sweeper`] adds an optional
//! fixed-interval purge to bound memory when entries are written but never
//! read again; it is an optimisation only, correctness never depends on it.
//!
//! # Eviction
//!
//! When an insert would exceed `max_entries`, the least-recently-*inserted*
//! entry is evicted. Lookups do not refresh an entry's position, so this is
//! insertion-order (FIFO) eviction, not access-refreshing LRU. Overwriting an
//! existing key re-inserts it at the back of the order and never evicts.
//!
//! # Switching off
//!
//! [`ResponseCache::set_enabled(false)`](ResponseCache::set_enabled) makes
//! `get` always miss and `set` a no-op without touching stored entries, so
//! caching can be toggled at runtime without losing state.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use super::key::{cache_key, namespace_prefix};
use super::sweep::SweepHandle;
use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600))
///     .sweep_interval(None);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching starts switched on. Default: true.
    pub enabled: bool,
    /// Maximum number of live entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live for stored entries. Default: 1 hour.
    pub ttl: Duration,
    /// Interval of the background expiry sweep, `None` to rely on lazy
    /// expiry alone. Default: 5 minutes.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            sweep_interval: Some(Duration::from_secs(300)),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with caching switched on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum number of live entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for stored entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set (or disable with `None`) the background sweep interval.
    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently stored (expired-but-unswept entries included).
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Lookups that returned a value since construction or the last `clear`.
    pub hits: u64,
    /// Lookups that returned nothing since construction or the last `clear`.
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before any lookup.
    pub hit_rate: f64,
    /// Whether the global switch is on.
    pub enabled: bool,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<V> {
    // only ever read with `peek`, so the LRU end is the oldest insertion
    entries: LruCache<String, Entry<V>>,
    hits: u64,
    misses: u64,
}

impl<V> Inner<V> {
    fn remove_where(&mut self, mut doomed: impl FnMut(&str, &Entry<V>) -> bool) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| doomed(key.as_str(), *entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.entries.pop(key);
        }
        keys.len()
    }
}

/// In-memory response cache, safe to share between concurrent callers.
///
/// Generic over the stored value; the orchestrator stores parsed results as
/// `serde_json::Value` so one cache serves every operation type.
pub struct ResponseCache<V> {
    max_entries: usize,
    ttl: Duration,
    enabled: AtomicBool,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            ttl: config.ttl,
            enabled: AtomicBool::new(config.enabled),
            inner: Mutex::new(Inner {
                // a zero capacity never stores anything; see `set`
                entries: LruCache::new(
                    NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN),
                ),
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the global switch is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Flip the global switch. Stored entries are left untouched.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Look up a cached value.
    ///
    /// Returns `None` on miss, when the entry has expired (the entry is
    /// removed), or when caching is switched off.
    pub fn get(&self, operation: &str, params: &Value) -> Option<V> {
        self.get_with(operation, params, |value| Some(value.clone()))
    }

    /// Look up a cached value and convert it with `decode`.
    ///
    /// A live entry that `decode` rejects counts as a miss, not a hit, and
    /// is left in place for the caller to overwrite.
    pub fn get_with<T>(
        &self,
        operation: &str,
        params: &Value,
        decode: impl FnOnce(&V) -> Option<T>,
    ) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        let key = cache_key(operation, params);
        let now = Instant::now();

        let mut inner = self.lock();
        let expired = inner.entries.peek(&key).map(|entry| now > entry.expires_at);
        let found = match expired {
            Some(true) => {
                inner.entries.pop(&key);
                debug!(operation, "cache entry expired");
                None
            }
            Some(false) => inner.entries.peek(&key).and_then(|entry| decode(&entry.value)),
            None => None,
        };

        if found.is_some() {
            inner.hits += 1;
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => operation.to_owned())
                .increment(1);
        } else {
            inner.misses += 1;
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => operation.to_owned())
                .increment(1);
        }
        found
    }

    /// Store a value, evicting the oldest-inserted entry if the cache is full.
    pub fn set(&self, operation: &str, params: &Value, value: V) {
        if !self.is_enabled() || self.max_entries == 0 {
            return;
        }
        let key = cache_key(operation, params);
        let now = Instant::now();

        let mut inner = self.lock();
        // popping first moves an overwritten key to the back of the order
        if inner.entries.pop(&key).is_none()
            && inner.entries.len() >= self.max_entries
            && let Some((oldest, _)) = inner.entries.pop_lru()
        {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            debug!(evicted = %oldest, "cache full, evicted oldest entry");
        }

        inner.entries.put(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Remove entries for an operation.
    ///
    /// Without `params`, every entry in the operation's namespace is removed.
    /// With `params`, every entry whose key *contains* the key derived from
    /// them is removed (substring match, not exact). Returns the number of
    /// entries removed.
    pub fn invalidate(&self, operation: &str, params: Option<&Value>) -> usize {
        let mut inner = self.lock();
        let removed = match params {
            None => {
                let prefix = namespace_prefix(operation);
                inner.remove_where(|key, _| key.starts_with(&prefix))
            }
            Some(params) => {
                let pattern = cache_key(operation, params);
                inner.remove_where(|key, _| key.contains(&pattern))
            }
        };
        debug!(operation, removed, "cache invalidated");
        removed
    }

    /// Remove every entry and reset hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .remove_where(|_, entry| now > entry.expires_at)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
            enabled: self.is_enabled(),
        }
    }
}

impl<V: Clone + Send + 'static> ResponseCache<V> {
    /// Start a background task purging expired entries every `period`.
    ///
    /// The task holds only a weak reference: it exits on its own once the
    /// cache is dropped, and is aborted when the returned handle is stopped
    /// or dropped. Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> SweepHandle {
        let cache = Arc::downgrade(self);
        SweepHandle::spawn(period, move || {
            cache.upgrade().map(|cache| cache.purge_expired())
        })
    }
}
