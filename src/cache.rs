//! Result cache for read queries
//!
//! A fixed-capacity LRU cache of fully shaped read results. The key is a
//! composite of the shaper token, the single-row flag, and the literal SQL
//! text, so logically identical queries with different shaping never collide.
//! Values are cached after shaping: a hit skips both the database round trip
//! and re-invocation of the shaper.
//!
//! Caching is conservative about writes: any insert/update/delete clears the
//! cache in its entirety before the statement is issued, so a read that
//! follows a write can never observe pre-write cached data.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use splitdb::{CacheConfig, CacheKey, CachedValue, QueryCache};
//!
//! let mut cache = QueryCache::new(&CacheConfig::with_capacity(10));
//! let key = CacheKey::new(None, false, "SELECT * FROM users");
//!
//! assert!(cache.lookup(&key).is_none());
//! cache.store(key.clone(), CachedValue::Rows(vec![json!({"id": 1})]));
//! assert!(cache.lookup(&key).is_some());
//!
//! cache.invalidate_all();
//! assert!(cache.lookup(&key).is_none());
//! ```

use std::num::NonZeroUsize;

use lru::LruCache;
use serde_json::Value;
use tracing::debug;

/// Default maximum number of cached read results
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

/// Settings for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether read results are cached at all
    enabled: bool,
    /// Maximum number of entries, fixed for the cache's lifetime
    capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Enabled, with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            enabled: true,
            capacity,
        }
    }

    /// Disabled: lookups always miss, stores and clears are no-ops
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Whether caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Composite key for one cached read result.
///
/// Two reads share an entry only when shaper token, single-row flag, and SQL
/// text all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    shaper: Option<String>,
    single: bool,
    sql: String,
}

impl CacheKey {
    /// Build a key from the shaper token (if any), the single-row flag, and
    /// the literal SQL text.
    pub fn new(shaper_token: Option<&str>, single: bool, sql: &str) -> Self {
        Self {
            shaper: shaper_token.map(str::to_owned),
            single,
            sql: sql.to_owned(),
        }
    }
}

/// A fully shaped, cacheable read result.
///
/// The single-row flag is part of the key, so a key always maps to the
/// matching variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// All shaped rows of a multi-row read (possibly empty)
    Rows(Vec<Value>),
    /// The shaped first row of a single-row read; `None` when the query
    /// matched nothing (the zero-row outcome is cached too)
    Row(Option<Value>),
}

/// Cache telemetry counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of lookups served from the cache
    pub hits: u64,
    /// Number of lookups that went to the database
    pub misses: u64,
    /// Number of results stored
    pub insertions: u64,
    /// Number of entries evicted at capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate over all lookups, 0.0 to 1.0
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of shaped read results.
///
/// Capacity is fixed at construction; inserting beyond it evicts the least
/// recently used entry. A disabled cache holds no storage at all.
pub struct QueryCache {
    entries: Option<LruCache<CacheKey, CachedValue>>,
    stats: CacheStats,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.is_enabled())
            .field("len", &self.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl QueryCache {
    /// Create a cache from the given settings.
    ///
    /// A zero capacity disables the cache outright.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = if config.is_enabled() {
            NonZeroUsize::new(config.capacity()).map(LruCache::new)
        } else {
            None
        };
        Self {
            entries,
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached result, marking it most recently used on a hit.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<CachedValue> {
        let entries = self.entries.as_mut()?;
        match entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a result, evicting the least recently used entry
    /// when at capacity.
    pub fn store(&mut self, key: CacheKey, value: CachedValue) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        if let Some((evicted, _)) = entries.push(key.clone(), value) {
            // push also returns the old value on replacement; only a
            // different key means an entry was evicted
            if evicted != key {
                self.stats.evictions += 1;
            }
        }
        self.stats.insertions += 1;
    }

    /// Clear every entry.
    pub fn invalidate_all(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
            debug!("query cache invalidated");
        }
    }

    /// Whether caching is active
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Current number of cached results
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// Whether the cache holds no results
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Telemetry counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: i64) -> CachedValue {
        CachedValue::Rows(vec![json!({ "n": n })])
    }

    #[test]
    fn test_lookup_miss_then_hit() {
        let mut cache = QueryCache::new(&CacheConfig::default());
        let key = CacheKey::new(None, false, "SELECT 1");

        assert!(cache.lookup(&key).is_none());
        cache.store(key.clone(), rows(1));
        assert_eq!(cache.lookup(&key), Some(rows(1)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn test_capacity_plus_one_evicts_least_recently_used() {
        let mut cache = QueryCache::new(&CacheConfig::with_capacity(2));
        let a = CacheKey::new(None, false, "SELECT a");
        let b = CacheKey::new(None, false, "SELECT b");
        let c = CacheKey::new(None, false, "SELECT c");

        cache.store(a.clone(), rows(1));
        cache.store(b.clone(), rows(2));
        // touch `a` so `b` becomes least recently used
        assert!(cache.lookup(&a).is_some());
        cache.store(c.clone(), rows(3));

        assert!(cache.lookup(&a).is_some());
        assert!(cache.lookup(&b).is_none());
        assert!(cache.lookup(&c).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacement_is_not_an_eviction() {
        let mut cache = QueryCache::new(&CacheConfig::with_capacity(2));
        let key = CacheKey::new(None, false, "SELECT a");
        cache.store(key.clone(), rows(1));
        cache.store(key.clone(), rows(2));

        assert_eq!(cache.lookup(&key), Some(rows(2)));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_separates_shapers_and_single_flag() {
        let sql = "SELECT * FROM t";
        let plain = CacheKey::new(None, false, sql);
        let shaped = CacheKey::new(Some("names"), false, sql);
        let other_shaper = CacheKey::new(Some("ids"), false, sql);
        let single = CacheKey::new(None, true, sql);

        assert_ne!(plain, shaped);
        assert_ne!(shaped, other_shaper);
        assert_ne!(plain, single);
        assert_eq!(plain, CacheKey::new(None, false, sql));

        let mut cache = QueryCache::new(&CacheConfig::default());
        cache.store(plain.clone(), rows(1));
        cache.store(shaped.clone(), rows(2));
        assert_eq!(cache.lookup(&plain), Some(rows(1)));
        assert_eq!(cache.lookup(&shaped), Some(rows(2)));
    }

    #[test]
    fn test_invalidate_all_clears_everything() {
        let mut cache = QueryCache::new(&CacheConfig::default());
        cache.store(CacheKey::new(None, false, "SELECT a"), rows(1));
        cache.store(CacheKey::new(None, true, "SELECT b"), CachedValue::Row(None));

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert!(cache.lookup(&CacheKey::new(None, false, "SELECT a")).is_none());
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let mut cache = QueryCache::new(&CacheConfig::disabled());
        let key = CacheKey::new(None, false, "SELECT 1");

        cache.store(key.clone(), rows(1));
        assert!(cache.lookup(&key).is_none());
        assert!(!cache.is_enabled());
        assert_eq!(cache.len(), 0);

        // no lookups are counted while disabled
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = QueryCache::new(&CacheConfig::with_capacity(0));
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = QueryCache::new(&CacheConfig::default());
        let key = CacheKey::new(None, false, "SELECT 1");
        cache.store(key.clone(), rows(1));
        cache.lookup(&key);
        cache.lookup(&key);
        cache.lookup(&CacheKey::new(None, false, "SELECT 2"));

        let stats = cache.stats();
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_hit_rate_is_zero() {
        let cache = QueryCache::new(&CacheConfig::default());
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
