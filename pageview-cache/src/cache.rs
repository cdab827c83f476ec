//! In-memory TTL cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use pageview_core::constants::{DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL};

/// Cache entry with an optional deadline.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Expiration requested when storing a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expiry {
    /// Use the cache's configured default TTL
    #[default]
    Default,
    /// Expire after the given duration
    After(Duration),
    /// Never expire
    Never,
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied by [`Expiry::Default`]
    pub default_ttl: Duration,
    /// Period of the background sweep
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// In-memory key/value cache with TTL expiry.
///
/// Thread-safe. Expired entries are never returned, whether or not the sweep
/// has removed them yet.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Returns the configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a live value by key.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone())
    }

    /// Caches a value with the default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, Expiry::Default);
    }

    /// Caches a value, replacing any previous entry and restarting its clock.
    pub fn set(&self, key: K, value: V, expiry: Expiry) {
        let now = Instant::now();
        let expires_at = match expiry {
            Expiry::Default => now.checked_add(self.config.default_ttl),
            Expiry::After(ttl) => now.checked_add(ttl),
            Expiry::Never => None,
        };

        self.entries
            .write()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Removes a cached entry.
    pub fn remove(&self, key: &K) {
        self.entries.write().remove(key);
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Entries stored, expired or not
    pub total_entries: usize,
    /// Entries past their deadline but not yet swept
    pub expired_entries: usize,
    /// Entries that `get` would still return
    pub valid_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn short_lived() -> TtlCache<String, u64> {
        TtlCache::with_config(CacheConfig {
            default_ttl: Duration::from_millis(20),
            sweep_interval: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_cache_set_get() {
        let cache = TtlCache::new();
        cache.insert("/blog/post".to_string(), 42u64);
        assert_eq!(cache.get(&"/blog/post".to_string()), Some(42));
    }

    #[test]
    fn test_cache_miss() {
        let cache: TtlCache<String, u64> = TtlCache::new();
        assert!(cache.get(&"/nowhere".to_string()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_overwrite_resets_value_and_clock() {
        let cache = TtlCache::with_config(CacheConfig {
            default_ttl: Duration::from_millis(60),
            sweep_interval: Duration::from_secs(60),
        });
        let key = "/".to_string();
        cache.insert(key.clone(), 1u64);
        std::thread::sleep(Duration::from_millis(40));
        cache.insert(key.clone(), 2);
        // past the first deadline, inside the second
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&key), Some(2));
    }

    #[test]
    fn test_cache_default_ttl_expiration() {
        let cache = short_lived();
        cache.insert("/a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&"/a".to_string()).is_none());
        // still stored until swept
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_custom_and_never_expiry() {
        let cache = short_lived();
        cache.set("/long".to_string(), 1, Expiry::After(Duration::from_secs(3600)));
        cache.set("/forever".to_string(), 2, Expiry::Never);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"/long".to_string()), Some(1));
        assert_eq!(cache.get(&"/forever".to_string()), Some(2));
    }

    #[test]
    fn test_cache_remove_and_clear() {
        let cache = TtlCache::new();
        cache.insert("/a".to_string(), 1u64);
        cache.insert("/b".to_string(), 2u64);
        cache.remove(&"/a".to_string());
        assert!(cache.get(&"/a".to_string()).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_purge_expired() {
        let cache = short_lived();
        cache.insert("/old".to_string(), 1);
        cache.set("/kept".to_string(), 2, Expiry::Never);
        std::thread::sleep(Duration::from_millis(40));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.valid_entries, 1);

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"/kept".to_string()), Some(2));
    }

    #[test]
    fn test_cache_concurrent_access() {
        let cache = Arc::new(TtlCache::<u64, u64>::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        cache.insert(i % 16, t * 1000 + i);
                        if let Some(v) = cache.get(&(i % 16)) {
                            assert_eq!(v % 1000 % 16, i % 16);
                        }
                        cache.purge_expired();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
    }
}
