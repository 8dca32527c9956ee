// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded time-to-live cache for response bodies.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;
use serde_json::Value;

use super::{parse_json_body, request_key, Fetch, FetchConfig, Query, UpstreamError};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted: Instant,
    last_used: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    tick: u64,
}

/// LRU cache whose entries also expire after a fixed time-to-live.
///
/// Expired entries are dropped lazily when they are looked up, or when room
/// is needed for a new entry. Once the cache is full and nothing has
/// expired, the least recently used entry is evicted.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache. A capacity of zero disables caching.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Look up a live entry.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Store a value, evicting if the cache is full.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Number of stored entries, including ones that expired but were not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop one entry.
    pub fn remove(&self, key: &K) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.remove(key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
        }
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut inner = self.inner.lock().ok()?;
        inner.tick += 1;
        let tick = inner.tick;

        let expired = match inner.entries.get_mut(key) {
            None => return None,
            Some(entry) if now.duration_since(entry.inserted) >= self.ttl => true,
            Some(entry) => {
                entry.last_used = tick;
                return Some(entry.value.clone());
            }
        };

        if expired {
            inner.entries.remove(key);
        }
        None
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let ttl = self.ttl;
            inner
                .entries
                .retain(|_, entry| now.duration_since(entry.inserted) < ttl);

            if inner.entries.len() >= self.capacity {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    inner.entries.remove(&oldest);
                }
            }
        }

        inner.entries.insert(
            key,
            Entry {
                value,
                inserted: now,
                last_used: tick,
            },
        );
    }
}

/// Fetcher that memoizes successful bodies of an inner fetcher.
///
/// Failures pass straight through and are never cached, so the next call
/// after an upstream hiccup goes back to the network. For JSON requests a
/// body only counts as a success once it parses and carries no service
/// error.
#[derive(Debug)]
pub struct CachedFetcher<F> {
    inner: F,
    cache: TtlCache<String, String>,
}

impl<F: Fetch> CachedFetcher<F> {
    /// Wrap `inner` with a cache sized from `config`.
    pub fn new(inner: F, config: &FetchConfig) -> Self {
        Self {
            inner,
            cache: TtlCache::new(config.cache_ttl, config.cache_capacity),
        }
    }

    /// Forget every cached body.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Number of cached bodies.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<F: Fetch> Fetch for CachedFetcher<F> {
    fn get_text(&self, url: &str, query: Query<'_>) -> Result<String, UpstreamError> {
        let key = request_key(url, query);
        if let Some(body) = self.cache.get(&key) {
            debug!("cache hit: {}", key);
            return Ok(body);
        }

        debug!("cache miss: {}", key);
        let body = self.inner.get_text(url, query)?;
        self.cache.insert(key, body.clone());
        Ok(body)
    }

    fn get_json(&self, url: &str, query: Query<'_>) -> Result<Value, UpstreamError> {
        let key = request_key(url, query);
        if let Some(body) = self.cache.get(&key) {
            debug!("cache hit: {}", key);
            // A body stored by get_text may not be JSON.
            match parse_json_body(url, &body) {
                Ok(doc) => return Ok(doc),
                Err(_) => self.cache.remove(&key),
            }
        }

        debug!("cache miss: {}", key);
        let body = self.inner.get_text(url, query)?;
        let doc = parse_json_body(url, &body)?;
        self.cache.insert(key, body);
        Ok(doc)
    }

    fn head(&self, url: &str) -> Result<(), UpstreamError> {
        self.inner.head(url)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FixtureFetcher;
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60), 4);
        let start = Instant::now();
        cache.insert_at("a", 1, start);

        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(59)), Some(1));
        assert_eq!(cache.get_at(&"a", start + Duration::from_secs(60)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = TtlCache::new(Duration::from_secs(600), 2);
        let now = Instant::now();
        cache.insert_at("a", 1, now);
        cache.insert_at("b", 2, now);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get_at(&"a", now), Some(1));
        cache.insert_at("c", 3, now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(&"a", now), Some(1));
        assert_eq!(cache.get_at(&"b", now), None);
        assert_eq!(cache.get_at(&"c", now), Some(3));
    }

    #[test]
    fn test_expired_entries_evicted_before_live_ones() {
        let cache = TtlCache::new(Duration::from_secs(10), 2);
        let start = Instant::now();
        cache.insert_at("old", 1, start);
        let later = start + Duration::from_secs(5);
        cache.insert_at("fresh", 2, later);

        cache.insert_at("new", 3, start + Duration::from_secs(11));

        assert_eq!(cache.get_at(&"fresh", start + Duration::from_secs(11)), Some(2));
        assert_eq!(cache.get_at(&"new", start + Duration::from_secs(11)), Some(3));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = TtlCache::new(Duration::from_secs(10), 0);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_cached_fetcher_hits_network_once() {
        let fixture = FixtureFetcher::new().with("https://x", "{}");
        let fetcher = CachedFetcher::new(&fixture, &FetchConfig::default());

        fetcher.get_text("https://x", &[("f", "pjson")]).unwrap();
        fetcher.get_text("https://x", &[("f", "pjson")]).unwrap();
        assert_eq!(fixture.calls(), 1);

        // A different query string is a different key.
        fetcher.get_text("https://x", &[("f", "json")]).unwrap();
        assert_eq!(fixture.calls(), 2);
        assert_eq!(fetcher.cached_len(), 2);
    }

    #[test]
    fn test_cached_fetcher_does_not_cache_failures() {
        let fixture = FixtureFetcher::new();
        let fetcher = CachedFetcher::new(&fixture, &FetchConfig::default());

        assert!(fetcher.get_text("https://down", &[]).is_err());
        assert!(fetcher.get_text("https://down", &[]).is_err());
        assert_eq!(fixture.calls(), 2);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[test]
    fn test_cached_fetcher_does_not_cache_unparseable_json() {
        let fixture = FixtureFetcher::new().with("https://x", "<html>502 proxy</html>");
        let fetcher = CachedFetcher::new(&fixture, &FetchConfig::default());

        assert!(matches!(fetcher.get_json("https://x", &[]), Err(UpstreamError::Json { .. })));
        assert!(matches!(fetcher.get_json("https://x", &[]), Err(UpstreamError::Json { .. })));
        assert_eq!(fixture.calls(), 2);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[test]
    fn test_cached_fetcher_does_not_cache_service_errors() {
        let fixture = FixtureFetcher::new().with("https://x", r#"{"error":{"code":500,"message":"busy"}}"#);
        let fetcher = CachedFetcher::new(&fixture, &FetchConfig::default());

        assert!(matches!(fetcher.get_json("https://x", &[]), Err(UpstreamError::Service { code: 500, .. })));
        assert!(fetcher.get_json("https://x", &[]).is_err());
        assert_eq!(fixture.calls(), 2);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[test]
    fn test_text_body_cached_earlier_is_refetched_for_json() {
        let fixture = FixtureFetcher::new().with("https://x", "a,b\n1,2\n");
        let fetcher = CachedFetcher::new(&fixture, &FetchConfig::default());

        fetcher.get_text("https://x", &[]).unwrap();
        assert_eq!(fetcher.cached_len(), 1);
        assert!(fetcher.get_json("https://x", &[]).is_err());
        assert_eq!(fixture.calls(), 2);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[test]
    fn test_shared_cached_fetcher_caches_parsed_json_once() {
        let fixture = FixtureFetcher::new().with("https://x", r#"{"layers":[]}"#);
        let fetcher = std::sync::Arc::new(CachedFetcher::new(&fixture, &FetchConfig::default()));

        assert_eq!(fetcher.get_json("https://x", &[]).unwrap(), serde_json::json!({"layers": []}));
        assert_eq!(fetcher.get_json("https://x", &[]).unwrap(), serde_json::json!({"layers": []}));
        assert_eq!(fixture.calls(), 1);
        assert_eq!(fetcher.cached_len(), 1);
    }
}
