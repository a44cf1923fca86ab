//! Lookup result cache.
//!
//! Short queries dominate autocomplete traffic and are the most expensive
//! to rank (widest candidate sets), so completed lookups for them are kept
//! in an LRU keyed by the full request tuple. The critical sections are
//! get/put only; searches never run under the lock. The whole cache is
//! cleared when a new index snapshot becomes current.

use crate::suggest::service::LookupResponse;
use anyhow::Result;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key input; serialized to JSON so distinct tuples can never
/// collide (a `None` context filter stays distinct from an empty one).
#[derive(Debug, Serialize)]
pub struct CacheKey<'a> {
    pub suggester: &'a str,
    pub token: &'a str,
    pub context_filter: Option<&'a str>,
    pub count: usize,
    pub all_terms_required: bool,
    pub highlight: bool,
}

impl CacheKey<'_> {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Concurrent LRU over completed lookups.
pub struct SuggestionCache {
    entries: Mutex<LruCache<String, LookupResponse>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SuggestionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<LookupResponse> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        match entries.get(key) {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(response.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: String, response: LookupResponse) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, response);
        }
    }

    /// Bulk invalidation, used when a new snapshot is installed.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn hit_rate(&self) -> f32 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        if hits + misses == 0 {
            0.0
        } else {
            hits as f32 / (hits + misses) as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(token: &str, context: Option<&str>, count: usize, all: bool, hl: bool) -> String {
        CacheKey {
            suggester: "products",
            token,
            context_filter: context,
            count,
            all_terms_required: all,
            highlight: hl,
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn test_key_deterministic() {
        assert_eq!(
            key("ip", Some("phones"), 10, true, true),
            key("ip", Some("phones"), 10, true, true)
        );
    }

    #[test]
    fn test_key_changes_with_any_field() {
        let base = key("ip", Some("phones"), 10, true, true);
        assert_ne!(base, key("ipa", Some("phones"), 10, true, true));
        assert_ne!(base, key("ip", Some("tablets"), 10, true, true));
        assert_ne!(base, key("ip", None, 10, true, true));
        assert_ne!(base, key("ip", Some("phones"), 20, true, true));
        assert_ne!(base, key("ip", Some("phones"), 10, false, true));
        assert_ne!(base, key("ip", Some("phones"), 10, true, false));
    }

    #[test]
    fn test_none_context_distinct_from_empty() {
        assert_ne!(
            key("ip", None, 10, true, true),
            key("ip", Some(""), 10, true, true)
        );
    }

    #[test]
    fn test_get_put_and_clear() {
        let cache = SuggestionCache::new(4);
        let k = key("ip", None, 10, true, true);
        assert!(cache.get(&k).is_none());

        cache.put(k.clone(), LookupResponse::default());
        assert!(cache.get(&k).is_some());

        cache.clear();
        assert!(cache.get(&k).is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = SuggestionCache::new(1);
        let first = key("a", None, 10, true, true);
        let second = key("b", None, 10, true, true);
        cache.put(first.clone(), LookupResponse::default());
        cache.put(second.clone(), LookupResponse::default());
        assert!(cache.get(&first).is_none());
        assert!(cache.get(&second).is_some());
    }

    #[test]
    fn test_hit_rate() {
        let cache = SuggestionCache::new(4);
        let k = key("a", None, 10, true, true);
        cache.get(&k);
        cache.put(k.clone(), LookupResponse::default());
        cache.get(&k);
        assert!((cache.hit_rate() - 0.5).abs() < 1e-6);
    }
}
