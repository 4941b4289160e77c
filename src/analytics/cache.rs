//! Short-lived memo of computed statistics
//!
//! Entries are readable while younger than the TTL. There is no size-based
//! eviction: once the map grows past `max_entries`, the next `put` sweeps out
//! every expired entry. Under a burst of distinct live keys the map can stay
//! above `max_entries` until those keys age out.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{duration_from_secs, Clock};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

pub struct ResultCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    max_entries: usize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(clock: Arc<dyn Clock>, ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl: duration_from_secs(ttl_secs),
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if self.clock.now() - entry.stored_at < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        let now = self.clock.now();
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: now,
            },
        );

        if self.entries.len() > self.max_entries {
            let before = self.entries.len();
            self.entries.retain(|_, entry| now - entry.stored_at <= self.ttl);
            debug!(
                before,
                after = self.entries.len(),
                "swept expired stats cache entries"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(clock: &Arc<ManualClock>, max_entries: usize) -> ResultCache<u64> {
        let clock: Arc<dyn Clock> = clock.clone();
        ResultCache::new(clock, DEFAULT_CACHE_TTL_SECS, max_entries)
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, DEFAULT_CACHE_MAX_ENTRIES);

        cache.put("summary_stats", 7);
        clock.advance(TimeDelta::seconds(59));
        assert_eq!(cache.get("summary_stats"), Some(7));
    }

    #[test]
    fn test_cache_miss_after_ttl() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, DEFAULT_CACHE_MAX_ENTRIES);

        cache.put("summary_stats", 7);
        clock.advance(TimeDelta::seconds(61));
        assert_eq!(cache.get("summary_stats"), None);
    }

    #[test]
    fn test_cache_entry_expires_exactly_at_ttl() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, DEFAULT_CACHE_MAX_ENTRIES);

        cache.put("k", 1);
        clock.advance(TimeDelta::seconds(60));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_cache_put_overwrites() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, DEFAULT_CACHE_MAX_ENTRIES);

        cache.put("k", 1);
        cache.put("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, 3);

        cache.put("old-1", 1);
        cache.put("old-2", 2);
        clock.advance(TimeDelta::seconds(120));
        cache.put("fresh-1", 3);
        assert_eq!(cache.len(), 3);

        // Fourth entry crosses the threshold and triggers the sweep
        cache.put("fresh-2", 4);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("fresh-1"), Some(3));
        assert_eq!(cache.get("fresh-2"), Some(4));
    }

    #[test]
    fn test_oversized_ttl_still_caches() {
        let clock = Arc::new(ManualClock::at_epoch());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let cache = ResultCache::new(dyn_clock, u64::MAX, DEFAULT_CACHE_MAX_ENTRIES);

        cache.put("k", 1);
        clock.advance(TimeDelta::days(365));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_live_entries_can_exceed_capacity() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(&clock, 3);

        for i in 0..6 {
            cache.put(format!("page_stats_/p{i}"), i);
        }
        assert_eq!(cache.len(), 6);
    }
}
