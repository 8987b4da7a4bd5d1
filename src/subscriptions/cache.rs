use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::catalog::SubscriptionFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub flags: SubscriptionFlags,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// Last computed flags per IGDB game id, shared by every library row
/// referencing that game. Reads never touch `cached_at`.
#[derive(Debug)]
pub struct SubscriptionCache {
    entries: HashMap<i64, CacheEntry>,
    ttl: Duration,
}

impl SubscriptionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Any entry regardless of age.
    pub fn get(&self, igdb_id: i64) -> Option<&CacheEntry> {
        self.entries.get(&igdb_id)
    }

    pub fn get_fresh(&self, igdb_id: i64, now: DateTime<Utc>) -> Option<SubscriptionFlags> {
        self.entries
            .get(&igdb_id)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.flags)
    }

    pub fn insert(&mut self, igdb_id: i64, flags: SubscriptionFlags, cached_at: DateTime<Utc>) {
        self.entries.insert(igdb_id, CacheEntry { flags, cached_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> SubscriptionFlags {
        SubscriptionFlags {
            ps_plus: true,
            ..Default::default()
        }
    }

    #[test]
    fn entry_just_inside_ttl_is_fresh() {
        let now = Utc::now();
        let mut cache = SubscriptionCache::new(Duration::hours(24));
        cache.insert(1942, flags(), now - Duration::hours(23) - Duration::minutes(59));

        assert_eq!(cache.get_fresh(1942, now), Some(flags()));
    }

    #[test]
    fn entry_past_ttl_is_stale_but_still_readable() {
        let now = Utc::now();
        let mut cache = SubscriptionCache::new(Duration::hours(24));
        cache.insert(1942, flags(), now - Duration::hours(24) - Duration::minutes(1));

        assert_eq!(cache.get_fresh(1942, now), None);
        assert_eq!(cache.get(1942).map(|e| e.flags), Some(flags()));
    }

    #[test]
    fn entry_exactly_at_ttl_is_stale() {
        let now = Utc::now();
        let mut cache = SubscriptionCache::new(Duration::hours(24));
        cache.insert(7, flags(), now - Duration::hours(24));

        assert_eq!(cache.get_fresh(7, now), None);
    }

    #[test]
    fn reads_do_not_refresh_cached_at() {
        let now = Utc::now();
        let cached_at = now - Duration::hours(2);
        let mut cache = SubscriptionCache::new(Duration::hours(24));
        cache.insert(7, flags(), cached_at);

        let _ = cache.get_fresh(7, now);
        let _ = cache.get(7);

        assert_eq!(cache.get(7).map(|e| e.cached_at), Some(cached_at));
    }

    #[test]
    fn missing_entry() {
        let cache = SubscriptionCache::new(Duration::hours(24));
        assert!(cache.is_empty());
        assert_eq!(cache.get_fresh(99, Utc::now()), None);
    }
}
