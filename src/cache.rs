use crate::metadata::AppMetadata;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry {
    metadata: AppMetadata,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Ephemeral per-process cache of scraped records, keyed `app_<id>`.
///
/// Only fresh records belong here; degraded ones must be retried.
pub struct MetadataCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    enabled: bool,
}

pub fn cache_key(app_id: &str) -> String {
    format!("app_{app_id}")
}

impl MetadataCache {
    pub fn new(ttl: Duration, enabled: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, false)
    }

    pub fn get(&self, app_id: &str) -> Option<AppMetadata> {
        if !self.enabled {
            return None;
        }

        let key = cache_key(app_id);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(&key) {
                None => return None,
                Some(entry) if !entry.is_stale(self.ttl) => return Some(entry.metadata.clone()),
                Some(_) => {}
            }
        }

        log::debug!("cache key={key} expired");
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // re-check, another request may have refreshed it meanwhile
        if entries.get(&key).is_some_and(|entry| entry.is_stale(self.ttl)) {
            entries.remove(&key);
        }

        None
    }

    pub fn insert(&self, metadata: AppMetadata) {
        if !self.enabled {
            return;
        }

        let key = cache_key(&metadata.id);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        // ids that are never read again would otherwise stay forever
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(self.ttl));
        if entries.len() < before {
            log::debug!("cache swept {} expired entries", before - entries.len());
        }

        entries.insert(
            key,
            CacheEntry {
                metadata,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> AppMetadata {
        AppMetadata {
            downloads: "10K+".into(),
            ..AppMetadata::degraded(id, "u")
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(cache_key("com.example"), "app_com.example");
    }

    #[test]
    fn test_hit() {
        let cache = MetadataCache::new(Duration::from_secs(60), true);
        cache.insert(record("a"));
        assert_eq!(cache.get("a"), Some(record("a")));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = MetadataCache::new(Duration::ZERO, true);
        cache.insert(record("a"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_insert_sweeps_expired_entries() {
        let cache = MetadataCache::new(Duration::from_millis(20), true);
        cache.insert(record("a"));
        cache.insert(record("b"));
        std::thread::sleep(Duration::from_millis(40));

        cache.insert(record("c"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("c"), Some(record("c")));
    }

    #[test]
    fn test_disabled() {
        let cache = MetadataCache::disabled();
        cache.insert(record("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }
}
