//! In-memory caching for the reward definition set

use shake_core::RewardDefinition;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry {
    definitions: Vec<RewardDefinition>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Thread-safe cache for the session's reward definitions with TTL.
///
/// Definitions are immutable once fetched for a session but refreshed
/// opportunistically after each claim, so the claim path invalidates
/// this cache the same way a trade invalidates stale price data.
pub struct DefinitionsCache {
    entry: RwLock<Option<CacheEntry>>,
    default_ttl: Duration,
}

impl DefinitionsCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            default_ttl,
        }
    }

    /// Get the cached definitions if not expired
    pub fn get(&self) -> Option<Vec<RewardDefinition>> {
        let guard = self.entry.read().ok()?;
        let entry = guard.as_ref()?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.definitions.clone())
        }
    }

    /// Store a freshly fetched definition set
    pub fn insert(&self, definitions: Vec<RewardDefinition>) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = Some(CacheEntry {
                definitions,
                inserted_at: Instant::now(),
                ttl: self.default_ttl,
            });
        }
    }

    /// Drop the cached set (e.g. after a claim changes what's affordable)
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }
}

impl Default for DefinitionsCache {
    fn default() -> Self {
        // Definitions change rarely; refresh at most every 5 minutes
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shake_core::fallback_ladder;

    #[test]
    fn test_insert_get_invalidate() {
        let cache = DefinitionsCache::default();
        assert!(cache.is_empty());

        cache.insert(fallback_ladder());
        assert_eq!(cache.get().unwrap().len(), 5);

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_not_returned() {
        let cache = DefinitionsCache::new(Duration::from_millis(0));
        cache.insert(fallback_ladder());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get().is_none());
    }
}
