//! URL-keyed LRU read-through cache.
//!
//! Keyed by URL only: several tabs showing the same URL share one slot,
//! matching the per-key retention of one record.

// ============================================================================
// Imports
// ============================================================================

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::identifiers::RecordId;

use super::record::ThumbnailRecord;

// ============================================================================
// Constants
// ============================================================================

/// Default number of cached URLs.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

// ============================================================================
// ThumbnailCache
// ============================================================================

/// Bounded URL -> record map with least-recently-used eviction.
///
/// A capacity of zero disables caching.
#[derive(Debug)]
pub(crate) struct ThumbnailCache {
    entries: Option<LruCache<String, ThumbnailRecord>>,
}

impl ThumbnailCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// Returns the entry and marks it most recently used.
    pub fn get(&mut self, url: &str) -> Option<ThumbnailRecord> {
        self.entries.as_mut()?.get(url).cloned()
    }

    /// Inserts or refreshes an entry, evicting the least recently used.
    pub fn insert(&mut self, record: ThumbnailRecord) {
        if let Some(entries) = self.entries.as_mut() {
            entries.put(record.url.clone(), record);
        }
    }

    /// Inserts `record` unless the slot already holds a newer one.
    pub fn insert_if_newer(&mut self, record: ThumbnailRecord) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };

        let stale = entries.peek(record.url.as_str()).is_some_and(|cached| {
            (cached.captured_at, cached.id) > (record.captured_at, record.id)
        });
        if !stale {
            entries.put(record.url.clone(), record);
        }
    }

    /// Drops entries whose record id was deleted from the store.
    pub fn evict_ids(&mut self, ids: &[RecordId]) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        if ids.is_empty() {
            return;
        }

        let doomed: Vec<String> = entries
            .iter()
            .filter(|(_, record)| ids.contains(&record.id))
            .map(|(url, _)| url.clone())
            .collect();
        for url in doomed {
            entries.pop(url.as_str());
        }
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capture::CaptureKind;
    use crate::identifiers::{TabId, WindowId};

    fn record(id: i64, url: &str) -> ThumbnailRecord {
        ThumbnailRecord {
            id: RecordId::new(id),
            tab_id: TabId::new(1),
            window_id: WindowId::new(1),
            url: url.to_string(),
            kind: CaptureKind::First,
            image: vec![1, 2, 3],
            mime_type: "image/jpeg".to_string(),
            width: 800,
            height: 500,
            dpr: 1.0,
            captured_at: id,
        }
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(record(1, "a"));
        cache.insert(record(2, "b"));

        // Reading "a" makes "b" the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.insert(record(3, "c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_refresh_replaces_record() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(record(1, "a"));
        cache.insert(record(2, "b"));
        cache.insert(record(5, "a"));
        cache.insert(record(6, "c"));

        assert_eq!(cache.get("a").map(|r| r.id), Some(RecordId::new(5)));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_insert_if_newer_keeps_newer_entry() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(record(9, "a"));

        // A lookup that read an older row must not replace the newer one.
        cache.insert_if_newer(record(4, "a"));
        assert_eq!(cache.get("a").map(|r| r.id), Some(RecordId::new(9)));

        cache.insert_if_newer(record(12, "a"));
        assert_eq!(cache.get("a").map(|r| r.id), Some(RecordId::new(12)));

        cache.insert_if_newer(record(3, "b"));
        assert_eq!(cache.get("b").map(|r| r.id), Some(RecordId::new(3)));
    }

    #[test]
    fn test_evict_ids() {
        let mut cache = ThumbnailCache::new(4);
        cache.insert(record(1, "a"));
        cache.insert(record(2, "b"));

        cache.evict_ids(&[RecordId::new(1), RecordId::new(99)]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a").is_none());

        cache.insert(record(3, "c"));
        cache.insert(record(4, "d"));
        cache.insert(record(7, "e"));
        cache.insert(record(8, "f"));
        assert_eq!(cache.len(), 4);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let mut cache = ThumbnailCache::new(0);
        cache.insert(record(1, "a"));
        cache.insert_if_newer(record(2, "b"));
        cache.evict_ids(&[RecordId::new(1)]);
        assert_eq!(cache.len(), 0);
        assert!(cache.get("a").is_none());
    }
}
