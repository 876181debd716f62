use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded LRU set of entry ids that have already been fetched and
/// classified. Presence means "do not fetch again"; absence means "never
/// checked, or evicted" and the entry is re-fetched on the next run.
///
/// Ids are only inserted after a successful classification, so a stale hit
/// is impossible; an eviction merely costs one extra fetch later. Entries
/// age out through capacity pressure alone, there is no removal API.
pub struct SeenCache {
    inner: LruCache<i64, ()>,
}

impl SeenCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Membership probe. Does not refresh recency.
    pub fn contains(&self, id: i64) -> bool {
        self.inner.contains(&id)
    }

    /// Record an id as classified, evicting the least-recently-used id if
    /// the cache is full.
    pub fn insert(&mut self, id: i64) {
        self.inner.put(id, ());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
