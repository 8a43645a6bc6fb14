//! LRU cache of recently evicted or read-back pages.

use crate::page::tree::PageTree;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of pages the cache retains.
pub const DEFAULT_CACHE_CAPACITY: usize = 5;

/// A bounded LRU of decoded page trees, keyed by page byte position.
///
/// Pages land here when rotation evicts them from the mutable slot and
/// when a query decodes them back from disk. Trees are shared via `Arc`
/// so read snapshots never copy a page.
pub struct PageCache {
    pages: LruCache<u64, Arc<PageTree>>,
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("len", &self.pages.len())
            .field("capacity", &self.pages.cap())
            .finish()
    }
}

impl PageCache {
    /// Creates a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding up to `capacity` pages.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            pages: LruCache::new(capacity),
        }
    }

    /// Inserts a page, evicting the least recently used when full.
    pub fn insert(&mut self, position: u64, tree: Arc<PageTree>) {
        self.pages.put(position, tree);
    }

    /// Looks up a page and promotes it to most recently used.
    pub fn get(&mut self, position: u64) -> Option<Arc<PageTree>> {
        self.pages.get(&position).cloned()
    }

    /// Promotes a page to most recently used without cloning it.
    pub fn touch(&mut self, position: u64) {
        self.pages.promote(&position);
    }

    /// Snapshots the cached pages in most-recently-used-first order
    /// without disturbing recency.
    pub fn snapshot_mru(&self) -> Vec<(u64, Arc<PageTree>)> {
        self.pages
            .iter()
            .map(|(pos, tree)| (*pos, Arc::clone(tree)))
            .collect()
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no pages are cached.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}
