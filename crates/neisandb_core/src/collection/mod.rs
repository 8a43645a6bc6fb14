//! Collections: per-file document stores.
//!
//! A collection owns one page file. Mutations go into an in-memory page
//! tree; when the tree reaches capacity it is flushed to its LSN-derived
//! slot and rotated out. Reads walk pages newest-to-oldest so the latest
//! version of every id wins.

mod coordinator;
mod mutation;
mod query;

pub use query::{FindOptions, Predicate, Selector};

use crate::config::CollectionConfig;
use crate::error::CoreResult;
use crate::model::Model;
use crate::page::{PageCache, PageFile, PageTree};
use crate::schema::Schema;
use coordinator::WriteCoordinator;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Mutable per-collection state.
///
/// Guarded by a short-lived synchronous lock; never held across an
/// await.
#[derive(Debug)]
pub(crate) struct State {
    /// The active mutable page tree.
    pub(crate) current_page: PageTree,
    /// LRU of recently evicted or read-back pages.
    pub(crate) cache: PageCache,
    /// Largest id ever allocated; `None` until the first insert.
    pub(crate) max_id: Option<u32>,
    /// Largest LSN ever allocated; `None` until the first mutation.
    pub(crate) max_lsn: Option<u64>,
    /// Largest LSN whose page has been durably written.
    pub(crate) last_flushed_lsn: Option<u64>,
    /// Known end-of-file byte offset.
    pub(crate) file_size: u64,
}

/// Engine internals shared by the typed handle, the flush timer, and
/// clones of the collection.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) file: PageFile,
    pub(crate) tree_capacity: usize,
    /// First id/LSN value (0 or 1); also the base of the page math.
    pub(crate) base: u64,
    flush_debounce: Duration,
    pub(crate) coordinator: WriteCoordinator,
    pub(crate) state: Mutex<State>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    /// Byte position of the page holding the given LSN.
    pub(crate) fn page_position(&self, lsn: u64) -> u64 {
        let index = (lsn - self.base) / self.tree_capacity as u64;
        index * self.file.page_size() as u64
    }

    /// Allocates the next LSN, updating `max_lsn` before the caller
    /// places the entry.
    pub(crate) fn allocate_lsn(state: &mut State, base: u64) -> u64 {
        let next = state.max_lsn.map_or(base, |lsn| lsn + 1);
        state.max_lsn = Some(next);
        next
    }

    /// Allocates the next id, updating `max_id` before the caller
    /// places the entry.
    pub(crate) fn allocate_id(state: &mut State, base: u64) -> u32 {
        let next = state.max_id.map_or(base as u32, |id| id + 1);
        state.max_id = Some(next);
        next
    }

    /// Flushes the current page to the slot derived from `lsn`.
    ///
    /// No-op when everything at or below `lsn` is already durable. The
    /// flusher lock is held for exactly the duration of the page write.
    pub(crate) async fn internal_flush(&self, lsn: Option<u64>) -> CoreResult<()> {
        let Some(lsn) = lsn else { return Ok(()) };
        if self.flushed_at_least(lsn) {
            return Ok(());
        }

        let _flush = self.coordinator.begin_flush().await;
        // Re-check: another flush may have won the gate first.
        let tree = {
            let state = self.state.lock();
            if state.last_flushed_lsn.is_some_and(|flushed| flushed >= lsn) {
                return Ok(());
            }
            state.current_page.clone()
        };

        self.file.ensure_exists().await?;
        let position = self.page_position(lsn);
        self.file.write_page(position, &tree).await?;

        let mut state = self.state.lock();
        state.file_size = state.file_size.max(position + self.file.page_size() as u64);
        state.last_flushed_lsn = Some(lsn);
        info!(collection = %self.name, lsn, position, "flushed page");
        Ok(())
    }

    fn flushed_at_least(&self, lsn: u64) -> bool {
        self.state
            .lock()
            .last_flushed_lsn
            .is_some_and(|flushed| flushed >= lsn)
    }

    /// Arms (or re-arms) the debounced flush timer.
    fn arm_flush_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let delay = self.flush_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                let lsn = shared.state.lock().max_lsn;
                if let Err(error) = shared.internal_flush(lsn).await {
                    warn!(collection = %shared.name, %error, "debounced flush failed");
                }
            }
        });
        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Cancels the debounced flush timer, if armed.
    pub(crate) fn cancel_flush_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }

    /// The page rotation protocol, applied after every mutation.
    ///
    /// Under capacity: (re-)arm the debounced flush. At capacity:
    /// cancel the timer, flush the full page to its slot, move it into
    /// the cache, and start a fresh page. `arm_timer` is false inside
    /// batch mutations, which manage the timer around the whole batch.
    pub(crate) async fn after_mutation(self: &Arc<Self>, arm_timer: bool) -> CoreResult<()> {
        let (full, max_lsn) = {
            let state = self.state.lock();
            (
                state.current_page.is_full(self.tree_capacity),
                state.max_lsn,
            )
        };

        if !full {
            if arm_timer {
                self.arm_flush_timer();
            }
            return Ok(());
        }

        self.cancel_flush_timer();
        self.internal_flush(max_lsn).await?;

        let mut state = self.state.lock();
        let sealed = std::mem::take(&mut state.current_page);
        let lsn = max_lsn.expect("a full page holds at least one LSN");
        let position = self.page_position(lsn);
        state.cache.insert(position, Arc::new(sealed));
        info!(collection = %self.name, position, "rotated page");
        Ok(())
    }

    /// Reads a page from disk, waiting out any in-flight flush, and
    /// retains the decoded tree in the cache.
    pub(crate) async fn read_page_from_disk(
        &self,
        position: u64,
    ) -> CoreResult<Option<Arc<PageTree>>> {
        let tree = {
            let _idle = self.coordinator.flusher_idle().await;
            self.file.read_page(position).await?
        };
        Ok(tree.map(|tree| {
            let tree = Arc::new(tree);
            self.state.lock().cache.insert(position, Arc::clone(&tree));
            tree
        }))
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("name", &self.name)
            .field("tree_capacity", &self.tree_capacity)
            .finish_non_exhaustive()
    }
}

/// Point-in-time counters and sizes for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Visible live documents.
    pub live: usize,
    /// Ids whose newest version is a tombstone.
    pub tombstones: usize,
    /// Entries in the active page tree.
    pub current_entries: usize,
    /// Whole pages on disk.
    pub pages: u64,
    /// File size in bytes.
    pub file_size: u64,
    /// Largest id allocated.
    pub max_id: Option<u32>,
    /// Largest LSN allocated.
    pub max_lsn: Option<u64>,
    /// Largest LSN durably written.
    pub last_flushed_lsn: Option<u64>,
}

/// A typed, file-backed document collection.
///
/// Cheap to clone; all clones share the same engine state. Safe to use
/// from concurrent tasks: mutations serialize behind the writer lock,
/// reads are admitted up to the reader bound.
pub struct Collection<M: Model> {
    pub(crate) shared: Arc<Shared>,
    pub(crate) schema: Arc<Schema>,
    pub(crate) uniques: Arc<[String]>,
    pub(crate) limiter: Arc<Semaphore>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for Collection<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            schema: Arc::clone(&self.schema),
            uniques: Arc::clone(&self.uniques),
            limiter: Arc::clone(&self.limiter),
            _marker: PhantomData,
        }
    }
}

impl<M: Model> Collection<M> {
    /// Opens the collection file and seeds engine state from it.
    ///
    /// If the file holds at least one page, the *last* page seeds
    /// `max_id`, `max_lsn`, and the flush watermark. A recovered page
    /// that is already full goes straight to the cache and a fresh
    /// mutable page is started; otherwise the recovered page becomes
    /// the mutable page again.
    pub(crate) async fn open(
        path: &Path,
        config: CollectionConfig,
        schema: Schema,
        limiter: Arc<Semaphore>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let file = PageFile::new(path, config.page_size);
        let page_size = config.page_size as u64;

        let mut state = State {
            current_page: PageTree::new(),
            cache: PageCache::new(),
            max_id: None,
            max_lsn: None,
            last_flushed_lsn: None,
            file_size: file.size().await?,
        };

        if state.file_size >= page_size {
            let last_position = (state.file_size / page_size - 1) * page_size;
            if let Some(recovered) = file.read_page(last_position).await? {
                state.max_id = recovered.max_id();
                state.max_lsn = recovered.max_lsn();
                state.last_flushed_lsn = state.max_lsn;
                if recovered.is_full(config.tree_capacity) {
                    state.cache.insert(last_position, Arc::new(recovered));
                } else {
                    state.current_page = recovered;
                }
                debug!(
                    collection = %config.name,
                    max_id = ?state.max_id,
                    max_lsn = ?state.max_lsn,
                    "recovered collection state"
                );
            }
        }

        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name,
                file,
                tree_capacity: config.tree_capacity,
                base: config.id_start.base(),
                flush_debounce: config.flush_debounce,
                coordinator: WriteCoordinator::new(),
                state: Mutex::new(state),
                timer: Mutex::new(None),
            }),
            schema: Arc::new(schema),
            uniques: config.uniques.into(),
            limiter,
            _marker: PhantomData,
        })
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Cancels the debounce timer and flushes everything allocated so
    /// far.
    ///
    /// Afterwards `max_lsn == last_flushed_lsn`.
    pub async fn flush(&self) -> CoreResult<()> {
        self.shared.cancel_flush_timer();
        let lsn = self.shared.state.lock().max_lsn;
        self.shared.internal_flush(lsn).await
    }

    /// Flushes and releases this handle.
    ///
    /// Other clones of the collection remain usable.
    pub async fn close(self) -> CoreResult<()> {
        self.flush().await
    }
}

impl<M: Model> std::fmt::Debug for Collection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}
