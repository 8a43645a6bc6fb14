//! Concurrency discipline for one collection.

use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit};

/// Number of reads a collection admits concurrently.
pub const READER_PERMITS: usize = 10;

/// The three primitives guarding a collection.
///
/// - the **writer lock** serializes mutations and is held across every
///   suspension point inside them;
/// - the **reader semaphore** bounds concurrent read admissions;
/// - the **flusher gate** lets readers and the writer wait out an
///   in-flight page write: the flusher holds the write side while a
///   page is on its way to disk, everyone else holds the read side for
///   the duration of their file access.
///
/// Readers never take the writer lock. The writer takes the flush gate
/// only when it explicitly initiates a flush (rotation or an explicit
/// `flush()`), and releases it before returning.
#[derive(Debug)]
pub(crate) struct WriteCoordinator {
    writer: Mutex<()>,
    readers: Semaphore,
    flusher: RwLock<()>,
}

impl WriteCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            writer: Mutex::new(()),
            readers: Semaphore::new(READER_PERMITS),
            flusher: RwLock::new(()),
        }
    }

    /// Acquires the exclusive writer lock.
    pub(crate) async fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Admits one reader, waiting when the admission bound is reached.
    pub(crate) async fn begin_read(&self) -> SemaphorePermit<'_> {
        self.readers
            .acquire()
            .await
            .expect("reader semaphore is never closed")
    }

    /// Waits until no flush is in progress; the returned guard keeps it
    /// that way while file bytes are being read.
    pub(crate) async fn flusher_idle(&self) -> RwLockReadGuard<'_, ()> {
        self.flusher.read().await
    }

    /// Takes the exclusive flusher lock for the duration of a page
    /// write.
    pub(crate) async fn begin_flush(&self) -> RwLockWriteGuard<'_, ()> {
        self.flusher.write().await
    }
}
