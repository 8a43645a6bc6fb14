//! Read operations.
//!
//! Every read snapshots `max_lsn` on entry and ignores entries newer
//! than the snapshot. A visited set of ids is carried through the
//! mutable page, the cache, and the file so that only the newest
//! version of each id is considered; older versions and tombstones
//! further down the walk are shadowed.

use crate::collection::{Collection, CollectionStats};
use crate::document::Document;
use crate::error::CoreResult;
use crate::model::Model;
use crate::page::RecordKey;
use std::collections::HashSet;
use std::sync::Arc;

/// A filter over model instances.
pub type Predicate<M> = dyn Fn(&M) -> bool + Send + Sync;

/// What a point-style operation searches for: an id or the first
/// instance matching a predicate.
pub enum Selector<'a, M> {
    /// Point lookup by id.
    Id(u32),
    /// First instance satisfying the predicate, newest-id first.
    Matching(&'a Predicate<M>),
}

impl<'a, M> Selector<'a, M> {
    /// Selects by id.
    pub const fn id(id: u32) -> Self {
        Self::Id(id)
    }

    /// Selects the first match of the predicate.
    pub const fn matching(predicate: &'a Predicate<M>) -> Self {
        Self::Matching(predicate)
    }
}

/// Pagination window for [`Collection::find`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Matches to skip from the front of the result.
    pub offset: Option<usize>,
    /// Maximum matches to return.
    pub limit: Option<usize>,
}

impl FindOptions {
    /// No offset, no limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offset: None,
            limit: None,
        }
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl<M: Model> Collection<M> {
    /// Finds one instance by id or predicate.
    pub async fn find_one(&self, selector: Selector<'_, M>) -> CoreResult<Option<M>> {
        let _permit = self.shared.coordinator.begin_read().await;
        match selector {
            Selector::Id(id) => self.find_one_by_id(id).await,
            Selector::Matching(predicate) => self.find_one_matching(predicate).await,
        }
    }

    /// Returns whether the selector matches anything.
    pub async fn exists(&self, selector: Selector<'_, M>) -> CoreResult<bool> {
        Ok(self.find_one(selector).await?.is_some())
    }

    /// Finds every live instance matching the predicate (or all, when
    /// absent), windowed by `options`.
    ///
    /// Returns `None` instead of an empty vector, so "nothing matched"
    /// reads the same way whether or not a window was applied.
    pub async fn find(
        &self,
        predicate: Option<&Predicate<M>>,
        options: FindOptions,
    ) -> CoreResult<Option<Vec<M>>> {
        let _permit = self.shared.coordinator.begin_read().await;
        let mut matches = Vec::new();
        self.scan_visible(|id, doc| {
            let Some(doc) = doc else { return Ok(true) };
            let instance = M::from_document(id, doc)?;
            if predicate.is_none_or(|predicate| predicate(&instance)) {
                matches.push(instance);
            }
            Ok(true)
        })
        .await?;

        let offset = options.offset.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        let window: Vec<M> = matches.into_iter().skip(offset).take(limit).collect();
        Ok((!window.is_empty()).then_some(window))
    }

    /// Counts live instances matching the predicate (or all, when
    /// absent).
    ///
    /// Without a predicate this never constructs model instances.
    pub async fn count(&self, predicate: Option<&Predicate<M>>) -> CoreResult<usize> {
        let _permit = self.shared.coordinator.begin_read().await;
        let mut total = 0usize;
        self.scan_visible(|id, doc| {
            let Some(doc) = doc else { return Ok(true) };
            match predicate {
                None => total += 1,
                Some(predicate) => {
                    if predicate(&M::from_document(id, doc)?) {
                        total += 1;
                    }
                }
            }
            Ok(true)
        })
        .await?;
        Ok(total)
    }

    /// Finds matches and maps each through `mapper` concurrently, one
    /// task per match, each holding a permit from the database-wide
    /// limiter. Results come back in match order; per-element mapper
    /// failures are dropped silently.
    pub async fn find_and_map<R, E, F>(
        &self,
        predicate: Option<&Predicate<M>>,
        mapper: F,
    ) -> CoreResult<Vec<R>>
    where
        F: Fn(M) -> Result<R, E> + Send + Sync + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let matches = self
            .find(predicate, FindOptions::new())
            .await?
            .unwrap_or_default();

        let mapper = Arc::new(mapper);
        let mut handles = Vec::with_capacity(matches.len());
        for instance in matches {
            let limiter = Arc::clone(&self.limiter);
            let mapper = Arc::clone(&mapper);
            handles.push(tokio::spawn(async move {
                let _slot = limiter
                    .acquire_owned()
                    .await
                    .expect("database limiter is never closed");
                mapper(instance)
            }));
        }

        let mut mapped = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(Ok(result)) = handle.await {
                mapped.push(result);
            }
        }
        Ok(mapped)
    }

    /// Reports counters and sizes for this collection.
    pub async fn stats(&self) -> CoreResult<CollectionStats> {
        let _permit = self.shared.coordinator.begin_read().await;
        let mut live = 0usize;
        let mut tombstones = 0usize;
        self.scan_visible(|_, doc| {
            if doc.is_some() {
                live += 1;
            } else {
                tombstones += 1;
            }
            Ok(true)
        })
        .await?;

        let state = self.shared.state.lock();
        Ok(CollectionStats {
            name: self.shared.name.clone(),
            live,
            tombstones,
            current_entries: state.current_page.len(),
            pages: state.file_size / self.shared.file.page_size() as u64,
            file_size: state.file_size,
            max_id: state.max_id,
            max_lsn: state.max_lsn,
            last_flushed_lsn: state.last_flushed_lsn,
        })
    }

    /// Point lookup by id via floor probes.
    async fn find_one_by_id(&self, id: u32) -> CoreResult<Option<M>> {
        let shared = &self.shared;

        // Memory and cache phases share one state lock section so the
        // snapshot and the probes cannot interleave with a mutation.
        let (snapshot_lsn, resolved) = {
            let mut state = shared.state.lock();
            let Some(snapshot_lsn) = state.max_lsn else {
                return Ok(None);
            };
            if state.max_id.is_none_or(|max| id > max) {
                return Ok(None);
            }
            let probe = RecordKey::new(id, snapshot_lsn);

            let mut resolved = state
                .current_page
                .floor(probe)
                .filter(|(key, _)| key.id == id)
                .map(|(_, value)| value.clone());

            if resolved.is_none() {
                for (position, tree) in state.cache.snapshot_mru() {
                    if let Some((key, value)) = tree.floor(probe) {
                        if key.id == id {
                            state.cache.touch(position);
                            resolved = Some(value.clone());
                            break;
                        }
                    }
                }
            }
            (snapshot_lsn, resolved)
        };

        if let Some(value) = resolved {
            return match value.document() {
                Some(doc) => Ok(Some(M::from_document(id, doc)?)),
                None => Ok(None),
            };
        }

        // File phase: newest page first, down to page 0.
        let probe = RecordKey::new(id, snapshot_lsn);
        let page_size = shared.file.page_size() as u64;
        let mut position = shared.page_position(snapshot_lsn);
        loop {
            if let Some(tree) = shared.read_page_from_disk(position).await? {
                if let Some((key, value)) = tree.floor(probe) {
                    if key.id == id {
                        return match value.document() {
                            Some(doc) => Ok(Some(M::from_document(id, doc)?)),
                            None => Ok(None),
                        };
                    }
                }
            }
            if position == 0 {
                break;
            }
            position -= page_size;
        }
        Ok(None)
    }

    /// First instance matching the predicate along the visibility walk.
    async fn find_one_matching(&self, predicate: &Predicate<M>) -> CoreResult<Option<M>> {
        let mut found = None;
        self.scan_visible(|id, doc| {
            let Some(doc) = doc else { return Ok(true) };
            let instance = M::from_document(id, doc)?;
            if predicate(&instance) {
                found = Some(instance);
                return Ok(false);
            }
            Ok(true)
        })
        .await?;
        Ok(found)
    }

    /// Walks the newest visible version of every id: mutable page, then
    /// cached pages (most recently used first), then file pages newest
    /// to oldest.
    ///
    /// `visit` receives the id and its newest document (`None` for a
    /// tombstone) and returns `false` to stop the walk.
    pub(crate) async fn scan_visible<F>(&self, mut visit: F) -> CoreResult<()>
    where
        F: FnMut(u32, Option<&Document>) -> CoreResult<bool>,
    {
        let shared = &self.shared;
        let (snapshot_lsn, current, cached) = {
            let state = shared.state.lock();
            let Some(snapshot_lsn) = state.max_lsn else {
                return Ok(());
            };
            (
                snapshot_lsn,
                state.current_page.clone(),
                state.cache.snapshot_mru(),
            )
        };

        let mut visited: HashSet<u32> = HashSet::new();

        for (key, value) in current.iter_desc() {
            if key.lsn > snapshot_lsn || !visited.insert(key.id) {
                continue;
            }
            if !visit(key.id, value.document())? {
                return Ok(());
            }
        }

        for (_, tree) in &cached {
            for (key, value) in tree.iter_desc() {
                if key.lsn > snapshot_lsn || !visited.insert(key.id) {
                    continue;
                }
                if !visit(key.id, value.document())? {
                    return Ok(());
                }
            }
        }

        let page_size = shared.file.page_size() as u64;
        let mut position = shared.page_position(snapshot_lsn);
        loop {
            if let Some(tree) = shared.read_page_from_disk(position).await? {
                for (key, value) in tree.iter_desc() {
                    if key.lsn > snapshot_lsn || !visited.insert(key.id) {
                        continue;
                    }
                    if !visit(key.id, value.document())? {
                        return Ok(());
                    }
                }
            }
            if position == 0 {
                break;
            }
            position -= page_size;
        }
        Ok(())
    }
}
