//! Write operations.
//!
//! All mutations run under the exclusive writer lock. Each allocates
//! one LSN (inserts also allocate an id), places its entry in the
//! mutable page, then applies the rotation protocol: arm the debounced
//! flush while the page has room, or flush-and-rotate once it is full.

use crate::collection::{Collection, FindOptions, Predicate, Selector, Shared};
use crate::document::Document;
use crate::error::{CoreResult, Rejection, WriteOutcome};
use crate::model::Model;
use crate::page::{PageTree, PageValue, RecordKey};
use std::collections::HashSet;

impl<M: Model> Collection<M> {
    /// Inserts a validated document, allocating a fresh id.
    ///
    /// The payload is validated against the collection schema, then
    /// checked against every unique field over live records in memory
    /// and on disk. Both refusals come back as
    /// [`WriteOutcome::Rejected`] keyed by the offending field.
    pub async fn insert(&self, payload: Document) -> CoreResult<WriteOutcome<M>> {
        let _writer = self.shared.coordinator.begin_write().await;
        drop(self.shared.coordinator.flusher_idle().await);

        let parsed = match self.schema.validate(&payload) {
            Ok(parsed) => parsed,
            Err(errors) => return Ok(WriteOutcome::Rejected(Rejection::Validation(errors))),
        };

        // No id compares equal to a record that does not exist yet.
        if let Some(field) = self.unique_conflict(&parsed, None).await? {
            return Ok(WriteOutcome::Rejected(Rejection::UniqueConflict { field }));
        }

        let id = {
            let mut state = self.shared.state.lock();
            let lsn = Shared::allocate_lsn(&mut state, self.shared.base);
            let id = Shared::allocate_id(&mut state, self.shared.base);
            state
                .current_page
                .set(RecordKey::new(id, lsn), PageValue::Live(parsed.clone()));
            id
        };

        self.shared.after_mutation(true).await?;
        Ok(WriteOutcome::Written(M::from_document(id, &parsed)?))
    }

    /// Resolves the selector, runs `updater` on the instance, and
    /// writes the result as a new version of the same id.
    ///
    /// Refused when the selector matches nothing, the updater declines,
    /// the updated document fails validation, or a unique field would
    /// collide with another live record.
    pub async fn find_one_and_update<F>(
        &self,
        selector: Selector<'_, M>,
        updater: F,
    ) -> CoreResult<WriteOutcome<M>>
    where
        F: FnOnce(&mut M) -> Result<(), String>,
    {
        let _writer = self.shared.coordinator.begin_write().await;

        let Some(instance) = self.find_one(selector).await? else {
            return Ok(WriteOutcome::Rejected(Rejection::NoMatch));
        };
        self.apply_update(instance, updater, true).await
    }

    /// Resolves the selector and writes a tombstone over the match.
    ///
    /// Returns the pre-deletion instance, or `None` when nothing
    /// matched; a missing target is not a failure.
    pub async fn find_one_and_delete(&self, selector: Selector<'_, M>) -> CoreResult<Option<M>> {
        let _writer = self.shared.coordinator.begin_write().await;

        let Some(instance) = self.find_one(selector).await? else {
            return Ok(None);
        };
        self.apply_delete(&instance, true).await?;
        Ok(Some(instance))
    }

    /// Updates every match of the predicate (or every record, when
    /// absent) through `updater`.
    ///
    /// The debounced flush is suspended around the batch. Matches are
    /// processed one at a time: the updater is synchronous and every
    /// per-record step runs under the outer writer lock, so there is no
    /// work left to overlap. The first per-record refusal aborts the
    /// remainder and becomes the operation's rejection. Records updated
    /// before it stay updated: the store is log-structured and has no
    /// rollback.
    pub async fn find_and_update<F>(
        &self,
        predicate: Option<&Predicate<M>>,
        updater: F,
    ) -> CoreResult<WriteOutcome<Vec<M>>>
    where
        F: Fn(&mut M) -> Result<(), String>,
    {
        let _writer = self.shared.coordinator.begin_write().await;

        let matches = self
            .find(predicate, FindOptions::new())
            .await?
            .unwrap_or_default();
        self.shared.cancel_flush_timer();

        let mut updated = Vec::with_capacity(matches.len());
        let mut failure = None;
        for instance in matches {
            match self.apply_update(instance, &updater, false).await? {
                WriteOutcome::Written(written) => updated.push(written),
                WriteOutcome::Rejected(rejection) => {
                    failure = Some(rejection);
                    break;
                }
            }
        }

        self.shared.arm_flush_timer();
        Ok(match failure {
            Some(rejection) => WriteOutcome::Rejected(rejection),
            None => WriteOutcome::Written(updated),
        })
    }

    /// Writes a tombstone over every match of the predicate.
    ///
    /// The predicate is mandatory: deleting a whole collection must be
    /// spelled out as a predicate that matches everything.
    pub async fn find_and_delete(&self, predicate: &Predicate<M>) -> CoreResult<Vec<M>> {
        let _writer = self.shared.coordinator.begin_write().await;

        let matches = self
            .find(Some(predicate), FindOptions::new())
            .await?
            .unwrap_or_default();
        self.shared.cancel_flush_timer();

        for instance in &matches {
            self.apply_delete(instance, false).await?;
        }

        self.shared.arm_flush_timer();
        Ok(matches)
    }

    /// The single-update path, shared by the one-shot and batch forms.
    /// Assumes the writer lock is held.
    async fn apply_update<F>(
        &self,
        mut instance: M,
        updater: F,
        arm_timer: bool,
    ) -> CoreResult<WriteOutcome<M>>
    where
        F: FnOnce(&mut M) -> Result<(), String>,
    {
        let id = instance.id();

        if let Err(message) = updater(&mut instance) {
            return Ok(WriteOutcome::Rejected(Rejection::Updater(message)));
        }

        let parsed = match self.schema.validate(&instance.to_document()) {
            Ok(parsed) => parsed,
            Err(errors) => return Ok(WriteOutcome::Rejected(Rejection::Validation(errors))),
        };

        if let Some(field) = self.unique_conflict(&parsed, Some(id)).await? {
            return Ok(WriteOutcome::Rejected(Rejection::UniqueConflict { field }));
        }

        {
            let mut state = self.shared.state.lock();
            let lsn = Shared::allocate_lsn(&mut state, self.shared.base);
            state
                .current_page
                .set(RecordKey::new(id, lsn), PageValue::Live(parsed.clone()));
        }

        self.shared.after_mutation(arm_timer).await?;
        Ok(WriteOutcome::Written(M::from_document(id, &parsed)?))
    }

    /// Writes a tombstone at a fresh LSN. Assumes the writer lock is
    /// held.
    async fn apply_delete(&self, instance: &M, arm_timer: bool) -> CoreResult<()> {
        {
            let mut state = self.shared.state.lock();
            let lsn = Shared::allocate_lsn(&mut state, self.shared.base);
            state
                .current_page
                .set(RecordKey::new(instance.id(), lsn), PageValue::Deleted);
        }
        self.shared.after_mutation(arm_timer).await
    }

    /// Scans for a unique-field collision between the candidate and the
    /// newest live version of every other id.
    ///
    /// The walk covers the mutable page, then file pages newest to
    /// oldest; the visited set spans both phases so newer in-memory
    /// versions shadow whatever the same id looks like on disk.
    /// `candidate_id` is `None` for inserts, which cannot collide with
    /// themselves.
    async fn unique_conflict(
        &self,
        candidate: &Document,
        candidate_id: Option<u32>,
    ) -> CoreResult<Option<String>> {
        if self.uniques.is_empty() {
            return Ok(None);
        }

        let mut visited: HashSet<u32> = HashSet::new();
        let (current, file_size) = {
            let state = self.shared.state.lock();
            (state.current_page.clone(), state.file_size)
        };

        if let Some(field) = self.conflict_in_tree(&current, candidate, candidate_id, &mut visited)
        {
            return Ok(Some(field));
        }

        let page_size = self.shared.file.page_size() as u64;
        if file_size < page_size {
            return Ok(None);
        }
        let mut position = (file_size / page_size - 1) * page_size;
        loop {
            let tree = {
                let _idle = self.shared.coordinator.flusher_idle().await;
                self.shared.file.read_page(position).await?
            };
            if let Some(tree) = tree {
                if let Some(field) =
                    self.conflict_in_tree(&tree, candidate, candidate_id, &mut visited)
                {
                    return Ok(Some(field));
                }
            }
            if position == 0 {
                break;
            }
            position -= page_size;
        }
        Ok(None)
    }

    fn conflict_in_tree(
        &self,
        tree: &PageTree,
        candidate: &Document,
        candidate_id: Option<u32>,
        visited: &mut HashSet<u32>,
    ) -> Option<String> {
        for (key, value) in tree.iter_desc() {
            if !visited.insert(key.id) {
                continue;
            }
            let Some(doc) = value.document() else { continue };
            if candidate_id == Some(key.id) {
                continue;
            }
            for field in self.uniques.iter() {
                if let (Some(stored), Some(candidate_value)) =
                    (doc.get(field), candidate.get(field))
                {
                    if stored == candidate_value {
                        return Some(field.clone());
                    }
                }
            }
        }
        None
    }
}
