//! Headless driver of one registration grid.
//!
//! [`GridSession`] owns the displayed rows and their [`ChangeTracker`], and runs the
//! load, edit, save and delete workflow against a backend that is both a [`RowSource`] and a
//! [`Persistence`] collaborator. User-facing messages and delete confirmations go through the
//! injected [`Notifier`].
//!
//! `save` and `delete_rows` hold `&mut self` across the backend call, so no row can be marked
//! while a submission is outstanding. A failed submission leaves every mark in place so the same
//! diff can be retried.

use crate::validation::validate_batch;
use crate::{
    ChangeKind, ChangeSet, ChangeTracker, FieldAccess, Notice, Notifier, Persistence,
    PersistResult, RowSource, SaveBatch, SaveError, SaveResult, SearchQuery, SessionConfig,
    TrackerError, TrackerResult,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveReport {
    NothingToSave,
    Saved {
        inserted: usize,
        updated: usize,
        deleted: usize,
        message: Option<String>,
        saved_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteReport {
    NothingSelected,
    Cancelled,
    Deleted {
        rows: usize,
        message: Option<String>,
    },
}

pub struct GridSession<R, B, N> {
    rows: Vec<R>,
    tracker: ChangeTracker<R>,
    query: SearchQuery,
    backend: B,
    notifier: N,
    cfg: SessionConfig,
}

impl<R, B, N> GridSession<R, B, N>
where
    R: Clone + FieldAccess + Send + Sync,
    B: RowSource<R> + Persistence<R>,
    N: Notifier,
{
    pub fn new(backend: B, notifier: N, cfg: SessionConfig) -> Self {
        Self {
            rows: Vec::new(),
            tracker: ChangeTracker::default(),
            query: SearchQuery::new(),
            backend,
            notifier,
            cfg,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn tracker(&self) -> &ChangeTracker<R> {
        &self.tracker
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces the grid with `rows` and starts a clean tracker on them.
    pub fn load(&mut self, rows: Vec<R>) {
        self.tracker = ChangeTracker::new(&rows);
        self.rows = rows;
    }

    /// Runs `query` against the row source and loads the result.
    pub async fn search(&mut self, query: SearchQuery) -> PersistResult<usize> {
        self.query = query;
        self.refresh().await
    }

    /// Reloads the grid with the last query. On failure the current rows and marks are kept.
    pub async fn refresh(&mut self) -> PersistResult<usize> {
        match self.backend.fetch(&self.query).await {
            Ok(rows) => {
                let count = rows.len();
                self.load(rows);
                tracing::info!(rows = count, "grid loaded");
                self.notifier.notify(&Notice::Loaded(count));
                Ok(count)
            }
            Err(e) => {
                tracing::error!("failed to load grid rows: {}", e);
                self.notifier.notify(&Notice::LoadFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Puts a new row at the top of the grid and marks it as an insert.
    pub fn add_row(&mut self, row: R) {
        self.rows.insert(0, row);
        self.tracker.row_inserted_at(0);
    }

    pub fn update_row(&mut self, position: usize, row: R) -> TrackerResult<()> {
        self.edit_row(position, |current| *current = row)
    }

    pub fn edit_row<F>(&mut self, position: usize, edit: F) -> TrackerResult<()>
    where
        F: FnOnce(&mut R),
    {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(position)
            .ok_or(TrackerError::PositionOutOfRange { position, len })?;
        edit(row);
        self.tracker.mark_as_update(position);
        Ok(())
    }

    /// Marks an existing row without touching its contents.
    pub fn mark(&mut self, position: usize, kind: ChangeKind) -> TrackerResult<()> {
        self.check_position(position)?;
        self.tracker.mark(position, kind);
        Ok(())
    }

    fn check_position(&self, position: usize) -> TrackerResult<()> {
        if position < self.rows.len() {
            Ok(())
        } else {
            Err(TrackerError::PositionOutOfRange {
                position,
                len: self.rows.len(),
            })
        }
    }

    /// Submits every pending change.
    ///
    /// # Errors
    ///
    /// - [`SaveError::Validation`] if a row to be written misses a required field; nothing is
    ///   submitted.
    /// - [`SaveError::Rejected`] if the backend answered with `success = false`.
    /// - [`SaveError::Persist`] if no answer was obtained.
    /// - [`SaveError::Tracker`] if a mark points past the end of the grid.
    ///
    /// In every error case the marks are left untouched.
    pub async fn save(&mut self) -> SaveResult<SaveReport> {
        if !self.tracker.has_changes() {
            self.notifier.notify(&Notice::NothingToSave);
            return Ok(SaveReport::NothingToSave);
        }

        let submitted = self.tracker.changes().clone();
        let batch = SaveBatch::new(self.tracker.changed_rows(&self.rows)?, submitted.clone());

        if let Err(err) = validate_batch(&batch, self.cfg.required_fields()) {
            if let SaveError::Validation { message, .. } = &err {
                self.notifier.notify(&Notice::Invalid(message.clone()));
            }
            return Err(err);
        }

        tracing::info!(
            rows = batch.len(),
            inserts = submitted.count(ChangeKind::Insert),
            updates = submitted.count(ChangeKind::Update),
            deletes = submitted.count(ChangeKind::Delete),
            "submitting grid changes"
        );
        let result = self.backend.submit(&batch).await;
        drop(batch);

        match result {
            Ok(outcome) if outcome.success => {
                self.tracker.reset();
                self.drop_deleted_rows(&submitted);
                self.rebaseline().await;

                let message = outcome.message;
                self.notifier.notify(&Notice::Saved(
                    message.clone().unwrap_or_else(|| "Success".into()),
                ));
                Ok(SaveReport::Saved {
                    inserted: submitted.count(ChangeKind::Insert),
                    updated: submitted.count(ChangeKind::Update),
                    deleted: submitted.count(ChangeKind::Delete),
                    message,
                    saved_at: Utc::now(),
                })
            }
            Ok(outcome) => {
                let reason = outcome.failure_reason().to_string();
                tracing::warn!("save rejected: {}", reason);
                self.notifier.notify(&Notice::SaveFailed(reason.clone()));
                Err(SaveError::Rejected(reason))
            }
            Err(e) => {
                tracing::error!("save failed: {}", e);
                self.notifier.notify(&Notice::SaveFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Deletes the rows at `positions` after asking the user to confirm.
    ///
    /// Only the selected rows are submitted, each marked as a delete. Other pending marks are
    /// not sent and survive the operation. On failure the delete marks stay so the user can
    /// retry through [`save`](Self::save) or another delete.
    pub async fn delete_rows(&mut self, positions: &[usize]) -> SaveResult<DeleteReport> {
        let mut selected = positions.to_vec();
        selected.sort_unstable();
        selected.dedup();

        if selected.is_empty() {
            self.notifier.notify(&Notice::NothingSelected);
            return Ok(DeleteReport::NothingSelected);
        }
        for &position in &selected {
            self.check_position(position)?;
        }

        let prompt = format!("Delete {} row(s)?", selected.len());
        if !self.notifier.confirm(&prompt) {
            tracing::info!(rows = selected.len(), "delete cancelled");
            return Ok(DeleteReport::Cancelled);
        }

        let mut deletes = ChangeSet::new();
        for &position in &selected {
            self.tracker.mark_as_delete(position);
            deletes.mark_delete(position);
        }

        let batch = SaveBatch::new(self.tracker_rows(&deletes)?, deletes);
        tracing::info!(rows = batch.len(), "submitting grid deletes");
        let result = self.backend.submit(&batch).await;
        drop(batch);

        match result {
            Ok(outcome) if outcome.success => {
                for &position in selected.iter().rev() {
                    self.rows.remove(position);
                    self.tracker.row_removed_at(position);
                }
                self.notifier.notify(&Notice::Deleted(selected.len()));
                Ok(DeleteReport::Deleted {
                    rows: selected.len(),
                    message: outcome.message,
                })
            }
            Ok(outcome) => {
                let reason = outcome.failure_reason().to_string();
                tracing::warn!("delete rejected: {}", reason);
                self.notifier.notify(&Notice::DeleteFailed(reason.clone()));
                Err(SaveError::Rejected(reason))
            }
            Err(e) => {
                tracing::error!("delete failed: {}", e);
                self.notifier.notify(&Notice::DeleteFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    fn tracker_rows(&self, changes: &ChangeSet) -> TrackerResult<Vec<&R>> {
        changes
            .keys()
            .map(|&position| {
                self.rows.get(position).ok_or(TrackerError::PositionOutOfRange {
                    position,
                    len: self.rows.len(),
                })
            })
            .collect()
    }

    fn drop_deleted_rows(&mut self, submitted: &ChangeSet) {
        let deleted: Vec<usize> = submitted
            .iter()
            .filter(|(_, kind)| *kind == ChangeKind::Delete)
            .map(|(position, _)| *position)
            .collect();
        for position in deleted.into_iter().rev() {
            if position < self.rows.len() {
                self.rows.remove(position);
            }
        }
    }

    async fn rebaseline(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        self.load(rows);
        if self.cfg.reload_after_save() {
            // refresh already reports the failure; the local rows stay as the baseline
            let _ = self.refresh().await;
        }
    }
}
