//! Positional change tracking for a displayed row collection.
//!
//! A [`ChangeTracker`] is created whenever a grid loads a fresh baseline. The grid reports every
//! add, edit and delete by row position; on save it asks which rows changed and how, submits them,
//! and calls [`ChangeTracker::reset`] once the backend confirms.
//!
//! Positions are indices into the displayed sequence. If the grid inserts or removes rows it must
//! report that through [`ChangeTracker::row_inserted_at`] / [`ChangeTracker::row_removed_at`] so
//! existing marks keep pointing at their rows. Grids that sort or filter between marking and
//! saving should use [`KeyedChangeTracker`](crate::KeyedChangeTracker) instead.

use crate::{ChangeKind, ChangeSet, TrackerError, TrackerResult};

#[derive(Debug, Clone)]
pub struct ChangeTracker<R> {
    baseline: Vec<R>,
    changes: ChangeSet,
}

impl<R: Clone> ChangeTracker<R> {
    /// Creates a clean tracker holding an independent copy of `initial_rows` as its baseline.
    pub fn new(initial_rows: &[R]) -> Self {
        Self {
            baseline: initial_rows.to_vec(),
            changes: ChangeSet::new(),
        }
    }
}

impl<R> Default for ChangeTracker<R> {
    fn default() -> Self {
        Self {
            baseline: Vec::new(),
            changes: ChangeSet::new(),
        }
    }
}

impl<R> ChangeTracker<R> {
    pub fn mark_as_insert(&mut self, position: usize) {
        tracing::debug!(position, "row marked insert");
        self.changes.mark_insert(position);
    }

    /// Marks the row as updated. A row still pending insert stays an insert.
    pub fn mark_as_update(&mut self, position: usize) {
        let kind = match self.changes.get(&position) {
            Some(ChangeKind::Insert) => ChangeKind::Insert,
            _ => ChangeKind::Update,
        };
        tracing::debug!(position, %kind, "row marked update");
        self.changes.mark_update(position);
    }

    /// Marks the row as deleted, overriding any earlier insert or update.
    pub fn mark_as_delete(&mut self, position: usize) {
        tracing::debug!(position, "row marked delete");
        self.changes.mark_delete(position);
    }

    /// Applies `kind` at `position` with the same rules as the `mark_as_*` methods.
    pub fn mark(&mut self, position: usize, kind: ChangeKind) {
        match kind {
            ChangeKind::Insert => self.mark_as_insert(position),
            ChangeKind::Update => self.mark_as_update(position),
            ChangeKind::Delete => self.mark_as_delete(position),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Returns the rows of `current_rows` at the recorded positions, top to bottom.
    ///
    /// `current_rows` must be ordered the way the grid was ordered when the marks were made.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PositionOutOfRange`] if a recorded position does not exist in
    /// `current_rows`; the change set is left as it was.
    pub fn changed_rows<'a>(&self, current_rows: &'a [R]) -> TrackerResult<Vec<&'a R>> {
        self.changes
            .keys()
            .map(|&position| {
                current_rows
                    .get(position)
                    .ok_or(TrackerError::PositionOutOfRange {
                        position,
                        len: current_rows.len(),
                    })
            })
            .collect()
    }

    /// Clears all recorded changes. The baseline is kept.
    pub fn reset(&mut self) {
        if self.has_changes() {
            tracing::debug!(cleared = self.changes.len(), "change tracker reset");
        }
        self.changes.clear();
    }

    /// Clears only the changes that were part of `submitted` and have not been touched since.
    ///
    /// Use this instead of [`reset`](Self::reset) when the grid kept accepting edits while the
    /// save request was outstanding.
    pub fn reconcile(&mut self, submitted: &ChangeSet) {
        let settled = self.changes.forget_settled(submitted);
        tracing::debug!(
            settled,
            remaining = self.changes.len(),
            "change tracker reconciled"
        );
    }

    /// The rows this tracker was created from.
    pub fn baseline(&self) -> &[R] {
        &self.baseline
    }

    /// Records that a new row was inserted at `position`.
    ///
    /// Marks at or after `position` move down one row, then `position` is marked as an insert.
    pub fn row_inserted_at(&mut self, position: usize) {
        self.changes.shift_up_from(position);
        self.mark_as_insert(position);
    }

    /// Records that the row at `position` left the grid, forgetting its mark and moving later
    /// marks up one row.
    pub fn row_removed_at(&mut self, position: usize) -> Option<ChangeKind> {
        self.changes.remove_and_shift(position)
    }
}
