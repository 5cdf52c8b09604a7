//! Change tracking keyed by a stable row identifier.
//!
//! Rows already stored by the backend are keyed by their primary key; rows added in the grid get a
//! fresh draft key. Because the association does not depend on where a row is displayed, sorting,
//! filtering or inserting rows in the grid cannot move a pending change onto the wrong row.

use crate::constants::FIELD_PI_02_ID;
use crate::{ChangeKind, ChangeSet, Row, SaveBatch, TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RowKey {
    /// Primary key of a row the backend already holds.
    Stored(i64),
    /// Temporary key of a row created in the grid and not yet saved.
    Draft(Uuid),
}

impl RowKey {
    pub fn draft() -> Self {
        RowKey::Draft(Uuid::new_v4())
    }

    /// Key of a registration row the backend already holds, read from its `PI_02_ID`.
    pub fn of_row(row: &Row) -> Option<Self> {
        row.id(FIELD_PI_02_ID).map(RowKey::Stored)
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, RowKey::Draft(_))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Stored(id) => write!(f, "stored:{id}"),
            RowKey::Draft(uuid) => write!(f, "draft:{}", uuid.simple()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyedChangeTracker<R, K: Ord = RowKey> {
    baseline: Vec<R>,
    changes: ChangeSet<K>,
}

impl<R: Clone, K: Ord> KeyedChangeTracker<R, K> {
    pub fn new(initial_rows: &[R]) -> Self {
        Self {
            baseline: initial_rows.to_vec(),
            changes: ChangeSet::new(),
        }
    }
}

impl<R, K: Ord + Clone + fmt::Debug> KeyedChangeTracker<R, K> {
    pub fn mark_as_insert(&mut self, key: K) {
        tracing::debug!(?key, "row marked insert");
        self.changes.mark_insert(key);
    }

    /// Marks the row as updated. A row still pending insert stays an insert.
    pub fn mark_as_update(&mut self, key: K) {
        tracing::debug!(?key, "row marked update");
        self.changes.mark_update(key);
    }

    pub fn mark_as_delete(&mut self, key: K) {
        tracing::debug!(?key, "row marked delete");
        self.changes.mark_delete(key);
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> &ChangeSet<K> {
        &self.changes
    }

    pub fn reset(&mut self) {
        self.changes.clear();
    }

    pub fn reconcile(&mut self, submitted: &ChangeSet<K>) {
        self.changes.forget_settled(submitted);
    }

    pub fn baseline(&self) -> &[R] {
        &self.baseline
    }

    /// Returns the changed rows in key order, matched by key rather than position.
    ///
    /// A row is looked up in `current_rows` first. A row marked for deletion that is no longer
    /// displayed is taken from the baseline. Keys that match no row in either place are skipped
    /// and reported by [`unmatched_keys`](Self::unmatched_keys).
    pub fn changed_rows<'a, F>(&'a self, current_rows: &'a [R], key_of: F) -> Vec<&'a R>
    where
        F: Fn(&R) -> K,
    {
        self.resolve(current_rows, key_of)
            .into_iter()
            .filter_map(|(_, row)| row)
            .collect()
    }

    /// Keys with a pending change that match neither a displayed row nor, for deletes, a
    /// baseline row.
    pub fn unmatched_keys<F>(&self, current_rows: &[R], key_of: F) -> Vec<K>
    where
        F: Fn(&R) -> K,
    {
        self.resolve(current_rows, key_of)
            .into_iter()
            .filter(|(_, row)| row.is_none())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Builds the batch to submit: every changed row paired with its key and kind.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnmatchedKey`] if a pending change matches no row; nothing is
    /// submitted partially.
    pub fn save_batch<'a, F>(
        &'a self,
        current_rows: &'a [R],
        key_of: F,
    ) -> TrackerResult<SaveBatch<'a, R, K>>
    where
        F: Fn(&R) -> K,
    {
        let rows = self
            .resolve(current_rows, key_of)
            .into_iter()
            .map(|(key, row)| row.ok_or_else(|| TrackerError::UnmatchedKey(format!("{key:?}"))))
            .collect::<TrackerResult<Vec<_>>>()?;
        Ok(SaveBatch::new(rows, self.changes.clone()))
    }

    /// Every pending key in order, with the row it resolves to.
    fn resolve<'a, F>(&'a self, current_rows: &'a [R], key_of: F) -> Vec<(&'a K, Option<&'a R>)>
    where
        F: Fn(&R) -> K,
    {
        let mut displayed: BTreeMap<K, &'a R> = BTreeMap::new();
        for row in current_rows {
            displayed.entry(key_of(row)).or_insert(row);
        }

        let mut removed: BTreeMap<K, &'a R> = BTreeMap::new();
        for row in &self.baseline {
            let key = key_of(row);
            if self.changes.get(&key) == Some(ChangeKind::Delete) {
                removed.entry(key).or_insert(row);
            }
        }

        self.changes
            .keys()
            .map(|key| {
                let row = displayed.get(key).or_else(|| removed.get(key)).copied();
                (key, row)
            })
            .collect()
    }
}
