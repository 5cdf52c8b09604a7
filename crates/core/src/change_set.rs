//! Row key to [`ChangeKind`] mapping.
//!
//! The marking rules live here so the positional and keyed trackers share them:
//!
//! - `Insert` overwrites whatever was recorded.
//! - `Update` never downgrades a pending `Insert`.
//! - `Delete` overwrites whatever was recorded.
//!
//! Entries are ordered by key, so iteration over a positional set walks rows top to bottom.
//!
//! Every mark also stamps its entry with a fresh revision. A clone taken when a save is
//! submitted carries those revisions, which lets [`ChangeSet::forget_settled`] tell an entry that
//! was settled by that save apart from one that was marked again while it was in flight, even
//! when the kind did not change.

use crate::ChangeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet<K: Ord = usize> {
    entries: BTreeMap<K, ChangeKind>,
    #[serde(skip, default = "BTreeMap::new")]
    revisions: BTreeMap<K, u64>,
    #[serde(skip)]
    next_revision: u64,
}

impl<K: Ord> Default for ChangeSet<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            revisions: BTreeMap::new(),
            next_revision: 0,
        }
    }
}

/// Two sets are equal when they hold the same kinds for the same keys; revisions are ignored.
impl<K: Ord> PartialEq for ChangeSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Ord> Eq for ChangeSet<K> {}

impl<K: Ord> ChangeSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<ChangeKind> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<ChangeKind> {
        self.revisions.remove(key);
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.revisions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, ChangeKind)> {
        self.entries.iter().map(|(k, kind)| (k, *kind))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.entries.values().filter(|k| **k == kind).count()
    }

    /// Drops every entry that has not been marked since `submitted` was cloned from this set.
    ///
    /// An entry survives when it is new, when its kind changed, or when it was marked again
    /// after the snapshot, whatever the kind. Entries of a `submitted` set that was not cloned
    /// from this one never match. Returns the number of entries removed.
    pub fn forget_settled(&mut self, submitted: &ChangeSet<K>) -> usize {
        let before = self.entries.len();
        let revisions = &mut self.revisions;
        self.entries.retain(|key, kind| {
            let settled = submitted.entries.get(key) == Some(kind)
                && revisions.get(key).is_some()
                && submitted.revisions.get(key) == revisions.get(key);
            if settled {
                revisions.remove(key);
            }
            !settled
        });
        before - self.entries.len()
    }
}

impl<K: Ord + Clone> ChangeSet<K> {
    pub fn mark_insert(&mut self, key: K) {
        self.stamp(key.clone());
        self.entries.insert(key, ChangeKind::Insert);
    }

    /// Records an update unless the key is already a pending insert.
    ///
    /// A pending insert keeps its kind but is still stamped as re-marked.
    pub fn mark_update(&mut self, key: K) {
        self.stamp(key.clone());
        let kind = self.entries.entry(key).or_insert(ChangeKind::Update);
        if *kind != ChangeKind::Insert {
            *kind = ChangeKind::Update;
        }
    }

    pub fn mark_delete(&mut self, key: K) {
        self.stamp(key.clone());
        self.entries.insert(key, ChangeKind::Delete);
    }

    /// Applies `kind` with the same rules as the dedicated `mark_*` methods.
    pub fn mark(&mut self, key: K, kind: ChangeKind) {
        match kind {
            ChangeKind::Insert => self.mark_insert(key),
            ChangeKind::Update => self.mark_update(key),
            ChangeKind::Delete => self.mark_delete(key),
        }
    }

    fn stamp(&mut self, key: K) {
        self.next_revision += 1;
        self.revisions.insert(key, self.next_revision);
    }
}

impl ChangeSet<usize> {
    /// Moves every position `>= at` one row down, making room for a row inserted at `at`.
    ///
    /// An entry at `usize::MAX` has no row below it and is dropped.
    pub fn shift_up_from(&mut self, at: usize) {
        let moved = self.entries.split_off(&at);
        let moved_revisions = self.revisions.split_off(&at);
        for (pos, kind) in moved {
            match pos.checked_add(1) {
                Some(next) => {
                    self.entries.insert(next, kind);
                }
                None => tracing::warn!(position = pos, "mark past the last row dropped"),
            }
        }
        self.revisions.extend(
            moved_revisions
                .into_iter()
                .filter_map(|(pos, rev)| pos.checked_add(1).map(|next| (next, rev))),
        );
    }

    /// Forgets the entry at `at` and moves every later position one row up.
    pub fn remove_and_shift(&mut self, at: usize) -> Option<ChangeKind> {
        let mut moved = self.entries.split_off(&at);
        let mut moved_revisions = self.revisions.split_off(&at);
        let removed = moved.remove(&at);
        moved_revisions.remove(&at);
        self.entries
            .extend(moved.into_iter().map(|(pos, kind)| (pos - 1, kind)));
        self.revisions
            .extend(moved_revisions.into_iter().map(|(pos, rev)| (pos - 1, rev)));
        removed
    }
}

impl<'a, K: Ord> IntoIterator for &'a ChangeSet<K> {
    type Item = (&'a K, &'a ChangeKind);
    type IntoIter = std::collections::btree_map::Iter<'a, K, ChangeKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_does_not_downgrade_insert() {
        let mut set = ChangeSet::new();
        set.mark_insert(4);
        set.mark_update(4);
        set.mark_update(4);

        assert_eq!(set.get(&4), Some(ChangeKind::Insert));
    }

    #[test]
    fn test_update_overrides_delete() {
        let mut set = ChangeSet::new();
        set.mark_delete(1);
        set.mark_update(1);

        assert_eq!(set.get(&1), Some(ChangeKind::Update));
    }

    #[test]
    fn test_mark_dispatches_with_same_rules() {
        let mut set = ChangeSet::new();
        set.mark(0, ChangeKind::Insert);
        set.mark(0, ChangeKind::Update);
        set.mark(1, ChangeKind::Update);
        set.mark(1, ChangeKind::Delete);

        assert_eq!(set.get(&0), Some(ChangeKind::Insert));
        assert_eq!(set.get(&1), Some(ChangeKind::Delete));
    }

    #[test]
    fn test_count_by_kind() {
        let mut set = ChangeSet::new();
        set.mark_insert(0);
        set.mark_update(2);
        set.mark_update(3);
        set.mark_delete(5);

        assert_eq!(set.count(ChangeKind::Insert), 1);
        assert_eq!(set.count(ChangeKind::Update), 2);
        assert_eq!(set.count(ChangeKind::Delete), 1);
    }

    #[test]
    fn test_shift_up_from_moves_later_positions() {
        let mut set = ChangeSet::new();
        set.mark_update(0);
        set.mark_delete(2);
        set.mark_update(3);

        set.shift_up_from(2);

        let entries: Vec<_> = set.iter().map(|(p, k)| (*p, k)).collect();
        assert_eq!(
            entries,
            vec![
                (0, ChangeKind::Update),
                (3, ChangeKind::Delete),
                (4, ChangeKind::Update)
            ]
        );
    }

    #[test]
    fn test_remove_and_shift() {
        let mut set = ChangeSet::new();
        set.mark_update(0);
        set.mark_delete(2);
        set.mark_insert(5);

        assert_eq!(set.remove_and_shift(2), Some(ChangeKind::Delete));
        assert_eq!(set.remove_and_shift(3), None);

        let entries: Vec<_> = set.iter().map(|(p, k)| (*p, k)).collect();
        assert_eq!(entries, vec![(0, ChangeKind::Update), (3, ChangeKind::Insert)]);
    }

    #[test]
    fn test_forget_settled_keeps_later_marks() {
        let mut set = ChangeSet::new();
        set.mark_update(0);
        set.mark_insert(1);
        let submitted = set.clone();

        // edits arriving while the save is in flight
        set.mark_delete(1);
        set.mark_update(7);

        assert_eq!(set.forget_settled(&submitted), 1);
        assert_eq!(set.get(&0), None);
        assert_eq!(set.get(&1), Some(ChangeKind::Delete));
        assert_eq!(set.get(&7), Some(ChangeKind::Update));
    }

    #[test]
    fn test_forget_settled_keeps_same_kind_remarks() {
        let mut set = ChangeSet::new();
        set.mark_update(0);
        set.mark_insert(1);
        set.mark_delete(2);
        set.mark_update(3);
        let submitted = set.clone();

        set.mark_update(0);
        set.mark_update(1);
        set.mark_delete(2);

        assert_eq!(set.forget_settled(&submitted), 1);
        assert_eq!(set.get(&0), Some(ChangeKind::Update));
        assert_eq!(set.get(&1), Some(ChangeKind::Insert));
        assert_eq!(set.get(&2), Some(ChangeKind::Delete));
        assert_eq!(set.get(&3), None);

        // a second save of what is left settles it
        let resubmitted = set.clone();
        assert_eq!(set.forget_settled(&resubmitted), 3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_forget_settled_follows_shifted_entries() {
        let mut set = ChangeSet::new();
        set.mark_update(2);
        let mut submitted = set.clone();

        set.shift_up_from(0);
        submitted.shift_up_from(0);

        assert_eq!(set.forget_settled(&submitted), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_forget_settled_ignores_foreign_sets() {
        let mut set = ChangeSet::new();
        set.mark_update(0);
        let mut other = ChangeSet::new();
        other.mark_update(0);

        assert_eq!(set.forget_settled(&other), 0);
        assert_eq!(set.get(&0), Some(ChangeKind::Update));
    }

    #[test]
    fn test_shift_drops_mark_at_last_position() {
        let mut set = ChangeSet::new();
        set.mark_update(usize::MAX);
        set.mark_delete(3);

        set.shift_up_from(0);

        let entries: Vec<_> = set.iter().map(|(p, k)| (*p, k)).collect();
        assert_eq!(entries, vec![(4, ChangeKind::Delete)]);
    }

    #[test]
    fn test_serialises_as_row_types_object() {
        let mut set = ChangeSet::new();
        set.mark_insert(0);
        set.mark_delete(3);

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({"0": "insert", "3": "delete"}));

        let parsed: ChangeSet = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, set);
    }
}
