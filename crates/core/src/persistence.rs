//! Collaborator contracts: where rows come from and where changes go.
//!
//! Implementations live outside this crate (`medreg-client` talks to the servlet backend); tests
//! use in-memory doubles.

use crate::{ChangeKind, ChangeSet, NonEmptyText, PersistResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer of the save endpoint. A submission either applies entirely or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn saved(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Human-readable reason for a failed outcome.
    pub fn failure_reason(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("Unknown error")
    }
}

/// Rows submitted together with the change set they were selected by.
///
/// `rows[i]` belongs to the `i`-th entry of `changes` in key order, which is how
/// [`ChangeTracker::changed_rows`](crate::ChangeTracker::changed_rows) and
/// [`KeyedChangeTracker::save_batch`](crate::KeyedChangeTracker::save_batch) select them.
#[derive(Debug, Clone)]
pub struct SaveBatch<'a, R, K: Ord = usize> {
    rows: Vec<&'a R>,
    changes: ChangeSet<K>,
}

impl<'a, R, K: Ord> SaveBatch<'a, R, K> {
    pub fn new(rows: Vec<&'a R>, changes: ChangeSet<K>) -> Self {
        Self { rows, changes }
    }

    pub fn rows(&self) -> &[&'a R] {
        &self.rows
    }

    pub fn changes(&self) -> &ChangeSet<K> {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-keys the batch by row index: the `i`-th row is marked at `i`.
    ///
    /// This is the shape the servlet expects for a batch selected by stable keys.
    pub fn into_indexed(self) -> SaveBatch<'a, R> {
        let mut changes = ChangeSet::new();
        for (index, (_, kind)) in self.changes.iter().enumerate() {
            changes.mark(index, kind);
        }
        SaveBatch {
            rows: self.rows,
            changes,
        }
    }
}

impl<'a, R, K: Ord + Copy> SaveBatch<'a, R, K> {
    /// Pairs each row with its key and change kind.
    pub fn entries(&self) -> impl Iterator<Item = (K, ChangeKind, &'a R)> + '_ {
        self.changes
            .iter()
            .zip(self.rows.iter())
            .map(|((key, kind), row)| (*key, kind, *row))
    }
}

/// Search filters sent to the row source. Blank values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchQuery {
    filters: BTreeMap<String, NonEmptyText>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter; a blank value removes any previous filter on `name`.
    pub fn filter(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        let name = name.into();
        match NonEmptyText::new(value) {
            Ok(value) => {
                self.filters.insert(name, value);
            }
            Err(_) => {
                self.filters.remove(&name);
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(NonEmptyText::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Backend that applies a batch of row changes.
#[async_trait]
pub trait Persistence<R: Sync>: Send + Sync {
    /// Submits `batch`. `Ok` carries the backend's verdict; `Err` means no verdict was obtained.
    async fn submit(&self, batch: &SaveBatch<'_, R>) -> PersistResult<SaveOutcome>;
}

/// Backend that supplies the baseline rows of a grid.
#[async_trait]
pub trait RowSource<R>: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> PersistResult<Vec<R>>;
}
