//! Required-field checks run before a save batch is submitted.

use crate::{ChangeKind, Row, SaveBatch, SaveError, SaveResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Read access to a row's named fields.
pub trait FieldAccess {
    fn field_text(&self, field: &str) -> Option<Cow<'_, str>>;

    /// True when the field is present and not whitespace-only.
    fn has_value(&self, field: &str) -> bool {
        self.field_text(field)
            .is_some_and(|text| !text.trim().is_empty())
    }
}

impl FieldAccess for Row {
    fn field_text(&self, field: &str) -> Option<Cow<'_, str>> {
        self.text(field)
    }
}

/// A group of fields that must all be filled in, reported with a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFields {
    pub fields: Vec<String>,
    pub message: String,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    pub fn is_satisfied_by<R: FieldAccess>(&self, row: &R) -> bool {
        self.fields.iter().all(|field| row.has_value(field))
    }
}

/// Checks every row of `batch` that will be written against `rules`.
///
/// Rows marked for deletion are not checked. The first failing rule of the first failing row is
/// reported.
pub fn validate_batch<R: FieldAccess>(
    batch: &SaveBatch<'_, R>,
    rules: &[RequiredFields],
) -> SaveResult<()> {
    for (position, kind, row) in batch.entries() {
        if kind == ChangeKind::Delete {
            continue;
        }
        if let Some(rule) = rules.iter().find(|rule| !rule.is_satisfied_by(row)) {
            return Err(SaveError::Validation {
                position,
                message: rule.message.clone(),
            });
        }
    }
    Ok(())
}
