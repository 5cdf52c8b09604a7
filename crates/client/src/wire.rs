//! JSON bodies exchanged with the registration servlet.

use medreg_core::{ChangeSet, Row, SaveBatch};
use serde::{Deserialize, Serialize};

/// Body of a save request: the changed rows in position order and the kind of every mark,
/// keyed by grid position.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<'a> {
    pub patients: &'a [&'a Row],
    pub row_types: &'a ChangeSet,
}

impl<'a> SaveRequest<'a> {
    pub fn from_batch(batch: &'a SaveBatch<'_, Row>) -> Self {
        Self {
            patients: batch.rows(),
            row_types: batch.changes(),
        }
    }
}

/// Envelope of the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
}
