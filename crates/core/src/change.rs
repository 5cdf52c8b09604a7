use crate::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of mutation pending for a row.
///
/// Serialises to the lowercase names the save servlet reads from `rowTypes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> TrackerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            _ => Err(TrackerError::UnknownChangeKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Insert".parse::<ChangeKind>().unwrap(), ChangeKind::Insert);
        assert_eq!(" delete ".parse::<ChangeKind>().unwrap(), ChangeKind::Delete);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "upsert".parse::<ChangeKind>().expect_err("should reject");
        assert!(matches!(err, TrackerError::UnknownChangeKind(s) if s == "upsert"));
    }

    #[test]
    fn test_serialises_lowercase() {
        let json = serde_json::to_string(&ChangeKind::Update).unwrap();
        assert_eq!(json, "\"update\"");
    }
}
