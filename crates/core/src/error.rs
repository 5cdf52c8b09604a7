#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("row position {position} is outside the current rows (len {len})")]
    PositionOutOfRange { position: usize, len: usize },
    #[error("no row matches the pending change for key {0}")]
    UnmatchedKey(String),
    #[error("unknown change kind: {0:?}")]
    UnknownChangeKind(String),
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Failure reported by a [`Persistence`](crate::Persistence) or
/// [`RowSource`](crate::RowSource) implementation.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("persistence backend failed: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl PersistError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

pub type PersistResult<T> = std::result::Result<T, PersistError>;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("row {position}: {message}")]
    Validation { position: usize, message: String },
    #[error("save rejected by backend: {0}")]
    Rejected(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub type SaveResult<T> = std::result::Result<T, SaveError>;
