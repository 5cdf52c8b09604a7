use medreg_core::PersistError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unauthorised (401): the API token is missing or expired")]
    Unauthorized,
    #[error("forbidden (403): the API token lacks permission")]
    Forbidden,
    #[error("endpoint not found (404): {0}")]
    NotFound(String),
    #[error("server error ({status})")]
    Server { status: u16 },
    #[error("unexpected response status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("{0}")]
    Api(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for PersistError {
    fn from(err: ClientError) -> Self {
        PersistError::backend(err)
    }
}
