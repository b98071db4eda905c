use thiserror::Error;

/// Failure of the external text-generation call.
///
/// Never propagated past the refresh worker: the message is rendered into
/// the cached summary instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No API key configured for the text generation provider.")]
    MissingApiKey,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No valid response received from model.")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout(err.to_string())
        } else if err.is_decode() {
            GenerationError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            GenerationError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

/// Failure reading or writing persisted finance data or summary records.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}
