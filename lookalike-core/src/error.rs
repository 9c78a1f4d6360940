use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookalikeError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Catalog entry unavailable: {locator} ({reason})")]
    EntryUnavailable { locator: String, reason: String },

    #[error("Hash length mismatch: expected {expected} symbols, got {actual}")]
    HashLengthMismatch { expected: usize, actual: usize },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("An entry with hash {0} already exists")]
    DuplicateHash(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for LookalikeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LookalikeError>;
