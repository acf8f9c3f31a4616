use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Errors raised while validating values at the boundary of the core types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),
    #[error("invalid page record {uid}: {reason}")]
    InvalidPage { uid: u32, reason: String },
    #[error("invalid correlation id: {0}")]
    InvalidCorrelationId(String),
    #[error("invalid site base '{base}': {reason}")]
    InvalidSiteBase { base: String, reason: String },
}

impl From<CoreError> for StorageError {
    fn from(value: CoreError) -> Self {
        StorageError::InvalidData(value.to_string())
    }
}
