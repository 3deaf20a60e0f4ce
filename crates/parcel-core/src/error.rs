use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors raised by the persisted store (content rows, usage counters,
/// access log).
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
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

/// Errors raised by a blob store.
///
/// A missing blob is not an error: `delete` reports it as
/// [`BlobDeletion::NotFound`](crate::blob::BlobDeletion) and `read` as `None`.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
    #[error("blob io failed: {0}")]
    Io(String),
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self {
        BlobError::Io(err.to_string())
    }
}

/// The reason an upload was refused by the admission check.
///
/// These are expected, user-facing outcomes rather than failures; each
/// variant maps to a distinct client error status at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionDenied {
    #[error("file of {size} bytes exceeds the maximum upload size of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },
    #[error("storage limit reached: {used} + {incoming} bytes exceeds {limit} bytes")]
    StorageLimit { used: u64, incoming: u64, limit: u64 },
    #[error("file count limit reached: {count} of {limit} files")]
    FileCountLimit { count: u64, limit: u64 },
}
