use parcel_core::{BlobError, ContentId, StorageError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReapError {
    /// The sweep could not list its candidates and did nothing.
    #[error("failed to scan for reapable content: {0}")]
    Scan(#[source] StorageError),
    #[error("failed to delete blob of content {id}: {source}")]
    Blob {
        id: ContentId,
        #[source]
        source: BlobError,
    },
    #[error("failed to delete content row {id}: {source}")]
    Row {
        id: ContentId,
        #[source]
        source: StorageError,
    },
    #[error("failed to prune the access log: {0}")]
    Prune(#[source] StorageError),
}
