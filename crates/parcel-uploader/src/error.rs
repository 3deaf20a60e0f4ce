use parcel_core::{
    AccessKind, AdmissionDenied, BlobError, ContentId, CoreError, LinkId, OwnerId, ShortCode,
    StorageError,
};
use parcel_generator::AllocationError;
use parcel_quota::QuotaError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// The upload does not fit the owner's quota or the size cap.
    #[error(transparent)]
    Denied(#[from] AdmissionDenied),
    #[error("content {0} not found")]
    NotFound(ContentId),
    #[error("content {id} is not owned by {owner}")]
    NotOwner { id: ContentId, owner: OwnerId },
    #[error("short code still taken after {attempts} inserts")]
    CodeConflict { attempts: usize },
    #[error("short code allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("blob store failed: {0}")]
    Blob(#[from] BlobError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<QuotaError> for UploadError {
    fn from(value: QuotaError) -> Self {
        match value {
            QuotaError::Denied(denied) => Self::Denied(denied),
            QuotaError::Storage(err) => Self::Storage(err),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("short link not found: {0}")]
    NotFound(String),
    #[error("short link expired: {0}")]
    Expired(ShortCode),
    #[error("link {id} is not owned by {owner}")]
    NotOwner { id: LinkId, owner: OwnerId },
    #[error("short code still taken after {attempts} inserts")]
    CodeConflict { attempts: usize },
    #[error("short code allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CoreError> for LinkError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AccessError {
    #[error("content not found: {0}")]
    NotFound(String),
    /// Expired, out of views, or its bytes are gone.
    #[error("content is no longer available: {0}")]
    Gone(ShortCode),
    #[error("{0} is not a content access")]
    UnsupportedKind(AccessKind),
    #[error("blob store failed: {0}")]
    Blob(#[from] BlobError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
