use parcel_core::{AdmissionDenied, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuotaError>;

#[derive(Debug, Clone, Error)]
pub enum QuotaError {
    /// The upload does not fit. This is an expected outcome, not a failure.
    #[error(transparent)]
    Denied(#[from] AdmissionDenied),
    #[error("usage store failed: {0}")]
    Storage(#[from] StorageError),
}

impl QuotaError {
    pub fn denial(&self) -> Option<&AdmissionDenied> {
        match self {
            QuotaError::Denied(denied) => Some(denied),
            QuotaError::Storage(_) => None,
        }
    }
}
