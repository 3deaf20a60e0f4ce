use parcel_core::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    /// Every candidate, including the long fallback codes, was taken.
    #[error("no free short code after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error("invalid allocator settings: {0}")]
    InvalidSettings(String),
    #[error("short code lookup failed: {0}")]
    Lookup(#[from] StorageError),
}
