use crate::error::BlobError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Result type for blob store operations.
pub type Result<T> = std::result::Result<T, BlobError>;

/// Opaque location of a stored blob, as returned by [`BlobStore::save`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobDeletion {
    Deleted,
    /// The blob was already gone. Callers treat this as success.
    NotFound,
}

/// Byte storage for uploaded files (filesystem, object store, memory).
///
/// The core only needs save, read and delete; everything else about the
/// backend is its own business.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Persists `data` and returns the path it can be found under.
    ///
    /// `name` is the client-supplied file name; backends may use it to pick
    /// an extension but must not trust it as a path.
    async fn save(&self, data: &[u8], name: &str, content_type: Option<&str>)
        -> Result<BlobPath>;

    /// Reads a blob back. Returns `Ok(None)` if it does not exist.
    async fn read(&self, path: &BlobPath) -> Result<Option<Vec<u8>>>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete(&self, path: &BlobPath) -> Result<BlobDeletion>;
}
