use super::stored_name;
use async_trait::async_trait;
use dashmap::DashMap;
use parcel_core::blob::Result;
use parcel_core::{BlobDeletion, BlobPath, BlobStore};

/// Keeps blobs in memory. Used by tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, path: &BlobPath) -> bool {
        self.blobs.contains_key(path.as_str())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(
        &self,
        data: &[u8],
        name: &str,
        _content_type: Option<&str>,
    ) -> Result<BlobPath> {
        let stored = stored_name(name);
        self.blobs.insert(stored.clone(), data.to_vec());
        Ok(BlobPath::new(stored))
    }

    async fn read(&self, path: &BlobPath) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(path.as_str()).map(|blob| blob.value().clone()))
    }

    async fn delete(&self, path: &BlobPath) -> Result<BlobDeletion> {
        Ok(match self.blobs.remove(path.as_str()) {
            Some(_) => BlobDeletion::Deleted,
            None => BlobDeletion::NotFound,
        })
    }
}
