use super::{is_stored_name, stored_name};
use async_trait::async_trait;
use parcel_core::blob::Result;
use parcel_core::{BlobDeletion, BlobError, BlobPath, BlobStore};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stores blobs on the local filesystem.
///
/// Files get UUID-based names and are sharded by the first two characters
/// of the name:
///
/// ```text
/// {root}/
/// ├── 3f/
/// │   └── 3f2a9c1e-....png
/// └── a0/
///     └── a07b44d2-....bin
/// ```
///
/// The returned [`BlobPath`] is the bare stored name; the shard is derived
/// from it on every access.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates the store, creating `root` if it does not exist.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if !is_stored_name(name) {
            return Err(BlobError::InvalidPath(name.to_string()));
        }
        Ok(self.root.join(&name[..2]).join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(
        &self,
        data: &[u8],
        name: &str,
        _content_type: Option<&str>,
    ) -> Result<BlobPath> {
        let stored = stored_name(name);
        let path = self.resolve(&stored)?;

        if let Some(shard) = path.parent() {
            tokio::fs::create_dir_all(shard).await?;
        }
        write_blob(&path, data).await?;

        debug!(path = %path.display(), bytes = data.len(), "blob written");
        Ok(BlobPath::new(stored))
    }

    async fn read(&self, path: &BlobPath) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(path.as_str())?;
        match tokio::fs::read(&file).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &BlobPath) -> Result<BlobDeletion> {
        let file = self.resolve(path.as_str())?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(BlobDeletion::Deleted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BlobDeletion::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `data` to `path`, removing whatever was written if the write fails.
async fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    let Err(err) = tokio::fs::write(path, data).await else {
        return Ok(());
    };
    if let Err(cleanup) = tokio::fs::remove_file(path).await {
        if cleanup.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial blob");
        }
    }
    Err(err.into())
}
