use crate::error::UploadError;
use crate::MAX_INSERT_ATTEMPTS;
use parcel_core::{
    BlobError, BlobPath, BlobStore, Clock, CodeStyle, ContentId, ContentItem, ContentRepository,
    ExpirationPolicy, NewContent, OwnerId, StorageError, SystemClock, UsageDelta,
    UsageRepository,
};
use parcel_generator::{AllocationError, AllocatorSettings, ShortCodeAllocator};
use parcel_quota::{QuotaLedger, Reservation};
use std::sync::Arc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// A file to be stored.
#[derive(Debug, Clone, TypedBuilder)]
pub struct UploadRequest {
    /// `None` for anonymous uploads, which are not charged to any quota.
    #[builder(default)]
    pub owner: Option<OwnerId>,
    #[builder(setter(into))]
    pub file_name: String,
    #[builder(default)]
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    /// Stored next to the file. Not counted toward quota.
    #[builder(default)]
    pub thumbnail: Option<Vec<u8>>,
    #[builder(default)]
    pub style: CodeStyle,
    #[builder(default)]
    pub expiration: ExpirationPolicy,
    #[builder(default)]
    pub max_views: Option<u64>,
}

/// Blobs written for an upload whose row does not exist yet.
///
/// Dropped without [`keep`](Self::keep), the blobs are deleted on a spawned
/// task, so an upload cancelled mid-way leaves nothing behind.
struct StagedBlobs<B: BlobStore + ?Sized> {
    blobs: Arc<B>,
    file: BlobPath,
    thumbnail: Option<BlobPath>,
    kept: bool,
}

impl<B: BlobStore + ?Sized> StagedBlobs<B> {
    fn new(blobs: Arc<B>, file: BlobPath) -> Self {
        Self {
            blobs,
            file,
            thumbnail: None,
            kept: false,
        }
    }

    /// The upload's row now points at the blobs.
    fn keep(mut self) {
        self.kept = true;
    }

    fn paths(&self) -> Vec<BlobPath> {
        std::iter::once(self.file.clone())
            .chain(self.thumbnail.clone())
            .collect()
    }

    async fn discard(mut self) {
        self.kept = true;
        discard_all(self.blobs.as_ref(), &self.paths()).await;
    }
}

impl<B: BlobStore + ?Sized> Drop for StagedBlobs<B> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        let paths = self.paths();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(path = %self.file, "staged blobs dropped outside a runtime, left in place");
            return;
        };
        let blobs = Arc::clone(&self.blobs);
        runtime.spawn(async move { discard_all(blobs.as_ref(), &paths).await });
    }
}

async fn discard_all<B: BlobStore + ?Sized>(blobs: &B, paths: &[BlobPath]) {
    for path in paths {
        if let Err(err) = blobs.delete(path).await {
            warn!(%path, error = %err, "failed to remove blob of abandoned upload");
        }
    }
}

/// The upload and explicit-delete paths.
///
/// An upload reserves quota before anything is written and gives the
/// reservation back if any later step fails, so the counters only ever keep
/// bytes that belong to an inserted row.
pub struct UploadService<C: ?Sized, U: ?Sized, B: ?Sized, K: ?Sized = SystemClock> {
    contents: Arc<C>,
    ledger: QuotaLedger<U, C>,
    blobs: Arc<B>,
    clock: Arc<K>,
    allocator: ShortCodeAllocator<C>,
}

impl<C, U, B, K> UploadService<C, U, B, K>
where
    C: ContentRepository + ?Sized,
    U: UsageRepository + ?Sized,
    B: BlobStore + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(
        contents: Arc<C>,
        ledger: QuotaLedger<U, C>,
        blobs: Arc<B>,
        clock: Arc<K>,
        allocator: &AllocatorSettings,
    ) -> Result<Self, AllocationError> {
        let allocator = ShortCodeAllocator::new(Arc::clone(&contents), allocator)?;
        Ok(Self {
            contents,
            ledger,
            blobs,
            clock,
            allocator,
        })
    }

    pub fn ledger(&self) -> &QuotaLedger<U, C> {
        &self.ledger
    }

    /// Stores a file and returns its content row.
    ///
    /// Steps: size and quota admission, blob writes, code allocation and
    /// insert. An insert that loses a race for its code is retried with a
    /// fresh code.
    pub async fn upload(&self, request: UploadRequest) -> Result<ContentItem, UploadError> {
        let size = request.data.len() as u64;
        let reservation = match request.owner {
            Some(owner) => Some(self.ledger.admit(owner, size).await?),
            None => {
                self.ledger.check_upload_size(size)?;
                None
            }
        };

        let staged = match self.stage(&request).await {
            Ok(staged) => staged,
            Err(err) => {
                release(reservation).await;
                return Err(err.into());
            }
        };

        let now = self.clock.now();
        let expires_at = request.expiration.resolve(now);

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let code = match self.allocator.allocate(request.style).await {
                Ok(code) => code,
                Err(err) => {
                    abandon(reservation, staged).await;
                    return Err(err.into());
                }
            };

            let row = NewContent {
                owner: request.owner,
                code,
                file_name: request.file_name.clone(),
                content_type: request.content_type.clone(),
                size,
                storage_path: staged.file.clone(),
                thumbnail_path: staged.thumbnail.clone(),
                expires_at,
                max_views: request.max_views,
                created_at: now,
            };

            match self.contents.insert(row).await {
                Ok(item) => {
                    staged.keep();
                    if let Some(reservation) = reservation {
                        reservation.settle();
                    }
                    info!(
                        content_id = %item.id,
                        code = %item.code,
                        owner_id = ?item.owner,
                        size,
                        "content uploaded"
                    );
                    return Ok(item);
                }
                Err(StorageError::Conflict(code)) => {
                    debug!(attempt, %code, "short code taken at insert, reallocating");
                }
                Err(err) => {
                    abandon(reservation, staged).await;
                    return Err(err.into());
                }
            }
        }

        abandon(reservation, staged).await;
        Err(UploadError::CodeConflict {
            attempts: MAX_INSERT_ATTEMPTS,
        })
    }

    /// Deletes an item on behalf of its owner and returns the removed row.
    ///
    /// Blobs go first: if one cannot be deleted the row is kept so the
    /// delete can be retried.
    pub async fn delete(&self, owner: OwnerId, id: ContentId) -> Result<ContentItem, UploadError> {
        let item = self
            .contents
            .get(id)
            .await?
            .ok_or(UploadError::NotFound(id))?;
        if item.owner != Some(owner) {
            return Err(UploadError::NotOwner { id, owner });
        }

        let _hold = self.ledger.hold(owner).await;
        self.blobs.delete(&item.storage_path).await?;
        if let Some(thumbnail) = &item.thumbnail_path {
            self.blobs.delete(thumbnail).await?;
        }

        // lost a race with the reaper, which settles the quota itself
        if !self.contents.delete(id).await? {
            return Err(UploadError::NotFound(id));
        }

        self.ledger
            .commit(owner, UsageDelta::removal(item.size))
            .await?;
        info!(content_id = %id, owner_id = %owner, size = item.size, "content deleted");
        Ok(item)
    }

    async fn stage(&self, request: &UploadRequest) -> Result<StagedBlobs<B>, BlobError> {
        let content_type = request.content_type.as_deref();
        let file = self
            .blobs
            .save(&request.data, &request.file_name, content_type)
            .await?;
        let mut staged = StagedBlobs::new(Arc::clone(&self.blobs), file);

        if let Some(bytes) = &request.thumbnail {
            match self.blobs.save(bytes, &request.file_name, None).await {
                Ok(path) => staged.thumbnail = Some(path),
                Err(err) => {
                    staged.discard().await;
                    return Err(err);
                }
            }
        }

        Ok(staged)
    }
}

/// Undoes a failed upload: blobs are removed and the reservation given back.
async fn abandon<U, C, B>(reservation: Option<Reservation<U, C>>, staged: StagedBlobs<B>)
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
    B: BlobStore + ?Sized,
{
    staged.discard().await;
    release(reservation).await;
}

async fn release<U, C>(reservation: Option<Reservation<U, C>>)
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
{
    let Some(reservation) = reservation else {
        return;
    };
    let (owner, size) = (reservation.owner(), reservation.size());
    if let Err(err) = reservation.release().await {
        warn!(owner_id = %owner, size, error = %err, "failed to release quota reservation");
    }
}
