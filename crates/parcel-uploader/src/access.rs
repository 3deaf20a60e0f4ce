use crate::error::AccessError;
use parcel_core::{
    AccessKind, AccessLogEntry, AccessLogStore, AccessTarget, BlobStore, Clock, ContentItem,
    ContentRepository, RequestMeta, ShortCode, SystemClock,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// A content item together with its bytes.
#[derive(Debug, Clone)]
pub struct OpenedContent {
    pub item: ContentItem,
    pub data: Vec<u8>,
}

/// Serves content by code and records each view or download.
///
/// An item that is already reap-eligible is reported as gone even if the
/// reaper has not removed it yet.
pub struct AccessRecorder<C: ?Sized, A: ?Sized, B: ?Sized, K: ?Sized = SystemClock> {
    contents: Arc<C>,
    access_log: Arc<A>,
    blobs: Arc<B>,
    clock: Arc<K>,
}

impl<C, A, B, K> AccessRecorder<C, A, B, K>
where
    C: ContentRepository + ?Sized,
    A: AccessLogStore + ?Sized,
    B: BlobStore + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(contents: Arc<C>, access_log: Arc<A>, blobs: Arc<B>, clock: Arc<K>) -> Self {
        Self {
            contents,
            access_log,
            blobs,
            clock,
        }
    }

    /// Loads the item behind `code`, reads its bytes and records the access.
    ///
    /// The view counter is what enforces `max_views`, so a failure to bump it
    /// fails the request instead of serving uncounted bytes.
    pub async fn open(
        &self,
        code: &str,
        kind: AccessKind,
        meta: RequestMeta,
    ) -> Result<OpenedContent, AccessError> {
        if kind == AccessKind::Click {
            return Err(AccessError::UnsupportedKind(kind));
        }

        let code = ShortCode::new(code).map_err(|_| AccessError::NotFound(code.to_string()))?;
        let item = self
            .contents
            .get_by_code(&code)
            .await?
            .ok_or_else(|| AccessError::NotFound(code.to_string()))?;

        let now = self.clock.now();
        if item.is_reapable(now) {
            debug!(content_id = %item.id, %code, "refusing reap-eligible content");
            return Err(AccessError::Gone(code));
        }

        let Some(data) = self.blobs.read(&item.storage_path).await? else {
            warn!(content_id = %item.id, path = %item.storage_path, "content blob is missing");
            return Err(AccessError::Gone(code));
        };

        let entry = AccessLogEntry::new(AccessTarget::Content(item.id), item.owner, kind, now, meta);
        self.access_log.append(entry).await?;
        self.contents.increment_counter(item.id, kind).await?;

        Ok(OpenedContent { item, data })
    }

    /// Reads an item's thumbnail. Not recorded as an access.
    pub async fn thumbnail(&self, code: &str) -> Result<Option<Vec<u8>>, AccessError> {
        let code = ShortCode::new(code).map_err(|_| AccessError::NotFound(code.to_string()))?;
        let item = self
            .contents
            .get_by_code(&code)
            .await?
            .ok_or_else(|| AccessError::NotFound(code.to_string()))?;
        if item.is_reapable(self.clock.now()) {
            return Err(AccessError::Gone(code));
        }
        match &item.thumbnail_path {
            Some(path) => Ok(self.blobs.read(path).await?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use parcel_core::{LogScope, ManualClock, NewContent, OwnerId};
    use parcel_storage::{InMemoryAccessLog, InMemoryContentRepository, MemoryBlobStore};

    struct Fixture {
        recorder: AccessRecorder<
            InMemoryContentRepository,
            InMemoryAccessLog,
            MemoryBlobStore,
            ManualClock,
        >,
        contents: Arc<InMemoryContentRepository>,
        log: Arc<InMemoryAccessLog>,
        blobs: Arc<MemoryBlobStore>,
        clock: Arc<ManualClock>,
    }

    fn epoch() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn fixture() -> Fixture {
        let contents = Arc::new(InMemoryContentRepository::new());
        let log = Arc::new(InMemoryAccessLog::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let recorder = AccessRecorder::new(
            Arc::clone(&contents),
            Arc::clone(&log),
            Arc::clone(&blobs),
            Arc::clone(&clock),
        );
        Fixture {
            recorder,
            contents,
            log,
            blobs,
            clock,
        }
    }

    impl Fixture {
        async fn store(
            &self,
            code: &str,
            expires_at: Option<Timestamp>,
            max_views: Option<u64>,
        ) -> ContentItem {
            let storage_path = self.blobs.save(b"hello", "hello.txt", None).await.unwrap();
            self.contents
                .insert(NewContent {
                    owner: Some(OwnerId(3)),
                    code: ShortCode::new(code).unwrap(),
                    file_name: "hello.txt".to_string(),
                    content_type: Some("text/plain".to_string()),
                    size: 5,
                    storage_path,
                    thumbnail_path: None,
                    expires_at,
                    max_views,
                    created_at: epoch(),
                })
                .await
                .unwrap()
        }

        async fn logged(&self, item: &ContentItem) -> Vec<AccessLogEntry> {
            self.log
                .query(
                    LogScope::Content(item.id),
                    epoch(),
                    epoch() + SignedDuration::from_hours(24),
                )
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn view_serves_bytes_and_records_it() {
        let fx = fixture();
        let item = fx.store("hello01", None, None).await;
        let meta = RequestMeta {
            ip: Some("192.0.2.1".to_string()),
            ..RequestMeta::default()
        };

        let opened = fx.recorder.open("hello01", AccessKind::View, meta).await.unwrap();

        assert_eq!(opened.data, b"hello");
        let stored = fx.contents.get(item.id).await.unwrap().unwrap();
        assert_eq!((stored.view_count, stored.download_count), (1, 0));

        let rows = fx.logged(&item).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, AccessKind::View);
        assert_eq!(rows[0].owner, Some(OwnerId(3)));
        assert_eq!(rows[0].at, epoch());
    }

    #[tokio::test]
    async fn download_bumps_its_own_counter() {
        let fx = fixture();
        let item = fx.store("hello01", None, None).await;

        fx.recorder
            .open("hello01", AccessKind::Download, RequestMeta::default())
            .await
            .unwrap();

        let stored = fx.contents.get(item.id).await.unwrap().unwrap();
        assert_eq!((stored.view_count, stored.download_count), (0, 1));
        assert_eq!(fx.logged(&item).await[0].kind, AccessKind::Download);
    }

    #[tokio::test]
    async fn view_limit_is_enforced_before_the_reaper_runs() {
        let fx = fixture();
        let item = fx.store("once001", None, Some(2)).await;

        for _ in 0..2 {
            fx.recorder
                .open("once001", AccessKind::View, RequestMeta::default())
                .await
                .unwrap();
        }
        let err = fx
            .recorder
            .open("once001", AccessKind::View, RequestMeta::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::Gone(_)));
        assert_eq!(fx.logged(&item).await.len(), 2);
    }

    #[tokio::test]
    async fn expired_content_is_gone() {
        let fx = fixture();
        fx.store("brief01", Some(epoch() + SignedDuration::from_mins(5)), None)
            .await;

        fx.recorder
            .open("brief01", AccessKind::View, RequestMeta::default())
            .await
            .unwrap();
        fx.clock.advance(SignedDuration::from_mins(5));

        let err = fx
            .recorder
            .open("brief01", AccessKind::Download, RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Gone(_)));
    }

    #[tokio::test]
    async fn unknown_or_malformed_code_is_not_found() {
        let fx = fixture();

        for code in ["nothere", "x", "bad code!"] {
            let err = fx
                .recorder
                .open(code, AccessKind::View, RequestMeta::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AccessError::NotFound(_)), "{code}");
        }
        assert!(fx.log.is_empty());
    }

    #[tokio::test]
    async fn missing_blob_is_gone_and_not_recorded() {
        let fx = fixture();
        let item = fx.store("hello01", None, None).await;
        fx.blobs.delete(&item.storage_path).await.unwrap();

        let err = fx
            .recorder
            .open("hello01", AccessKind::View, RequestMeta::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::Gone(_)));
        assert!(fx.log.is_empty());
        assert_eq!(fx.contents.get(item.id).await.unwrap().unwrap().view_count, 0);
    }

    #[tokio::test]
    async fn clicks_are_not_content_accesses() {
        let fx = fixture();
        fx.store("hello01", None, None).await;

        let err = fx
            .recorder
            .open("hello01", AccessKind::Click, RequestMeta::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::UnsupportedKind(AccessKind::Click)));
    }

    #[tokio::test]
    async fn thumbnail_is_served_without_recording() {
        let fx = fixture();
        let thumbnail = fx.blobs.save(b"thumb", "t.png", None).await.unwrap();
        let storage_path = fx.blobs.save(b"full", "f.png", None).await.unwrap();
        fx.contents
            .insert(NewContent {
                owner: None,
                code: ShortCode::new("pic0001").unwrap(),
                file_name: "f.png".to_string(),
                content_type: None,
                size: 4,
                storage_path,
                thumbnail_path: Some(thumbnail),
                expires_at: None,
                max_views: None,
                created_at: epoch(),
            })
            .await
            .unwrap();

        assert_eq!(
            fx.recorder.thumbnail("pic0001").await.unwrap(),
            Some(b"thumb".to_vec())
        );
        assert!(fx.log.is_empty());

        fx.store("hello01", None, None).await;
        assert_eq!(fx.recorder.thumbnail("hello01").await.unwrap(), None);
    }
}
