use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use parcel_core::error::Result;
use parcel_core::{
    AccessKind, CodeLookup, ContentId, ContentItem, ContentRepository, LiveUsage, NewContent,
    OwnerId, ShortCode, StorageError,
};
use std::sync::atomic::{AtomicI64, Ordering};

/// An in-memory content table.
///
/// `codes` acts as the unique index on short codes. A row is inserted while
/// the code's entry is locked, so two racing inserts of the same code cannot
/// both succeed.
#[derive(Debug)]
pub struct InMemoryContentRepository {
    rows: DashMap<ContentId, ContentItem>,
    codes: DashMap<ShortCode, ContentId>,
    next_id: AtomicI64,
}

impl Default for InMemoryContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            codes: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn owned_by(&self, owner: OwnerId) -> impl Iterator<Item = ContentItem> + '_ {
        self.rows
            .iter()
            .filter(move |row| row.owner == Some(owner))
            .map(|row| row.value().clone())
    }
}

#[async_trait]
impl CodeLookup for InMemoryContentRepository {
    async fn code_exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.codes.contains_key(code))
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn insert(&self, content: NewContent) -> Result<ContentItem> {
        match self.codes.entry(content.code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(content.code.to_string())),
            Entry::Vacant(slot) => {
                let id = ContentId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let item = content.into_item(id);
                self.rows.insert(id, item.clone());
                slot.insert(id);
                Ok(item)
            }
        }
    }

    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ContentItem>> {
        let Some(id) = self.codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn delete(&self, id: ContentId) -> Result<bool> {
        let Some((_, item)) = self.rows.remove(&id) else {
            return Ok(false);
        };
        self.codes.remove(&item.code);
        Ok(true)
    }

    async fn increment_counter(&self, id: ContentId, kind: AccessKind) -> Result<()> {
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("content {id}")))?;
        match kind {
            AccessKind::View => row.view_count = row.view_count.saturating_add(1),
            AccessKind::Download => row.download_count = row.download_count.saturating_add(1),
            AccessKind::Click => {}
        }
        Ok(())
    }

    async fn find_reapable(&self, now: Timestamp) -> Result<Vec<ContentItem>> {
        let mut reapable: Vec<ContentItem> = self
            .rows
            .iter()
            .filter(|row| row.is_reapable(now))
            .map(|row| row.value().clone())
            .collect();
        reapable.sort_by_key(|item| item.id);
        Ok(reapable)
    }

    async fn live_usage(&self, owner: OwnerId) -> Result<LiveUsage> {
        Ok(self
            .owned_by(owner)
            .fold(LiveUsage::default(), |usage, item| LiveUsage {
                bytes: usage.bytes.saturating_add(item.size),
                files: usage.files + 1,
            }))
    }

    async fn created_between(
        &self,
        owner: OwnerId,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Timestamp>> {
        Ok(self
            .owned_by(owner)
            .map(|item| item.created_at)
            .filter(|at| *at >= from && *at < until)
            .collect())
    }
}
