use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parcel_core::error::Result;
use parcel_core::{CodeLookup, LinkId, LinkRepository, NewLink, ShortCode, ShortLink, StorageError};
use std::sync::atomic::{AtomicI64, Ordering};

/// An in-memory short link table. Same indexing scheme as
/// [`InMemoryContentRepository`](super::InMemoryContentRepository).
#[derive(Debug)]
pub struct InMemoryLinkRepository {
    rows: DashMap<LinkId, ShortLink>,
    codes: DashMap<ShortCode, LinkId>,
    next_id: AtomicI64,
}

impl Default for InMemoryLinkRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            codes: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl CodeLookup for InMemoryLinkRepository {
    async fn code_exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.codes.contains_key(code))
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn insert(&self, link: NewLink) -> Result<ShortLink> {
        match self.codes.entry(link.code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(link.code.to_string())),
            Entry::Vacant(slot) => {
                let id = LinkId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let link = link.into_link(id);
                self.rows.insert(id, link.clone());
                slot.insert(id);
                Ok(link)
            }
        }
    }

    async fn get(&self, id: LinkId) -> Result<Option<ShortLink>> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let Some(id) = self.codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn delete(&self, id: LinkId) -> Result<bool> {
        let Some((_, link)) = self.rows.remove(&id) else {
            return Ok(false);
        };
        self.codes.remove(&link.code);
        Ok(true)
    }

    async fn increment_clicks(&self, id: LinkId) -> Result<()> {
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("link {id}")))?;
        row.click_count = row.click_count.saturating_add(1);
        Ok(())
    }
}
