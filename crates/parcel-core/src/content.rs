use crate::blob::BlobPath;
use crate::ids::{ContentId, OwnerId};
use crate::shortcode::ShortCode;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiration policy for an uploaded file or a short link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// Never expires.
    #[default]
    Never,
    /// Expires after a certain duration from creation.
    AfterDuration(Duration),
    /// Expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

impl ExpirationPolicy {
    /// Converts the policy into an absolute expiry relative to `now`.
    ///
    /// Durations too large to be represented saturate to "never".
    pub fn resolve(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            ExpirationPolicy::Never => None,
            ExpirationPolicy::AfterDuration(duration) => SignedDuration::try_from(*duration)
                .ok()
                .and_then(|d| now.checked_add(d).ok()),
            ExpirationPolicy::AtTimestamp(ts) => Some(*ts),
        }
    }
}

/// An uploaded file as stored in the content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    /// `None` for orphaned or anonymous content.
    pub owner: Option<OwnerId>,
    pub code: ShortCode,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub storage_path: BlobPath,
    pub thumbnail_path: Option<BlobPath>,
    pub expires_at: Option<Timestamp>,
    pub max_views: Option<u64>,
    pub view_count: u64,
    pub download_count: u64,
    pub created_at: Timestamp,
}

impl ContentItem {
    /// Returns whether the item has passed its expiry.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Returns whether the item has used up its view allowance.
    pub fn is_view_limit_reached(&self) -> bool {
        self.max_views
            .is_some_and(|max_views| self.view_count >= max_views)
    }

    /// The reaper's eligibility predicate.
    pub fn is_reapable(&self, now: Timestamp) -> bool {
        self.is_expired(now) || self.is_view_limit_reached()
    }
}

/// A content row about to be inserted. The repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    pub owner: Option<OwnerId>,
    pub code: ShortCode,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub storage_path: BlobPath,
    pub thumbnail_path: Option<BlobPath>,
    pub expires_at: Option<Timestamp>,
    pub max_views: Option<u64>,
    pub created_at: Timestamp,
}

impl NewContent {
    pub fn into_item(self, id: ContentId) -> ContentItem {
        ContentItem {
            id,
            owner: self.owner,
            code: self.code,
            file_name: self.file_name,
            content_type: self.content_type,
            size: self.size,
            storage_path: self.storage_path,
            thumbnail_path: self.thumbnail_path,
            expires_at: self.expires_at,
            max_views: self.max_views,
            view_count: 0,
            download_count: 0,
            created_at: self.created_at,
        }
    }
}
