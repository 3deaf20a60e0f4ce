use crate::ids::{LinkId, OwnerId};
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: LinkId,
    pub owner: Option<OwnerId>,
    pub code: ShortCode,
    /// The original URL that was shortened.
    pub target_url: String,
    pub click_count: u64,
    /// When the link expires, if ever.
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ShortLink {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// A link row about to be inserted. The repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub owner: Option<OwnerId>,
    pub code: ShortCode,
    pub target_url: String,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NewLink {
    pub fn into_link(self, id: LinkId) -> ShortLink {
        ShortLink {
            id,
            owner: self.owner,
            code: self.code,
            target_url: self.target_url,
            click_count: 0,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}
