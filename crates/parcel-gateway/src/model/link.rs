use jiff::Timestamp;
use parcel_core::{LinkId, OwnerId, ShortLink};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub word_code: bool,
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: LinkId,
    pub code: String,
    pub short_url: String,
    pub target_url: String,
    pub click_count: u64,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl LinkResponse {
    pub fn new(link: ShortLink, base_url: &str) -> Self {
        Self {
            id: link.id,
            short_url: link.code.to_url(base_url, "l"),
            code: link.code.to_string(),
            target_url: link.target_url,
            click_count: link.click_count,
            expires_at: link.expires_at,
            created_at: link.created_at,
        }
    }
}
