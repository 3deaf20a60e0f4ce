use jiff::Timestamp;
use parcel_core::{ContentId, ContentItem, OwnerId};
use serde::{Deserialize, Serialize};

/// Query string of `POST /v1/uploads`. `name` wins over a form part's file
/// name.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub owner_id: Option<OwnerId>,
    pub name: Option<String>,
    #[serde(default)]
    pub word_code: bool,
    pub expires_in_secs: Option<u64>,
    pub max_views: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: OwnerId,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "DaysQuery::default_days")]
    pub days: i64,
}

impl DaysQuery {
    fn default_days() -> i64 {
        30
    }
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub id: ContentId,
    pub code: String,
    pub url: String,
    pub owner_id: Option<OwnerId>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub has_thumbnail: bool,
    pub expires_at: Option<Timestamp>,
    pub max_views: Option<u64>,
    pub view_count: u64,
    pub download_count: u64,
    pub created_at: Timestamp,
}

impl ContentResponse {
    pub fn new(item: ContentItem, base_url: &str) -> Self {
        Self {
            id: item.id,
            url: item.code.to_url(base_url, "f"),
            code: item.code.to_string(),
            owner_id: item.owner,
            file_name: item.file_name,
            content_type: item.content_type,
            size: item.size,
            has_thumbnail: item.thumbnail_path.is_some(),
            expires_at: item.expires_at,
            max_views: item.max_views,
            view_count: item.view_count,
            download_count: item.download_count,
            created_at: item.created_at,
        }
    }
}
