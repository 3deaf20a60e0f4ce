mod content;
mod health;
mod link;
mod quota;

pub use content::{ContentResponse, DaysQuery, OwnerQuery, UploadParams};
pub use health::HealthResponse;
pub use link::{CreateLinkRequest, LinkResponse};
pub use quota::{LimitsRequest, ReconcileResponse};
