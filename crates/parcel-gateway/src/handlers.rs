mod admin;
mod content;
mod health;
mod link;
mod user;

pub use admin::reap_handler;
pub use content::{
    content_analytics_handler, delete_upload_handler, download_handler, thumbnail_handler,
    upload_handler, view_handler,
};
pub use health::health_handler;
pub use link::{create_link_handler, follow_link_handler, link_analytics_handler};
pub use user::{
    owner_analytics_handler, reconcile_handler, set_limits_handler, usage_handler,
};
