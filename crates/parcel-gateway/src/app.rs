use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    content_analytics_handler, create_link_handler, delete_upload_handler, download_handler,
    follow_link_handler, health_handler, link_analytics_handler, owner_analytics_handler,
    reap_handler, reconcile_handler, set_limits_handler, thumbnail_handler, upload_handler,
    usage_handler, view_handler,
};
use crate::state::AppState;

/// Extra body room for a multipart thumbnail part and form framing.
const THUMBNAIL_ALLOWANCE: usize = 1024 * 1024;

pub struct App {}

impl App {
    pub fn router(state: AppState, request_timeout: Duration) -> Router {
        let body_limit = usize::try_from(state.ledger().settings().max_upload_bytes)
            .unwrap_or(usize::MAX)
            .saturating_add(THUMBNAIL_ALLOWANCE);

        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/v1",
                Router::new()
                    .route(
                        "/uploads",
                        post(upload_handler).layer(DefaultBodyLimit::max(body_limit)),
                    )
                    .route("/uploads/{id}", delete(delete_upload_handler))
                    .route("/uploads/{id}/analytics", get(content_analytics_handler))
                    .route("/users/{owner_id}/usage", get(usage_handler))
                    .route("/users/{owner_id}/usage/reconcile", post(reconcile_handler))
                    .route("/users/{owner_id}/limits", put(set_limits_handler))
                    .route("/users/{owner_id}/analytics", get(owner_analytics_handler))
                    .route("/links", post(create_link_handler))
                    .route("/links/{id}/analytics", get(link_analytics_handler))
                    .route("/admin/reap", post(reap_handler)),
            )
            .route("/f/{code}", get(view_handler))
            .route("/f/{code}/download", get(download_handler))
            .route("/f/{code}/thumbnail", get(thumbnail_handler))
            .route("/l/{code}", get(follow_link_handler))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
