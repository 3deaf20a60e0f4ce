use crate::error::Result;
use crate::extract::ClientMeta;
use crate::model::{CreateLinkRequest, DaysQuery, LinkResponse};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use parcel_core::{CodeStyle, DailyBucket, ExpirationPolicy, LinkId, LogScope};
use std::time::Duration;

pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>)> {
    let expiration = request
        .expires_in_secs
        .map(|secs| ExpirationPolicy::AfterDuration(Duration::from_secs(secs)))
        .unwrap_or_default();

    let link = state
        .links()
        .shorten(
            request.owner_id,
            &request.url,
            CodeStyle::from_preference(request.word_code),
            expiration,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::new(link, state.base_url())),
    ))
}

pub async fn follow_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ClientMeta(meta): ClientMeta,
) -> Result<Redirect> {
    let link = state.links().follow(&code, meta).await?;
    Ok(Redirect::temporary(&link.target_url))
}

pub async fn link_analytics_handler(
    State(state): State<AppState>,
    Path(id): Path<LinkId>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyBucket>>> {
    let buckets = state
        .analytics()
        .aggregate_recent(LogScope::Link(id), query.days)
        .await?;
    Ok(Json(buckets))
}
