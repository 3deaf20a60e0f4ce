use crate::error::{AppError, Result};
use crate::extract::{ClientMeta, UploadBody};
use crate::model::{ContentResponse, DaysQuery, OwnerQuery, UploadParams};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use parcel_core::{
    AccessKind, CodeStyle, ContentId, DailyBucket, ExpirationPolicy, LogScope,
};
use parcel_uploader::{OpenedContent, UploadRequest};
use std::time::Duration;

const OCTET_STREAM: &str = "application/octet-stream";

pub async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: UploadBody,
) -> Result<(StatusCode, Json<ContentResponse>)> {
    let file_name = params
        .name
        .or(body.file_name)
        .unwrap_or_else(|| "upload.bin".to_string());
    let expiration = params
        .expires_in_secs
        .map(|secs| ExpirationPolicy::AfterDuration(Duration::from_secs(secs)))
        .unwrap_or_default();

    let request = UploadRequest::builder()
        .owner(params.owner_id)
        .file_name(file_name)
        .content_type(body.content_type)
        .data(body.data.to_vec())
        .thumbnail(body.thumbnail.map(|bytes| bytes.to_vec()))
        .style(CodeStyle::from_preference(params.word_code))
        .expiration(expiration)
        .max_views(params.max_views)
        .build();

    let item = state.uploads().upload(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContentResponse::new(item, state.base_url())),
    ))
}

pub async fn delete_upload_handler(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode> {
    state.uploads().delete(query.owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn content_analytics_handler(
    State(state): State<AppState>,
    Path(id): Path<ContentId>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyBucket>>> {
    let buckets = state
        .analytics()
        .aggregate_recent(LogScope::Content(id), query.days)
        .await?;
    Ok(Json(buckets))
}

pub async fn view_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ClientMeta(meta): ClientMeta,
) -> Result<Response> {
    let opened = state.access().open(&code, AccessKind::View, meta).await?;
    Ok(serve(opened, "inline"))
}

pub async fn download_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ClientMeta(meta): ClientMeta,
) -> Result<Response> {
    let opened = state
        .access()
        .open(&code, AccessKind::Download, meta)
        .await?;
    Ok(serve(opened, "attachment"))
}

pub async fn thumbnail_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let bytes = state
        .access()
        .thumbnail(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("thumbnail of {code}")))?;
    Ok(([(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM))], bytes).into_response())
}

fn serve(opened: OpenedContent, disposition: &str) -> Response {
    let content_type = opened
        .item
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or(HeaderValue::from_static(OCTET_STREAM));
    let file_name: String = opened
        .item
        .file_name
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\' || *c == ' ')
        .collect();
    let disposition = HeaderValue::from_str(&format!("{disposition}; filename=\"{file_name}\""))
        .unwrap_or(HeaderValue::from_static("attachment"));

    (
        [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
        opened.data,
    )
        .into_response()
}
