use crate::error::Result;
use crate::model::{DaysQuery, LimitsRequest, ReconcileResponse};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use parcel_core::{DailyBucket, LogScope, OwnerId};
use parcel_quota::QuotaSnapshot;

pub async fn usage_handler(
    State(state): State<AppState>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<QuotaSnapshot>> {
    Ok(Json(state.ledger().snapshot(owner).await?))
}

pub async fn set_limits_handler(
    State(state): State<AppState>,
    Path(owner): Path<OwnerId>,
    Json(request): Json<LimitsRequest>,
) -> Result<Json<QuotaSnapshot>> {
    state
        .ledger()
        .set_limits(owner, request.max_storage_bytes, request.max_files)
        .await?;
    Ok(Json(state.ledger().snapshot(owner).await?))
}

pub async fn reconcile_handler(
    State(state): State<AppState>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<ReconcileResponse>> {
    let outcome = state.ledger().reconcile(owner).await?;
    Ok(Json(outcome.into()))
}

pub async fn owner_analytics_handler(
    State(state): State<AppState>,
    Path(owner): Path<OwnerId>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyBucket>>> {
    let buckets = state
        .analytics()
        .aggregate_recent(LogScope::Owner(owner), query.days)
        .await?;
    Ok(Json(buckets))
}
