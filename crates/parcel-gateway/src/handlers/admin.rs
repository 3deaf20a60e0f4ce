use crate::error::Result;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use parcel_reaper::SweepReport;
use tracing::info;

/// Runs one sweep now. Waits for a sweep already in progress to finish
/// first.
pub async fn reap_handler(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    let report = state.reaper().sweep().await?;
    info!(cleaned = report.cleaned, failed = report.failed, "manual sweep finished");
    Ok(Json(report))
}
