//! Read-only views: catalog, metric, status, leaderboard

use absound_common::distance::ParameterRanges;
use absound_common::scoring::LeaderboardEntry;
use absound_common::tournament::{MetricBreakdown, TournamentStatus};
use absound_common::Sample;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{ApiError, ApiResult, AppState};

/// Catalog listing with per-axis ranges for plotting
#[derive(Debug, Serialize)]
pub struct SamplesResponse {
    pub samples: Vec<Sample>,
    pub ranges: Option<ParameterRanges>,
}

/// GET /api/samples
pub async fn list_samples(State(state): State<AppState>) -> Json<SamplesResponse> {
    let engine = state.engine.lock().await;
    Json(SamplesResponse {
        samples: engine.samples().to_vec(),
        ranges: engine.parameter_ranges(),
    })
}

/// GET /api/samples/:id
pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sample>> {
    let engine = state.engine.lock().await;
    engine
        .sample(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Sample {}", id)))
}

/// GET /api/metric
pub async fn get_metric(State(state): State<AppState>) -> Json<MetricBreakdown> {
    Json(state.engine.lock().await.get_metric_breakdown())
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<TournamentStatus> {
    Json(state.engine.lock().await.status())
}

/// GET /api/leaderboard
pub async fn get_leaderboard(State(state): State<AppState>) -> Json<Vec<LeaderboardEntry>> {
    Json(state.engine.lock().await.leaderboard())
}
