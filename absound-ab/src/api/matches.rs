//! Match serving and vote recording

use absound_common::tournament::{Match, Phase, TournamentStatus};
use absound_common::Sample;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

/// Pending match with both samples resolved to their records
#[derive(Debug, Serialize)]
pub struct NextMatchResponse {
    #[serde(rename = "match")]
    pub pending: Match,
    pub a: Sample,
    pub b: Sample,
    pub phase: Phase,
}

/// GET /api/match/next
///
/// Returns the pending match, generating one if needed.
/// 204 No Content when the tournament is complete or the catalog is too small.
pub async fn next_match(State(state): State<AppState>) -> ApiResult<Response> {
    let mut engine = state.engine.lock().await;

    let Some(pending) = engine.get_next_match() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let lookup = |id: &str| {
        engine
            .sample(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Sample {}", id)))
    };
    let a = lookup(&pending.a)?;
    let b = lookup(&pending.b)?;

    Ok(Json(NextMatchResponse {
        phase: engine.phase(),
        pending,
        a,
        b,
    })
    .into_response())
}

/// Vote request body: a sample id or the literal `"tie"`
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub winner: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// False when the vote was stale or named a sample outside the match
    pub applied: bool,
    pub status: TournamentStatus,
}

/// POST /api/match/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let winner = request.winner.trim();
    if winner.is_empty() {
        return Err(ApiError::BadRequest("winner must not be empty".to_string()));
    }

    let mut engine = state.engine.lock().await;
    let applied = engine.record_result(&match_id, winner);
    if !applied {
        debug!(match_id = %match_id, "Vote not applied");
    }

    Ok(Json(VoteResponse {
        applied,
        status: engine.status(),
    }))
}
