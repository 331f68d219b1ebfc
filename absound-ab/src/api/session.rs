//! Phase control: advance, continue after completion, reset

use absound_common::tournament::TournamentStatus;
use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::AppState;

/// POST /api/phase/next
///
/// Advances to the next phase and returns the new status.
pub async fn next_phase(State(state): State<AppState>) -> Json<TournamentStatus> {
    let mut engine = state.engine.lock().await;
    engine.next_phase();
    Json(engine.status())
}

#[derive(Debug, Serialize)]
pub struct ContinueResponse {
    /// False unless the tournament was complete
    pub applied: bool,
    pub status: TournamentStatus,
}

/// POST /api/continue
pub async fn continue_from_complete(State(state): State<AppState>) -> Json<ContinueResponse> {
    let mut engine = state.engine.lock().await;
    let applied = engine.continue_from_complete();
    Json(ContinueResponse {
        applied,
        status: engine.status(),
    })
}

/// POST /api/reset
///
/// Discards all history and starts a fresh explore phase.
pub async fn reset(State(state): State<AppState>) -> Json<TournamentStatus> {
    let mut engine = state.engine.lock().await;
    engine.reset();
    info!("Reset requested via API");
    Json(engine.status())
}
