//! State export and import
//!
//! Export is offered as a downloadable JSON file. Import takes the raw JSON
//! text as the request body and replaces the engine state wholesale, or
//! rejects it leaving the current state untouched.

use absound_common::time;
use absound_common::tournament::TournamentStatus;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{ApiResult, AppState};

/// GET /api/state/export
pub async fn export_state(State(state): State<AppState>) -> ApiResult<Response> {
    let json = state.engine.lock().await.export_state()?;
    let filename = format!(
        "absound-tournament-{}.json",
        time::now().format("%Y%m%d-%H%M%S")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        json,
    )
        .into_response())
}

/// POST /api/state/import
///
/// 400 with code `IMPORT_REJECTED` when the blob fails validation.
pub async fn import_state(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<TournamentStatus>> {
    let mut engine = state.engine.lock().await;
    engine.import_state(&body)?;
    Ok(Json(engine.status()))
}
