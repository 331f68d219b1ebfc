//! absound-ab library - blind A/B/tie listening test service
//!
//! Owns the sample catalog, the tournament engine, and its storage backend,
//! and exposes engine operations as a local JSON API for the browser page.
//! Audio files are served under the catalog base URL.

use std::path::PathBuf;
use std::sync::Arc;

use absound_common::{StateStore, Tournament};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Engine over a storage backend chosen at startup
pub type Engine = Tournament<Box<dyn StateStore + Send>>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Tournament engine; each handler runs one operation under the lock
    pub engine: Arc<Mutex<Engine>>,
    /// URL prefix the audio files are served under
    pub base_url: String,
    /// Directory holding the audio files, if served by this process
    pub audio_dir: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: Engine, base_url: impl Into<String>, audio_dir: Option<PathBuf>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            base_url: base_url.into(),
            audio_dir,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/samples", get(api::list_samples))
        .route("/api/samples/:id", get(api::get_sample))
        .route("/api/match/next", get(api::next_match))
        .route("/api/match/:id/vote", post(api::vote))
        .route("/api/phase/next", post(api::next_phase))
        .route("/api/continue", post(api::continue_from_complete))
        .route("/api/reset", post(api::reset))
        .route("/api/metric", get(api::get_metric))
        .route("/api/status", get(api::get_status))
        .route("/api/leaderboard", get(api::get_leaderboard))
        .route("/api/state/export", get(api::export_state))
        .route("/api/state/import", post(api::import_state))
        .merge(api::health_routes());

    let mut app = Router::new().merge(api).with_state(state.clone());

    if let Some(dir) = &state.audio_dir {
        let prefix = format!("/{}", state.base_url.trim_matches('/'));
        info!(dir = %dir.display(), prefix = %prefix, "Serving audio files");
        app = if prefix == "/" {
            app.fallback_service(ServeDir::new(dir))
        } else {
            app.nest_service(&prefix, ServeDir::new(dir))
        };
    }

    app.layer(TraceLayer::new_for_http())
        // Browser page may be served from another local origin
        .layer(CorsLayer::permissive())
}
