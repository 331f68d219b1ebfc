//! Integration tests for absound-ab API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Catalog listing and single-sample lookup
//! - Match serving, voting, stale votes
//! - Phase control, continue, reset
//! - Metric, status, leaderboard views
//! - State export/import including rejection
//! - Static audio serving under the base URL

use absound_ab::{build_router, AppState, Engine};
use absound_common::config::TournamentSettings;
use absound_common::{parse_catalog, MemoryStore, StateStore, Tournament};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::util::ServiceExt; // for `oneshot` method

const BASE_URL: &str = "/assets/audio";

fn filenames() -> Vec<String> {
    vec![
        "sample_e0.5_cfg0.3_t0.8.wav".to_string(),
        "sample_e0.9_cfg0.3_t0.8.wav".to_string(),
        "sample_e1.2_cfg0.5_t0.6.wav".to_string(),
        "test_e0.7_cfg0.4_t0.9.aiff".to_string(),
        "notes.txt".to_string(),
    ]
}

fn engine_with(names: &[String]) -> Engine {
    let store: Box<dyn StateStore + Send> = Box::new(MemoryStore::new());
    let settings = TournamentSettings {
        seed: Some(99),
        ..TournamentSettings::default()
    };
    Tournament::new(parse_catalog(names, BASE_URL), store, settings)
}

/// Test helper: Create app over an in-memory engine
fn setup_app() -> Router {
    build_router(AppState::new(engine_with(&filenames()), BASE_URL, None))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app();

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "absound-ab");
    assert!(body["version"].is_string());
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_samples_listing_drops_unparseable_names() {
    let app = setup_app();
    let (status, body) = send(&app, test_request("GET", "/api/samples")).await;

    assert_eq!(status, StatusCode::OK);
    let samples = body["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0]["id"], "sample_e0.5_cfg0.3_t0.8");
    assert_eq!(samples[0]["file"], "/assets/audio/sample_e0.5_cfg0.3_t0.8.wav");
    assert_eq!(body["ranges"]["exaggeration"]["min"], 0.5);
    assert_eq!(body["ranges"]["exaggeration"]["max"], 1.2);
}

#[tokio::test]
async fn test_sample_lookup() {
    let app = setup_app();

    let (status, body) = send(&app, test_request("GET", "/api/samples/test_e0.7_cfg0.4_t0.9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["temp"], 0.9);

    let (status, body) = send(&app, test_request("GET", "/api/samples/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// =============================================================================
// Matches and votes
// =============================================================================

#[tokio::test]
async fn test_next_match_is_stable_until_voted() {
    let app = setup_app();

    let (status, first) = send(&app, test_request("GET", "/api/match/next")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["phase"], "explore");
    assert_eq!(first["a"]["id"], first["match"]["a"]);
    assert_eq!(first["b"]["id"], first["match"]["b"]);
    assert_ne!(first["match"]["a"], first["match"]["b"]);

    let (_, second) = send(&app, test_request("GET", "/api/match/next")).await;
    assert_eq!(first["match"]["id"], second["match"]["id"]);
}

#[tokio::test]
async fn test_vote_applies_once() {
    let app = setup_app();
    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    let match_id = next["match"]["id"].as_str().unwrap().to_string();
    let winner = next["match"]["a"].clone();
    let uri = format!("/api/match/{}/vote", match_id);

    let (status, body) = send(&app, json_request("POST", &uri, json!({"winner": winner}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["status"]["matches_played"], 1);
    assert_eq!(body["status"]["consecutive_wins"], 1);
    assert!(body["status"]["current_match"].is_null());

    // Replay of the same vote is a stale callback
    let (status, body) = send(&app, json_request("POST", &uri, json!({"winner": winner}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(body["status"]["matches_played"], 1);
}

#[tokio::test]
async fn test_tie_vote_scores_half_point() {
    let app = setup_app();
    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    let uri = format!("/api/match/{}/vote", next["match"]["id"].as_str().unwrap());

    let (_, body) = send(&app, json_request("POST", &uri, json!({"winner": "tie"}))).await;
    assert_eq!(body["applied"], true);

    let (_, board) = send(&app, test_request("GET", "/api/leaderboard")).await;
    let rows = board.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    let tied: Vec<&Value> = rows.iter().filter(|r| r["ties"] == 1).collect();
    assert_eq!(tied.len(), 2);
    for row in tied {
        assert_eq!(row["score"], 0.5);
    }
}

#[tokio::test]
async fn test_vote_for_outsider_is_not_applied() {
    let app = setup_app();
    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    let uri = format!("/api/match/{}/vote", next["match"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request("POST", &uri, json!({"winner": "sample_e9_cfg9_t9"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(body["status"]["matches_played"], 0);
}

#[tokio::test]
async fn test_empty_winner_is_bad_request() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/match/whatever/vote", json!({"winner": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_no_match_for_single_sample_catalog() {
    let names = vec!["sample_e1_cfg1_t1.wav".to_string()];
    let app = build_router(AppState::new(engine_with(&names), BASE_URL, None));

    let response = app.oneshot(test_request("GET", "/api/match/next")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// =============================================================================
// Phase control
// =============================================================================

#[tokio::test]
async fn test_phase_progression_and_continue() {
    let app = setup_app();

    let (_, body) = send(&app, test_request("POST", "/api/continue")).await;
    assert_eq!(body["applied"], false);

    let (_, body) = send(&app, test_request("POST", "/api/phase/next")).await;
    assert_eq!(body["phase"], "refine");

    let (_, body) = send(&app, test_request("POST", "/api/phase/next")).await;
    assert_eq!(body["phase"], "showdown");
    // No history yet: all four samples are fallback finalists
    assert_eq!(body["candidates"].as_array().unwrap().len(), 4);
    assert_eq!(body["showdown_total"], 6);

    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    assert!(next["match"]["id"].as_str().unwrap().starts_with("sd1:"));

    let (_, body) = send(&app, test_request("POST", "/api/phase/next")).await;
    assert_eq!(body["phase"], "complete");

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/match/next"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, body) = send(&app, test_request("POST", "/api/continue")).await;
    assert_eq!(body["applied"], true);
    assert_eq!(body["status"]["phase"], "explore");
}

#[tokio::test]
async fn test_reset_clears_progress() {
    let app = setup_app();
    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    let uri = format!("/api/match/{}/vote", next["match"]["id"].as_str().unwrap());
    send(&app, json_request("POST", &uri, json!({"winner": "tie"}))).await;

    let (status, body) = send(&app, test_request("POST", "/api/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches_played"], 0);
    assert_eq!(body["phase"], "explore");

    let (_, metric) = send(&app, test_request("GET", "/api/metric")).await;
    assert_eq!(metric["total"], 0.0);
}

// =============================================================================
// Metric and status
// =============================================================================

#[tokio::test]
async fn test_metric_after_one_vote() {
    let app = setup_app();
    let (_, next) = send(&app, test_request("GET", "/api/match/next")).await;
    let uri = format!("/api/match/{}/vote", next["match"]["id"].as_str().unwrap());
    send(&app, json_request("POST", &uri, json!({"winner": "tie"}))).await;

    let (status, metric) = send(&app, test_request("GET", "/api/metric")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metric["coverage"], 0.5);
    assert_eq!(metric["depth"], 0.125);
    assert_eq!(metric["showdown_progress"], 0.0);
    let total = metric["total"].as_f64().unwrap();
    assert!((total - (0.6 * 0.5 + 0.3 * 0.125)).abs() < 1e-9);

    let (_, status_body) = send(&app, test_request("GET", "/api/status")).await;
    assert_eq!(status_body["matches_played"], 1);
    assert_eq!(status_body["phase_matches"], 1);
}

// =============================================================================
// Export / import
// =============================================================================

#[tokio::test]
async fn test_export_is_attachment() {
    let app = setup_app();
    let response = app
        .oneshot(test_request("GET", "/api/state/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("absound-tournament-"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["phase"], "explore");
    assert_eq!(body["matchesPlayed"], 0);
}

#[tokio::test]
async fn test_export_then_import_into_fresh_app() {
    let source = setup_app();
    let (_, next) = send(&source, test_request("GET", "/api/match/next")).await;
    let uri = format!("/api/match/{}/vote", next["match"]["id"].as_str().unwrap());
    send(&source, json_request("POST", &uri, json!({"winner": next["match"]["b"]}))).await;
    send(&source, test_request("POST", "/api/phase/next")).await;

    let (_, exported) = send(&source, test_request("GET", "/api/state/export")).await;

    let target = setup_app();
    let (status, body) = send(&target, json_request("POST", "/api/state/import", exported)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "refine");
    assert_eq!(body["matches_played"], 1);
}

#[tokio::test]
async fn test_import_rejects_missing_phase() {
    let app = setup_app();
    let (_, before) = send(&app, test_request("GET", "/api/status")).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/state/import",
            json!({"matchesPlayed": 3, "phaseMatches": 0, "history": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "IMPORT_REJECTED");

    let (_, after) = send(&app, test_request("GET", "/api/status")).await;
    assert_eq!(before, after);
}

// =============================================================================
// Static audio
// =============================================================================

#[tokio::test]
async fn test_audio_files_served_under_base_url() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sample_e0.5_cfg0.3_t0.8.wav"), b"RIFF0000WAVE").unwrap();

    let audio_dir = Some(PathBuf::from(dir.path()));
    let app = build_router(AppState::new(engine_with(&filenames()), BASE_URL, audio_dir));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/assets/audio/sample_e0.5_cfg0.3_t0.8.wav"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"RIFF0000WAVE");

    let response = app
        .oneshot(test_request("GET", "/assets/audio/missing.wav"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
