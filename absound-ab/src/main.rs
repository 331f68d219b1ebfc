//! absound-ab - Blind A/B/tie listening test server
//!
//! Loads the sample catalog, restores the tournament from the data folder,
//! and serves the JSON API and audio files to the browser page.

use std::path::{Path, PathBuf};

use absound_common::catalog::{parse_catalog, parse_file_list};
use absound_common::config::{resolve_data_dir, TomlConfig};
use absound_common::{FileStore, StateStore, Tournament};
use absound_ab::{build_router, AppState, Engine};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for absound-ab
#[derive(Parser, Debug)]
#[command(name = "absound-ab")]
#[command(about = "Blind A/B/tie listening test for synthetic speech samples")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(long, env = "ABSOUND_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding persisted tournament state
    #[arg(long, env = "ABSOUND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "ABSOUND_PORT")]
    port: Option<u16>,

    /// File listing sample filenames (one per line, or a JSON array)
    #[arg(long, env = "ABSOUND_CATALOG")]
    catalog: Option<PathBuf>,

    /// Directory holding the audio files
    #[arg(long, env = "ABSOUND_AUDIO_DIR")]
    audio_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "absound_ab=info,absound_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any file access
    info!(
        "Starting absound-ab v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = TomlConfig::resolve(args.config.as_deref()).context("Failed to load config")?;

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), &config);
    info!("Data folder: {}", data_dir.display());
    let store = FileStore::open(&data_dir)
        .with_context(|| format!("Failed to open data folder {}", data_dir.display()))?;

    let list_file = args.catalog.or(config.catalog.list_file.clone());
    let filenames = match &list_file {
        Some(path) => read_catalog(path)?,
        None => {
            warn!("No catalog list file configured; starting with an empty catalog");
            Vec::new()
        }
    };

    let samples = parse_catalog(&filenames, &config.catalog.base_url);
    info!(
        listed = filenames.len(),
        parsed = samples.len(),
        "Sample catalog loaded"
    );

    let boxed: Box<dyn StateStore + Send> = Box::new(store);
    let engine: Engine = Tournament::new(samples, boxed, config.tournament.clone());

    let audio_dir = args.audio_dir.or(config.catalog.audio_dir.clone());
    if audio_dir.is_none() {
        warn!("No audio directory configured; audio must be served elsewhere");
    }

    let state = AppState::new(engine, config.catalog.base_url.clone(), audio_dir);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let host = config.server.host.as_str();
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("absound-ab listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Read and split the catalog list file
fn read_catalog(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog list {}", path.display()))?;
    let names = parse_file_list(&content)
        .with_context(|| format!("Failed to parse catalog list {}", path.display()))?;
    info!("Catalog list: {} ({} entries)", path.display(), names.len());
    Ok(names)
}

/// Resolves when the operator stops the server
///
/// Every vote is already on disk, so in-flight requests are only drained.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = interrupt => "interrupt",
        _ = terminate => "terminate",
    };
    info!(reason, "Stopping absound-ab");
}
