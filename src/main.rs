//! Video language catalog
//!
//! Scans a media directory, records the first audio stream's language for
//! each video in SQLite, and can rewrite that tag in place. Everything is
//! exposed as a JSON API under /api alongside a small static frontend.

mod api;
mod app;
mod config;
mod db;
mod services;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{AppState, build_app};
use crate::config::Config;
use crate::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_lang_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Arc::new(Config::from_env()?);
    tracing::info!(
        videos_dir = %config.videos_dir.display(),
        database = %config.database_path.display(),
        "Starting video language catalog"
    );

    let db = Database::open(&config.database_path).await?;
    tracing::info!("Database ready");

    let state = AppState::new(config.clone(), db);
    if !state.catalog.prober().is_available().await {
        tracing::warn!(ffprobe = %config.ffprobe_path, "ffprobe not found; languages will be reported as unknown");
    }

    let app = build_app(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
