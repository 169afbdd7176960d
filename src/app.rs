//! Application state and HTTP router construction.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::db::Database;
use crate::services::{CatalogService, FfmpegService, RemuxService};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Wire the catalog service from configuration and an open database
    pub fn new(config: Arc<Config>, db: Database) -> Self {
        let catalog = CatalogService::new(
            db,
            config.videos_dir.clone(),
            FfmpegService::with_ffprobe_path(config.ffprobe_path.clone()),
            RemuxService::with_ffmpeg_path(config.ffmpeg_path.clone()),
        );
        Self {
            config,
            catalog: Arc::new(catalog),
        }
    }
}

/// Build the API router mounted at /api
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(api::theme::router())
        .merge(api::files::router())
}

/// Build the full Axum router: /api, health probes, static frontend and layers.
pub fn build_app(state: AppState) -> Router<()> {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .nest("/api", api_router())
        .merge(api::health::router())
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(&static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
