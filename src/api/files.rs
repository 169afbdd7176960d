//! File catalog endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::app::AppState;
use crate::services::FileEntry;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive filename substring
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub path: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLanguageRequest {
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub status: &'static str,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct LanguageResponse {
    pub status: &'static str,
    pub language: Option<String>,
}

impl CountResponse {
    fn ok(count: u64) -> Json<Self> {
        Json(Self { status: "ok", count })
    }
}

impl LanguageResponse {
    fn ok(language: Option<String>) -> Json<Self> {
        Json(Self {
            status: "ok",
            language,
        })
    }
}

/// List files on disk merged with their stored analysis
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let files = state.catalog.list_files(query.name.as_deref()).await?;
    Ok(Json(files))
}

/// Get a stored file
async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FileEntry>, ApiError> {
    Ok(Json(state.catalog.get_file(id).await?))
}

/// Register files found on disk that are not stored yet
async fn rescan(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.catalog.rescan().await?;
    Ok(CountResponse::ok(count))
}

/// Re-probe every stored file
async fn analyze_all(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.catalog.analyze_all().await?;
    Ok(CountResponse::ok(count as u64))
}

/// Probe stored files that have never been analyzed
async fn analyze_new(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.catalog.analyze_new().await?;
    Ok(CountResponse::ok(count as u64))
}

/// Probe a file given by path, storing the result
async fn analyze_file(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<LanguageResponse>, ApiError> {
    let language = state.catalog.analyze_file(&body.path, &body.filename).await?;
    Ok(LanguageResponse::ok(language))
}

async fn reanalyze(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LanguageResponse>, ApiError> {
    let language = state.catalog.reanalyze(id).await?;
    Ok(LanguageResponse::ok(language))
}

/// Rewrite the first audio stream's language tag in the file itself
async fn set_language(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetLanguageRequest>,
) -> Result<Json<LanguageResponse>, ApiError> {
    let language = state.catalog.set_language(id, &body.language).await?;
    Ok(LanguageResponse::ok(Some(language)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route("/files/analyze", post(analyze_file))
        .route("/files/{id}", get(get_file))
        .route("/files/{id}/reanalyze", post(reanalyze))
        .route("/files/{id}/set_language", post(set_language))
        .route("/rescan", post(rescan))
        .route("/analyze_all", post(analyze_all))
        .route("/analyze_new", post(analyze_new))
}
