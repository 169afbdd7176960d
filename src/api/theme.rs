//! UI theme setting endpoints

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::app::AppState;
use crate::db::Theme;

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeBody {
    pub theme: String,
}

#[derive(Debug, Serialize)]
pub struct SetThemeResponse {
    pub status: &'static str,
    pub theme: Theme,
}

async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeBody>, ApiError> {
    let theme = state.catalog.theme().await?;
    Ok(Json(ThemeBody {
        theme: theme.to_string(),
    }))
}

async fn set_theme(
    State(state): State<AppState>,
    Json(body): Json<ThemeBody>,
) -> Result<Json<SetThemeResponse>, ApiError> {
    let theme = state.catalog.set_theme(&body.theme).await?;
    Ok(Json(SetThemeResponse { status: "ok", theme }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/theme", get(get_theme).post(set_theme))
}
