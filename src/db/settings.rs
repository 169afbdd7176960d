//! Application settings database operations

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Settings key holding the UI theme
pub const THEME_KEY: &str = "theme";

/// UI themes the frontend ships stylesheets for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Plex,
    Sonarr,
    Jellyfin,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Plex, Theme::Sonarr, Theme::Jellyfin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Plex => "plex",
            Theme::Sonarr => "sonarr",
            Theme::Jellyfin => "jellyfin",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid theme '{}'", s))
    }
}

/// Settings repository for database operations
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a setting by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Set a setting value
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current UI theme. Unknown stored values fall back to the default theme.
    pub async fn theme(&self) -> Result<Theme> {
        let stored = self.get(THEME_KEY).await?;
        Ok(stored
            .and_then(|value| value.parse().ok())
            .unwrap_or_default())
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set(THEME_KEY, theme.as_str()).await
    }
}
