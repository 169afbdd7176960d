//! Database connection and operations

pub mod files;
pub mod schema_sync;
pub mod settings;
pub mod sqlite_helpers;

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub use files::{AnalysisUpdate, FileKey, FileRecord, FileRepository};
pub use settings::{SettingsRepository, Theme};

/// Database wrapper providing connection pool access
///
/// Every repository call borrows a pooled connection for the duration of
/// that call only; batch writes hold one transaction for the batch.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5)
    }

    /// Open (creating if needed) the SQLite file at `path` and bring the schema up to date
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::get_max_connections())
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        let db = Self { pool };
        db.sync_schema().await?;
        Ok(db)
    }

    /// Create missing tables
    pub async fn sync_schema(&self) -> Result<()> {
        let result = schema_sync::sync_schema(&self.pool)
            .await
            .context("Schema sync failed")?;
        if !result.tables_created.is_empty() {
            info!(tables = ?result.tables_created, "Created tables");
        }
        Ok(())
    }

    /// Check that a connection can be acquired and used
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Get the connection pool
    #[allow(dead_code)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a catalogued files repository
    pub fn files(&self) -> FileRepository {
        FileRepository::new(self.pool.clone())
    }

    /// Get a settings repository
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");

        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(db.ping().await);
        assert!(db.files().list_all().await.unwrap().is_empty());

        db.pool().close().await;
        let reopened = Database::open(&path).await.unwrap();
        assert!(reopened.ping().await);
    }
}
