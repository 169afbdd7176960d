//! Catalogued video files database repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::db::sqlite_helpers::{datetime_to_str, str_to_datetime_opt};

/// A catalogued file from the database
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub filename: String,
    pub language: Option<String>,
    /// Parsed probe timestamp; `None` also when the stored text is unreadable
    pub analyzed_at: Option<DateTime<Utc>>,
    analyzed: bool,
}

impl FileRecord {
    /// A file counts as analyzed once a probe has stamped it, even if no tag was found
    /// or the stamp itself cannot be parsed
    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for FileRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: i64 = row.try_get("id")?;
        let analyzed_str: Option<String> = row.try_get("analyzed_at")?;
        let analyzed = analyzed_str.as_deref().is_some_and(|s| !s.is_empty());

        let analyzed_at = str_to_datetime_opt(analyzed_str.as_deref()).unwrap_or_else(|e| {
            warn!(id, error = %e, "Unreadable analyzed_at; keeping file as analyzed");
            None
        });

        Ok(Self {
            id,
            path: row.try_get("path")?,
            filename: row.try_get("filename")?,
            language: row.try_get("language")?,
            analyzed_at,
            analyzed,
        })
    }
}

/// Identifies an existing row either by surrogate id or by its unique path
#[derive(Debug, Clone, Copy)]
pub enum FileKey<'a> {
    Id(i64),
    #[allow(dead_code)]
    Path(&'a str),
}

/// Input for stamping one row with a probe result
#[derive(Debug, Clone)]
pub struct AnalysisUpdate {
    pub id: i64,
    pub language: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

const SELECT_FILES: &str = "SELECT id, path, filename, language, analyzed_at FROM files";

pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get every stored file
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_FILES} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Get stored files that have never been probed
    pub async fn list_unanalyzed(&self) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_FILES} WHERE analyzed_at IS NULL OR analyzed_at = '' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a file by id
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_FILES} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Get a file by path
    #[allow(dead_code)]
    pub async fn get_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_FILES} WHERE path = ?1"))
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Register a file unless its path is already stored. Returns whether a row was inserted.
    #[allow(dead_code)]
    pub async fn insert_if_absent(&self, path: &str, filename: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO files (path, filename) VALUES (?1, ?2)")
            .bind(path)
            .bind(filename)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Register a batch of `(path, filename)` pairs in one transaction, skipping known paths.
    /// Returns the number of rows inserted.
    pub async fn insert_missing(&self, files: &[(String, String)]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for (path, filename) in files {
            let result =
                sqlx::query("INSERT OR IGNORE INTO files (path, filename) VALUES (?1, ?2)")
                    .bind(path)
                    .bind(filename)
                    .execute(&mut *tx)
                    .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Set the probe result on an existing row. Returns false if no row matched.
    pub async fn update_analysis(
        &self,
        key: FileKey<'_>,
        language: Option<&str>,
        analyzed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = match key {
            FileKey::Id(id) => {
                sqlx::query("UPDATE files SET language = ?1, analyzed_at = ?2 WHERE id = ?3")
                    .bind(language)
                    .bind(datetime_to_str(analyzed_at))
                    .bind(id)
            }
            FileKey::Path(path) => {
                sqlx::query("UPDATE files SET language = ?1, analyzed_at = ?2 WHERE path = ?3")
                    .bind(language)
                    .bind(datetime_to_str(analyzed_at))
                    .bind(path)
            }
        };

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a batch of probe results in one transaction. Returns the number of rows updated.
    pub async fn update_analyses(&self, updates: &[AnalysisUpdate]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for update in updates {
            let result =
                sqlx::query("UPDATE files SET language = ?1, analyzed_at = ?2 WHERE id = ?3")
                    .bind(update.language.as_deref())
                    .bind(datetime_to_str(update.analyzed_at))
                    .bind(update.id)
                    .execute(&mut *tx)
                    .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Insert a probed file, or overwrite the stored result if the path already exists
    pub async fn upsert_analysis(
        &self,
        path: &str,
        filename: &str,
        language: Option<&str>,
        analyzed_at: DateTime<Utc>,
    ) -> Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (path, filename, language, analyzed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (path) DO UPDATE SET
                filename = excluded.filename,
                language = excluded.language,
                analyzed_at = excluded.analyzed_at
            RETURNING id, path, filename, language, analyzed_at
            "#,
        )
        .bind(path)
        .bind(filename)
        .bind(language)
        .bind(datetime_to_str(analyzed_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}
