//! Catalog service
//!
//! Composes the scanner, the database, the prober and the rewriter into the
//! operations exposed over HTTP.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::ffmpeg::FfmpegService;
use super::remux::{RemuxError, RemuxService};
use super::scanner;
use crate::db::{AnalysisUpdate, Database, FileKey, FileRecord, Theme};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("File not found: id={0}")]
    NotFound(i64),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Remux(#[from] RemuxError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// A file as listed to clients: either a stored record or a file found on
/// disk that has not been registered yet (`id` is then `None`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub filename: String,
    pub path: String,
    pub language: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub analyzed: bool,
}

impl From<FileRecord> for FileEntry {
    fn from(record: FileRecord) -> Self {
        Self {
            analyzed: record.is_analyzed(),
            id: Some(record.id),
            filename: record.filename,
            path: record.path,
            language: record.language,
            analyzed_at: record.analyzed_at,
        }
    }
}

impl FileEntry {
    fn unregistered(path: &Path) -> Self {
        Self {
            id: None,
            filename: scanner::file_name(path),
            path: path.to_string_lossy().into_owned(),
            language: None,
            analyzed_at: None,
            analyzed: false,
        }
    }
}

pub struct CatalogService {
    db: Database,
    videos_dir: PathBuf,
    prober: FfmpegService,
    remuxer: RemuxService,
}

impl CatalogService {
    pub fn new(
        db: Database,
        videos_dir: PathBuf,
        prober: FfmpegService,
        remuxer: RemuxService,
    ) -> Self {
        Self {
            db,
            videos_dir,
            prober,
            remuxer,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn prober(&self) -> &FfmpegService {
        &self.prober
    }

    /// Walk the media root off the async runtime
    async fn scan(&self) -> CatalogResult<Vec<PathBuf>> {
        let root = self.videos_dir.clone();
        let files = tokio::task::spawn_blocking(move || scanner::scan_directory(&root))
            .await
            .map_err(|e| anyhow::anyhow!("Directory scan task failed: {}", e))?;
        Ok(files)
    }

    /// Probe a file's audio language. Probe failures are logged and reported
    /// as an unknown language, the same as a file without a tag.
    async fn probe_language(&self, path: &Path) -> Option<String> {
        match self.prober.audio_language(path).await {
            Ok(language) => language,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Probe failed; language recorded as unknown");
                None
            }
        }
    }

    /// Files currently on disk, merged with stored records by path, sorted by filename
    pub async fn list_files(&self, name_filter: Option<&str>) -> CatalogResult<Vec<FileEntry>> {
        let mut stored: HashMap<String, FileRecord> = self
            .db
            .files()
            .list_all()
            .await?
            .into_iter()
            .map(|r| (r.path.clone(), r))
            .collect();

        let needle = name_filter
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);

        let mut entries: Vec<FileEntry> = self
            .scan()
            .await?
            .into_iter()
            .map(|path| {
                let key = path.to_string_lossy().into_owned();
                match stored.remove(&key) {
                    Some(record) => FileEntry::from(record),
                    None => FileEntry::unregistered(&path),
                }
            })
            .filter(|entry| match &needle {
                Some(n) => entry.filename.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .collect();

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }

    pub async fn get_file(&self, id: i64) -> CatalogResult<FileEntry> {
        let record = self
            .db
            .files()
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        Ok(record.into())
    }

    /// Register files found on disk that are not stored yet. Returns how many were added.
    pub async fn rescan(&self) -> CatalogResult<u64> {
        info!(root = %self.videos_dir.display(), "Registering new files");

        let discovered: Vec<(String, String)> = self
            .scan()
            .await?
            .iter()
            .map(|p| (p.to_string_lossy().into_owned(), scanner::file_name(p)))
            .collect();

        let inserted = self.db.files().insert_missing(&discovered).await?;
        info!(discovered = discovered.len(), inserted, "Registration complete");
        Ok(inserted)
    }

    /// Probe each record and write all results in one transaction
    async fn analyze_records(&self, records: Vec<FileRecord>) -> CatalogResult<usize> {
        let mut updates = Vec::with_capacity(records.len());
        for record in &records {
            let language = self.probe_language(Path::new(&record.path)).await;
            updates.push(AnalysisUpdate {
                id: record.id,
                language,
                analyzed_at: Utc::now(),
            });
        }

        self.db.files().update_analyses(&updates).await?;
        Ok(records.len())
    }

    /// Re-probe every stored file. Returns the number processed.
    pub async fn analyze_all(&self) -> CatalogResult<usize> {
        info!("Analyzing all stored files");
        let records = self.db.files().list_all().await?;
        let count = self.analyze_records(records).await?;
        info!(count, "Analysis of all files complete");
        Ok(count)
    }

    /// Probe stored files that were never analyzed, updating them in place
    pub async fn analyze_new(&self) -> CatalogResult<usize> {
        info!("Analyzing files not yet analyzed");
        let records = self.db.files().list_unanalyzed().await?;
        let count = self.analyze_records(records).await?;
        info!(count, "Analysis of new files complete");
        Ok(count)
    }

    /// Probe an arbitrary path and store the result, updating the row if the path is known
    pub async fn analyze_file(&self, path: &str, filename: &str) -> CatalogResult<Option<String>> {
        info!(path, "Analyzing file on request");
        let language = self.probe_language(Path::new(path)).await;
        self.db
            .files()
            .upsert_analysis(path, filename, language.as_deref(), Utc::now())
            .await?;
        Ok(language)
    }

    /// Re-probe a stored file
    pub async fn reanalyze(&self, id: i64) -> CatalogResult<Option<String>> {
        let record = self.db.files().get_by_id(id).await?.ok_or_else(|| {
            warn!(id, "File not found for reanalysis");
            CatalogError::NotFound(id)
        })?;

        info!(id, path = %record.path, "Reanalyzing file");
        let language = self.probe_language(Path::new(&record.path)).await;
        self.db
            .files()
            .update_analysis(FileKey::Id(id), language.as_deref(), Utc::now())
            .await?;
        Ok(language)
    }

    /// Rewrite a stored file's audio language tag, then record the new language.
    /// On rewrite failure neither the file nor the stored record changes.
    pub async fn set_language(&self, id: i64, language: &str) -> CatalogResult<String> {
        let record = self.db.files().get_by_id(id).await?.ok_or_else(|| {
            warn!(id, "File not found for set_language");
            CatalogError::NotFound(id)
        })?;

        let language = language.trim();
        if language.is_empty() {
            return Err(CatalogError::InvalidInput("Language must not be empty".to_string()));
        }

        self.remuxer
            .set_audio_language(Path::new(&record.path), language)
            .await?;

        self.db
            .files()
            .update_analysis(FileKey::Id(id), Some(language), Utc::now())
            .await?;
        info!(id, path = %record.path, language, "Audio language updated");
        Ok(language.to_string())
    }

    pub async fn theme(&self) -> CatalogResult<Theme> {
        Ok(self.db.settings().theme().await?)
    }

    /// Store a new theme; values outside the known set are rejected without side effects
    pub async fn set_theme(&self, value: &str) -> CatalogResult<Theme> {
        let theme: Theme = value.parse().map_err(CatalogError::InvalidInput)?;
        self.db.settings().set_theme(theme).await?;
        info!(theme = %theme, "Theme updated");
        Ok(theme)
    }
}
