//! In-place audio language rewriting with ffmpeg
//!
//! Streams are copied (never re-encoded) into a temporary sibling of the
//! source, with the first audio stream's `language` tag overwritten. The
//! temporary file then replaces the source with a single rename, so readers
//! see either the old file or the new one. The temporary file is removed on
//! every failure path.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Longest tool diagnostic passed back to callers
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Name prefix of in-progress rewrite outputs; the scanner never lists these
pub const TEMP_FILE_PREFIX: &str = ".langtag-";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("Failed to start ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with code {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("Failed to create temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to replace original file: {0}")]
    Replace(#[source] std::io::Error),
}

impl RemuxError {
    /// Client-facing description, with tool output truncated
    pub fn diagnostic(&self) -> String {
        match self {
            RemuxError::ToolFailed { stderr, .. } => {
                format!("ffmpeg error: {}", truncate_chars(stderr, MAX_DIAGNOSTIC_CHARS))
            }
            other => other.to_string(),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Media rewriter using ffmpeg
#[derive(Debug, Clone)]
pub struct RemuxService {
    /// Path to ffmpeg executable
    ffmpeg_path: String,
}

impl RemuxService {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }

    /// Create with a custom ffmpeg path
    pub fn with_ffmpeg_path(ffmpeg_path: String) -> Self {
        Self { ffmpeg_path }
    }

    /// Overwrite the first audio stream's language tag of `path` in place
    pub async fn set_audio_language(&self, path: &Path, language: &str) -> Result<(), RemuxError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let suffix = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        // Sibling of the source so the final rename stays on one filesystem.
        // Dropping `temp` before `persist` deletes it.
        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(&suffix)
            .tempfile_in(parent)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Could not create temporary file");
                RemuxError::TempFile(e)
            })?;

        info!(
            path = %path.display(),
            language,
            temp = %temp.path().display(),
            "Rewriting audio language with ffmpeg"
        );

        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(path)
            .args(["-map", "0", "-c", "copy"])
            .arg("-metadata:s:a:0")
            .arg(format!("language={language}"))
            .arg(temp.path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(RemuxError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                path = %path.display(),
                code = ?output.status.code(),
                stderr = %stderr,
                "ffmpeg failed; original left untouched"
            );
            return Err(RemuxError::ToolFailed {
                code: output.status.code(),
                stderr,
            });
        }

        // The temp file is created owner-only; keep the original's mode.
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            tokio::fs::set_permissions(temp.path(), metadata.permissions())
                .await
                .map_err(|e| {
                    error!(path = %path.display(), error = %e, "Could not copy permissions to remuxed file");
                    RemuxError::Replace(e)
                })?;
        }

        temp.persist(path).map_err(|e| {
            error!(path = %path.display(), error = %e.error, "Could not replace original with remuxed file");
            RemuxError::Replace(e.error)
        })?;
        debug!(path = %path.display(), "Replaced original with remuxed file");

        Ok(())
    }
}

impl Default for RemuxService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_diagnostic_is_truncated() {
        let err = RemuxError::ToolFailed {
            code: Some(1),
            stderr: "é".repeat(800),
        };
        let diagnostic = err.diagnostic();
        assert!(diagnostic.starts_with("ffmpeg error: "));
        assert_eq!(
            diagnostic.trim_start_matches("ffmpeg error: ").chars().count(),
            MAX_DIAGNOSTIC_CHARS
        );
    }

    #[test]
    fn test_short_diagnostic_untouched() {
        let err = RemuxError::ToolFailed {
            code: Some(1),
            stderr: "Invalid data".to_string(),
        };
        assert_eq!(err.diagnostic(), "ffmpeg error: Invalid data");
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_FILE_PREFIX))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_tool_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("a.mkv");
        std::fs::write(&video, b"data").unwrap();

        let service = RemuxService::with_ffmpeg_path("/nonexistent/ffmpeg".to_string());
        let err = service.set_audio_language(&video, "eng").await.unwrap_err();
        assert_matches!(err, RemuxError::Spawn(_));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_temp_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("moved-away").join("a.mkv");

        let err = RemuxService::new()
            .set_audio_language(&video, "eng")
            .await
            .unwrap_err();
        assert_matches!(err, RemuxError::TempFile(_));
        assert!(err.diagnostic().starts_with("Failed to create temporary file"));
    }

    #[cfg(unix)]
    mod with_tools {
        use super::*;
        use crate::services::ffmpeg::FfmpegService;
        use crate::services::test_tools;
        use std::os::unix::fs::PermissionsExt;
        use std::process::Command as StdCommand;

        #[tokio::test]
        async fn test_failure_leaves_original_byte_identical() {
            let tools = tempfile::tempdir().unwrap();
            let media = tempfile::tempdir().unwrap();
            let ffmpeg =
                test_tools::failing_tool(tools.path(), "ffmpeg", "Invalid data found when processing input");
            let video = media.path().join("movie.mp4");
            let original = b"\x00\x00\x00\x18ftypmp42 original bytes".to_vec();
            std::fs::write(&video, &original).unwrap();

            let service = RemuxService::with_ffmpeg_path(ffmpeg);
            let err = service.set_audio_language(&video, "fra").await.unwrap_err();

            assert_matches!(err, RemuxError::ToolFailed { code: Some(1), .. });
            assert!(err.diagnostic().contains("Invalid data found"));
            assert_eq!(std::fs::read(&video).unwrap(), original);
            assert!(leftover_temp_files(media.path()).is_empty());
        }

        #[tokio::test]
        async fn test_success_replaces_and_reads_back() {
            let tools = tempfile::tempdir().unwrap();
            let media = tempfile::tempdir().unwrap();
            let ffmpeg = test_tools::fake_ffmpeg(tools.path());
            let ffprobe = test_tools::fake_ffprobe(tools.path());
            let video = media.path().join("movie.mkv");
            std::fs::write(&video, b"payload").unwrap();
            std::fs::set_permissions(&video, std::fs::Permissions::from_mode(0o644)).unwrap();

            RemuxService::with_ffmpeg_path(ffmpeg)
                .set_audio_language(&video, "deu")
                .await
                .unwrap();

            assert_eq!(std::fs::read(&video).unwrap(), b"payload");
            assert!(leftover_temp_files(media.path()).is_empty());
            let mode = std::fs::metadata(&video).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o644);

            let language = FfmpegService::with_ffprobe_path(ffprobe)
                .audio_language(&video)
                .await
                .unwrap();
            assert_eq!(language.as_deref(), Some("deu"));
        }

        fn tool_on_path(name: &str) -> bool {
            StdCommand::new(name)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        }

        /// Round trip through the real tools; skipped when they are not installed
        #[tokio::test]
        async fn test_real_ffmpeg_round_trip() {
            if !tool_on_path("ffmpeg") || !tool_on_path("ffprobe") {
                eprintln!("ffmpeg/ffprobe not found; skipping");
                return;
            }

            let media = tempfile::tempdir().unwrap();
            let video = media.path().join("sample.mkv");
            let status = StdCommand::new("ffmpeg")
                .args(["-hide_banner", "-loglevel", "error", "-y"])
                .args(["-f", "lavfi", "-i", "color=c=blue:s=160x120:d=1"])
                .args(["-f", "lavfi", "-i", "sine=frequency=1000:duration=1"])
                .args(["-c:v", "mpeg4", "-c:a", "aac"])
                .args(["-metadata:s:a:0", "language=eng"])
                .arg(&video)
                .status()
                .unwrap();
            assert!(status.success());

            let prober = FfmpegService::new();
            assert_eq!(prober.audio_language(&video).await.unwrap().as_deref(), Some("eng"));

            RemuxService::new().set_audio_language(&video, "fra").await.unwrap();

            let probe = prober.probe_streams(&video).await.unwrap();
            assert_eq!(
                crate::services::ffmpeg::first_audio_language(&probe).as_deref(),
                Some("fra")
            );
            let video_streams = probe
                .streams
                .unwrap_or_default()
                .into_iter()
                .filter(|s| s.codec_type.as_deref() == Some("video"))
                .count();
            assert_eq!(video_streams, 1);
            assert!(leftover_temp_files(media.path()).is_empty());
        }
    }
}
