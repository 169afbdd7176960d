//! ffprobe-based audio language detection
//!
//! Runs ffprobe (command-line) with JSON output and reads the language tag of
//! the first audio stream. ffprobe's JSON output format is stable and
//! well-documented, so only the fields needed here are modelled.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

/// FFprobe JSON output structures
pub mod ffprobe {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    pub struct FfprobeOutput {
        pub streams: Option<Vec<Stream>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Stream {
        pub codec_type: Option<String>,
        pub tags: Option<HashMap<String, String>>,
    }
}

/// Stream tag keys checked for a language, in order. Matroska files often
/// carry the uppercase variant.
const LANGUAGE_TAG_KEYS: &[&str] = &["language", "LANGUAGE"];

/// Language tag of the first audio stream in tool-reported order.
///
/// Only the first audio stream is considered; a later tagged audio stream
/// does not stand in for an untagged first one. Empty tags count as absent.
pub fn first_audio_language(probe: &ffprobe::FfprobeOutput) -> Option<String> {
    let stream = probe
        .streams
        .as_ref()?
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))?;

    let tags = stream.tags.as_ref()?;
    LANGUAGE_TAG_KEYS
        .iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Media prober using ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegService {
    /// Path to ffprobe executable
    ffprobe_path: String,
}

impl FfmpegService {
    /// Create a new FFmpeg service
    pub fn new() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
        }
    }

    /// Create with a custom ffprobe path
    pub fn with_ffprobe_path(ffprobe_path: String) -> Self {
        Self { ffprobe_path }
    }

    /// Check if ffprobe is available
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffprobe_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run ffprobe and return its parsed stream listing
    pub async fn probe_streams(&self, path: &Path) -> Result<ffprobe::FfprobeOutput> {
        debug!(path = %path.display(), "Probing media file with ffprobe");

        if !path.exists() {
            anyhow::bail!(
                "ffprobe failed for '{}': file does not exist",
                path.display()
            );
        }

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error"])
            .args(["-print_format", "json"])
            .arg("-show_streams")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute ffprobe for '{}'", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            anyhow::bail!(
                "ffprobe failed for '{}' (exit code {}): {}",
                path.display(),
                exit_code,
                if stderr.is_empty() {
                    "no error output"
                } else {
                    stderr.trim()
                }
            );
        }

        let probe: ffprobe::FfprobeOutput = serde_json::from_slice(&output.stdout)
            .context("Failed to parse ffprobe JSON output")?;

        Ok(probe)
    }

    /// Read the first audio stream's language tag.
    ///
    /// `Ok(None)` means the probe ran and found no audio stream or no tag;
    /// `Err` means the probe itself failed.
    pub async fn audio_language(&self, path: &Path) -> Result<Option<String>> {
        let probe = self.probe_streams(path).await?;
        let language = first_audio_language(&probe);

        info!(
            path = %path.display(),
            streams = probe.streams.as_ref().map(Vec::len).unwrap_or(0),
            language = ?language,
            "Audio language probe complete"
        );

        Ok(language)
    }
}

impl Default for FfmpegService {
    fn default() -> Self {
        Self::new()
    }
}
