//! Video library scanner
//!
//! Walks the media root to discover video files by extension.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::remux::TEMP_FILE_PREFIX;

/// Video file extensions we recognize (compared case-insensitively)
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v"];

/// Whether `path` has one of the recognized video extensions
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `path` is an unfinished language rewrite output
pub fn is_rewrite_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with(TEMP_FILE_PREFIX))
        .unwrap_or(false)
}

/// Base name of `path` as a string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recursively list every regular video file beneath `root`, as absolute paths.
///
/// Scanning is best effort: a missing root yields an empty list and
/// unreadable entries are skipped. Leftover rewrite temp files are ignored.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        warn!(root = %root.display(), "Media root does not exist; nothing to scan");
        return Vec::new();
    }

    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

    let files: Vec<PathBuf> = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && is_video_file(entry.path())
                && !is_rewrite_temp_file(entry.path())
        })
        .map(|entry| entry.into_path())
        .collect();

    debug!(root = %root.display(), count = files.len(), "Directory scan complete");
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("/a/movie.mkv")));
        assert!(is_video_file(Path::new("/a/MOVIE.MP4")));
        assert!(is_video_file(Path::new("clip.M4v")));
        assert!(!is_video_file(Path::new("/a/movie.srt")));
        assert!(!is_video_file(Path::new("/a/movie.mkv.lang")));
        assert!(!is_video_file(Path::new("/a/mkv")));
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert!(scan_directory(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_scan_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("shows/season 1")).unwrap();
        std::fs::create_dir_all(root.join("film.mkv")).unwrap();
        for name in ["a.mp4", "b.MKV", "notes.txt", "shows/season 1/e01.webm", "shows/cover.jpg"] {
            std::fs::write(root.join(name), b"").unwrap();
        }

        let mut found: Vec<String> = scan_directory(root)
            .into_iter()
            .map(|p| {
                assert!(p.is_absolute());
                p.strip_prefix(root).unwrap().to_string_lossy().into_owned()
            })
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.mp4", "b.MKV", "shows/season 1/e01.webm"]);
    }

    #[test]
    fn test_rewrite_temp_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("movie.mkv"), b"").unwrap();
        std::fs::write(root.join(format!("{TEMP_FILE_PREFIX}Ab12Cd.mkv")), b"").unwrap();
        std::fs::write(root.join(".hidden.mp4"), b"").unwrap();

        let mut found: Vec<String> = scan_directory(root).iter().map(|p| file_name(p)).collect();
        found.sort();
        assert_eq!(found, vec![".hidden.mp4", "movie.mkv"]);

        assert!(is_rewrite_temp_file(Path::new("/v/.langtag-x1y2.mp4")));
        assert!(!is_rewrite_temp_file(Path::new("/v/langtag-x1y2.mp4")));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/v/shows/e01.mkv")), "e01.mkv");
        assert_eq!(file_name(Path::new("/")), "");
    }
}
