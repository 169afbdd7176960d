//! Application configuration management

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// Root directory scanned for video files
    pub videos_dir: PathBuf,

    /// SQLite database file (created on first start)
    pub database_path: PathBuf,

    /// Frontend assets served at `/` and `/static`
    pub static_dir: PathBuf,

    /// ffprobe executable used to read stream metadata
    pub ffprobe_path: String,

    /// ffmpeg executable used to remux files
    pub ffmpeg_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: var("HOST", "0.0.0.0").parse().context("Invalid HOST")?,

            port: var("PORT", "8000").parse().context("Invalid PORT")?,

            videos_dir: PathBuf::from(var("VIDEOS_DIR", "/videos")),

            database_path: PathBuf::from(var("DB_PATH", "app.db")),

            static_dir: PathBuf::from(var("STATIC_DIR", "static")),

            ffprobe_path: var("FFPROBE_PATH", "ffprobe"),

            ffmpeg_path: var("FFMPEG_PATH", "ffmpeg"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
