//! Media tooling and catalog services

pub mod catalog;
pub mod ffmpeg;
pub mod remux;
pub mod scanner;

#[cfg(all(test, unix))]
pub(crate) mod test_tools;

pub use catalog::{CatalogError, CatalogService, FileEntry};
pub use ffmpeg::FfmpegService;
pub use remux::{RemuxError, RemuxService};
