//! API route definitions
//!
//! JSON endpoints under /api, plus health probes at the root.

pub mod error;
pub mod files;
pub mod health;
pub mod theme;
