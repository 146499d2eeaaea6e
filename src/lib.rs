//! Sankaku Fetcher Library
//!
//! A Rust library for archiving gallery media from Sankaku tag searches.
//! Discovery runs through a real browser session because the site only
//! exposes its content after scripts run; the media bytes themselves are
//! downloaded over rate-limited HTTP with digest-verified idempotent writes.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
