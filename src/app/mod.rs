//! Core application modules for Sankaku Fetcher
//!
//! The pipeline drives a browser-backed [`session::PageSession`] for
//! discovery and a rate-limited [`client::MediaFetcher`] for the bytes,
//! reporting everything it did through [`report::RunReport`].

pub mod browser;
pub mod client;
pub mod download;
pub mod hash;
pub mod pacing;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod session;
pub mod walker;

#[cfg(test)]
pub mod fixtures;

pub use browser::ChromeSession;
pub use client::{ClientConfig, HttpFetcher, MediaFetcher};
pub use download::{Downloader, SaveOutcome};
pub use pipeline::{Pipeline, PipelineConfig};
pub use report::RunReport;
pub use resolver::{ContentResolver, ContentVariant};
pub use session::{PageSession, Selector};
pub use walker::{PageWalker, WalkerConfig};
