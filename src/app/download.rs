//! Idempotent media downloads
//!
//! Files land at `{save_dir}/{post_id}.{ext}`. A file that already exists is
//! never overwritten: depending on configuration it is either skipped
//! outright or re-fetched into a temp location and compared by digest, with
//! the verdict recorded and the fresh copy discarded either way.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::app::client::{MediaFetcher, MediaResponse};
use crate::app::hash::files_match;
use crate::constants::files;
use crate::errors::FetchResult;

/// What happened to one post's media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Fresh file written
    Saved,
    /// File already present, left untouched without re-fetching
    SkippedExists,
    /// File already present and the re-fetched copy matched it
    ReconciledIdentical,
    /// File already present but the re-fetched copy differed
    ReconciledMismatch,
    /// The fetch itself failed; nothing was written
    FetchFailed,
}

/// The known media extension appearing earliest in the URL.
///
/// Source URLs carry query strings and cache-busting suffixes, so this is a
/// positional scan over the whole URL rather than a suffix check.
pub fn extension_for_url(url: &str) -> Option<&'static str> {
    files::MEDIA_EXTENSIONS
        .iter()
        .filter_map(|ext| url.find(ext).map(|index| (index, *ext)))
        .min_by_key(|(index, _)| *index)
        .map(|(_, ext)| ext)
}

/// Writes post media to disk without ever clobbering an existing file
pub struct Downloader {
    save_dir: PathBuf,
    compare_existing: bool,
}

impl Downloader {
    pub fn new(save_dir: impl Into<PathBuf>, compare_existing: bool) -> Self {
        Self {
            save_dir: save_dir.into(),
            compare_existing,
        }
    }

    /// Final on-disk location for a post's media
    pub fn target_path(&self, post_id: &str, extension: &str) -> PathBuf {
        self.save_dir.join(format!("{post_id}.{extension}"))
    }

    /// Fetch one post's media and settle it on disk.
    ///
    /// Fetch failures (transport errors and non-2xx statuses) are outcomes,
    /// not errors; only local I/O trouble surfaces as `Err`.
    pub async fn save(
        &self,
        fetcher: &dyn MediaFetcher,
        post_id: &str,
        extension: &str,
        url: &str,
    ) -> FetchResult<SaveOutcome> {
        let target = self.target_path(post_id, extension);
        let exists = fs::try_exists(&target).await?;

        if exists && !self.compare_existing {
            debug!("{} already present, skipping", target.display());
            return Ok(SaveOutcome::SkippedExists);
        }

        let response = match fetcher.get(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed for post {}: {}", post_id, e);
                return Ok(SaveOutcome::FetchFailed);
            }
        };
        if !response.is_success() {
            warn!("Fetch for post {} returned HTTP {}", post_id, response.status);
            return Ok(SaveOutcome::FetchFailed);
        }

        fs::create_dir_all(&self.save_dir).await?;

        if exists {
            self.reconcile(response, &target, post_id, extension).await
        } else {
            match stream_to_file(response, &target).await {
                Ok(()) => {
                    info!("Saved {}", target.display());
                    Ok(SaveOutcome::Saved)
                }
                Err(e) => {
                    warn!("Write failed for post {}: {}", post_id, e);
                    let _ = fs::remove_file(&target).await;
                    Ok(SaveOutcome::FetchFailed)
                }
            }
        }
    }

    /// Re-fetch into a temp location and compare digests against the
    /// existing file. The existing file is never modified; the temp copy is
    /// removed regardless of the verdict.
    async fn reconcile(
        &self,
        response: MediaResponse,
        target: &Path,
        post_id: &str,
        extension: &str,
    ) -> FetchResult<SaveOutcome> {
        let temp_dir = self.save_dir.join(files::TEMP_DIR_NAME);
        fs::create_dir_all(&temp_dir).await?;
        let temp_path = temp_dir.join(format!("{post_id}.{extension}"));

        if let Err(e) = stream_to_file(response, &temp_path).await {
            warn!("Reconcile fetch failed for post {}: {}", post_id, e);
            let _ = fs::remove_file(&temp_path).await;
            return Ok(SaveOutcome::FetchFailed);
        }

        let identical = files_match(target, &temp_path).await?;
        fs::remove_file(&temp_path).await?;
        // only succeeds when no other temp files remain, which is fine
        let _ = fs::remove_dir(&temp_dir).await;

        if identical {
            debug!("{} verified against fresh copy", target.display());
            Ok(SaveOutcome::ReconciledIdentical)
        } else {
            warn!(
                "{} differs from fresh copy, keeping the existing file",
                target.display()
            );
            Ok(SaveOutcome::ReconciledMismatch)
        }
    }
}

async fn stream_to_file(mut response: MediaResponse, path: &Path) -> FetchResult<()> {
    let mut file = fs::File::create(path).await?;
    while let Some(chunk) = response.body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
