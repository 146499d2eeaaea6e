//! Run accounting
//!
//! Everything a run learns is accumulated here and flushed to report files
//! at the end, so a partial run still leaves a usable record of which pages
//! failed and which posts need attention. Empty categories produce no file.

use std::collections::BTreeSet;
use std::path::Path;

use tokio::io;
use tracing::info;

use crate::app::download::SaveOutcome;
use crate::constants::reports;

/// Accumulated results of one run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Pages whose posts were all visited
    pub downloaded_pages: BTreeSet<u32>,
    /// Pages that never yielded post ids
    pub failed_pages: BTreeSet<u32>,
    /// Posts that exposed nothing downloadable
    pub inaccessible_posts: BTreeSet<String>,
    /// Posts whose existing file differed from a fresh copy
    pub wrong_hash_posts: BTreeSet<String>,
    /// Posts skipped before download (sample URLs, unknown extensions)
    pub skipped_posts: BTreeSet<String>,
    /// Fresh files written
    pub saved: u64,
    /// Existing files left untouched without re-fetching
    pub skipped_existing: u64,
    /// Existing files verified identical against a fresh copy
    pub reconciled_identical: u64,
    /// Fetches that failed outright
    pub fetch_failures: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one download outcome into the tallies
    pub fn record_outcome(&mut self, post_id: &str, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Saved => self.saved += 1,
            SaveOutcome::SkippedExists => self.skipped_existing += 1,
            SaveOutcome::ReconciledIdentical => self.reconciled_identical += 1,
            SaveOutcome::ReconciledMismatch => {
                self.wrong_hash_posts.insert(post_id.to_string());
            }
            SaveOutcome::FetchFailed => self.fetch_failures += 1,
        }
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{} saved, {} already present, {} verified, {} hash mismatches, \
             {} inaccessible, {} skipped, {} fetch failures, {} pages done, {} pages failed",
            self.saved,
            self.skipped_existing,
            self.reconciled_identical,
            self.wrong_hash_posts.len(),
            self.inaccessible_posts.len(),
            self.skipped_posts.len(),
            self.fetch_failures,
            self.downloaded_pages.len(),
            self.failed_pages.len()
        )
    }

    /// Write the non-empty categories as line-per-entry files
    pub async fn write_files(&self, report_dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(report_dir).await?;

        write_set(
            report_dir,
            reports::DOWNLOADED_PAGES_FILE,
            self.downloaded_pages.iter().map(u32::to_string),
        )
        .await?;
        write_set(
            report_dir,
            reports::FAILED_PAGES_FILE,
            self.failed_pages.iter().map(u32::to_string),
        )
        .await?;
        write_set(
            report_dir,
            reports::INACCESSIBLE_POSTS_FILE,
            self.inaccessible_posts.iter().cloned(),
        )
        .await?;
        write_set(
            report_dir,
            reports::WRONG_HASHES_FILE,
            self.wrong_hash_posts.iter().cloned(),
        )
        .await?;
        write_set(
            report_dir,
            reports::SKIPPED_POSTS_FILE,
            self.skipped_posts.iter().cloned(),
        )
        .await?;

        Ok(())
    }
}

async fn write_set(
    report_dir: &Path,
    file_name: &str,
    entries: impl Iterator<Item = String>,
) -> io::Result<()> {
    let lines: Vec<String> = entries.collect();
    if lines.is_empty() {
        return Ok(());
    }

    let path = report_dir.join(file_name);
    info!("Writing {} entries to {}", lines.len(), path.display());
    tokio::fs::write(&path, lines.join("\n") + "\n").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_outcomes_are_tallied() {
        let mut report = RunReport::new();
        report.record_outcome("1", SaveOutcome::Saved);
        report.record_outcome("2", SaveOutcome::Saved);
        report.record_outcome("3", SaveOutcome::SkippedExists);
        report.record_outcome("4", SaveOutcome::ReconciledIdentical);
        report.record_outcome("5", SaveOutcome::ReconciledMismatch);
        report.record_outcome("6", SaveOutcome::FetchFailed);

        assert_eq!(report.saved, 2);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.reconciled_identical, 1);
        assert_eq!(report.fetch_failures, 1);
        assert!(report.wrong_hash_posts.contains("5"));
    }

    #[test]
    fn test_summary_mentions_every_tally() {
        let mut report = RunReport::new();
        report.record_outcome("1", SaveOutcome::Saved);
        report.downloaded_pages.insert(1);

        let summary = report.summary();
        assert!(summary.contains("1 saved"));
        assert!(summary.contains("1 pages done"));
    }

    #[tokio::test]
    async fn test_empty_categories_write_no_files() {
        let dir = tempdir().unwrap();
        RunReport::new().write_files(dir.path()).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_populated_categories_written_line_per_entry() {
        let dir = tempdir().unwrap();
        let mut report = RunReport::new();
        report.failed_pages.insert(7);
        report.failed_pages.insert(3);
        report.inaccessible_posts.insert("abc".to_string());

        report.write_files(dir.path()).await.unwrap();

        let failed = tokio::fs::read_to_string(dir.path().join(reports::FAILED_PAGES_FILE))
            .await
            .unwrap();
        assert_eq!(failed, "3\n7\n");

        let inaccessible =
            tokio::fs::read_to_string(dir.path().join(reports::INACCESSIBLE_POSTS_FILE))
                .await
                .unwrap();
        assert_eq!(inaccessible, "abc\n");

        assert!(!dir.path().join(reports::WRONG_HASHES_FILE).exists());
    }
}
