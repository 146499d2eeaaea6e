//! Run orchestration
//!
//! Ties the session, walker, resolver and downloader together: log in, fix
//! the page range, then walk page by page and post by post, folding every
//! outcome into a [`RunReport`]. Report files are flushed even when a run
//! dies early, so partial progress is never lost.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::app::client::MediaFetcher;
use crate::app::download::{extension_for_url, Downloader};
use crate::app::pacing::{jittered, wait_with_progress};
use crate::app::report::RunReport;
use crate::app::resolver::{ContentResolver, ContentVariant};
use crate::app::session::PageSession;
use crate::app::walker::{PageWalker, WalkerConfig};
use crate::constants::{selectors, site};
use crate::errors::{AppError, AuthError, Result};

/// Everything a run needs to know, resolved from config and CLI
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub login_url: String,
    pub base_url: String,
    pub post_url_base: String,
    pub save_dir: PathBuf,
    pub report_dir: PathBuf,
    pub first_page: u32,
    /// Fixed upper page; `None` discovers it by probing
    pub last_page: Option<u32>,
    pub compare_existing: bool,
    pub username: String,
    pub password: String,
    pub element_timeout: Duration,
    pub page_retry_limit: u32,
    pub retry_cooldown: Duration,
    pub cooldown_jitter: Duration,
    pub page_delay: Duration,
    pub item_delay: Duration,
    pub item_jitter: Duration,
    pub progress_interval: Duration,
    pub max_probe_pages: u32,
}

impl PipelineConfig {
    fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            base_url: self.base_url.clone(),
            element_timeout: self.element_timeout,
            retry_limit: self.page_retry_limit,
            retry_cooldown: self.retry_cooldown,
            cooldown_jitter: self.cooldown_jitter,
            page_delay: self.page_delay,
            progress_interval: self.progress_interval,
        }
    }
}

/// One full crawl-and-download run
pub struct Pipeline<'a> {
    session: &'a dyn PageSession,
    fetcher: &'a dyn MediaFetcher,
    walker: PageWalker,
    resolver: ContentResolver,
    downloader: Downloader,
    config: PipelineConfig,
    shutdown: broadcast::Receiver<()>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        session: &'a dyn PageSession,
        fetcher: &'a dyn MediaFetcher,
        config: PipelineConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let walker = PageWalker::new(config.walker_config());
        let resolver = ContentResolver::new(&config.post_url_base, config.element_timeout);
        let downloader = Downloader::new(&config.save_dir, config.compare_existing);
        Self {
            session,
            fetcher,
            walker,
            resolver,
            downloader,
            config,
            shutdown,
        }
    }

    /// Execute the run. Report files are written whether or not the run
    /// finished; only the error outcome differs.
    pub async fn run(mut self) -> Result<RunReport> {
        let mut report = RunReport::new();
        let outcome = self.run_inner(&mut report).await;

        if let Err(e) = report.write_files(&self.config.report_dir).await {
            error!("Failed to write report files: {}", e);
        }

        match outcome {
            Ok(()) => {
                info!("Run complete: {}", report.summary());
                Ok(report)
            }
            Err(e) => {
                error!("Run aborted ({} error): {}", e.category(), e);
                Err(e)
            }
        }
    }

    /// Log in and probe for the last populated page without downloading
    pub async fn probe(self) -> Result<Option<u32>> {
        self.login().await?;
        self.walker
            .discover_last_page(
                self.session,
                self.config.first_page,
                self.config.max_probe_pages,
            )
            .await
            .map_err(AppError::from)
    }

    async fn run_inner(&mut self, report: &mut RunReport) -> Result<()> {
        self.login().await?;

        let first_page = self.config.first_page;
        let last_page = match self.config.last_page {
            Some(last) => last,
            None => {
                info!("Probing for the last populated page");
                self.walker
                    .discover_last_page(self.session, first_page, self.config.max_probe_pages)
                    .await
                    .map_err(AppError::from)?
                    .ok_or_else(|| {
                        AppError::generic(format!("no populated pages at or after page {first_page}"))
                    })?
            }
        };
        if last_page < first_page {
            return Err(AppError::generic(format!(
                "last page {last_page} precedes first page {first_page}"
            )));
        }

        info!("Walking pages {} through {}", first_page, last_page);

        'pages: for page in first_page..=last_page {
            if self.shutdown_requested() {
                warn!("Shutdown requested, stopping before page {}", page);
                break;
            }

            let post_ids = self.walker.list_post_ids(self.session, page).await?;
            if post_ids.is_empty() {
                report.failed_pages.insert(page);
                continue;
            }

            let total = post_ids.len();
            for (index, post_id) in post_ids.iter().enumerate() {
                if self.shutdown_requested() {
                    warn!("Shutdown requested, stopping before post {}", post_id);
                    break 'pages;
                }

                self.process_post(post_id, report).await?;

                if index + 1 < total {
                    wait_with_progress(
                        jittered(self.config.item_delay, self.config.item_jitter),
                        self.config.progress_interval,
                    )
                    .await;
                }
            }

            report.downloaded_pages.insert(page);
        }

        Ok(())
    }

    /// Submit the credential form and confirm the site accepted it
    async fn login(&self) -> Result<()> {
        if self.config.username.is_empty() || self.config.password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }

        info!("Logging in as {}", self.config.username);
        self.session.navigate(&self.config.login_url).await.map_err(AuthError::from)?;

        for selector in [
            &selectors::LOGIN_EMAIL,
            &selectors::LOGIN_PASSWORD,
            &selectors::LOGIN_SUBMIT,
        ] {
            self.session
                .wait_for(selector, self.config.element_timeout)
                .await
                .map_err(AuthError::FormUnavailable)?;
        }

        self.session
            .fill(&selectors::LOGIN_EMAIL, &self.config.username)
            .await
            .map_err(AuthError::from)?;
        self.session
            .fill(&selectors::LOGIN_PASSWORD, &self.config.password)
            .await
            .map_err(AuthError::from)?;
        self.session
            .click(&selectors::LOGIN_SUBMIT)
            .await
            .map_err(AuthError::from)?;

        if self.session.count(&selectors::LOGIN_ERROR).await.map_err(AuthError::from)? > 0 {
            return Err(AuthError::LoginRejected.into());
        }

        info!("Login accepted");
        Ok(())
    }

    /// Resolve one post and settle its media on disk
    async fn process_post(&self, post_id: &str, report: &mut RunReport) -> Result<()> {
        let variant = self.resolver.resolve(self.session, post_id).await?;

        let url = match &variant {
            ContentVariant::Inaccessible => {
                warn!("Post {} exposes no downloadable content", post_id);
                report.inaccessible_posts.insert(post_id.to_string());
                return Ok(());
            }
            // the companion link of a downsized post is the full resource,
            // even when its URL carries the sample marker
            ContentVariant::DownsizedImage { url } => url,
            ContentVariant::FullImage { url } | ContentVariant::Video { url } => {
                if url.contains(site::SAMPLE_URL_MARKER) {
                    warn!("Post {} only exposes a sample, skipping", post_id);
                    report.skipped_posts.insert(post_id.to_string());
                    return Ok(());
                }
                url
            }
        };

        let Some(extension) = extension_for_url(url) else {
            warn!("Post {} has no recognized media extension: {}", post_id, url);
            report.skipped_posts.insert(post_id.to_string());
            return Ok(());
        };

        let outcome = self
            .downloader
            .save(self.fetcher, post_id, extension, url)
            .await?;
        report.record_outcome(post_id, outcome);
        Ok(())
    }

    /// Non-blocking shutdown check, run between pages and between posts
    fn shutdown_requested(&mut self) -> bool {
        matches!(
            self.shutdown.try_recv(),
            Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::{
        detail_dom, listing_dom, login_dom, FakeDom, FakeElement, FakeFetcher, FakeSession,
    };
    use crate::constants::reports;
    use std::path::Path;
    use tempfile::tempdir;

    const LOGIN_URL: &str = "https://board.example/login";
    const BASE_URL: &str = "https://board.example/?tags=art";
    const POST_BASE: &str = "https://board.example/posts";

    fn test_config(save_dir: &Path, report_dir: &Path, last_page: u32) -> PipelineConfig {
        PipelineConfig {
            login_url: LOGIN_URL.to_string(),
            base_url: BASE_URL.to_string(),
            post_url_base: POST_BASE.to_string(),
            save_dir: save_dir.to_path_buf(),
            report_dir: report_dir.to_path_buf(),
            first_page: 1,
            last_page: Some(last_page),
            compare_existing: false,
            username: "archivist".to_string(),
            password: "hunter2".to_string(),
            element_timeout: Duration::from_millis(10),
            page_retry_limit: 1,
            retry_cooldown: Duration::from_millis(4),
            cooldown_jitter: Duration::ZERO,
            page_delay: Duration::from_millis(4),
            item_delay: Duration::from_millis(4),
            item_jitter: Duration::ZERO,
            progress_interval: Duration::from_millis(2),
            max_probe_pages: 10,
        }
    }

    fn page_url(page: u32) -> String {
        format!("{BASE_URL}&page={page}")
    }

    fn post_url(id: &str) -> String {
        format!("{POST_BASE}/{id}")
    }

    fn full_image_dom(url: &str) -> FakeDom {
        detail_dom().with(selectors::FULL_IMAGE, FakeElement::new().attr("src", url))
    }

    async fn run_pipeline(
        session: &FakeSession,
        fetcher: &FakeFetcher,
        config: PipelineConfig,
    ) -> Result<RunReport> {
        let (_tx, rx) = broadcast::channel(1);
        Pipeline::new(session, fetcher, config, rx).run().await
    }

    #[tokio::test]
    async fn test_end_to_end_single_page() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/100", "/posts/101"]));
        session.add_page(post_url("100"), detail_dom()); // inaccessible
        session.add_page(
            post_url("101"),
            full_image_dom("https://cdn.example/data/101.jpg"),
        );

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/data/101.jpg", 200, b"jpeg bytes");

        let report = run_pipeline(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await
        .unwrap();

        assert_eq!(report.saved, 1);
        assert!(report.inaccessible_posts.contains("100"));
        assert!(report.downloaded_pages.contains(&1));
        assert!(save.path().join("101.jpg").exists());
        // never walks past the configured last page
        assert_eq!(session.visit_count(&page_url(2)), 0);
        assert_eq!(
            session.filled_value(&selectors::LOGIN_EMAIL),
            Some("archivist".to_string())
        );

        let inaccessible = tokio::fs::read_to_string(
            report_dir.path().join(reports::INACCESSIBLE_POSTS_FILE),
        )
        .await
        .unwrap();
        assert_eq!(inaccessible, "100\n");
    }

    #[tokio::test]
    async fn test_rejected_login_aborts() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(
            LOGIN_URL,
            login_dom().with(selectors::LOGIN_ERROR, FakeElement::new()),
        );
        let fetcher = FakeFetcher::new();

        let result = run_pipeline(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::LoginRejected))
        ));
        assert_eq!(session.visit_count(&page_url(1)), 0);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let build_session = || {
            let mut session = FakeSession::new();
            session.add_page(LOGIN_URL, login_dom());
            session.add_page(page_url(1), listing_dom(&["/posts/55"]));
            session.add_page(
                post_url("55"),
                full_image_dom("https://cdn.example/data/55.png"),
            );
            session
        };

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/data/55.png", 200, b"png bytes");

        let first = run_pipeline(
            &build_session(),
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await
        .unwrap();
        assert_eq!(first.saved, 1);
        assert_eq!(fetcher.request_count("https://cdn.example/data/55.png"), 1);

        let second = run_pipeline(
            &build_session(),
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await
        .unwrap();
        assert_eq!(second.saved, 0);
        assert_eq!(second.skipped_existing, 1);
        // no re-fetch of a file that is already on disk
        assert_eq!(fetcher.request_count("https://cdn.example/data/55.png"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_page_recorded_once_and_run_continues() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), FakeDom::default()); // never populates
        session.add_page(page_url(2), listing_dom(&["/posts/9"]));
        session.add_page(
            post_url("9"),
            full_image_dom("https://cdn.example/data/9.gif"),
        );

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/data/9.gif", 200, b"gif bytes");

        let report = run_pipeline(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 2),
        )
        .await
        .unwrap();

        assert_eq!(report.failed_pages.iter().copied().collect::<Vec<_>>(), [1]);
        assert!(report.downloaded_pages.contains(&2));
        assert_eq!(report.saved, 1);
    }

    #[tokio::test]
    async fn test_mismatch_never_overwrites() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();
        let existing = save.path().join("77.jpg");
        tokio::fs::write(&existing, b"locally edited").await.unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/77"]));
        session.add_page(
            post_url("77"),
            full_image_dom("https://cdn.example/data/77.jpg"),
        );

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/data/77.jpg", 200, b"remote bytes");

        let mut config = test_config(save.path(), report_dir.path(), 1);
        config.compare_existing = true;

        let report = run_pipeline(&session, &fetcher, config).await.unwrap();

        assert!(report.wrong_hash_posts.contains("77"));
        let kept = tokio::fs::read(&existing).await.unwrap();
        assert_eq!(kept, b"locally edited");
    }

    #[tokio::test]
    async fn test_sample_urls_and_unknown_extensions_skipped() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/1", "/posts/2"]));
        session.add_page(
            post_url("1"),
            full_image_dom("https://cdn.example/sample/1.jpg"),
        );
        session.add_page(post_url("2"), full_image_dom("https://cdn.example/data/2"));

        let fetcher = FakeFetcher::new();
        let report = run_pipeline(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await
        .unwrap();

        assert!(report.skipped_posts.contains("1"));
        assert!(report.skipped_posts.contains("2"));
        assert_eq!(report.saved, 0);
        assert_eq!(fetcher.request_count("https://cdn.example/sample/1.jpg"), 0);
    }

    #[tokio::test]
    async fn test_downsized_companion_link_downloaded_despite_marker() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let dom = detail_dom()
            .with(selectors::SAMPLE_MARKER, FakeElement::new())
            .with(
                selectors::DOWNSIZED_LINK,
                FakeElement::new().attr("href", "https://cdn.example/sample-served/3.png"),
            );
        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/3"]));
        session.add_page(post_url("3"), dom);

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/sample-served/3.png", 200, b"full png");

        let report = run_pipeline(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
        )
        .await
        .unwrap();

        assert_eq!(report.saved, 1);
        assert!(report.skipped_posts.is_empty());
        assert!(save.path().join("3.png").exists());
    }

    #[tokio::test]
    async fn test_last_page_discovered_when_unset() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/5"]));
        session.add_page(page_url(2), FakeDom::default());
        session.add_page(
            post_url("5"),
            full_image_dom("https://cdn.example/data/5.jpg"),
        );

        let mut fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn.example/data/5.jpg", 200, b"bytes");

        let mut config = test_config(save.path(), report_dir.path(), 1);
        config.last_page = None;

        let report = run_pipeline(&session, &fetcher, config).await.unwrap();
        assert_eq!(
            report.downloaded_pages.iter().copied().collect::<Vec<_>>(),
            [1]
        );
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_the_walk() {
        let save = tempdir().unwrap();
        let report_dir = tempdir().unwrap();

        let mut session = FakeSession::new();
        session.add_page(LOGIN_URL, login_dom());
        session.add_page(page_url(1), listing_dom(&["/posts/5"]));

        let fetcher = FakeFetcher::new();
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let report = Pipeline::new(
            &session,
            &fetcher,
            test_config(save.path(), report_dir.path(), 1),
            rx,
        )
        .run()
        .await
        .unwrap();

        assert!(report.downloaded_pages.is_empty());
        assert_eq!(session.visit_count(&page_url(1)), 0);
    }
}
