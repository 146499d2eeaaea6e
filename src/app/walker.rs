//! Listing-page traversal
//!
//! Walks numbered listing pages and extracts post ids from thumbnail links.
//! Listing pages sometimes render empty on a loaded session, so an empty
//! scan is retried with a jittered cooldown before the page is written off.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::pacing::{jittered, wait_with_progress};
use crate::app::session::PageSession;
use crate::constants::{pacing, selectors, site};
use crate::errors::{RenderError, RenderResult};

/// Tuning for the walker, defaults mirroring the site's tolerances
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Listing URL carrying the search query; page numbers are appended
    pub base_url: String,
    /// How long to wait for thumbnails before declaring a page empty
    pub element_timeout: Duration,
    /// How many times an empty page is rescanned before giving up
    pub retry_limit: u32,
    /// Base cooldown between rescans of an empty page
    pub retry_cooldown: Duration,
    /// Random spread added on top of the cooldown
    pub cooldown_jitter: Duration,
    /// Pause before every listing navigation
    pub page_delay: Duration,
    /// Progress-log cadence during long waits
    pub progress_interval: Duration,
}

impl WalkerConfig {
    /// Defaults for everything but the listing URL
    pub fn for_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            element_timeout: crate::constants::limits::ELEMENT_WAIT_TIMEOUT,
            retry_limit: crate::constants::limits::PAGE_RETRY_LIMIT,
            retry_cooldown: pacing::RETRY_COOLDOWN,
            cooldown_jitter: pacing::COOLDOWN_JITTER,
            page_delay: pacing::PAGE_DELAY,
            progress_interval: pacing::PROGRESS_INTERVAL,
        }
    }
}

/// Walks listing pages and yields the post ids they link to
pub struct PageWalker {
    config: WalkerConfig,
}

impl PageWalker {
    /// Create a walker from configuration
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Listing URL for a page number
    pub fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.config.base_url, page)
    }

    /// Collect the post ids on a listing page.
    ///
    /// An empty page is rescanned up to the retry limit with a jittered
    /// cooldown in between. Exhausting the retries returns an empty list
    /// rather than an error; the caller records the page as failed and
    /// moves on.
    pub async fn list_post_ids(
        &self,
        session: &dyn PageSession,
        page: u32,
    ) -> RenderResult<Vec<String>> {
        let mut attempt = 0;
        loop {
            let ids = self.scan_page(session, page).await?;
            if !ids.is_empty() {
                info!("Page {} lists {} posts", page, ids.len());
                return Ok(ids);
            }

            attempt += 1;
            if attempt > self.config.retry_limit {
                error!(
                    "Page {} still empty after {} attempts, recording as failed",
                    page, attempt
                );
                return Ok(Vec::new());
            }

            warn!(
                "Page {} rendered empty (attempt {}/{}), cooling down",
                page, attempt, self.config.retry_limit
            );
            wait_with_progress(
                jittered(self.config.retry_cooldown, self.config.cooldown_jitter),
                self.config.progress_interval,
            )
            .await;
        }
    }

    /// One scan: pace, navigate, settle the page, pull thumbnail hrefs.
    /// A thumbnail timeout means the page rendered empty.
    async fn scan_page(&self, session: &dyn PageSession, page: u32) -> RenderResult<Vec<String>> {
        wait_with_progress(self.config.page_delay, self.config.progress_interval).await;

        let url = self.page_url(page);
        info!("Opening listing page {}", page);
        session.navigate(&url).await?;
        dismiss_premium_notice(session).await?;
        match self.disable_auto_paging(session).await {
            Ok(()) => {}
            // no toggle means the listing chrome never rendered
            Err(RenderError::ElementTimeout { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }
        dismiss_premium_notice(session).await?;

        match session
            .wait_for(&selectors::THUMB, self.config.element_timeout)
            .await
        {
            Ok(()) => {}
            Err(RenderError::ElementTimeout { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        let hrefs = session
            .attribute_all(&selectors::THUMB_LINK, "href")
            .await?;
        Ok(hrefs
            .into_iter()
            .flatten()
            .filter_map(|href| post_id_from_href(&href))
            .collect())
    }

    /// Infinite scrolling breaks deterministic page numbering, so the
    /// auto-paging toggle is switched off whenever it reports being on.
    /// The toggle only takes effect after a reload.
    async fn disable_auto_paging(&self, session: &dyn PageSession) -> RenderResult<()> {
        session
            .wait_for(&selectors::AUTO_TOGGLE, self.config.element_timeout)
            .await?;

        let state = session.text(&selectors::AUTO_TOGGLE).await?;
        if state.trim() == site::AUTO_TOGGLE_ON_TEXT {
            info!("Auto-paging is on, disabling it");
            session.click(&selectors::AUTO_TOGGLE).await?;
            session.refresh().await?;
        } else {
            debug!("Auto-paging already off ({})", state.trim());
        }
        Ok(())
    }

    /// Probe forward from `first_page` until a page renders without
    /// thumbnails, returning the last populated page number. `None` means
    /// even the first page was empty.
    pub async fn discover_last_page(
        &self,
        session: &dyn PageSession,
        first_page: u32,
        max_probe_pages: u32,
    ) -> RenderResult<Option<u32>> {
        let mut last_populated = None;

        for page in first_page..first_page.saturating_add(max_probe_pages) {
            session.navigate(&self.page_url(page)).await?;
            dismiss_premium_notice(session).await?;

            match session
                .wait_for(&selectors::THUMB, self.config.element_timeout)
                .await
            {
                Ok(()) => {
                    debug!("Page {} is populated", page);
                    last_populated = Some(page);
                }
                Err(RenderError::ElementTimeout { .. }) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(last_populated)
    }
}

/// Close the premium-upsell overlay if it is covering the page
pub(crate) async fn dismiss_premium_notice(session: &dyn PageSession) -> RenderResult<()> {
    if session.count(&selectors::PREMIUM_NOTICE).await? > 0 {
        info!("Dismissing premium notice");
        session.click(&selectors::PREMIUM_CLOSE).await?;
    }
    Ok(())
}

/// Last non-empty path segment of a thumbnail href
fn post_id_from_href(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
