//! Chromium-backed [`PageSession`]
//!
//! Listing and detail pages only expose their content after scripts run, so
//! media discovery goes through a real browser over the DevTools protocol.
//! Media bytes themselves do not: they are fetched over plain HTTP by
//! [`crate::app::client::HttpFetcher`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::session::{PageSession, Selector};
use crate::errors::{RenderError, RenderResult};

/// How often `wait_for` re-queries the page
const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn backend(e: CdpError) -> RenderError {
    RenderError::Backend(e.to_string())
}

/// One Chromium instance driving one page
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chromium and open a blank page.
    ///
    /// The CDP event handler must be polled for the connection to make
    /// progress, so it gets its own task for the life of the session.
    pub async fn launch(headless: bool) -> RenderResult<Self> {
        let builder = if headless {
            BrowserConfig::builder()
        } else {
            BrowserConfig::builder().with_head()
        };
        let config = builder.build().map_err(RenderError::Backend)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(backend)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(backend)?;
        debug!("Chromium session established (headless: {})", headless);

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Close the browser and stop the event handler. Best effort; a browser
    /// that already died is not an error worth surfacing at shutdown.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&self, url: &str) -> RenderResult<()> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await.map_err(backend)?;
        Ok(())
    }

    async fn refresh(&self) -> RenderResult<()> {
        self.page.reload().await.map_err(backend)?;
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> RenderResult<()> {
        let css = selector.to_css();
        let deadline = Instant::now() + timeout;

        loop {
            if self.page.find_element(css.as_str()).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RenderError::ElementTimeout {
                    selector: css,
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn count(&self, selector: &Selector) -> RenderResult<usize> {
        match self.page.find_elements(selector.to_css()).await {
            Ok(elements) => Ok(elements.len()),
            // querySelectorAll over a page with no matches surfaces as an
            // error in some CDP versions; treat it as zero
            Err(_) => Ok(0),
        }
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> RenderResult<Option<String>> {
        let element = self
            .page
            .find_element(selector.to_css())
            .await
            .map_err(|_| RenderError::ElementMissing {
                selector: selector.to_css(),
            })?;
        element.attribute(name).await.map_err(backend)
    }

    async fn attribute_all(
        &self,
        selector: &Selector,
        name: &str,
    ) -> RenderResult<Vec<Option<String>>> {
        let elements = self
            .page
            .find_elements(selector.to_css())
            .await
            .unwrap_or_default();

        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(element.attribute(name).await.map_err(backend)?);
        }
        Ok(values)
    }

    async fn text(&self, selector: &Selector) -> RenderResult<String> {
        let element = self
            .page
            .find_element(selector.to_css())
            .await
            .map_err(|_| RenderError::ElementMissing {
                selector: selector.to_css(),
            })?;
        Ok(element
            .inner_text()
            .await
            .map_err(backend)?
            .unwrap_or_default())
    }

    async fn click(&self, selector: &Selector) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector.to_css())
            .await
            .map_err(|_| RenderError::ElementMissing {
                selector: selector.to_css(),
            })?;
        element.click().await.map_err(backend)?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector.to_css())
            .await
            .map_err(|_| RenderError::ElementMissing {
                selector: selector.to_css(),
            })?;
        element
            .click()
            .await
            .map_err(backend)?
            .type_str(value)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
