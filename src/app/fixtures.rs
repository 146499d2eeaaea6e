//! Scripted fakes for the session and fetcher seams
//!
//! `FakeSession` serves pre-built DOM snapshots keyed by URL and records
//! every interaction; `FakeFetcher` serves canned HTTP bodies. Both exist so
//! crawl logic can be tested without a browser or a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::app::client::{MediaFetcher, MediaResponse};
use crate::app::session::{PageSession, Selector};
use crate::constants::selectors;
use crate::errors::{FetchError, FetchResult, RenderError, RenderResult};

/// One fake element: attributes plus visible text
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    attrs: HashMap<String, String>,
    text: String,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

/// A DOM snapshot: elements grouped by the selector that finds them
#[derive(Debug, Clone, Default)]
pub struct FakeDom {
    elements: HashMap<Selector, Vec<FakeElement>>,
}

impl FakeDom {
    pub fn with(mut self, selector: Selector, element: FakeElement) -> Self {
        self.elements.entry(selector).or_default().push(element);
        self
    }

    fn matching(&self, selector: &Selector) -> &[FakeElement] {
        self.elements
            .get(selector)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn first(&self, selector: &Selector) -> RenderResult<&FakeElement> {
        self.matching(selector)
            .first()
            .ok_or_else(|| RenderError::ElementMissing {
                selector: selector.to_css(),
            })
    }
}

/// A post detail page whose content container has rendered
pub fn detail_dom() -> FakeDom {
    FakeDom::default().with(selectors::POST_CONTENT, FakeElement::new())
}

/// A populated listing page: auto-paging off, one thumbnail per href
pub fn listing_dom(hrefs: &[&str]) -> FakeDom {
    let mut dom = FakeDom::default().with(
        selectors::AUTO_TOGGLE,
        FakeElement::new().text("Enabled: Off"),
    );
    for href in hrefs {
        dom = dom
            .with(selectors::THUMB, FakeElement::new())
            .with(selectors::THUMB_LINK, FakeElement::new().attr("href", href));
    }
    dom
}

/// A login page carrying the credential form
pub fn login_dom() -> FakeDom {
    FakeDom::default()
        .with(selectors::LOGIN_EMAIL, FakeElement::new())
        .with(selectors::LOGIN_PASSWORD, FakeElement::new())
        .with(selectors::LOGIN_SUBMIT, FakeElement::new())
}

/// Scripted [`PageSession`]: navigation swaps in the snapshot registered for
/// the URL, and every visit, click, refresh and fill is recorded.
///
/// `wait_for` resolves against the current snapshot immediately; an absent
/// element times out without actually sleeping.
#[derive(Default)]
pub struct FakeSession {
    pages: Mutex<HashMap<String, Vec<FakeDom>>>,
    current: Mutex<FakeDom>,
    visits: Mutex<HashMap<String, usize>>,
    clicks: Mutex<HashMap<Selector, usize>>,
    fills: Mutex<HashMap<Selector, String>>,
    refreshes: Mutex<usize>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this snapshot on every visit to the URL
    pub fn add_page(&mut self, url: impl Into<String>, dom: FakeDom) {
        self.add_page_sequence(url, vec![dom]);
    }

    /// Serve these snapshots in order; the last one repeats once the
    /// sequence is exhausted
    pub fn add_page_sequence(&mut self, url: impl Into<String>, doms: Vec<FakeDom>) {
        self.pages.lock().unwrap().insert(url.into(), doms);
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.visits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn click_count(&self, selector: &Selector) -> usize {
        self.clicks
            .lock()
            .unwrap()
            .get(selector)
            .copied()
            .unwrap_or(0)
    }

    pub fn refresh_count(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }

    pub fn filled_value(&self, selector: &Selector) -> Option<String> {
        self.fills.lock().unwrap().get(selector).cloned()
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&self, url: &str) -> RenderResult<()> {
        *self.visits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let mut pages = self.pages.lock().unwrap();
        let dom = match pages.get_mut(url) {
            Some(doms) if doms.len() > 1 => doms.remove(0),
            Some(doms) => doms.first().cloned().unwrap_or_default(),
            None => FakeDom::default(),
        };
        *self.current.lock().unwrap() = dom;
        Ok(())
    }

    async fn refresh(&self) -> RenderResult<()> {
        *self.refreshes.lock().unwrap() += 1;
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> RenderResult<()> {
        if self.current.lock().unwrap().matching(selector).is_empty() {
            Err(RenderError::ElementTimeout {
                selector: selector.to_css(),
                timeout,
            })
        } else {
            Ok(())
        }
    }

    async fn count(&self, selector: &Selector) -> RenderResult<usize> {
        Ok(self.current.lock().unwrap().matching(selector).len())
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> RenderResult<Option<String>> {
        let current = self.current.lock().unwrap();
        let element = current.first(selector)?;
        Ok(element.attrs.get(name).cloned())
    }

    async fn attribute_all(
        &self,
        selector: &Selector,
        name: &str,
    ) -> RenderResult<Vec<Option<String>>> {
        let current = self.current.lock().unwrap();
        Ok(current
            .matching(selector)
            .iter()
            .map(|element| element.attrs.get(name).cloned())
            .collect())
    }

    async fn text(&self, selector: &Selector) -> RenderResult<String> {
        let current = self.current.lock().unwrap();
        Ok(current.first(selector)?.text.clone())
    }

    async fn click(&self, selector: &Selector) -> RenderResult<()> {
        self.current.lock().unwrap().first(selector)?;
        *self.clicks.lock().unwrap().entry(*selector).or_insert(0) += 1;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> RenderResult<()> {
        self.current.lock().unwrap().first(selector)?;
        self.fills
            .lock()
            .unwrap()
            .insert(*selector, value.to_string());
        Ok(())
    }
}

/// Scripted [`MediaFetcher`]: canned bodies, optional transport failures,
/// and a request log. Unregistered URLs come back as 404.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    failures: Mutex<HashMap<String, ()>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, url: impl Into<String>, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), (status, body.to_vec()));
    }

    pub fn fail(&mut self, url: impl Into<String>) {
        self.failures.lock().unwrap().insert(url.into(), ());
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|requested| requested.as_str() == url)
            .count()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn get(&self, url: &str) -> FetchResult<MediaResponse> {
        self.requests.lock().unwrap().push(url.to_string());

        if self.failures.lock().unwrap().contains_key(url) {
            return Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "scripted transport failure",
            )));
        }

        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or((404, Vec::new()));

        // chunked so streaming consumers see more than one frame
        let chunks: Vec<FetchResult<Bytes>> = body
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(MediaResponse {
            status,
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}
