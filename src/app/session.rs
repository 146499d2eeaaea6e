//! Rendering-session boundary
//!
//! The pipeline never talks to a browser directly; it goes through the
//! [`PageSession`] trait so the whole crawl logic can run against a scripted
//! fake in tests. The production implementation lives in
//! [`crate::app::browser`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::RenderResult;

/// A typed element selector, rendered to CSS for the backend.
///
/// The site is addressed exclusively through the constants in
/// [`crate::constants::selectors`]; free-form selector strings only appear
/// as the `Css` variant there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element id (`#value`)
    Id(&'static str),
    /// Class name (`.value`)
    Class(&'static str),
    /// Form control name (`[name='value']`)
    Name(&'static str),
    /// Tag name
    Tag(&'static str),
    /// Raw CSS selector
    Css(&'static str),
}

impl Selector {
    /// Render the selector as a CSS string
    pub fn to_css(&self) -> String {
        match self {
            Selector::Id(value) => format!("#{value}"),
            Selector::Class(value) => format!(".{value}"),
            Selector::Name(value) => format!("[name='{value}']"),
            Selector::Tag(value) => (*value).to_string(),
            Selector::Css(value) => (*value).to_string(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_css())
    }
}

/// One live, exclusively-owned browser page.
///
/// All methods operate on the current page; `navigate` replaces it. First
/// element in display order wins for the single-element queries. A browser
/// session is not safely shared across concurrent callers, so the pipeline
/// serializes every call.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Load a URL, replacing the current page
    async fn navigate(&self, url: &str) -> RenderResult<()>;

    /// Reload the current page
    async fn refresh(&self) -> RenderResult<()>;

    /// Wait until at least one element matches, or time out
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> RenderResult<()>;

    /// Number of elements currently matching
    async fn count(&self, selector: &Selector) -> RenderResult<usize>;

    /// Attribute of the first matching element; `Ok(None)` when the element
    /// exists but lacks the attribute
    async fn attribute(&self, selector: &Selector, name: &str) -> RenderResult<Option<String>>;

    /// Attribute of every matching element, in display order
    async fn attribute_all(
        &self,
        selector: &Selector,
        name: &str,
    ) -> RenderResult<Vec<Option<String>>>;

    /// Visible text of the first matching element
    async fn text(&self, selector: &Selector) -> RenderResult<String>;

    /// Click the first matching element
    async fn click(&self, selector: &Selector) -> RenderResult<()>;

    /// Focus the first matching element and type into it
    async fn fill(&self, selector: &Selector, value: &str) -> RenderResult<()>;
}
