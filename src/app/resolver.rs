//! Post content classification
//!
//! A rendered post detail page exposes exactly one downloadable variant.
//! Classification order is significant: a downsized sample and a full-size
//! image can coexist on the same page, and the presence of the sample marker
//! means the real resource hangs off a companion link - so downsized must be
//! detected before falling through to full-image detection.

use std::time::Duration;

use tracing::{debug, info};

use crate::app::session::PageSession;
use crate::app::walker::dismiss_premium_notice;
use crate::constants::selectors;
use crate::errors::{RenderError, ResolveError, ResolveResult};

/// The single content variant a post resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVariant {
    /// A reduced-resolution sample is shown; the URL is the companion link
    /// to the full-resolution resource, never the sample's own source
    DownsizedImage { url: String },
    /// Full-size inline image
    FullImage { url: String },
    /// Inline video
    Video { url: String },
    /// Nothing downloadable is exposed
    Inaccessible,
}

impl ContentVariant {
    /// The resolved source URL, absent only for inaccessible posts
    pub fn source_url(&self) -> Option<&str> {
        match self {
            ContentVariant::DownsizedImage { url }
            | ContentVariant::FullImage { url }
            | ContentVariant::Video { url } => Some(url),
            ContentVariant::Inaccessible => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            ContentVariant::DownsizedImage { .. } => "downsized image",
            ContentVariant::FullImage { .. } => "full image",
            ContentVariant::Video { .. } => "video",
            ContentVariant::Inaccessible => "inaccessible",
        }
    }
}

/// Classifies post detail pages and extracts their source URL
pub struct ContentResolver {
    post_url_base: String,
    element_timeout: Duration,
}

impl ContentResolver {
    /// Create a resolver rooted at the given post URL base
    pub fn new(post_url_base: impl Into<String>, element_timeout: Duration) -> Self {
        Self {
            post_url_base: post_url_base.into().trim_end_matches('/').to_string(),
            element_timeout,
        }
    }

    /// Detail-page URL for a post id
    pub fn post_url(&self, post_id: &str) -> String {
        format!("{}/{}", self.post_url_base, post_id)
    }

    /// Load a post's detail page and classify its content.
    ///
    /// A timeout waiting for the content container is fatal: unlike listing
    /// pages, a logged-in session is expected to always render post content.
    pub async fn resolve(
        &self,
        session: &dyn PageSession,
        post_id: &str,
    ) -> ResolveResult<ContentVariant> {
        info!("Fetching post details for {}", post_id);

        session.navigate(&self.post_url(post_id)).await?;
        dismiss_premium_notice(session).await?;

        session
            .wait_for(&selectors::POST_CONTENT, self.element_timeout)
            .await
            .map_err(ResolveError::ContentTimeout)?;
        dismiss_premium_notice(session).await?;

        let variant = self.classify(session).await?;
        debug!("Post {} classified as {}", post_id, variant.label());
        Ok(variant)
    }

    /// Classification order: downsized marker, then video, then full image,
    /// then inaccessible.
    async fn classify(&self, session: &dyn PageSession) -> ResolveResult<ContentVariant> {
        if session.count(&selectors::SAMPLE_MARKER).await? > 0 {
            let url = Self::source_of(
                session,
                &selectors::DOWNSIZED_LINK,
                "href",
                "downsized image",
            )
            .await?;
            return Ok(ContentVariant::DownsizedImage { url });
        }

        if session.count(&selectors::VIDEO_SOURCE).await? > 0 {
            let url = Self::source_of(session, &selectors::VIDEO_SOURCE, "src", "video").await?;
            return Ok(ContentVariant::Video { url });
        }

        if session.count(&selectors::FULL_IMAGE).await? > 0 {
            let url =
                Self::source_of(session, &selectors::FULL_IMAGE, "src", "full image").await?;
            return Ok(ContentVariant::FullImage { url });
        }

        Ok(ContentVariant::Inaccessible)
    }

    /// Pull the source attribute off the variant's element, failing loudly
    /// when classification and extraction disagree.
    async fn source_of(
        session: &dyn PageSession,
        selector: &crate::app::session::Selector,
        attribute: &str,
        variant: &'static str,
    ) -> ResolveResult<String> {
        let value = match session.attribute(selector, attribute).await {
            Ok(value) => value,
            Err(RenderError::ElementMissing { .. }) => None,
            Err(e) => return Err(ResolveError::Render(e)),
        };

        value.ok_or(ResolveError::SourceElementMissing { variant })
    }
}
