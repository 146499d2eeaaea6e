//! Application constants for Sankaku Fetcher
//!
//! Centralizes the constants used throughout the application, organized by
//! functional domain. Anything an operator may reasonably want to tune also
//! has a configuration knob; the values here are the defaults.

use std::time::Duration;

/// Environment variable names for authentication
pub mod env {
    /// Environment variable name for the Sankaku account name
    pub const USERNAME: &str = "SANKAKU_USERNAME";

    /// Environment variable name for the Sankaku account password
    pub const PASSWORD: &str = "SANKAKU_PASSWORD";
}

/// Site URLs and page markers
pub mod site {
    /// Default base URL for post detail pages; the post id is appended
    pub const POST_URL_BASE: &str = "https://chan.sankakucomplex.com/posts";

    /// Text shown by the auto-paging toggle when infinite scroll is active
    pub const AUTO_TOGGLE_ON_TEXT: &str = "Enabled: On";

    /// Substring in a source URL that marks a reduced-resolution sample
    pub const SAMPLE_URL_MARKER: &str = "sample";
}

/// CSS-addressable selectors for the rendered pages
pub mod selectors {
    use crate::app::session::Selector;

    /// Login form email field
    pub const LOGIN_EMAIL: Selector = Selector::Name("email");

    /// Login form password field
    pub const LOGIN_PASSWORD: Selector = Selector::Name("password");

    /// Login form submit button
    pub const LOGIN_SUBMIT: Selector = Selector::Css("form button[type='submit']");

    /// Error banner shown when the login is rejected
    pub const LOGIN_ERROR: Selector = Selector::Class("error");

    /// Premium upsell notice that overlays listing and detail pages
    pub const PREMIUM_NOTICE: Selector = Selector::Class("table--premium");

    /// Close button of the premium notice
    pub const PREMIUM_CLOSE: Selector = Selector::Id("close-btn");

    /// Infinite-scroll toggle on listing pages
    pub const AUTO_TOGGLE: Selector = Selector::Id("sc-auto-toggle");

    /// Thumbnail container on listing pages
    pub const THUMB: Selector = Selector::Class("thumb");

    /// Anchor inside a thumbnail, carrying the post link
    pub const THUMB_LINK: Selector = Selector::Css(".thumb a");

    /// Content container on a post detail page
    pub const POST_CONTENT: Selector = Selector::Id("post-content");

    /// Downsized-sample marker; its presence implies a full-size link exists
    pub const SAMPLE_MARKER: Selector = Selector::Css("#post-content .sample");

    /// Link to the full-resolution image of a downsized post
    pub const DOWNSIZED_LINK: Selector = Selector::Css("#post-content #image-link");

    /// Inline video element
    pub const VIDEO_SOURCE: Selector = Selector::Css("#post-content video");

    /// Inline full-size image element
    pub const FULL_IMAGE: Selector = Selector::Css("#post-content #image");
}

/// Request pacing defaults
pub mod pacing {
    use super::Duration;

    /// Delay before every listing-page navigation
    pub const PAGE_DELAY: Duration = Duration::from_secs(15);

    /// Delay between items on the same page
    pub const ITEM_DELAY: Duration = Duration::from_secs(5);

    /// Random extra delay added on top of the item delay
    pub const ITEM_JITTER: Duration = Duration::from_secs(2);

    /// Cooldown before retrying a listing page that yielded no posts
    pub const RETRY_COOLDOWN: Duration = Duration::from_secs(30);

    /// Random extra delay added on top of the retry cooldown
    pub const COOLDOWN_JITTER: Duration = Duration::from_secs(15);

    /// How often a paced wait logs its remaining time
    pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);
}

/// Retry and wait limits
pub mod limits {
    use super::Duration;

    /// How long to wait for an expected element before giving up
    pub const ELEMENT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Attempts to fetch post ids from a listing page before recording it
    /// as failed
    pub const PAGE_RETRY_LIMIT: u32 = 10;

    /// Hard cap on forward probing during last-page discovery
    pub const MAX_PROBE_PAGES: u32 = 10_000;

    /// Maximum retry attempts for a single HTTP request
    pub const MAX_HTTP_RETRIES: u32 = 3;

    /// Base delay for HTTP exponential backoff (milliseconds)
    pub const HTTP_RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// HTTP client configuration defaults
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Sankaku-Fetcher/0.3 (Gallery Archiver)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default rate limit for media requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;
}

/// File operation constants
pub mod files {
    /// Subdirectory of the save dir used for reconciliation downloads
    pub const TEMP_DIR_NAME: &str = "temp";

    /// Read/write chunk size for streaming and hashing (8 KiB)
    pub const CHUNK_SIZE: usize = 8 * 1024;

    /// Recognized media extensions, in match priority order
    pub const MEDIA_EXTENSIONS: [&str; 6] = ["jpg", "png", "gif", "jpeg", "mp4", "webm"];
}

/// Report file names, written to the report directory at run end
pub mod reports {
    /// Posts whose existing file hashed differently from the remote bytes
    pub const WRONG_HASHES_FILE: &str = "wrong_hashes.txt";

    /// Posts that resolved to no downloadable content
    pub const INACCESSIBLE_POSTS_FILE: &str = "inaccessible_posts.txt";

    /// Pages that produced no post ids after all retries
    pub const FAILED_PAGES_FILE: &str = "failed_pages.txt";

    /// Pages whose items were all processed
    pub const DOWNLOADED_PAGES_FILE: &str = "downloaded_pages.txt";

    /// Posts skipped for an unrecognized extension or a sample URL
    pub const SKIPPED_POSTS_FILE: &str = "skipped_posts.txt";
}

// Re-export commonly used constants for convenience
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::USER_AGENT;
pub use limits::{ELEMENT_WAIT_TIMEOUT, PAGE_RETRY_LIMIT};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(ENV_USERNAME, "SANKAKU_USERNAME");
        assert!(USER_AGENT.contains("Sankaku-Fetcher"));
        assert_eq!(PAGE_RETRY_LIMIT, 10);
    }

    #[test]
    fn test_pacing_invariants() {
        // Progress interval must never exceed the waits it reports on
        assert!(pacing::PROGRESS_INTERVAL <= pacing::PAGE_DELAY);
        assert!(pacing::PROGRESS_INTERVAL <= pacing::ITEM_DELAY);
        assert!(pacing::PROGRESS_INTERVAL <= pacing::RETRY_COOLDOWN);
    }

    #[test]
    fn test_extension_allow_list() {
        assert!(files::MEDIA_EXTENSIONS.contains(&"webm"));
        assert_eq!(files::MEDIA_EXTENSIONS.len(), 6);
    }
}
