//! Error types for Sankaku Fetcher
//!
//! One error enum per domain, plus a transparent top-level [`AppError`].
//! Per-item and per-page failures are converted into outcome-set entries by
//! the pipeline; the error values that survive to the caller here are the
//! ones that abort a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Rendering-session errors (the browser collaborator)
#[derive(Error, Debug)]
pub enum RenderError {
    /// Expected element never appeared before the wait timed out
    #[error("timed out after {timeout:?} waiting for element: {selector}")]
    ElementTimeout { selector: String, timeout: Duration },

    /// A query targeted an element that is not on the current page
    #[error("no element matches selector: {selector}")]
    ElementMissing { selector: String },

    /// The browser backend failed or the session was lost
    #[error("browser session error: {0}")]
    Backend(String),
}

/// Authentication errors - always fatal for the run
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials available from config or environment
    #[error(
        "Missing Sankaku credentials. Set SANKAKU_USERNAME and SANKAKU_PASSWORD environment variables or fill the [credentials] section of the config file"
    )]
    MissingCredentials,

    /// Login form never rendered
    #[error("login form did not appear on the login page")]
    FormUnavailable(#[source] RenderError),

    /// Credentials were rejected by the site
    #[error("Sankaku rejected the login. Please check your credentials and try again")]
    LoginRejected,

    /// Browser session failed mid-login
    #[error("browser session failed during login")]
    Render(#[from] RenderError),
}

/// Download and HTTP transfer errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level HTTP failure
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    /// I/O error while streaming to disk
    #[error("file I/O error")]
    Io(#[from] std::io::Error),

    /// Rate limit must be a positive requests-per-second value
    #[error("rate limit must be non-zero")]
    InvalidRateLimit,
}

/// Content classification errors on a post detail page
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The post content container never rendered
    #[error("post content never appeared")]
    ContentTimeout(#[source] RenderError),

    /// Classification found a variant marker but its source element is gone.
    /// This is a contract violation, not site weather - fail loudly.
    #[error("post classified as {variant} but its source element is missing")]
    SourceElementMissing { variant: &'static str },

    /// Browser session failed mid-resolution
    #[error("browser session failed while resolving post")]
    Render(#[from] RenderError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Missing required configuration value
    #[error("missing required configuration value: {field}")]
    MissingField { field: &'static str },

    /// Invalid configuration value
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// I/O error reading configuration
    #[error("I/O error reading configuration")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Rendering-session error
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Download error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Content resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check whether the error aborts the whole run.
    ///
    /// Everything that reaches the top level is fatal except element
    /// timeouts and per-request HTTP failures, which the pipeline only
    /// surfaces from contexts where retrying is handled lower down.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::Render(RenderError::ElementTimeout { .. })
                | AppError::Fetch(FetchError::Http(_))
                | AppError::Fetch(FetchError::Status { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Render(_) => "rendering",
            AppError::Fetch(_) => "download",
            AppError::Resolve(_) => "resolution",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Rendering-session result type alias
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Download result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
