//! Configuration management for Sankaku Fetcher
//!
//! Unified configuration with automatic first-run initialization and
//! multi-source loading: defaults, then config file, then environment
//! variables, then CLI arguments.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, PipelineConfig};
use crate::constants::{env, limits, pacing, site};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Site URLs
    pub site: SiteConfig,
    /// Account credentials (environment variables take precedence)
    pub credentials: CredentialsConfig,
    /// Run settings: page range and output locations
    pub run: RunConfig,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Request pacing settings
    pub pacing: PacingConfig,
    /// Retry and wait limits
    pub limits: LimitsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Site URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Login page URL
    pub login_url: String,
    /// Listing URL carrying the search query; page numbers are appended
    pub base_url: String,
    /// Base URL for post detail pages; the post id is appended
    pub post_url_base: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: "https://chan.sankakucomplex.com/user/login".to_string(),
            base_url: String::new(),
            post_url_base: site::POST_URL_BASE.to_string(),
        }
    }
}

/// Account credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Account name; prefer the SANKAKU_USERNAME environment variable
    pub username: String,
    /// Account password; prefer the SANKAKU_PASSWORD environment variable
    pub password: String,
}

/// Run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory media files are saved to
    pub save_dir: PathBuf,
    /// Directory report files are written to
    pub report_dir: PathBuf,
    /// First listing page to walk
    pub first_page: u32,
    /// Last listing page to walk (unset = discover by probing)
    pub last_page: Option<u32>,
    /// Re-fetch existing files and compare them by digest
    pub compare_existing: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("./downloads"),
            report_dir: PathBuf::from("."),
            first_page: 1,
            last_page: None,
            compare_existing: false,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfigToml {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            connect_timeout_secs: 30,
            rate_limit_rps: crate::constants::http::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfigToml {
    /// Convert to the runtime client configuration
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

/// Request pacing settings, all in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay before every listing-page navigation
    pub page_delay_secs: u64,
    /// Delay between items on the same page
    pub item_delay_secs: u64,
    /// Random extra delay added on top of the item delay
    pub item_jitter_secs: u64,
    /// Cooldown before retrying a listing page that yielded no posts
    pub retry_cooldown_secs: u64,
    /// Random extra delay added on top of the retry cooldown
    pub cooldown_jitter_secs: u64,
    /// How often a paced wait logs its remaining time
    pub progress_interval_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_secs: pacing::PAGE_DELAY.as_secs(),
            item_delay_secs: pacing::ITEM_DELAY.as_secs(),
            item_jitter_secs: pacing::ITEM_JITTER.as_secs(),
            retry_cooldown_secs: pacing::RETRY_COOLDOWN.as_secs(),
            cooldown_jitter_secs: pacing::COOLDOWN_JITTER.as_secs(),
            progress_interval_secs: pacing::PROGRESS_INTERVAL.as_secs(),
        }
    }
}

/// Retry and wait limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// How long to wait for an expected element, in seconds
    pub element_wait_timeout_secs: u64,
    /// Rescan attempts for a listing page that yielded no posts
    pub page_retry_limit: u32,
    /// Hard cap on forward probing during last-page discovery
    pub max_probe_pages: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            element_wait_timeout_secs: limits::ELEMENT_WAIT_TIMEOUT.as_secs(),
            page_retry_limit: limits::PAGE_RETRY_LIMIT,
            max_probe_pages: limits::MAX_PROBE_PAGES,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    /// 4. CLI arguments (applied by the caller)
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = if let Some(ref path) = config_file_override {
            Some(path.clone())
        } else {
            Self::find_config_file()?
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file if none exists and notifies the user
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::get_default_config_path()?;

        if config_path.exists() {
            return Ok(Some(config_path));
        }

        info!("Creating default configuration file...");

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ConfigError::Io)?;
        }

        let config_content = Self::generate_default_config_content();
        tokio::fs::write(&config_path, config_content)
            .await
            .map_err(ConfigError::Io)?;

        println!("Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   Fill in the [site] and [credentials] sections before running.");
        println!();

        Ok(Some(config_path))
    }

    /// Credentials from the environment beat the config file, so the file
    /// can stay secret-free
    fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var(env::USERNAME) {
            debug!("Using account name from {}", env::USERNAME);
            self.credentials.username = username;
        }
        if let Ok(password) = std::env::var(env::PASSWORD) {
            debug!("Using password from {}", env::PASSWORD);
            self.credentials.password = password;
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Result<Option<PathBuf>> {
        let search_paths = vec![
            // Project-local config
            PathBuf::from("./sankaku-fetcher.toml"),
            PathBuf::from("./config.toml"),
            // User config
            Self::get_default_config_path()?,
        ];

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Ok(Some(path));
            }
        }

        debug!("No config file found in standard locations");
        Ok(None)
    }

    /// Get the default config file path for the current user
    fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join("sankaku-fetcher").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Io)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Check the values that would otherwise fail deep inside a run
    pub fn validate(&self) -> ConfigResult<()> {
        if self.site.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "site.base_url",
            });
        }
        if self.site.login_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "site.login_url",
            });
        }
        if self.site.post_url_base.is_empty() {
            return Err(ConfigError::MissingField {
                field: "site.post_url_base",
            });
        }
        for (field, value) in [
            ("site.login_url", &self.site.login_url),
            ("site.base_url", &self.site.base_url),
            ("site.post_url_base", &self.site.post_url_base),
        ] {
            if let Err(e) = url::Url::parse(value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: e.to_string(),
                });
            }
        }
        if self.run.first_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "run.first_page",
                reason: "page numbering starts at 1".to_string(),
            });
        }
        if let Some(last_page) = self.run.last_page {
            if last_page < self.run.first_page {
                return Err(ConfigError::InvalidValue {
                    field: "run.last_page",
                    reason: format!(
                        "must not precede first_page ({})",
                        self.run.first_page
                    ),
                });
            }
        }
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps",
                reason: "must be at least 1".to_string(),
            });
        }
        let shortest_wait = self
            .pacing
            .page_delay_secs
            .min(self.pacing.item_delay_secs)
            .min(self.pacing.retry_cooldown_secs);
        if self.pacing.progress_interval_secs == 0
            || self.pacing.progress_interval_secs > shortest_wait
        {
            return Err(ConfigError::InvalidValue {
                field: "pacing.progress_interval_secs",
                reason: "must be positive and no longer than the shortest wait".to_string(),
            });
        }
        Ok(())
    }

    /// Assemble the pipeline configuration from the validated settings
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            login_url: self.site.login_url.clone(),
            base_url: self.site.base_url.clone(),
            post_url_base: self.site.post_url_base.clone(),
            save_dir: self.run.save_dir.clone(),
            report_dir: self.run.report_dir.clone(),
            first_page: self.run.first_page,
            last_page: self.run.last_page,
            compare_existing: self.run.compare_existing,
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            element_timeout: Duration::from_secs(self.limits.element_wait_timeout_secs),
            page_retry_limit: self.limits.page_retry_limit,
            retry_cooldown: Duration::from_secs(self.pacing.retry_cooldown_secs),
            cooldown_jitter: Duration::from_secs(self.pacing.cooldown_jitter_secs),
            page_delay: Duration::from_secs(self.pacing.page_delay_secs),
            item_delay: Duration::from_secs(self.pacing.item_delay_secs),
            item_jitter: Duration::from_secs(self.pacing.item_jitter_secs),
            progress_interval: Duration::from_secs(self.pacing.progress_interval_secs),
            max_probe_pages: self.limits.max_probe_pages,
        }
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Sankaku Fetcher Configuration
# This file was automatically generated on first run.

[site]
# Login page
login_url = "https://chan.sankakucomplex.com/user/login"

# Listing URL carrying your search query. Page numbers are appended.
# Example: "https://chan.sankakucomplex.com/?tags=landscape"
base_url = ""

# Post detail pages; the post id is appended
post_url_base = "{post_url_base}"

[credentials]
# Prefer the SANKAKU_USERNAME / SANKAKU_PASSWORD environment variables
# (a .env file next to the binary works too) over storing secrets here.
username = ""
password = ""

[run]
# Where media files land, named {{post_id}}.{{ext}}
save_dir = "./downloads"

# Where report files are written at the end of a run
report_dir = "."

first_page = 1
# last_page = 100      # unset: probe forward to find the last populated page

# Re-fetch files that already exist and compare them by digest
compare_existing = false

[client]
request_timeout_secs = 60
connect_timeout_secs = 30
rate_limit_rps = {rate_limit_rps}

[pacing]
# All in seconds. Generous delays keep the account in good standing.
page_delay_secs = {page_delay}
item_delay_secs = {item_delay}
item_jitter_secs = {item_jitter}
retry_cooldown_secs = {retry_cooldown}
cooldown_jitter_secs = {cooldown_jitter}
progress_interval_secs = {progress_interval}

[limits]
element_wait_timeout_secs = {element_wait}
page_retry_limit = {page_retry_limit}
max_probe_pages = {max_probe_pages}

[logging]
# Log level: trace, debug, info, warn, error
level = "info"
"#,
            post_url_base = site::POST_URL_BASE,
            rate_limit_rps = crate::constants::http::DEFAULT_RATE_LIMIT_RPS,
            page_delay = pacing::PAGE_DELAY.as_secs(),
            item_delay = pacing::ITEM_DELAY.as_secs(),
            item_jitter = pacing::ITEM_JITTER.as_secs(),
            retry_cooldown = pacing::RETRY_COOLDOWN.as_secs(),
            cooldown_jitter = pacing::COOLDOWN_JITTER.as_secs(),
            progress_interval = pacing::PROGRESS_INTERVAL.as_secs(),
            element_wait = limits::ELEMENT_WAIT_TIMEOUT.as_secs(),
            page_retry_limit = limits::PAGE_RETRY_LIMIT,
            max_probe_pages = limits::MAX_PROBE_PAGES,
        )
    }
}
