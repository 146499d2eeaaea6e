//! HTTP transfer boundary
//!
//! Media bytes travel over plain HTTP, not through the browser session. The
//! [`MediaFetcher`] trait is the seam: the production [`HttpFetcher`] wraps
//! reqwest with rate limiting and exponential backoff, tests substitute a
//! scripted fake.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{http, limits};
use crate::errors::{FetchError, FetchResult};

/// A streamed HTTP response: status plus a chunked body.
///
/// Non-success statuses are data, not errors - the downloader decides what
/// they mean for the item.
pub struct MediaResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a stream of chunks
    pub body: BoxStream<'static, FetchResult<Bytes>>,
}

impl MediaResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator consumed by the downloader
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Streamed GET. Transport failures are errors; non-2xx statuses are
    /// returned in the response.
    async fn get(&self, url: &str) -> FetchResult<MediaResponse>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Build the reqwest client with the configured timeouts
    pub fn build_http_client(&self) -> FetchResult<Client> {
        Client::builder()
            .cookie_store(true)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .build()
            .map_err(FetchError::Http)
    }
}

/// Production fetcher: reqwest with rate limiting and retry
pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &ClientConfig) -> FetchResult<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> FetchResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_rps).ok_or(FetchError::InvalidRateLimit)?,
        );
        Ok(RateLimiter::direct(quota))
    }

    /// Send one GET with retry on transport failure and server pushback
    async fn get_response(&self, url: &str) -> FetchResult<reqwest::Response> {
        // Jitter spreads the rate-limited requests out a little
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let mut retries = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    // 429/503 are pushback, worth backing off and retrying
                    if (status == 429 || status == 503) && retries < limits::MAX_HTTP_RETRIES {
                        retries += 1;
                        let delay = Duration::from_millis(
                            limits::HTTP_RETRY_BASE_DELAY_MS * 2_u64.pow(retries),
                        );
                        tracing::warn!(
                            "Server pushback (HTTP {}). Backing off for {}ms",
                            status,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::debug!("Fetched {} (HTTP {})", url, status);
                    return Ok(response);
                }
                Err(e) if retries < limits::MAX_HTTP_RETRIES => {
                    retries += 1;
                    let delay = Duration::from_millis(
                        limits::HTTP_RETRY_BASE_DELAY_MS * 2_u64.pow(retries),
                    );
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_HTTP_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        limits::MAX_HTTP_RETRIES,
                        e
                    );
                    return Err(FetchError::Http(e));
                }
            }
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> FetchResult<MediaResponse> {
        let response = self.get_response(url).await?;
        let status = response.status().as_u16();
        let body = response.bytes_stream().map_err(FetchError::Http).boxed();
        Ok(MediaResponse { status, body })
    }
}
