//! Pooled, retrying JSON client.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::metrics::MetricsCollector;
use crate::user_agent;

use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use super::{Bucket, FetchError, RateLimiter};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;
const MAX_IDLE_PER_HOST: usize = 16;

/// GET-and-decode seam between the catalogs and the network.
///
/// Implemented by [`HttpFetcher`]; tests substitute in-memory fakes.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetches `url` with query `params` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when every permitted attempt fails or the
    /// failure is not retryable.
    async fn get_json(
        &self,
        bucket: Bucket,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, FetchError>;
}

/// Client timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Construction-time knobs for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub timeouts: HttpTimeouts,
    pub primary_retry: RetryPolicy,
    pub secondary_retry: RetryPolicy,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            timeouts: HttpTimeouts::default(),
            primary_retry: RetryPolicy::default(),
            secondary_retry: RetryPolicy::secondary(),
        }
    }
}

/// reqwest-backed [`JsonFetcher`] with one connection pool per bucket.
///
/// Before each attempt the bucket is throttled through the shared
/// [`RateLimiter`]; after each attempt the outcome and latency are recorded in
/// the shared [`MetricsCollector`].
pub struct HttpFetcher {
    primary: Client,
    secondary: Client,
    primary_retry: RetryPolicy,
    secondary_retry: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
}

impl HttpFetcher {
    /// Creates a fetcher with default timeouts and retry policies.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, FetchError> {
        Self::with_settings(FetcherSettings::default(), rate_limiter, metrics)
    }

    /// Creates a fetcher with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_settings(
        settings: FetcherSettings,
        rate_limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            primary: build_http_client(settings.timeouts)?,
            secondary: build_http_client(settings.timeouts)?,
            primary_retry: settings.primary_retry,
            secondary_retry: settings.secondary_retry,
            rate_limiter,
            metrics,
        })
    }

    fn lane(&self, bucket: Bucket) -> (&Client, &RetryPolicy) {
        match bucket {
            Bucket::Primary => (&self.primary, &self.primary_retry),
            Bucket::Secondary => (&self.secondary, &self.secondary_retry),
        }
    }
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("primary_attempts", &self.primary_retry.max_attempts())
            .field("secondary_attempts", &self.secondary_retry.max_attempts())
            .finish_non_exhaustive()
    }
}

fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, FetchError> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .user_agent(user_agent::default_catalog_user_agent())
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .gzip(true)
        .build()
        .map_err(FetchError::client_build)
}

async fn send_once(client: &Client, url: &Url) -> Result<Value, FetchError> {
    let response = client
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| FetchError::network(url.as_str(), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http_status(url.as_str(), status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::network(url.as_str(), e))?;
    serde_json::from_slice(&body).map_err(|e| FetchError::decode(url.as_str(), e))
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    #[instrument(skip(self, params), fields(bucket = %bucket))]
    async fn get_json(
        &self,
        bucket: Bucket,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        let request_url = if params.is_empty() {
            Url::parse(url)
        } else {
            Url::parse_with_params(url, params)
        }
        .map_err(|e| FetchError::invalid_url(url, e))?;

        let (client, policy) = self.lane(bucket);
        let mut attempt = 1;

        loop {
            self.rate_limiter.throttle(bucket).await;

            let started = Instant::now();
            let result = send_once(client, &request_url).await;
            let latency = started.elapsed();
            self.metrics.record_request(bucket, result.is_ok(), latency);

            let error = match result {
                Ok(value) => {
                    debug!(
                        url = %request_url,
                        latency_ms = latency.as_millis(),
                        "GET ok"
                    );
                    return Ok(value);
                }
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url = %request_url,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %request_url, attempt, %reason, error = %error, "GET failed");
                    return Err(match failure_type {
                        FailureType::Permanent => error,
                        FailureType::Transient | FailureType::RateLimited => {
                            FetchError::retry_exhausted(request_url.as_str(), attempt, error)
                        }
                    });
                }
            }
        }
    }
}
