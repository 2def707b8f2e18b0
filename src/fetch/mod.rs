//! Rate-limited, retrying JSON fetches against the two catalogs.
//!
//! Every request is tagged with a [`Bucket`]. The bucket selects the pooled
//! HTTP client, the retry policy, the rate-limit lane and the metrics series
//! the attempt is recorded under.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use refcrawl_core::fetch::{Bucket, HttpFetcher, JsonFetcher, RateLimiter};
//! use refcrawl_core::metrics::MetricsCollector;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = Arc::new(RateLimiter::new(3.0));
//! let metrics = Arc::new(MetricsCollector::new());
//! let fetcher = HttpFetcher::new(limiter, metrics)?;
//! let work = fetcher
//!     .get_json(Bucket::Primary, "https://api.openalex.org/works/W2741809807", &[])
//!     .await?;
//! println!("{}", work["title"]);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod rate_limiter;
mod retry;

use std::fmt;

use serde::Serialize;

pub use client::{FetcherSettings, HttpFetcher, HttpTimeouts, JsonFetcher};
pub use error::FetchError;
pub use rate_limiter::{DEFAULT_QPS, RateLimiter, interval_for_qps};
pub use retry::{
    DEFAULT_PRIMARY_ATTEMPTS, DEFAULT_SECONDARY_ATTEMPTS, FailureType, RetryDecision,
    RetryPolicy, classify_error,
};

// Note: no module-local Result alias. Use `Result<T, FetchError>` explicitly.

/// Request lane a fetch belongs to.
///
/// The primary catalog is the only rate-limited lane by default; the
/// secondary catalog relies on its own server-side limits and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Bucket {
    /// OpenAlex traffic.
    #[serde(rename = "openalex")]
    Primary,
    /// Semantic Scholar traffic.
    #[serde(rename = "s2")]
    Secondary,
}

impl Bucket {
    /// Stable label used in logs and metrics output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "openalex",
            Self::Secondary => "s2",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
