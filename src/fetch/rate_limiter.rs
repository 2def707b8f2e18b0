//! Per-bucket politeness spacing for catalog requests.
//!
//! [`RateLimiter`] enforces a minimum interval between consecutive permitted
//! calls in each rate-limited [`Bucket`]. Buckets that were not configured as
//! limited pass straight through.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use refcrawl_core::fetch::{Bucket, RateLimiter};
//!
//! # async fn example() {
//! // Three requests per second against the primary catalog
//! let limiter = Arc::new(RateLimiter::new(3.0));
//!
//! // First call proceeds immediately
//! limiter.throttle(Bucket::Primary).await;
//!
//! // Second call waits until ~333ms have elapsed since the first
//! limiter.throttle(Bucket::Primary).await;
//!
//! // Secondary traffic is not throttled
//! limiter.throttle(Bucket::Secondary).await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::Bucket;

/// Default primary-catalog request rate.
pub const DEFAULT_QPS: f64 = 3.0;

/// Lowest accepted rate; smaller values are raised to this floor.
const MIN_QPS: f64 = 0.1;

/// Warning threshold for cumulative delay per bucket (30 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Converts a requests-per-second cap into the minimum spacing between calls.
///
/// ```
/// use std::time::Duration;
/// use refcrawl_core::fetch::interval_for_qps;
///
/// assert_eq!(interval_for_qps(4.0), Duration::from_millis(250));
/// assert_eq!(interval_for_qps(0.0), Duration::from_secs(10));
/// ```
#[must_use]
pub fn interval_for_qps(qps: f64) -> Duration {
    let qps = if qps.is_finite() { qps.max(MIN_QPS) } else { DEFAULT_QPS };
    Duration::from_secs_f64(1.0 / qps)
}

/// Minimum-spacing limiter shared by every task of a crawl.
///
/// Designed to be wrapped in `Arc`. The pacing decision for a bucket is
/// serialized through that bucket's mutex; the network call that follows is
/// not.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    disabled: bool,
    limited: Vec<Bucket>,
    /// Arc lets us release the `DashMap` shard lock before awaiting the inner mutex.
    buckets: DashMap<Bucket, Arc<BucketState>>,
}

#[derive(Debug)]
struct BucketState {
    /// `None` until the first permitted call, which is never delayed.
    last_call: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl BucketState {
    fn new() -> Self {
        Self {
            last_call: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a limiter that paces the primary bucket at `qps` requests per second.
    #[must_use]
    pub fn new(qps: f64) -> Self {
        Self::for_buckets(qps, &[Bucket::Primary])
    }

    /// Creates a limiter that paces each of `buckets` independently at `qps`.
    #[must_use]
    #[instrument(skip(buckets), fields(buckets = ?buckets))]
    pub fn for_buckets(qps: f64, buckets: &[Bucket]) -> Self {
        let interval = interval_for_qps(qps);
        debug!(interval_ms = interval.as_millis(), "creating rate limiter");
        Self {
            interval,
            disabled: false,
            limited: buckets.to_vec(),
            buckets: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            interval: Duration::ZERO,
            disabled: true,
            limited: Vec::new(),
            buckets: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum spacing between calls in a limited bucket.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether calls in `bucket` are paced.
    #[must_use]
    pub fn is_limited(&self, bucket: Bucket) -> bool {
        !self.disabled && self.limited.contains(&bucket)
    }

    /// Waits until a call in `bucket` is permitted, then records it.
    pub async fn throttle(&self, bucket: Bucket) {
        if !self.is_limited(bucket) {
            return;
        }

        let state = self
            .buckets
            .entry(bucket)
            .or_insert_with(|| Arc::new(BucketState::new()))
            .clone();

        let mut last_call = state.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let delay = self.interval.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    bucket = %bucket,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(delay) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        bucket = %bucket,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "heavy rate limiting - consider lowering worker count or depth"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        }

        *last_call = Some(Instant::now());
    }

    /// Total time spent waiting in `bucket` so far.
    #[must_use]
    pub fn cumulative_delay(&self, bucket: Bucket) -> Duration {
        self.buckets.get(&bucket).map_or(Duration::ZERO, |state| {
            Duration::from_millis(state.cumulative_delay_ms.load(Ordering::SeqCst))
        })
    }
}
