//! Request and per-layer crawl instrumentation.
//!
//! [`MetricsCollector`] is shared by the fetcher (one sample per HTTP attempt)
//! and the crawl engine (one [`LayerMetrics`] per expanded frontier item).
//! At the end of a run, [`MetricsCollector::summary`] produces a serializable
//! [`MetricsSummary`] with latency percentiles per bucket.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::fetch::Bucket;

/// Counters and per-layer records for one crawl invocation.
#[derive(Debug)]
pub struct MetricsCollector {
    started: Instant,
    state: Mutex<MetricsState>,
}

#[derive(Debug, Default)]
struct MetricsState {
    requests: BTreeMap<Bucket, BucketStats>,
    layers: Vec<LayerMetrics>,
}

#[derive(Debug, Default)]
struct BucketStats {
    ok: u64,
    err: u64,
    latencies: Vec<Duration>,
}

/// Summary of one processed frontier item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetrics {
    /// Which expansion strategy produced the layer (`openalex` or `s2`).
    pub engine: String,
    /// BFS depth of the expanded node.
    pub depth: usize,
    /// Outgoing references considered.
    pub total_refs: usize,
    /// References that produced an edge.
    pub kept: usize,
    /// References dropped by the threshold or mapping rules.
    pub pruned: usize,
    /// References enqueued for the next layer.
    pub expanded: usize,
    /// Wall-clock seconds for the layer.
    pub seconds: f64,
    /// Throughput, absent when the layer took no measurable time.
    pub refs_per_sec: Option<f64>,
    /// Sum of per-task durations.
    pub work_secs: f64,
    /// `work_secs / seconds`; how many tasks were in flight on average.
    pub eff_parallelism: Option<f64>,
}

impl LayerMetrics {
    /// Builds a layer record, deriving the rate fields from the timings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        engine: impl Into<String>,
        depth: usize,
        counts: LayerCounts,
        elapsed: Duration,
        work: Duration,
    ) -> Self {
        let seconds = elapsed.as_secs_f64();
        let work_secs = work.as_secs_f64();
        let (refs_per_sec, eff_parallelism) = if seconds > 0.0 {
            (
                Some(counts.total_refs as f64 / seconds),
                Some(work_secs / seconds),
            )
        } else {
            (None, None)
        };
        Self {
            engine: engine.into(),
            depth,
            total_refs: counts.total_refs,
            kept: counts.kept,
            pruned: counts.pruned,
            expanded: counts.expanded,
            seconds,
            refs_per_sec,
            work_secs,
            eff_parallelism,
        }
    }
}

/// Tallies accumulated while processing a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCounts {
    pub total_refs: usize,
    pub kept: usize,
    pub pruned: usize,
    pub expanded: usize,
}

/// Request statistics for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub ok: u64,
    pub err: u64,
    /// Mean attempt latency in seconds; absent when no attempts were made.
    pub avg_secs: Option<f64>,
    pub p50_secs: Option<f64>,
    pub p95_secs: Option<f64>,
}

/// End-of-run snapshot, written to `--metrics-out` as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub requests: BTreeMap<String, BucketSummary>,
    pub layers: Vec<LayerMetrics>,
    pub wall_clock_seconds: f64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Starts the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MetricsState::default()),
        }
    }

    /// Records one HTTP attempt.
    pub fn record_request(&self, bucket: Bucket, ok: bool, latency: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = state.requests.entry(bucket).or_default();
        if ok {
            stats.ok += 1;
        } else {
            stats.err += 1;
        }
        stats.latencies.push(latency);
    }

    /// Records a finished layer.
    pub fn record_layer(&self, layer: LayerMetrics) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .layers
            .push(layer);
    }

    /// Successful and failed attempt counts for `bucket`.
    #[must_use]
    pub fn request_counts(&self, bucket: Bucket) -> (u64, u64) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .requests
            .get(&bucket)
            .map_or((0, 0), |stats| (stats.ok, stats.err))
    }

    /// Copies out the layers recorded so far.
    #[must_use]
    pub fn layers(&self) -> Vec<LayerMetrics> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .layers
            .clone()
    }

    /// Aggregates everything recorded so far.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut requests = BTreeMap::new();
        for bucket in [Bucket::Primary, Bucket::Secondary] {
            let summary = state
                .requests
                .get(&bucket)
                .map_or_else(BucketSummary::empty, BucketStats::summarize);
            requests.insert(bucket.to_string(), summary);
        }
        MetricsSummary {
            requests,
            layers: state.layers.clone(),
            wall_clock_seconds: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl BucketSummary {
    fn empty() -> Self {
        Self {
            ok: 0,
            err: 0,
            avg_secs: None,
            p50_secs: None,
            p95_secs: None,
        }
    }
}

impl BucketStats {
    #[allow(clippy::cast_precision_loss)]
    fn summarize(&self) -> BucketSummary {
        let mut secs: Vec<f64> = self.latencies.iter().map(Duration::as_secs_f64).collect();
        secs.sort_by(f64::total_cmp);
        let avg_secs = if secs.is_empty() {
            None
        } else {
            Some(secs.iter().sum::<f64>() / secs.len() as f64)
        };
        BucketSummary {
            ok: self.ok,
            err: self.err,
            avg_secs,
            p50_secs: percentile(&secs, 50.0),
            p95_secs: percentile(&secs, 95.0),
        }
    }
}

/// Nearest-rank percentile over an ascending slice.
///
/// The index is `round(p / 100 * (n - 1))`, clamped to the slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let last = sorted.len() - 1;
    let index = ((p / 100.0) * last as f64).round().max(0.0) as usize;
    sorted.get(index.min(last)).copied()
}

impl MetricsSummary {
    /// Emits the summary through `tracing` at INFO.
    pub fn log(&self) {
        for (bucket, stats) in &self.requests {
            match (stats.avg_secs, stats.p50_secs, stats.p95_secs) {
                (Some(avg), Some(p50), Some(p95)) => info!(
                    bucket = %bucket,
                    ok = stats.ok,
                    err = stats.err,
                    "[metrics] avg={avg:.3}s p50={p50:.3}s p95={p95:.3}s"
                ),
                _ => info!(bucket = %bucket, ok = stats.ok, err = stats.err, "[metrics] no requests"),
            }
        }

        if !self.layers.is_empty() {
            info!("[metrics] layers summary:");
        }
        for layer in &self.layers {
            info!(
                engine = %layer.engine,
                depth = layer.depth,
                refs = layer.total_refs,
                kept = layer.kept,
                pruned = layer.pruned,
                expanded = layer.expanded,
                "[metrics] secs={:.2} rps={} eff_parallelism={}",
                layer.seconds,
                format_optional(layer.refs_per_sec),
                format_optional(layer.eff_parallelism),
            );
        }

        info!(
            "[metrics] wall_clock_seconds={:.2}",
            self.wall_clock_seconds
        );
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}
