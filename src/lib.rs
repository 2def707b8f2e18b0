//! Refcrawl Core Library
//!
//! Builds a directed citation graph (citer → cited) by recursively expanding
//! the references of a seed work, using OpenAlex as the primary catalog and
//! Semantic Scholar as a secondary source for domains where its reference
//! lists are more complete.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Rate-limited, retrying JSON client with per-bucket metrics
//! - [`catalog`] - Typed OpenAlex and Semantic Scholar clients behind traits
//! - [`cache`] - Disk-backed record and identifier-mapping caches
//! - [`resolver`] - Seed resolution and secondary-to-primary ID mapping
//! - [`crawl`] - Breadth-first crawl engine and threshold policy
//! - [`metrics`] - Request and per-layer instrumentation
//! - [`export`] - CSV and JSON writers for the finished graph
//! - [`config`] - Defaults, config file and validation
//! - [`app`] - Run orchestration used by the binary

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod crawl;
pub mod export;
pub mod fetch;
pub mod metrics;
pub mod resolver;

#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use cache::{CacheStore, MappingCache, MappingKey, MappingLookup, RecordCache};
pub use catalog::{
    OpenAlexClient, PrimaryCatalog, PrimaryWork, SecondaryCatalog, SecondaryPaper,
    SecondaryReference, SemanticScholarClient,
};
pub use config::{CrawlConfig, FileConfig, SourceSelection};
pub use crawl::{
    CrawlContext, CrawlEngine, CrawlError, CrawlGraph, CrawlOutcome, CrawlSettings, Edge,
    NodeKey, Provenance, ThresholdPolicy, WorkNode,
};
pub use fetch::{Bucket, FetchError, HttpFetcher, JsonFetcher, RateLimiter, RetryPolicy};
pub use metrics::{LayerMetrics, MetricsCollector, MetricsSummary};
pub use resolver::{IdResolver, ResolveError};
