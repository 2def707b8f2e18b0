//! Run orchestration: wiring, seed resolution, strategy selection, crawl and export.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::cache::{CacheStore, MappingCache, RecordCache};
use crate::catalog::{OpenAlexClient, PrimaryCatalog, PrimaryWork, SecondaryCatalog, SemanticScholarClient};
use crate::config::{CrawlConfig, SourceSelection};
use crate::crawl::{CrawlContext, CrawlEngine, CrawlOutcome};
use crate::export::{self, ExportPaths};
use crate::fetch::{HttpFetcher, JsonFetcher, RateLimiter};
use crate::metrics::{MetricsCollector, MetricsSummary};
use crate::resolver::IdResolver;

/// In auto mode, seeds listing fewer primary references than this are crawled
/// through the secondary catalog.
pub const AUTO_SECONDARY_MAX_REFS: usize = 10;

/// Which strategy actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Secondary,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "openalex",
            Self::Secondary => "s2",
        }
    }
}

/// Whether the secondary strategy should be attempted.
#[must_use]
pub fn wants_secondary(selection: SourceSelection, primary_reference_count: usize) -> bool {
    match selection {
        SourceSelection::Secondary => true,
        SourceSelection::Primary => false,
        SourceSelection::Auto => primary_reference_count < AUTO_SECONDARY_MAX_REFS,
    }
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub seed_id: String,
    pub strategy: Strategy,
    pub outcome: CrawlOutcome,
    pub metrics: MetricsSummary,
}

/// Collaborators built from a config.
pub struct Runtime {
    pub context: CrawlContext,
    pub mapping: Arc<MappingCache>,
}

impl Runtime {
    /// Builds the HTTP stack, catalog clients and caches.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP clients cannot be constructed.
    pub async fn build(config: &CrawlConfig) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new());
        let rate_limiter = Arc::new(RateLimiter::new(config.qps));
        let fetcher: Arc<dyn JsonFetcher> = Arc::new(
            HttpFetcher::with_settings(
                config.fetcher_settings(),
                rate_limiter,
                Arc::clone(&metrics),
            )
            .context("Failed to build HTTP client")?,
        );

        let primary: Arc<dyn PrimaryCatalog> = Arc::new(OpenAlexClient::with_base_url(
            Arc::clone(&fetcher),
            config.email.clone(),
            config.openalex_base_url.clone(),
        ));
        let secondary: Arc<dyn SecondaryCatalog> = Arc::new(SemanticScholarClient::with_base_url(
            fetcher,
            config.semantic_scholar_base_url.clone(),
        ));

        let records = Arc::new(RecordCache::load(CacheStore::from_setting(&config.cache_path)).await);
        let mapping =
            Arc::new(MappingCache::load(CacheStore::from_setting(&config.map_cache_path)).await);
        info!(
            records = records.len(),
            mappings = mapping.len(),
            "caches loaded"
        );

        let resolver = Arc::new(IdResolver::new(
            Arc::clone(&primary),
            Arc::clone(&secondary),
            Arc::clone(&records),
            Arc::clone(&mapping),
        ));

        Ok(Self {
            context: CrawlContext {
                primary,
                secondary,
                records,
                resolver,
                metrics,
            },
            mapping,
        })
    }
}

/// Resolves `seed`, crawls with the selected strategy and returns the result.
///
/// Nothing is written to disk except the caches.
///
/// # Errors
///
/// Fails when the seed cannot be resolved or its record cannot be fetched.
#[instrument(skip(runtime, config))]
pub async fn crawl(runtime: &Runtime, config: &CrawlConfig, seed: &str) -> Result<RunReport> {
    let ctx = &runtime.context;
    let seed_id = ctx
        .resolver
        .resolve_seed(seed)
        .await
        .with_context(|| format!("Could not resolve seed '{seed}'"))?;
    info!(%seed_id, "seed resolved");

    let seed_record = ctx
        .records
        .get_or_fetch(&seed_id, ctx.primary.as_ref())
        .await
        .with_context(|| format!("Failed to fetch seed record {seed_id}"))?;
    let reference_count = PrimaryWork::from_record(&seed_record)
        .map(|work| work.referenced_works.len())
        .unwrap_or_default();

    let engine = CrawlEngine::new(ctx.clone(), config.crawl_settings());
    let mut strategy = Strategy::Primary;
    let outcome = if wants_secondary(config.source, reference_count) {
        info!(
            source = config.source.as_str(),
            primary_refs = reference_count,
            "using secondary-mediated expansion"
        );
        if let Some(secondary_id) = ctx.resolver.find_secondary_seed(seed).await {
            info!(%secondary_id, "secondary seed found");
            strategy = Strategy::Secondary;
            engine.crawl_secondary(&seed_id, &secondary_id).await?
        } else {
            warn!(%seed_id, "no secondary seed found; falling back to primary-only expansion");
            engine.crawl_primary(&seed_id).await?
        }
    } else {
        engine.crawl_primary(&seed_id).await?
    };

    let metrics = ctx.metrics.summary();
    Ok(RunReport {
        seed_id,
        strategy,
        outcome,
        metrics,
    })
}

/// Full run: build, crawl, export graph files and metrics.
///
/// # Errors
///
/// Fails on seed resolution, seed fetch or output write errors.
pub async fn run(config: &CrawlConfig, seed: &str) -> Result<RunReport> {
    let runtime = Runtime::build(config).await?;
    let report = crawl(&runtime, config, seed).await?;

    let paths = ExportPaths {
        nodes_csv: config.nodes_csv_path(),
        edges_csv: config.edges_csv_path(),
        graph_json: config.graph_json.clone(),
    };
    export::write_all(&report.outcome.graph, &paths)?;

    report.metrics.log();
    if let Some(path) = &config.metrics_out {
        export::write_metrics_json(&report.metrics, path)?;
        info!(path = %path.display(), "metrics written");
    }

    info!(
        seed = %report.seed_id,
        strategy = report.strategy.as_str(),
        nodes = report.outcome.graph.node_count(),
        edges = report.outcome.graph.edge_count(),
        cached_mappings = runtime.mapping.len(),
        "run complete"
    );
    Ok(report)
}
