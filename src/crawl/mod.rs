//! Breadth-first citation crawl.
//!
//! The engine pops frontier items in FIFO order, lists each item's outgoing
//! references through a [`ReferenceSource`], evaluates every reference in a
//! bounded pool of tasks, and feeds the results through the
//! [`ThresholdPolicy`] to decide what is kept, pruned and expanded.
//!
//! Layers run strictly one after another; work inside a layer runs in
//! parallel up to `max_workers`. Results are applied in completion order, so
//! node and edge insertion order is not stable across runs.
//!
//! # Example
//!
//! ```no_run
//! # async fn example(ctx: refcrawl_core::crawl::CrawlContext) -> Result<(), refcrawl_core::crawl::CrawlError> {
//! use refcrawl_core::crawl::{CrawlEngine, CrawlSettings};
//!
//! let engine = CrawlEngine::new(ctx, CrawlSettings::default());
//! let outcome = engine.crawl_primary("W2741809807").await?;
//! println!("{} nodes, {} edges", outcome.graph.node_count(), outcome.graph.edge_count());
//! # Ok(())
//! # }
//! ```

mod graph;
mod policy;
mod source;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::cache::RecordCache;
use crate::catalog::{PrimaryCatalog, PrimaryWork, SecondaryCatalog};
use crate::fetch::FetchError;
use crate::metrics::{LayerCounts, LayerMetrics, MetricsCollector};
use crate::resolver::IdResolver;

pub use graph::{CrawlGraph, Edge, NodeKey, Provenance, SyntheticKey, WorkNode};
pub use policy::{Admission, ThresholdPolicy};
pub use source::{
    Evaluation, FrontierItem, PrimaryReferences, ReferenceSource, SecondaryReferences,
};

/// Default maximum BFS depth.
pub const DEFAULT_MAX_DEPTH: usize = 2;
/// Default size of the per-layer worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 8;
/// Default pause between consecutive frontier items.
pub const DEFAULT_LAYER_DELAY: Duration = Duration::from_millis(200);

/// Errors that abort a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The seed's own record could not be fetched.
    #[error("failed to fetch seed record {id}: {source}")]
    SeedFetch {
        id: String,
        #[source]
        source: FetchError,
    },

    /// The worker semaphore was closed unexpectedly.
    #[error("worker pool closed unexpectedly")]
    SemaphoreClosed,
}

/// Traversal tunables.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub max_depth: usize,
    pub max_workers: usize,
    /// Fixed pause after each dequeued frontier item.
    pub delay: Duration,
    pub policy: ThresholdPolicy,
    /// Keep unmapped secondary references as synthetic nodes.
    pub keep_unmapped: bool,
    /// Draw a per-layer progress bar on stderr.
    pub progress: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_workers: DEFAULT_MAX_WORKERS,
            delay: DEFAULT_LAYER_DELAY,
            policy: ThresholdPolicy::default(),
            keep_unmapped: false,
            progress: false,
        }
    }
}

/// Shared collaborators for one crawl invocation.
#[derive(Clone)]
pub struct CrawlContext {
    pub primary: Arc<dyn PrimaryCatalog>,
    pub secondary: Arc<dyn SecondaryCatalog>,
    pub records: Arc<RecordCache>,
    pub resolver: Arc<IdResolver>,
    pub metrics: Arc<MetricsCollector>,
}

/// Everything a finished crawl produced.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub graph: CrawlGraph,
    /// Every (key, depth) ever enqueued, seed included, in enqueue order.
    pub expanded: Vec<(NodeKey, usize)>,
}

/// Mutable traversal state owned by one crawl call.
struct Traversal {
    graph: CrawlGraph,
    seen: HashSet<NodeKey>,
    frontier: VecDeque<FrontierItem>,
    expanded: Vec<(NodeKey, usize)>,
}

impl Traversal {
    fn new(seed: FrontierItem, seed_node: WorkNode) -> Self {
        let mut graph = CrawlGraph::new();
        graph.upsert(seed.key.clone(), seed_node);
        Self {
            graph,
            seen: HashSet::from([seed.key.clone()]),
            expanded: vec![(seed.key.clone(), seed.depth)],
            frontier: VecDeque::from([seed]),
        }
    }

    /// Enqueues `key` unless it was seen before. Returns true when enqueued.
    fn enqueue(&mut self, key: NodeKey, secondary_id: Option<String>, depth: usize) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.expanded.push((key.clone(), depth));
        self.frontier.push_back(FrontierItem {
            key,
            secondary_id,
            depth,
        });
        true
    }
}

/// Breadth-first crawler over either reference source.
pub struct CrawlEngine {
    ctx: CrawlContext,
    settings: CrawlSettings,
}

impl CrawlEngine {
    #[must_use]
    pub fn new(ctx: CrawlContext, settings: CrawlSettings) -> Self {
        Self { ctx, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawls using references listed on primary records only.
    ///
    /// # Errors
    ///
    /// [`CrawlError::SeedFetch`] when the seed record cannot be fetched.
    #[instrument(skip(self))]
    pub async fn crawl_primary(&self, seed_id: &str) -> Result<CrawlOutcome, CrawlError> {
        let work = self.seed_work(seed_id).await?;
        let source = Arc::new(PrimaryReferences::new(
            Arc::clone(&self.ctx.primary),
            Arc::clone(&self.ctx.records),
        ));
        let seed = FrontierItem {
            key: NodeKey::primary(seed_id),
            secondary_id: None,
            depth: 0,
        };
        let seed_node = WorkNode::from_primary(&work, Provenance::Primary, None);
        self.traverse(source, seed, seed_node).await
    }

    /// Crawls using references listed by the secondary catalog, mapped back to
    /// primary works.
    ///
    /// # Errors
    ///
    /// [`CrawlError::SeedFetch`] when the seed record cannot be fetched.
    #[instrument(skip(self))]
    pub async fn crawl_secondary(
        &self,
        seed_id: &str,
        seed_secondary_id: &str,
    ) -> Result<CrawlOutcome, CrawlError> {
        let work = self.seed_work(seed_id).await?;
        let source = Arc::new(
            SecondaryReferences::new(
                Arc::clone(&self.ctx.primary),
                Arc::clone(&self.ctx.secondary),
                Arc::clone(&self.ctx.records),
                Arc::clone(&self.ctx.resolver),
            )
            .keep_unmapped(self.settings.keep_unmapped)
            .strict(self.settings.policy.strict),
        );
        let seed = FrontierItem {
            key: NodeKey::primary(seed_id),
            secondary_id: Some(seed_secondary_id.to_string()),
            depth: 0,
        };
        let seed_node =
            WorkNode::from_primary(&work, Provenance::Mixed, Some(seed_secondary_id.to_string()));
        self.traverse(source, seed, seed_node).await
    }

    async fn seed_work(&self, seed_id: &str) -> Result<PrimaryWork, CrawlError> {
        let record = self
            .ctx
            .records
            .get_or_fetch(seed_id, self.ctx.primary.as_ref())
            .await
            .map_err(|source| CrawlError::SeedFetch {
                id: seed_id.to_string(),
                source,
            })?;
        PrimaryWork::from_record(&record).map_err(|e| CrawlError::SeedFetch {
            id: seed_id.to_string(),
            source: FetchError::decode(format!("record:{seed_id}"), e),
        })
    }

    async fn traverse<S: ReferenceSource>(
        &self,
        source: Arc<S>,
        seed: FrontierItem,
        seed_node: WorkNode,
    ) -> Result<CrawlOutcome, CrawlError> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let mut state = Traversal::new(seed, seed_node);

        while let Some(item) = state.frontier.pop_front() {
            if item.depth >= self.settings.max_depth {
                continue;
            }
            self.expand(&source, &semaphore, &item, &mut state).await?;
            if !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        info!(
            engine = source.engine(),
            nodes = state.graph.node_count(),
            edges = state.graph.edge_count(),
            "crawl finished"
        );
        Ok(CrawlOutcome {
            graph: state.graph,
            expanded: state.expanded,
        })
    }

    /// Processes one frontier item: one layer in the metrics.
    async fn expand<S: ReferenceSource>(
        &self,
        source: &Arc<S>,
        semaphore: &Arc<Semaphore>,
        item: &FrontierItem,
        state: &mut Traversal,
    ) -> Result<(), CrawlError> {
        let engine = source.engine();
        let layer_start = Instant::now();

        let references = match source.references(item).await {
            Ok(references) => references,
            Err(error) => {
                warn!(engine, key = %item.key, %error, "could not list references; treating node as leaf");
                Vec::new()
            }
        };

        let mut counts = LayerCounts {
            total_refs: references.len(),
            ..LayerCounts::default()
        };
        let mut work = Duration::ZERO;
        let progress = layer_progress(self.settings.progress, engine, item.depth, references.len());

        let mut tasks = JoinSet::new();
        for reference in references {
            let permit = Arc::clone(semaphore)
                .acquire_owned()
                .await
                .map_err(|_| CrawlError::SemaphoreClosed)?;
            let source = Arc::clone(source);
            tasks.spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                let result = source.evaluate(reference).await;
                (result, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            progress.inc(1);
            let (result, elapsed) = match joined {
                Ok(done) => done,
                Err(error) => {
                    warn!(engine, %error, "reference task panicked");
                    continue;
                }
            };
            work += elapsed;

            match result {
                Err(error) => {
                    info!(engine, depth = item.depth, %error, "reference skipped");
                }
                Ok(Evaluation::Dropped) => counts.pruned += 1,
                Ok(Evaluation::Target {
                    key,
                    node,
                    secondary_id,
                }) => {
                    debug!(
                        engine,
                        depth = item.depth,
                        %key,
                        elapsed_ms = elapsed.as_millis(),
                        title = node.title.as_deref().unwrap_or(""),
                        "reference evaluated"
                    );
                    let admission = self.settings.policy.admit(node.cited_by_count);
                    if admission == Admission::Prune {
                        counts.pruned += 1;
                        continue;
                    }
                    counts.kept += 1;
                    state.graph.upsert(key.clone(), node);
                    state.graph.add_edge(item.key.clone(), key.clone());
                    if admission == Admission::Expand
                        && state.enqueue(key, secondary_id, item.depth + 1)
                    {
                        counts.expanded += 1;
                    }
                }
            }
        }
        progress.finish_and_clear();

        let layer = LayerMetrics::new(engine, item.depth, counts, layer_start.elapsed(), work);
        info!(
            "[{} L{}] refs={} kept={} pruned={} expanded={} in {:.2}s (eff_parallelism≈{})",
            layer_label(engine),
            layer.depth,
            layer.total_refs,
            layer.kept,
            layer.pruned,
            layer.expanded,
            layer.seconds,
            layer
                .eff_parallelism
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}"))
        );
        self.ctx.metrics.record_layer(layer);
        Ok(())
    }
}

fn layer_label(engine: &str) -> &'static str {
    if engine == "s2" { "S2" } else { "OA" }
}

/// Per-layer progress bar; hidden unless enabled.
fn layer_progress(enabled: bool, engine: &str, depth: usize, total: usize) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_prefix(format!("{} L{depth} refs", layer_label(engine)));
    bar
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::MappingCache;
    use crate::catalog::SecondaryReference;
    use crate::test_support::fakes::{FakePrimary, FakeSecondary, secondary_ref, work_record};

    fn context(primary: FakePrimary, secondary: FakeSecondary) -> CrawlContext {
        let primary: Arc<dyn PrimaryCatalog> = Arc::new(primary);
        let secondary: Arc<dyn SecondaryCatalog> = Arc::new(secondary);
        let records = Arc::new(RecordCache::in_memory());
        let resolver = Arc::new(IdResolver::new(
            Arc::clone(&primary),
            Arc::clone(&secondary),
            Arc::clone(&records),
            Arc::new(MappingCache::in_memory()),
        ));
        CrawlContext {
            primary,
            secondary,
            records,
            resolver,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    fn settings(max_depth: usize, min_citations: u64, prune: bool) -> CrawlSettings {
        CrawlSettings {
            max_depth,
            delay: Duration::ZERO,
            policy: ThresholdPolicy {
                min_citations,
                strict: false,
                prune_below_threshold: prune,
            },
            ..CrawlSettings::default()
        }
    }

    /// Seed W0 citing W50 (50 citations), W2 (2) and WU (unknown).
    fn threshold_catalog() -> FakePrimary {
        FakePrimary::default()
            .with_work("W0", work_record("W0", Some(100), &["W50", "W2", "WU"]))
            .with_work("W50", work_record("W50", Some(50), &["W7"]))
            .with_work("W2", work_record("W2", Some(2), &[]))
            .with_work("WU", work_record("WU", None, &[]))
            .with_work("W7", work_record("W7", Some(70), &[]))
    }

    /// A small diamond-shaped citation graph with a cycle back to the seed.
    fn diamond_catalog() -> FakePrimary {
        FakePrimary::default()
            .with_work("W1", work_record("W1", Some(10), &["W2", "W3"]))
            .with_work("W2", work_record("W2", Some(10), &["W3", "W4"]))
            .with_work("W3", work_record("W3", Some(10), &["W4", "W1"]))
            .with_work("W4", work_record("W4", Some(10), &["W5"]))
            .with_work("W5", work_record("W5", Some(10), &[]))
    }

    fn keys(outcome: &CrawlOutcome) -> Vec<String> {
        let mut keys: Vec<String> = outcome.graph.nodes().map(|(k, _)| k.to_string()).collect();
        keys.sort();
        keys
    }

    // ==================== Threshold Scenario Tests ====================

    #[tokio::test]
    async fn test_threshold_keeps_failing_refs_as_leaves() {
        let ctx = context(threshold_catalog(), FakeSecondary::default());
        let engine = CrawlEngine::new(ctx, settings(1, 10, false));

        let outcome = engine.crawl_primary("W0").await.unwrap();

        assert_eq!(outcome.graph.node_count(), 4);
        assert_eq!(outcome.graph.edge_count(), 3);
        let next: Vec<_> = outcome.expanded.iter().filter(|(_, d)| *d == 1).collect();
        assert_eq!(next.len(), 2, "count-50 and unknown both pass when not strict");
        assert!(next.iter().any(|(k, _)| *k == NodeKey::primary("W50")));
        assert!(!next.iter().any(|(k, _)| *k == NodeKey::primary("W2")));
    }

    #[tokio::test]
    async fn test_threshold_prune_drops_failing_refs() {
        let mut s = settings(1, 10, true);
        s.policy.strict = true;
        let ctx = context(threshold_catalog(), FakeSecondary::default());
        let engine = CrawlEngine::new(ctx.clone(), s);

        let outcome = engine.crawl_primary("W0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0", "W50"]);
        assert_eq!(outcome.graph.edge_count(), 1);
        let layers = ctx.metrics.layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].kept, 1);
        assert_eq!(layers[0].pruned, 2);
        assert_eq!(layers[0].expanded, 1);
    }

    #[tokio::test]
    async fn test_threshold_prune_keeps_unknown_counts_when_not_strict() {
        let ctx = context(threshold_catalog(), FakeSecondary::default());
        let engine = CrawlEngine::new(ctx.clone(), settings(1, 10, true));

        let outcome = engine.crawl_primary("W0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0", "W50", "WU"]);
        assert_eq!(outcome.graph.edge_count(), 2);
        let layers = ctx.metrics.layers();
        assert_eq!(layers[0].kept, 2);
        assert_eq!(layers[0].pruned, 1);
        assert_eq!(layers[0].expanded, 2);
    }

    #[tokio::test]
    async fn test_strict_threshold_without_prune_expands_only_known_passing() {
        let mut s = settings(1, 10, false);
        s.policy.strict = true;
        let engine = CrawlEngine::new(context(threshold_catalog(), FakeSecondary::default()), s);

        let outcome = engine.crawl_primary("W0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0", "W2", "W50", "WU"]);
        assert_eq!(outcome.graph.edge_count(), 3);
        let next: Vec<&NodeKey> = outcome
            .expanded
            .iter()
            .filter(|(_, d)| *d == 1)
            .map(|(k, _)| k)
            .collect();
        assert_eq!(next, vec![&NodeKey::primary("W50")]);
    }

    #[tokio::test]
    async fn test_depth_zero_keeps_only_seed() {
        let engine = CrawlEngine::new(
            context(threshold_catalog(), FakeSecondary::default()),
            settings(0, 0, false),
        );
        let outcome = engine.crawl_primary("W0").await.unwrap();
        assert_eq!(keys(&outcome), vec!["W0"]);
        assert_eq!(outcome.graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_raising_threshold_never_grows_pruned_graph() {
        let mut previous = usize::MAX;
        for min_citations in [0, 5, 10, 60, 200] {
            let engine = CrawlEngine::new(
                context(threshold_catalog(), FakeSecondary::default()),
                settings(2, min_citations, true),
            );
            let count = engine.crawl_primary("W0").await.unwrap().graph.node_count();
            assert!(count <= previous, "min_citations={min_citations} grew the graph");
            previous = count;
        }
    }

    // ==================== Traversal Shape Tests ====================

    #[tokio::test]
    async fn test_expanded_set_independent_of_worker_count() {
        let mut results = Vec::new();
        for workers in [1, 2, 8] {
            let mut s = settings(3, 0, false);
            s.max_workers = workers;
            let engine = CrawlEngine::new(context(diamond_catalog(), FakeSecondary::default()), s);
            let outcome = engine.crawl_primary("W1").await.unwrap();

            let mut expanded: Vec<String> =
                outcome.expanded.iter().map(|(k, _)| k.to_string()).collect();
            let before = expanded.len();
            expanded.sort();
            expanded.dedup();
            assert_eq!(expanded.len(), before, "a key was enqueued twice");
            results.push(expanded);
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }

    #[tokio::test]
    async fn test_every_non_seed_node_has_an_incoming_edge() {
        let engine = CrawlEngine::new(
            context(diamond_catalog(), FakeSecondary::default()),
            settings(3, 0, false),
        );
        let outcome = engine.crawl_primary("W1").await.unwrap();

        for (key, _) in outcome.graph.nodes() {
            if *key == NodeKey::primary("W1") {
                continue;
            }
            assert!(
                outcome.graph.edges().iter().any(|e| &e.target == key),
                "{key} has no incoming edge"
            );
        }
        assert!(
            outcome
                .graph
                .edges()
                .iter()
                .any(|e| e.source == NodeKey::primary("W3") && e.target == NodeKey::primary("W1")),
            "cycle edge back to the seed is still recorded"
        );
    }

    #[tokio::test]
    async fn test_depths_are_non_decreasing() {
        let engine = CrawlEngine::new(
            context(diamond_catalog(), FakeSecondary::default()),
            settings(3, 0, false),
        );
        let outcome = engine.crawl_primary("W1").await.unwrap();
        let depths: Vec<usize> = outcome.expanded.iter().map(|(_, d)| *d).collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
        assert!(depths.iter().all(|d| *d <= 3));
    }

    // ==================== Failure Handling Tests ====================

    #[tokio::test]
    async fn test_failed_reference_is_neither_kept_nor_pruned() {
        let primary = FakePrimary::default()
            .with_work("W0", work_record("W0", Some(1), &["W1", "W9"]))
            .with_work("W1", work_record("W1", Some(1), &[]))
            .failing("W9");
        let ctx = context(primary, FakeSecondary::default());
        let engine = CrawlEngine::new(ctx.clone(), settings(1, 0, false));

        let outcome = engine.crawl_primary("W0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0", "W1"]);
        let layer = &ctx.metrics.layers()[0];
        assert_eq!(layer.total_refs, 2);
        assert_eq!(layer.kept, 1);
        assert_eq!(layer.pruned, 0);
    }

    #[tokio::test]
    async fn test_seed_fetch_failure_is_fatal() {
        let engine = CrawlEngine::new(
            context(FakePrimary::default(), FakeSecondary::default()),
            settings(1, 0, false),
        );
        assert!(matches!(
            engine.crawl_primary("W404").await,
            Err(CrawlError::SeedFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_reference_listing_failure_terminates_branch() {
        let primary = FakePrimary::default().with_work("W0", work_record("W0", Some(1), &[]));
        let secondary = FakeSecondary::default().failing("s0");
        let ctx = context(primary, secondary);
        let engine = CrawlEngine::new(ctx.clone(), settings(2, 0, false));

        let outcome = engine.crawl_secondary("W0", "s0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0"]);
        let layers = ctx.metrics.layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].engine, "s2");
        assert_eq!(layers[0].total_refs, 0);
    }

    // ==================== Secondary Strategy Tests ====================

    #[tokio::test]
    async fn test_secondary_crawl_builds_mixed_and_synthetic_nodes() {
        let primary = FakePrimary::default()
            .with_work("W0", work_record("W0", Some(1), &[]))
            .with_work("W5", work_record("W5", Some(20), &[]))
            .with_doi("10.1234/five", "W5");
        let mapped = SecondaryReference {
            paper_id: Some("p5".into()),
            doi: Some("10.1234/five".into()),
            ..SecondaryReference::default()
        };
        let secondary = FakeSecondary::default()
            .with_references("s0", vec![mapped, secondary_ref("p7", "Nucl. Phys. B")])
            .with_references("p5", vec![secondary_ref("p8", "Ann. Phys.")]);

        let mut s = settings(2, 0, false);
        s.keep_unmapped = true;
        let engine = CrawlEngine::new(context(primary, secondary), s);
        let outcome = engine.crawl_secondary("W0", "s0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["S2:p7", "S2:p8", "W0", "W5"]);
        let seed = outcome.graph.node(&NodeKey::primary("W0")).unwrap();
        assert_eq!(seed.provenance, Provenance::Mixed);
        assert_eq!(seed.secondary_id.as_deref(), Some("s0"));

        let w5 = outcome.graph.node(&NodeKey::primary("W5")).unwrap();
        assert_eq!(w5.provenance, Provenance::Mixed);
        assert_eq!(w5.secondary_id.as_deref(), Some("p5"));

        let synthetic = outcome.graph.node(&NodeKey::paper_id("p7")).unwrap();
        assert_eq!(synthetic.provenance, Provenance::Secondary);
        assert_eq!(synthetic.primary_id, None);
    }

    #[tokio::test]
    async fn test_secondary_crawl_drops_unkeyable_unmapped_reference() {
        let primary = FakePrimary::default().with_work("W0", work_record("W0", Some(1), &[]));
        let nameless = SecondaryReference {
            title: Some("Phys. Rev. Lett.".into()),
            ..SecondaryReference::default()
        };
        let secondary = FakeSecondary::default().with_references("s0", vec![nameless]);

        let mut s = settings(1, 0, false);
        s.keep_unmapped = true;
        let ctx = context(primary, secondary);
        let engine = CrawlEngine::new(ctx.clone(), s);
        let outcome = engine.crawl_secondary("W0", "s0").await.unwrap();

        assert_eq!(keys(&outcome), vec!["W0"]);
        assert_eq!(ctx.metrics.layers()[0].pruned, 1);
    }
}
