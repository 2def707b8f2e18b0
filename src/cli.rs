//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use clap::builder::{OsStringValueParser, TypedValueParser};

use refcrawl_core::{CrawlConfig, SourceSelection};

/// Build a citation graph by crawling the references of a seed work.
///
/// The seed may be an OpenAlex work ID or URL, a DOI, a Semantic Scholar
/// paper ID or URL, or a free-text title. Results are written as node/edge
/// CSV tables and a graph JSON document.
///
/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "refcrawl")]
#[command(author, version, about)]
pub struct Args {
    /// Seed reference: W-ID, openalex.org URL, DOI, S2 paper ID/URL, or title
    pub seed: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/refcrawl/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum crawl depth (0-10)
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub depth: Option<u8>,

    /// Pause between frontier items in seconds
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Record cache file ("" disables persistence)
    #[arg(long, value_name = "PATH", value_parser = OsStringValueParser::new().map(PathBuf::from))]
    pub cache: Option<PathBuf>,

    /// Identifier-mapping cache file ("" disables persistence)
    #[arg(long, value_name = "PATH", value_parser = OsStringValueParser::new().map(PathBuf::from))]
    pub map_cache: Option<PathBuf>,

    /// Reference source: auto, openalex, or s2
    #[arg(short = 's', long, value_enum)]
    pub source: Option<SourceSelection>,

    /// Keep unmapped secondary references as synthetic S2:* nodes
    #[arg(long)]
    pub keep_unmapped: bool,

    /// Worker tasks per layer (1-64)
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub max_workers: Option<u8>,

    /// Minimum citation count to keep/expand a reference
    #[arg(short = 'm', long, value_name = "N")]
    pub min_citations: Option<u64>,

    /// Drop references below the threshold instead of keeping them as leaves
    #[arg(long)]
    pub prune_below_threshold: bool,

    /// Treat unknown citation counts as failing the threshold
    #[arg(long)]
    pub strict_threshold: bool,

    /// OpenAlex requests per second (floor 0.1)
    #[arg(long)]
    pub qps: Option<f64>,

    /// Contact email for the OpenAlex polite pool
    #[arg(long, env = "OPENALEX_EMAIL")]
    pub email: Option<String>,

    /// Output prefix for <prefix>_nodes.csv and <prefix>_edges.csv
    #[arg(short = 'o', long, value_name = "PREFIX")]
    pub outprefix: Option<String>,

    /// Graph JSON output path
    #[arg(long, value_name = "PATH")]
    pub graph_json: Option<PathBuf>,

    /// Write the metrics summary as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub metrics_out: Option<PathBuf>,

    /// Show per-layer progress bars
    #[arg(long)]
    pub progress: bool,
}

impl Args {
    /// Overlays explicitly given flags onto `config`.
    pub fn apply_to(&self, config: &mut CrawlConfig) {
        if let Some(depth) = self.depth {
            config.depth = usize::from(depth);
        }
        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(cache) = &self.cache {
            config.cache_path.clone_from(cache);
        }
        if let Some(map_cache) = &self.map_cache {
            config.map_cache_path.clone_from(map_cache);
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = usize::from(max_workers);
        }
        if let Some(min_citations) = self.min_citations {
            config.min_citations = min_citations;
        }
        if let Some(qps) = self.qps {
            config.qps = qps;
        }
        if self.email.is_some() {
            config.email.clone_from(&self.email);
        }
        if let Some(outprefix) = &self.outprefix {
            config.output_prefix.clone_from(outprefix);
        }
        if let Some(graph_json) = &self.graph_json {
            config.graph_json.clone_from(graph_json);
        }
        if self.metrics_out.is_some() {
            config.metrics_out.clone_from(&self.metrics_out);
        }
        config.keep_unmapped |= self.keep_unmapped;
        config.prune_below_threshold |= self.prune_below_threshold;
        config.strict_threshold |= self.strict_threshold;
        config.progress |= self.progress;
    }
}
