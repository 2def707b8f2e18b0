//! CLI entry point for the citation-graph crawler.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use refcrawl_core::config::load_file_config;
use refcrawl_core::{CrawlConfig, app};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

/// Exit status for configuration errors.
const EXIT_CONFIG: u8 = 2;
/// Exit status for resolution, crawl or export failures.
const EXIT_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    info!(
        seed = %args.seed,
        depth = config.depth,
        source = config.source.as_str(),
        min_citations = config.min_citations,
        "refcrawl starting"
    );

    match app::run(&config, &args.seed).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Defaults, then the config file, then explicit flags.
fn build_config(args: &Args) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::default();
    if let Some((path, file)) = load_file_config(args.config.as_deref())? {
        debug!(path = %path.display(), "config file loaded");
        config.apply_file(&file);
    }
    args.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}
