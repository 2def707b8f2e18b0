//! Runtime configuration: built-in defaults, an optional TOML file, then CLI flags.
//!
//! [`CrawlConfig`] holds every tunable. A [`FileConfig`] read from
//! `$XDG_CONFIG_HOME/refcrawl/config.toml` (or `~/.config/refcrawl/config.toml`,
//! or an explicit `--config` path) overrides the defaults, and explicit CLI
//! flags override the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::catalog::{DEFAULT_OPENALEX_BASE_URL, DEFAULT_SEMANTIC_SCHOLAR_BASE_URL};
use crate::crawl::{CrawlSettings, DEFAULT_MAX_DEPTH, DEFAULT_MAX_WORKERS, ThresholdPolicy};
use crate::fetch::{
    DEFAULT_PRIMARY_ATTEMPTS, DEFAULT_QPS, DEFAULT_SECONDARY_ATTEMPTS, FetcherSettings,
    HttpTimeouts, RetryPolicy,
};

/// Environment variable holding the contact email sent as `mailto`.
pub const EMAIL_ENV_VAR: &str = "OPENALEX_EMAIL";

const DEFAULT_DELAY_SECS: f64 = 0.2;
const DEFAULT_RECORD_CACHE: &str = ".openalex_cache.json";
const DEFAULT_MAPPING_CACHE: &str = ".map_cache.json";
const DEFAULT_OUTPUT_PREFIX: &str = "sources";
const DEFAULT_GRAPH_JSON: &str = "graph.json";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Which reference source drives the crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelection {
    /// Secondary when the seed lists few primary references.
    #[default]
    Auto,
    /// Primary catalog only.
    #[value(name = "openalex")]
    #[serde(rename = "openalex")]
    Primary,
    /// Secondary-mediated expansion.
    #[value(name = "s2")]
    #[serde(rename = "s2")]
    Secondary,
}

impl SourceSelection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Primary => "openalex",
            Self::Secondary => "s2",
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    pub depth: usize,
    /// Pause after each dequeued frontier item, in seconds.
    pub delay_secs: f64,
    /// Record cache file; an empty path disables persistence.
    pub cache_path: PathBuf,
    /// Mapping cache file; an empty path disables persistence.
    pub map_cache_path: PathBuf,
    pub source: SourceSelection,
    pub keep_unmapped: bool,
    pub max_workers: usize,
    pub min_citations: u64,
    pub prune_below_threshold: bool,
    pub strict_threshold: bool,
    /// Primary-catalog requests per second.
    pub qps: f64,
    pub email: Option<String>,
    /// Prefix for `<prefix>_nodes.csv` and `<prefix>_edges.csv`.
    pub output_prefix: String,
    pub graph_json: PathBuf,
    pub metrics_out: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub primary_attempts: u32,
    pub secondary_attempts: u32,
    pub progress: bool,
    pub openalex_base_url: String,
    pub semantic_scholar_base_url: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_MAX_DEPTH,
            delay_secs: DEFAULT_DELAY_SECS,
            cache_path: PathBuf::from(DEFAULT_RECORD_CACHE),
            map_cache_path: PathBuf::from(DEFAULT_MAPPING_CACHE),
            source: SourceSelection::Auto,
            keep_unmapped: false,
            max_workers: DEFAULT_MAX_WORKERS,
            min_citations: 0,
            prune_below_threshold: false,
            strict_threshold: false,
            qps: DEFAULT_QPS,
            email: env_var_non_empty(EMAIL_ENV_VAR),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            graph_json: PathBuf::from(DEFAULT_GRAPH_JSON),
            metrics_out: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            primary_attempts: DEFAULT_PRIMARY_ATTEMPTS,
            secondary_attempts: DEFAULT_SECONDARY_ATTEMPTS,
            progress: false,
            openalex_base_url: DEFAULT_OPENALEX_BASE_URL.to_string(),
            semantic_scholar_base_url: DEFAULT_SEMANTIC_SCHOLAR_BASE_URL.to_string(),
        }
    }
}

impl CrawlConfig {
    /// Overlays every value present in `file`.
    pub fn apply_file(&mut self, file: &FileConfig) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &file.$field {
                    self.$field.clone_from(value);
                })*
            };
        }
        overlay!(
            depth,
            delay_secs,
            cache_path,
            map_cache_path,
            source,
            keep_unmapped,
            max_workers,
            min_citations,
            prune_below_threshold,
            strict_threshold,
            qps,
            output_prefix,
            graph_json,
            connect_timeout_secs,
            read_timeout_secs,
            primary_attempts,
            secondary_attempts,
            progress,
            openalex_base_url,
            semantic_scholar_base_url,
        );
        if file.email.is_some() {
            self.email.clone_from(&file.email);
        }
        if file.metrics_out.is_some() {
            self.metrics_out.clone_from(&file.metrics_out);
        }
    }

    /// Rejects out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field and its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.depth > 10 {
            bail!("Invalid config value for `depth`: {}. Expected range: 0..=10", self.depth);
        }
        if !(1..=64).contains(&self.max_workers) {
            bail!(
                "Invalid config value for `max_workers`: {}. Expected range: 1..=64",
                self.max_workers
            );
        }
        if !self.delay_secs.is_finite() || !(0.0..=60.0).contains(&self.delay_secs) {
            bail!(
                "Invalid config value for `delay_secs`: {}. Expected range: 0..=60",
                self.delay_secs
            );
        }
        if !self.qps.is_finite() || !(0.1..=100.0).contains(&self.qps) {
            bail!("Invalid config value for `qps`: {}. Expected range: 0.1..=100", self.qps);
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_attempts("primary_attempts", self.primary_attempts)?;
        validate_attempts("secondary_attempts", self.secondary_attempts)?;
        if self.output_prefix.trim().is_empty() {
            bail!("Invalid config value for `output_prefix`: must not be empty");
        }
        Ok(())
    }

    /// Traversal settings derived from this config.
    #[must_use]
    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            max_depth: self.depth,
            max_workers: self.max_workers,
            delay: Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO),
            policy: ThresholdPolicy {
                min_citations: self.min_citations,
                strict: self.strict_threshold,
                prune_below_threshold: self.prune_below_threshold,
            },
            keep_unmapped: self.keep_unmapped,
            progress: self.progress,
        }
    }

    /// HTTP client settings derived from this config.
    #[must_use]
    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            timeouts: HttpTimeouts {
                connect: Duration::from_secs(self.connect_timeout_secs),
                read: Duration::from_secs(self.read_timeout_secs),
            },
            primary_retry: RetryPolicy::with_max_attempts(self.primary_attempts),
            secondary_retry: RetryPolicy::with_max_attempts(self.secondary_attempts),
        }
    }

    #[must_use]
    pub fn nodes_csv_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_nodes.csv", self.output_prefix))
    }

    #[must_use]
    pub fn edges_csv_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_edges.csv", self.output_prefix))
    }
}

fn validate_timeout_secs(field: &str, value: u64) -> Result<()> {
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_attempts(field: &str, value: u32) -> Result<()> {
    if !(1..=10).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=10");
    }
    Ok(())
}

/// TOML-backed overrides; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub depth: Option<usize>,
    pub delay_secs: Option<f64>,
    pub cache_path: Option<PathBuf>,
    pub map_cache_path: Option<PathBuf>,
    pub source: Option<SourceSelection>,
    pub keep_unmapped: Option<bool>,
    pub max_workers: Option<usize>,
    pub min_citations: Option<u64>,
    pub prune_below_threshold: Option<bool>,
    pub strict_threshold: Option<bool>,
    pub qps: Option<f64>,
    pub email: Option<String>,
    pub output_prefix: Option<String>,
    pub graph_json: Option<PathBuf>,
    pub metrics_out: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub primary_attempts: Option<u32>,
    pub secondary_attempts: Option<u32>,
    pub progress: Option<bool>,
    pub openalex_base_url: Option<String>,
    pub semantic_scholar_base_url: Option<String>,
}

impl FileConfig {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid config TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parses config TOML.
    ///
    /// # Errors
    ///
    /// Fails on syntax errors, unknown keys or wrongly typed values.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/refcrawl/config.toml`
/// 2. `$HOME/.config/refcrawl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("refcrawl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("refcrawl")
            .join("config.toml"),
    )
}

/// Loads the explicit config file, or the default one when it exists.
///
/// # Errors
///
/// Fails when an explicit path is missing, or any chosen file is unreadable
/// or invalid.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<(PathBuf, FileConfig)>> {
    if let Some(path) = explicit {
        return Ok(Some((path.to_path_buf(), FileConfig::load(path)?)));
    }
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let config = FileConfig::load(&path)?;
    Ok(Some((path, config)))
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn env_var_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
