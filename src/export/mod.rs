//! Writers for the finished graph: node/edge CSV tables, a graph JSON document
//! and the metrics summary.
//!
//! Nodes are written sorted by key so repeated runs over the same graph
//! produce identical tables; edges keep discovery order and duplicates.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::crawl::{CrawlGraph, Edge, NodeKey, WorkNode};
use crate::metrics::MetricsSummary;

/// Column order of the nodes table.
pub const NODE_COLUMNS: [&str; 12] = [
    "key",
    "openalex_id",
    "doi",
    "title",
    "publication_year",
    "host_venue",
    "type",
    "authors",
    "cited_by_count",
    "is_retracted",
    "source",
    "s2_paper_id",
];

/// Column order of the edges table.
pub const EDGE_COLUMNS: [&str; 2] = ["source_key", "target_key"];

/// Errors raised while writing output files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn node_row(key: &NodeKey, node: &WorkNode) -> [String; 12] {
    [
        key.to_string(),
        opt(node.primary_id.as_deref()),
        opt(node.doi.as_deref()),
        opt(node.title.as_deref()),
        opt(node.publication_year),
        opt(node.venue.as_deref()),
        opt(node.work_type.as_deref()),
        opt(node.authors.as_deref()),
        opt(node.cited_by_count),
        opt(node.is_retracted),
        node.provenance.to_string(),
        opt(node.secondary_id.as_deref()),
    ]
}

/// Writes the nodes table, one row per node, sorted by key.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be created or written.
pub fn write_nodes_csv(graph: &CrawlGraph, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| ExportError::csv(path, e))?;
    writer
        .write_record(NODE_COLUMNS)
        .map_err(|e| ExportError::csv(path, e))?;
    for (key, node) in graph.sorted_nodes() {
        writer
            .write_record(node_row(key, node))
            .map_err(|e| ExportError::csv(path, e))?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

/// Writes the edges table in discovery order, duplicates included.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be created or written.
pub fn write_edges_csv(graph: &CrawlGraph, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| ExportError::csv(path, e))?;
    writer
        .write_record(EDGE_COLUMNS)
        .map_err(|e| ExportError::csv(path, e))?;
    for edge in graph.edges() {
        writer
            .write_record([edge.source.to_string(), edge.target.to_string()])
            .map_err(|e| ExportError::csv(path, e))?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

#[derive(Serialize)]
struct GraphNode<'a> {
    key: &'a NodeKey,
    #[serde(flatten)]
    node: &'a WorkNode,
}

#[derive(Serialize)]
struct GraphDocument<'a> {
    nodes: Vec<GraphNode<'a>>,
    edges: &'a [Edge],
}

/// Writes `{"nodes": [...], "edges": [...]}`.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be created or written.
pub fn write_graph_json(graph: &CrawlGraph, path: &Path) -> Result<(), ExportError> {
    let document = GraphDocument {
        nodes: graph
            .sorted_nodes()
            .into_iter()
            .map(|(key, node)| GraphNode { key, node })
            .collect(),
        edges: graph.edges(),
    };
    write_json(&document, path)
}

/// Writes the metrics summary as pretty JSON.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be created or written.
pub fn write_metrics_json(summary: &MetricsSummary, path: &Path) -> Result<(), ExportError> {
    write_json(summary, path)
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| ExportError::json(path, e))?;
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

/// Output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub nodes_csv: PathBuf,
    pub edges_csv: PathBuf,
    pub graph_json: PathBuf,
}

/// Writes both CSV tables and the graph JSON.
///
/// # Errors
///
/// Returns the first [`ExportError`] encountered.
pub fn write_all(graph: &CrawlGraph, paths: &ExportPaths) -> Result<(), ExportError> {
    write_nodes_csv(graph, &paths.nodes_csv)?;
    write_edges_csv(graph, &paths.edges_csv)?;
    write_graph_json(graph, &paths.graph_json)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        nodes_csv = %paths.nodes_csv.display(),
        edges_csv = %paths.edges_csv.display(),
        graph_json = %paths.graph_json.display(),
        "graph exported"
    );
    Ok(())
}
