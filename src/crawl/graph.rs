//! Citation graph model: node keys, work nodes and edges.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::catalog::{PrimaryWork, SecondaryReference};

/// Characters of a title kept in an `S2-TITLE:` key.
pub const TITLE_KEY_CHARS: usize = 80;

/// Key of a node with no primary-catalog identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntheticKey {
    /// Keyed by the secondary paper ID.
    PaperId(String),
    /// Keyed by title when the reference has no secondary ID.
    Title(String),
}

/// Unique, stable identity of a graph node.
///
/// Primary IDs and synthetic keys live in separate variants, so a title that
/// happens to look like a work ID can never collide with a real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Primary(String),
    Synthetic(SyntheticKey),
}

impl NodeKey {
    #[must_use]
    pub fn primary(id: impl Into<String>) -> Self {
        Self::Primary(id.into())
    }

    #[must_use]
    pub fn paper_id(id: impl Into<String>) -> Self {
        Self::Synthetic(SyntheticKey::PaperId(id.into()))
    }

    /// Keys a synthetic node by the first [`TITLE_KEY_CHARS`] characters of its
    /// trimmed title.
    #[must_use]
    pub fn title(title: &str) -> Self {
        let prefix = title.trim().chars().take(TITLE_KEY_CHARS).collect();
        Self::Synthetic(SyntheticKey::Title(prefix))
    }

    /// The primary work ID, for primary keys.
    #[must_use]
    pub fn as_primary(&self) -> Option<&str> {
        match self {
            Self::Primary(id) => Some(id),
            Self::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(id) => write!(f, "{id}"),
            Self::Synthetic(SyntheticKey::PaperId(id)) => write!(f, "S2:{id}"),
            Self::Synthetic(SyntheticKey::Title(title)) => write!(f, "S2-TITLE:{title}"),
        }
    }
}

impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which catalog(s) a node's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    #[serde(rename = "openalex")]
    Primary,
    #[serde(rename = "s2")]
    Secondary,
    #[serde(rename = "mixed")]
    Mixed,
}

impl Provenance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "openalex",
            Self::Secondary => "s2",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered scholarly work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkNode {
    #[serde(rename = "openalex_id")]
    pub primary_id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(rename = "host_venue")]
    pub venue: Option<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    /// Author display names joined with `", "`.
    pub authors: Option<String>,
    /// `None` means the catalog did not report a count.
    pub cited_by_count: Option<u64>,
    pub is_retracted: Option<bool>,
    #[serde(rename = "source")]
    pub provenance: Provenance,
    #[serde(rename = "s2_paper_id")]
    pub secondary_id: Option<String>,
}

impl WorkNode {
    /// Builds a node from a parsed primary record.
    #[must_use]
    pub fn from_primary(
        work: &PrimaryWork,
        provenance: Provenance,
        secondary_id: Option<String>,
    ) -> Self {
        let authors = if work.authors.is_empty() {
            None
        } else {
            Some(work.authors.join(", "))
        };
        Self {
            primary_id: work.id.clone(),
            doi: work.doi.clone(),
            title: work.title.clone(),
            publication_year: work.publication_year,
            venue: work.venue.clone(),
            work_type: work.work_type.clone(),
            authors,
            cited_by_count: work.cited_by_count,
            is_retracted: work.is_retracted,
            provenance,
            secondary_id,
        }
    }

    /// Builds a secondary-only node carrying just title and year.
    #[must_use]
    pub fn synthetic(reference: &SecondaryReference) -> Self {
        Self {
            primary_id: None,
            doi: None,
            title: reference.title.clone(),
            publication_year: reference.year,
            venue: None,
            work_type: None,
            authors: None,
            cited_by_count: None,
            is_retracted: None,
            provenance: Provenance::Secondary,
            secondary_id: reference.paper_id.clone(),
        }
    }
}

/// "`source` cites `target`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: NodeKey,
    pub target: NodeKey,
}

/// Nodes keyed by [`NodeKey`] plus the edge list, in discovery order.
///
/// Duplicate edges are kept; deduplication is left to consumers.
#[derive(Debug, Clone, Default)]
pub struct CrawlGraph {
    nodes: HashMap<NodeKey, WorkNode>,
    edges: Vec<Edge>,
}

impl CrawlGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` unless `key` is already present. Returns true on insert.
    pub fn upsert(&mut self, key: NodeKey, node: WorkNode) -> bool {
        match self.nodes.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
        }
    }

    pub fn add_edge(&mut self, source: NodeKey, target: NodeKey) {
        self.edges.push(Edge { source, target });
    }

    #[must_use]
    pub fn node(&self, key: &NodeKey) -> Option<&WorkNode> {
        self.nodes.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, &WorkNode)> {
        self.nodes.iter()
    }

    /// Nodes sorted by rendered key (`S2:…` before `W…`), for stable output.
    #[must_use]
    pub fn sorted_nodes(&self) -> Vec<(&NodeKey, &WorkNode)> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by_cached_key(|(key, _)| key.to_string());
        nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
