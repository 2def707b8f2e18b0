//! Where a frontier node's outgoing references come from.
//!
//! Both crawl strategies plug into the same traversal through
//! [`ReferenceSource`]: [`PrimaryReferences`] reads `referenced_works` off the
//! cached primary record, [`SecondaryReferences`] lists references in the
//! secondary catalog and maps each one back to a primary work.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::RecordCache;
use crate::catalog::{PrimaryCatalog, PrimaryWork, SecondaryCatalog, SecondaryReference};
use crate::fetch::FetchError;
use crate::resolver::IdResolver;
use crate::resolver::patterns::is_low_information_title;

use super::graph::{NodeKey, Provenance, WorkNode};

/// A queued node awaiting expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub key: NodeKey,
    /// Secondary ID tracked alongside the node, used by secondary expansion.
    pub secondary_id: Option<String>,
    pub depth: usize,
}

/// Result of evaluating one discovered reference.
#[derive(Debug, Clone)]
pub enum Evaluation {
    /// A node to run through the threshold policy.
    Target {
        key: NodeKey,
        node: WorkNode,
        /// Secondary ID to carry into the next frontier item.
        secondary_id: Option<String>,
    },
    /// Unmapped and not retained; counted as pruned.
    Dropped,
}

/// One crawl strategy: how references are listed and turned into targets.
#[async_trait]
pub trait ReferenceSource: Send + Sync + 'static {
    type Reference: Send + 'static;

    /// Engine label used in metrics and logs (`openalex` or `s2`).
    fn engine(&self) -> &'static str;

    /// Lists the outgoing references of a frontier node.
    async fn references(&self, item: &FrontierItem) -> Result<Vec<Self::Reference>, FetchError>;

    /// Fetches or maps one reference into a graph target.
    async fn evaluate(&self, reference: Self::Reference) -> Result<Evaluation, FetchError>;
}

fn parse_record(id: &str, record: &serde_json::Value) -> Result<PrimaryWork, FetchError> {
    PrimaryWork::from_record(record).map_err(|e| FetchError::decode(format!("record:{id}"), e))
}

// ==================== Primary-only expansion ====================

/// References read directly off cached primary records.
pub struct PrimaryReferences {
    primary: Arc<dyn PrimaryCatalog>,
    records: Arc<RecordCache>,
}

impl PrimaryReferences {
    #[must_use]
    pub fn new(primary: Arc<dyn PrimaryCatalog>, records: Arc<RecordCache>) -> Self {
        Self { primary, records }
    }
}

#[async_trait]
impl ReferenceSource for PrimaryReferences {
    type Reference = String;

    fn engine(&self) -> &'static str {
        "openalex"
    }

    async fn references(&self, item: &FrontierItem) -> Result<Vec<String>, FetchError> {
        let Some(id) = item.key.as_primary() else {
            return Ok(Vec::new());
        };
        let record = self.records.get_or_fetch(id, self.primary.as_ref()).await?;
        Ok(parse_record(id, &record)?.referenced_works)
    }

    async fn evaluate(&self, id: String) -> Result<Evaluation, FetchError> {
        let record = self.records.get_or_fetch(&id, self.primary.as_ref()).await?;
        let work = parse_record(&id, &record)?;
        Ok(Evaluation::Target {
            node: WorkNode::from_primary(&work, Provenance::Primary, None),
            key: NodeKey::Primary(id),
            secondary_id: None,
        })
    }
}

// ==================== Secondary-mediated expansion ====================

/// References listed by the secondary catalog and mapped to primary works.
pub struct SecondaryReferences {
    primary: Arc<dyn PrimaryCatalog>,
    secondary: Arc<dyn SecondaryCatalog>,
    records: Arc<RecordCache>,
    resolver: Arc<IdResolver>,
    keep_unmapped: bool,
    strict: bool,
}

impl SecondaryReferences {
    #[must_use]
    pub fn new(
        primary: Arc<dyn PrimaryCatalog>,
        secondary: Arc<dyn SecondaryCatalog>,
        records: Arc<RecordCache>,
        resolver: Arc<IdResolver>,
    ) -> Self {
        Self {
            primary,
            secondary,
            records,
            resolver,
            keep_unmapped: false,
            strict: false,
        }
    }

    /// Keeps unmapped references as synthetic nodes (ignored when strict).
    #[must_use]
    pub fn keep_unmapped(mut self, keep: bool) -> Self {
        self.keep_unmapped = keep;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn unmapped(&self, reference: &SecondaryReference) -> Evaluation {
        if self.strict || !self.keep_unmapped {
            return Evaluation::Dropped;
        }
        let key = if let Some(paper_id) = &reference.paper_id {
            NodeKey::paper_id(paper_id.clone())
        } else if let Some(title) = reference
            .title
            .as_deref()
            .filter(|t| !is_low_information_title(Some(t)))
        {
            NodeKey::title(title)
        } else {
            return Evaluation::Dropped;
        };
        Evaluation::Target {
            node: WorkNode::synthetic(reference),
            secondary_id: reference.paper_id.clone(),
            key,
        }
    }
}

#[async_trait]
impl ReferenceSource for SecondaryReferences {
    type Reference = SecondaryReference;

    fn engine(&self) -> &'static str {
        "s2"
    }

    async fn references(
        &self,
        item: &FrontierItem,
    ) -> Result<Vec<SecondaryReference>, FetchError> {
        match item.secondary_id.as_deref() {
            Some(paper_id) => self.secondary.fetch_references(paper_id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn evaluate(&self, reference: SecondaryReference) -> Result<Evaluation, FetchError> {
        let Some(primary_id) = self.resolver.map_secondary_to_primary(&reference).await? else {
            debug!(paper_id = ?reference.paper_id, title = ?reference.title, "reference unmapped");
            return Ok(self.unmapped(&reference));
        };

        let fetched = self
            .records
            .get_or_fetch(&primary_id, self.primary.as_ref())
            .await
            .and_then(|record| parse_record(&primary_id, &record));
        match fetched {
            Ok(work) => Ok(Evaluation::Target {
                node: WorkNode::from_primary(&work, Provenance::Mixed, reference.paper_id.clone()),
                key: NodeKey::Primary(primary_id),
                secondary_id: reference.paper_id,
            }),
            Err(error) => {
                info!(%primary_id, %error, "mapped primary record unavailable; treating as unmapped");
                Ok(self.unmapped(&reference))
            }
        }
    }
}
