//! Typed clients for the two bibliographic catalogs.
//!
//! The crawl engine and resolver talk to the catalogs only through the
//! [`PrimaryCatalog`] and [`SecondaryCatalog`] traits, so tests can swap in
//! in-memory fakes while production uses [`OpenAlexClient`] and
//! [`SemanticScholarClient`] over the shared [`JsonFetcher`](crate::fetch::JsonFetcher).

mod openalex;
mod semantic_scholar;

use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::FetchError;

pub use openalex::{DEFAULT_OPENALEX_BASE_URL, OpenAlexClient};
pub use semantic_scholar::{DEFAULT_SEMANTIC_SCHOLAR_BASE_URL, SemanticScholarClient};

/// Metadata extracted from a primary-catalog work record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryWork {
    /// Short work ID (`W…`), when the record carried one.
    pub id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub venue: Option<String>,
    pub work_type: Option<String>,
    pub authors: Vec<String>,
    /// `None` means the catalog did not report a count.
    pub cited_by_count: Option<u64>,
    pub is_retracted: Option<bool>,
    /// Short IDs of outgoing references, restricted to work IDs.
    pub referenced_works: Vec<String>,
    /// Search relevance, only present on search results.
    pub relevance_score: Option<f64>,
}

impl PrimaryWork {
    /// Parses a raw primary-catalog record.
    ///
    /// # Errors
    ///
    /// Returns the serde error when `record` is not a work object.
    pub fn from_record(record: &Value) -> Result<Self, serde_json::Error> {
        openalex::parse_work(record)
    }
}

/// One outgoing reference as listed by the secondary catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryReference {
    /// Secondary paper ID, or the corpus ID when no paper ID was given.
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    /// Normalized DOI.
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub authors: Vec<String>,
}

/// A secondary-catalog search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryPaper {
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub citation_count: Option<u64>,
}

/// Canonical bibliographic catalog (OpenAlex).
#[async_trait]
pub trait PrimaryCatalog: Send + Sync {
    /// Fetches the full raw record for a short work ID.
    async fn fetch_work(&self, id: &str) -> Result<Value, FetchError>;

    /// Exact DOI filter lookup; first match only.
    async fn find_by_doi(&self, doi: &str) -> Result<Option<PrimaryWork>, FetchError>;

    /// Free-text search, in catalog order.
    async fn search_works(
        &self,
        query: &str,
        per_page: u32,
        sort: Option<&str>,
    ) -> Result<Vec<PrimaryWork>, FetchError>;
}

/// Supplementary catalog with its own ID space (Semantic Scholar).
#[async_trait]
pub trait SecondaryCatalog: Send + Sync {
    /// Lists the outgoing references of a secondary paper.
    async fn fetch_references(&self, paper_id: &str)
    -> Result<Vec<SecondaryReference>, FetchError>;

    /// Free-text paper search, in catalog order.
    async fn search_papers(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SecondaryPaper>, FetchError>;

    /// Looks up a secondary paper ID by DOI; `None` when unknown.
    async fn paper_id_by_doi(&self, doi: &str) -> Result<Option<String>, FetchError>;
}
