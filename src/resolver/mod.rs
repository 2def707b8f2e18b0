//! Identifier resolution between free-form references and the two catalogs.
//!
//! [`IdResolver`] turns a user-supplied reference (DOI, catalog ID or URL,
//! free-text title) into a primary work ID, finds the matching secondary
//! paper for secondary-mediated crawls, and maps secondary references back to
//! primary IDs through a tiered, cached fallback chain:
//!
//! 1. DOI, by exact filter lookup
//! 2. Preprint ID, by text search
//! 3. Secondary paper ID, from the cache only
//! 4. Title, by text search, skipped for low-information titles

mod error;
pub mod patterns;

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::cache::{MappingCache, MappingKey, MappingLookup, RecordCache};
use crate::catalog::{PrimaryCatalog, PrimaryWork, SecondaryCatalog, SecondaryReference};
use crate::fetch::FetchError;

pub use error::ResolveError;
use patterns::{
    extract_primary_id, extract_secondary_id, is_doi, is_low_information_title, normalize_doi,
};

/// Results requested when resolving a free-text seed.
const SEED_SEARCH_RESULTS: u32 = 5;
const SEED_SEARCH_SORT: &str = "relevance_score:desc";

/// Results requested for preprint-ID and title mapping searches.
const MAPPING_SEARCH_RESULTS: u32 = 3;

/// Outcome of one tier of the mapping chain.
enum TierOutcome {
    Resolved(String),
    Nothing,
    Failed(FetchError),
}

/// Resolves references to primary work IDs, consulting the mapping cache first.
pub struct IdResolver {
    primary: Arc<dyn PrimaryCatalog>,
    secondary: Arc<dyn SecondaryCatalog>,
    records: Arc<RecordCache>,
    mapping: Arc<MappingCache>,
}

impl IdResolver {
    #[must_use]
    pub fn new(
        primary: Arc<dyn PrimaryCatalog>,
        secondary: Arc<dyn SecondaryCatalog>,
        records: Arc<RecordCache>,
        mapping: Arc<MappingCache>,
    ) -> Self {
        Self {
            primary,
            secondary,
            records,
            mapping,
        }
    }

    /// Resolves a seed reference to a primary work ID.
    ///
    /// Tries, in order: a primary ID or catalog URL, an exact DOI lookup, and
    /// a relevance-sorted text search re-ranked by (relevance, citations).
    ///
    /// # Errors
    ///
    /// [`ResolveError::SeedNotFound`] when nothing matches;
    /// [`ResolveError::Catalog`] when a lookup request fails.
    #[instrument(skip(self))]
    pub async fn resolve_seed(&self, reference: &str) -> Result<String, ResolveError> {
        if let Some(id) = extract_primary_id(reference) {
            debug!(%id, "seed is a primary ID");
            return Ok(id);
        }

        if let Some(doi) = doi_in(reference) {
            let found = self
                .primary
                .find_by_doi(&doi)
                .await
                .map_err(|e| ResolveError::catalog(reference, e))?;
            return found
                .and_then(|work| work.id)
                .ok_or_else(|| ResolveError::seed_not_found(reference));
        }

        let mut works = self
            .primary
            .search_works(reference.trim(), SEED_SEARCH_RESULTS, Some(SEED_SEARCH_SORT))
            .await
            .map_err(|e| ResolveError::catalog(reference, e))?;
        works.sort_by(compare_seed_candidates);
        works
            .into_iter()
            .find_map(|work| work.id)
            .ok_or_else(|| ResolveError::seed_not_found(reference))
    }

    /// Finds the secondary paper ID matching a seed reference.
    ///
    /// Best effort: every failure is logged and the next strategy is tried;
    /// `None` means the secondary catalog could not place the seed.
    #[instrument(skip(self))]
    pub async fn find_secondary_seed(&self, reference: &str) -> Option<String> {
        if let Some(primary_id) = extract_primary_id(reference) {
            if let Some(paper_id) = self.secondary_id_via_primary(&primary_id).await {
                return Some(paper_id);
            }
        } else if let Some(paper_id) = extract_secondary_id(reference) {
            return Some(paper_id);
        } else if let Some(doi) = doi_in(reference) {
            match self.secondary.paper_id_by_doi(&doi).await {
                Ok(Some(paper_id)) => return Some(paper_id),
                Ok(None) => debug!(%doi, "DOI unknown to secondary catalog"),
                Err(error) => warn!(%doi, %error, "secondary DOI lookup failed"),
            }
        } else if reference.trim().to_ascii_lowercase().starts_with("http") {
            match self.resolve_seed(reference).await {
                Ok(primary_id) => {
                    if let Some(paper_id) = self.secondary_id_via_primary(&primary_id).await {
                        return Some(paper_id);
                    }
                }
                Err(error) => debug!(%error, "URL did not resolve in primary catalog"),
            }
        }

        match self.secondary.search_papers(reference.trim(), SEED_SEARCH_RESULTS).await {
            Ok(mut papers) => {
                papers.sort_by(|a, b| {
                    b.citation_count
                        .unwrap_or(0)
                        .cmp(&a.citation_count.unwrap_or(0))
                        .then_with(|| b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0)))
                });
                papers.into_iter().find_map(|paper| paper.paper_id)
            }
            Err(error) => {
                warn!(%error, "secondary seed search failed");
                None
            }
        }
    }

    async fn secondary_id_via_primary(&self, primary_id: &str) -> Option<String> {
        let record = match self.records.get_or_fetch(primary_id, self.primary.as_ref()).await {
            Ok(record) => record,
            Err(error) => {
                warn!(%primary_id, %error, "could not fetch primary record for secondary lookup");
                return None;
            }
        };
        let doi = PrimaryWork::from_record(&record)
            .ok()
            .and_then(|work| normalize_doi(work.doi.as_deref()))?;
        match self.secondary.paper_id_by_doi(&doi).await {
            Ok(paper_id) => paper_id,
            Err(error) => {
                warn!(%doi, %error, "secondary DOI lookup failed");
                None
            }
        }
    }

    /// Maps a secondary reference to a primary work ID.
    ///
    /// Returns `Ok(None)` when every tier came back empty (that outcome is
    /// cached). Returns `Err` when nothing resolved and at least one tier hit a
    /// network failure; transient failures are never cached.
    ///
    /// # Errors
    ///
    /// The first [`FetchError`] encountered, when no tier resolved.
    #[instrument(skip(self, reference), fields(paper_id = ?reference.paper_id))]
    pub async fn map_secondary_to_primary(
        &self,
        reference: &SecondaryReference,
    ) -> Result<Option<String>, FetchError> {
        let mut first_error: Option<FetchError> = None;

        if let Some(doi) = reference.doi.as_deref() {
            let key = MappingKey::Doi(doi.to_string());
            let outcome = self
                .tier(&key, || async {
                    Ok(self.primary.find_by_doi(doi).await?.and_then(|work| work.id))
                })
                .await;
            if let Some(id) = settle(outcome, &mut first_error) {
                return Ok(Some(id));
            }
        }

        if let Some(arxiv_id) = reference.arxiv_id.as_deref() {
            let key = MappingKey::Arxiv(arxiv_id.to_string());
            let outcome = self
                .tier(&key, || self.top_search_hit(arxiv_id))
                .await;
            if let Some(id) = settle(outcome, &mut first_error) {
                return Ok(Some(id));
            }
        }

        let secondary_key = reference
            .paper_id
            .as_deref()
            .map(|id| MappingKey::Secondary(id.to_string()));
        if let Some(key) = &secondary_key {
            match self.mapping.get(key) {
                MappingLookup::Mapped(id) => return Ok(Some(id)),
                // A sibling reference with this ID already came back empty.
                MappingLookup::Unmapped => {
                    debug!(%key, "secondary ID cached as unmapped");
                    return first_error.map_or(Ok(None), Err);
                }
                MappingLookup::Miss => {}
            }
        }

        if let Some(title) = reference
            .title
            .as_deref()
            .filter(|t| !is_low_information_title(Some(t)))
        {
            let key = MappingKey::title(title);
            let outcome = self.tier(&key, || self.top_search_hit(title)).await;
            if let Some(id) = settle(outcome, &mut first_error) {
                if let Some(secondary_key) = &secondary_key {
                    self.mapping.put(secondary_key, Some(id.clone())).await;
                }
                return Ok(Some(id));
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }
        if let Some(secondary_key) = &secondary_key
            && self.mapping.get(secondary_key) == MappingLookup::Miss
        {
            self.mapping.put(secondary_key, None).await;
        }
        Ok(None)
    }

    async fn top_search_hit(&self, query: &str) -> Result<Option<String>, FetchError> {
        let works = self
            .primary
            .search_works(query, MAPPING_SEARCH_RESULTS, None)
            .await?;
        Ok(works.into_iter().find_map(|work| work.id))
    }

    /// Runs one cached tier: a cached value short-circuits the lookup, a
    /// fresh result (hit or miss) is cached, a failure is not.
    async fn tier<F, Fut>(&self, key: &MappingKey, lookup: F) -> TierOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>, FetchError>>,
    {
        match self.mapping.get(key) {
            MappingLookup::Mapped(id) => {
                debug!(%key, %id, "mapping cache hit");
                return TierOutcome::Resolved(id);
            }
            MappingLookup::Unmapped => {
                debug!(%key, "mapping cache null");
                return TierOutcome::Nothing;
            }
            MappingLookup::Miss => {}
        }

        match lookup().await {
            Ok(Some(id)) => {
                self.mapping.put(key, Some(id.clone())).await;
                TierOutcome::Resolved(id)
            }
            Ok(None) => {
                self.mapping.put(key, None).await;
                TierOutcome::Nothing
            }
            Err(error) => {
                warn!(%key, %error, "mapping lookup failed; not caching");
                TierOutcome::Failed(error)
            }
        }
    }
}

impl fmt::Debug for IdResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdResolver")
            .field("cached_mappings", &self.mapping.len())
            .finish_non_exhaustive()
    }
}

fn settle(outcome: TierOutcome, first_error: &mut Option<FetchError>) -> Option<String> {
    match outcome {
        TierOutcome::Resolved(id) => Some(id),
        TierOutcome::Nothing => None,
        TierOutcome::Failed(error) => {
            first_error.get_or_insert(error);
            None
        }
    }
}

/// Returns the normalized DOI when `reference` is a bare DOI or a `doi.org` URL.
fn doi_in(reference: &str) -> Option<String> {
    normalize_doi(Some(reference)).filter(|doi| is_doi(doi))
}

/// Descending by relevance, then by citation count.
fn compare_seed_candidates(a: &PrimaryWork, b: &PrimaryWork) -> Ordering {
    b.relevance_score
        .unwrap_or(0.0)
        .total_cmp(&a.relevance_score.unwrap_or(0.0))
        .then_with(|| {
            b.cited_by_count
                .unwrap_or(0)
                .cmp(&a.cited_by_count.unwrap_or(0))
        })
}
