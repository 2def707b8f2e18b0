//! Seed resolution errors.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that abort seed resolution.
///
/// Both variants are fatal for a crawl: nothing can be traversed without a
/// primary seed.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every resolution strategy came back empty.
    #[error(
        "no primary catalog work found for '{reference}'\n  Suggestion: pass a DOI or an OpenAlex work ID (W...) instead of a title"
    )]
    SeedNotFound {
        /// The reference as given.
        reference: String,
    },

    /// A catalog request failed while resolving.
    #[error("catalog lookup failed while resolving '{reference}': {source}")]
    Catalog {
        /// The reference as given.
        reference: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },
}

impl ResolveError {
    /// Creates a seed-not-found error.
    pub fn seed_not_found(reference: impl Into<String>) -> Self {
        Self::SeedNotFound {
            reference: reference.into(),
        }
    }

    /// Creates a catalog error.
    pub fn catalog(reference: impl Into<String>, source: FetchError) -> Self {
        Self::Catalog {
            reference: reference.into(),
            source,
        }
    }
}
