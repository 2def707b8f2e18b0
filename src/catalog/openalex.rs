//! OpenAlex works API client.
//!
//! Every request is sent through the primary [`Bucket`], so it is paced by the
//! rate limiter and carries `mailto` for the polite pool when an email is
//! configured.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::fetch::{Bucket, FetchError, JsonFetcher};

use super::{PrimaryCatalog, PrimaryWork};

/// Default OpenAlex API base URL.
pub const DEFAULT_OPENALEX_BASE_URL: &str = "https://api.openalex.org";

// ==================== OpenAlex Response Types ====================

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    publication_year: Option<i32>,
    host_venue: Option<OpenAlexSource>,
    primary_location: Option<OpenAlexLocation>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    authorships: Option<Vec<OpenAlexAuthorship>>,
    cited_by_count: Option<u64>,
    is_retracted: Option<bool>,
    referenced_works: Option<Vec<String>>,
    relevance_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexSource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    source: Option<OpenAlexSource>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthorship {
    author: Option<OpenAlexAuthor>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexList {
    #[serde(default)]
    results: Vec<Value>,
}

/// Strips the `https://openalex.org/` prefix from a work URL.
fn short_id(raw: &str) -> &str {
    raw.rsplit('/').next().unwrap_or(raw)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub(super) fn parse_work(record: &Value) -> Result<PrimaryWork, serde_json::Error> {
    let raw = OpenAlexWork::deserialize(record)?;

    let venue = raw
        .host_venue
        .and_then(|source| source.display_name)
        .or_else(|| {
            raw.primary_location
                .and_then(|location| location.source)
                .and_then(|source| source.display_name)
        });

    let authors = raw
        .authorships
        .unwrap_or_default()
        .into_iter()
        .filter_map(|authorship| authorship.author.and_then(|author| author.display_name))
        .filter(|name| !name.is_empty())
        .collect();

    let referenced_works = raw
        .referenced_works
        .unwrap_or_default()
        .iter()
        .map(|reference| short_id(reference))
        .filter(|id| id.starts_with('W'))
        .map(str::to_string)
        .collect();

    Ok(PrimaryWork {
        id: raw.id.as_deref().map(short_id).map(str::to_string),
        doi: non_empty(raw.doi),
        title: non_empty(raw.title),
        publication_year: raw.publication_year,
        venue: non_empty(venue),
        work_type: non_empty(raw.work_type),
        authors,
        cited_by_count: raw.cited_by_count,
        is_retracted: raw.is_retracted,
        referenced_works,
        relevance_score: raw.relevance_score,
    })
}

// ==================== OpenAlexClient ====================

/// [`PrimaryCatalog`] backed by the OpenAlex REST API.
pub struct OpenAlexClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexClient {
    /// Creates a client against the public API.
    #[must_use]
    pub fn new(fetcher: Arc<dyn JsonFetcher>, mailto: Option<String>) -> Self {
        Self::with_base_url(fetcher, mailto, DEFAULT_OPENALEX_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(
        fetcher: Arc<dyn JsonFetcher>,
        mailto: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let mailto = mailto.filter(|email| !email.trim().is_empty());
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mailto,
        }
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        if let Some(mailto) = self.mailto.as_deref() {
            all_params.push(("mailto", mailto));
        }
        self.fetcher
            .get_json(Bucket::Primary, &url, &all_params)
            .await
    }

    async fn list_works(&self, params: &[(&str, &str)]) -> Result<Vec<PrimaryWork>, FetchError> {
        let body = self.get("/works", params).await?;
        let list = OpenAlexList::deserialize(&body).map_err(|e| {
            FetchError::decode(format!("{}/works", self.base_url), e)
        })?;

        let mut works = Vec::with_capacity(list.results.len());
        for record in &list.results {
            match parse_work(record) {
                Ok(work) if work.id.is_some() => works.push(work),
                Ok(_) => debug!("skipping search result without id"),
                Err(error) => warn!(%error, "skipping malformed search result"),
            }
        }
        Ok(works)
    }
}

impl fmt::Debug for OpenAlexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAlexClient")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PrimaryCatalog for OpenAlexClient {
    #[instrument(skip(self), fields(catalog = "openalex"))]
    async fn fetch_work(&self, id: &str) -> Result<Value, FetchError> {
        let path = format!("/works/{}", urlencoding::encode(id));
        self.get(&path, &[]).await
    }

    #[instrument(skip(self), fields(catalog = "openalex"))]
    async fn find_by_doi(&self, doi: &str) -> Result<Option<PrimaryWork>, FetchError> {
        let filter = format!("doi:{doi}");
        let works = self
            .list_works(&[("filter", filter.as_str()), ("per_page", "1")])
            .await?;
        Ok(works.into_iter().next())
    }

    #[instrument(skip(self), fields(catalog = "openalex"))]
    async fn search_works(
        &self,
        query: &str,
        per_page: u32,
        sort: Option<&str>,
    ) -> Result<Vec<PrimaryWork>, FetchError> {
        let per_page = per_page.to_string();
        let mut params = vec![("search", query), ("per_page", per_page.as_str())];
        if let Some(sort) = sort {
            params.push(("sort", sort));
        }
        self.list_works(&params).await
    }
}
