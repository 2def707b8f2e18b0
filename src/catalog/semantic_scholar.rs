//! Semantic Scholar Graph API client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::fetch::{Bucket, FetchError, JsonFetcher};
use crate::resolver::patterns::normalize_doi;

use super::{SecondaryCatalog, SecondaryPaper, SecondaryReference};

/// Default Semantic Scholar Graph API base URL.
pub const DEFAULT_SEMANTIC_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// The Graph API rejects nested selectors such as `references.authors.name`;
/// author names are read from `references.authors` locally.
const REFERENCE_FIELDS: &str = "references.paperId,references.title,references.year,references.externalIds,references.authors";

const SEARCH_FIELDS: &str = "paperId,year,citationCount,title";

// ==================== Semantic Scholar Response Types ====================

#[derive(Debug, Deserialize)]
struct S2PaperReferences {
    references: Option<Vec<S2Reference>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Reference {
    paper_id: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    external_ids: Option<S2ExternalIds>,
    authors: Option<Vec<S2Author>>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
    #[serde(rename = "CorpusId")]
    corpus_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2SearchHit>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2SearchHit {
    paper_id: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2PaperId {
    paper_id: Option<String>,
}

/// Corpus IDs arrive as numbers; some mirrors send them as strings.
fn corpus_id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl From<S2Reference> for SecondaryReference {
    fn from(raw: S2Reference) -> Self {
        let (doi, arxiv_id, corpus_id) = match raw.external_ids {
            Some(ids) => (
                normalize_doi(ids.doi.as_deref()),
                ids.arxiv.filter(|a| !a.trim().is_empty()),
                ids.corpus_id.as_ref().and_then(corpus_id_string),
            ),
            None => (None, None, None),
        };

        Self {
            paper_id: raw.paper_id.filter(|id| !id.is_empty()).or(corpus_id),
            title: raw.title.filter(|t| !t.trim().is_empty()),
            year: raw.year,
            doi,
            arxiv_id,
            authors: raw
                .authors
                .unwrap_or_default()
                .into_iter()
                .filter_map(|author| author.name)
                .collect(),
        }
    }
}

/// Encodes a DOI for use in a URL path, keeping its `/` separators.
fn encode_doi_path(doi: &str) -> String {
    doi.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ==================== SemanticScholarClient ====================

/// [`SecondaryCatalog`] backed by the Semantic Scholar Graph API.
pub struct SemanticScholarClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
}

impl SemanticScholarClient {
    /// Creates a client against the public API.
    #[must_use]
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self::with_base_url(fetcher, DEFAULT_SEMANTIC_SCHOLAR_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        self.fetcher.get_json(Bucket::Secondary, &url, params).await
    }

    fn decode<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, FetchError> {
        T::deserialize(body)
            .map_err(|e| FetchError::decode(format!("{}{}", self.base_url, path), e))
    }
}

impl fmt::Debug for SemanticScholarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticScholarClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecondaryCatalog for SemanticScholarClient {
    #[instrument(skip(self), fields(catalog = "s2"))]
    async fn fetch_references(
        &self,
        paper_id: &str,
    ) -> Result<Vec<SecondaryReference>, FetchError> {
        if paper_id.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("/paper/{}", urlencoding::encode(paper_id));
        let body = self.get(&path, &[("fields", REFERENCE_FIELDS)]).await?;
        let paper: S2PaperReferences = self.decode(&path, &body)?;

        let references: Vec<SecondaryReference> = paper
            .references
            .unwrap_or_default()
            .into_iter()
            .map(SecondaryReference::from)
            .collect();
        debug!(count = references.len(), "fetched secondary references");
        Ok(references)
    }

    #[instrument(skip(self), fields(catalog = "s2"))]
    async fn search_papers(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SecondaryPaper>, FetchError> {
        let limit = limit.to_string();
        let path = "/paper/search";
        let body = self
            .get(
                path,
                &[("query", query), ("fields", SEARCH_FIELDS), ("limit", limit.as_str())],
            )
            .await?;
        let response: S2SearchResponse = self.decode(path, &body)?;

        Ok(response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|hit| SecondaryPaper {
                paper_id: hit.paper_id,
                title: hit.title,
                year: hit.year,
                citation_count: hit.citation_count,
            })
            .collect())
    }

    #[instrument(skip(self), fields(catalog = "s2"))]
    async fn paper_id_by_doi(&self, doi: &str) -> Result<Option<String>, FetchError> {
        let path = format!("/paper/DOI:{}", encode_doi_path(doi));
        match self.get(&path, &[("fields", "paperId")]).await {
            Ok(body) => {
                let paper: S2PaperId = self.decode(&path, &body)?;
                Ok(paper.paper_id.filter(|id| !id.is_empty()))
            }
            Err(error) if error.status() == Some(404) => {
                debug!("DOI not known to secondary catalog");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetch::{FetcherSettings, HttpFetcher, RateLimiter, RetryPolicy};
    use crate::metrics::MetricsCollector;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn test_fetcher() -> Arc<dyn JsonFetcher> {
        let settings = FetcherSettings {
            primary_retry: RetryPolicy::without_delay(2),
            secondary_retry: RetryPolicy::without_delay(2),
            ..FetcherSettings::default()
        };
        Arc::new(
            HttpFetcher::with_settings(
                settings,
                Arc::new(RateLimiter::disabled()),
                Arc::new(MetricsCollector::new()),
            )
            .unwrap(),
        )
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_reference_conversion_normalizes_ids() {
        let raw: S2Reference = serde_json::from_value(json!({
            "paperId": null,
            "title": "Anti de Sitter space and holography",
            "year": 1998,
            "externalIds": {"DOI": "https://doi.org/10.4310/ATMP.1998.v2.n2.a2", "ArXiv": "hep-th/9802150", "CorpusId": 12345},
            "authors": [{"authorId": "1", "name": "Edward Witten"}]
        }))
        .unwrap();

        let reference = SecondaryReference::from(raw);
        assert_eq!(reference.paper_id.as_deref(), Some("12345"));
        assert_eq!(reference.doi.as_deref(), Some("10.4310/ATMP.1998.v2.n2.a2"));
        assert_eq!(reference.arxiv_id.as_deref(), Some("hep-th/9802150"));
        assert_eq!(reference.authors, vec!["Edward Witten"]);
    }

    #[test]
    fn test_reference_conversion_without_external_ids() {
        let raw: S2Reference =
            serde_json::from_value(json!({"paperId": "abc123", "title": ""})).unwrap();
        let reference = SecondaryReference::from(raw);
        assert_eq!(reference.paper_id.as_deref(), Some("abc123"));
        assert_eq!(reference.title, None);
        assert_eq!(reference.doi, None);
    }

    #[test]
    fn test_encode_doi_path_keeps_slashes() {
        assert_eq!(encode_doi_path("10.1103/PhysRevD.1"), "10.1103/PhysRevD.1");
        assert_eq!(encode_doi_path("10.1234/a b"), "10.1234/a%20b");
    }

    // ==================== Client Tests ====================

    #[tokio::test]
    async fn test_fetch_references_requests_flat_fields() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/paper/seed123"))
            .and(query_param("fields", REFERENCE_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paperId": "seed123",
                "references": [
                    {"paperId": "r1", "title": "First reference title here", "year": 2001},
                    {"paperId": "r2", "externalIds": {"DOI": "10.1234/r2"}}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = SemanticScholarClient::with_base_url(test_fetcher(), mock_server.uri());
        let refs = client.fetch_references("seed123").await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].doi.as_deref(), Some("10.1234/r2"));
    }

    #[tokio::test]
    async fn test_fetch_references_empty_id_skips_network() {
        let client = SemanticScholarClient::with_base_url(test_fetcher(), "http://127.0.0.1:1");
        assert!(client.fetch_references("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paper_id_by_doi_found() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/paper/DOI:10.1103/PhysRevLett.1"))
            .and(query_param("fields", "paperId"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paperId": "p1"})))
            .mount(&mock_server)
            .await;

        let client = SemanticScholarClient::with_base_url(test_fetcher(), mock_server.uri());
        let id = client.paper_id_by_doi("10.1103/PhysRevLett.1").await.unwrap();
        assert_eq!(id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_paper_id_by_doi_not_found_is_none() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = SemanticScholarClient::with_base_url(test_fetcher(), mock_server.uri());
        assert_eq!(client.paper_id_by_doi("10.1234/none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_papers_parses_hits() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/paper/search"))
            .and(query_param("query", "holography"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "data": [
                    {"paperId": "a", "year": 1998, "citationCount": 10},
                    {"paperId": "b", "year": 2001}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = SemanticScholarClient::with_base_url(test_fetcher(), mock_server.uri());
        let hits = client.search_papers("holography", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].citation_count, Some(10));
        assert_eq!(hits[1].citation_count, None);
    }
}
