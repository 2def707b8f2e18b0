//! In-memory catalogs that count their calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::catalog::{
    PrimaryCatalog, PrimaryWork, SecondaryCatalog, SecondaryPaper, SecondaryReference,
};
use crate::fetch::FetchError;

/// Builds a minimal primary work record.
pub fn work_record(id: &str, cited_by_count: Option<u64>, references: &[&str]) -> Value {
    json!({
        "id": format!("https://openalex.org/{id}"),
        "title": format!("Work {id}"),
        "publication_year": 2001,
        "cited_by_count": cited_by_count,
        "referenced_works": references
            .iter()
            .map(|r| format!("https://openalex.org/{r}"))
            .collect::<Vec<_>>(),
    })
}

/// Builds a secondary reference with only a paper ID and title.
pub fn secondary_ref(paper_id: &str, title: &str) -> SecondaryReference {
    SecondaryReference {
        paper_id: Some(paper_id.to_string()),
        title: Some(title.to_string()),
        ..SecondaryReference::default()
    }
}

fn fake_failure(key: &str) -> FetchError {
    FetchError::http_status(format!("fake://{key}"), 503)
}

#[derive(Debug, Default)]
pub struct FakePrimary {
    works: HashMap<String, Value>,
    dois: HashMap<String, String>,
    searches: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakePrimary {
    pub fn with_work(mut self, id: &str, record: Value) -> Self {
        self.works.insert(id.to_string(), record);
        self
    }

    pub fn with_doi(mut self, doi: &str, id: &str) -> Self {
        self.dois.insert(doi.to_string(), id.to_string());
        self
    }

    pub fn with_search(mut self, query: &str, ids: &[&str]) -> Self {
        self.searches
            .insert(query.to_string(), ids.iter().map(|s| (*s).to_string()).collect());
        self
    }

    /// Makes any call keyed by `key` (work ID, DOI or query) fail.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, key: &str) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(key) {
            return Err(fake_failure(key));
        }
        Ok(())
    }

    fn work(&self, id: &str) -> PrimaryWork {
        self.works
            .get(id)
            .and_then(|record| PrimaryWork::from_record(record).ok())
            .unwrap_or_else(|| PrimaryWork {
                id: Some(id.to_string()),
                ..PrimaryWork::default()
            })
    }
}

#[async_trait]
impl PrimaryCatalog for FakePrimary {
    async fn fetch_work(&self, id: &str) -> Result<Value, FetchError> {
        self.enter(id)?;
        self.works
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::http_status(format!("fake://{id}"), 404))
    }

    async fn find_by_doi(&self, doi: &str) -> Result<Option<PrimaryWork>, FetchError> {
        self.enter(doi)?;
        Ok(self.dois.get(doi).map(|id| self.work(id)))
    }

    async fn search_works(
        &self,
        query: &str,
        per_page: u32,
        _sort: Option<&str>,
    ) -> Result<Vec<PrimaryWork>, FetchError> {
        self.enter(query)?;
        Ok(self
            .searches
            .get(query)
            .map(|ids| {
                ids.iter()
                    .take(per_page as usize)
                    .map(|id| self.work(id))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FakeSecondary {
    references: HashMap<String, Vec<SecondaryReference>>,
    dois: HashMap<String, String>,
    searches: HashMap<String, Vec<SecondaryPaper>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeSecondary {
    pub fn with_references(mut self, paper_id: &str, references: Vec<SecondaryReference>) -> Self {
        self.references.insert(paper_id.to_string(), references);
        self
    }

    pub fn with_doi(mut self, doi: &str, paper_id: &str) -> Self {
        self.dois.insert(doi.to_string(), paper_id.to_string());
        self
    }

    /// Registers search hits as `(paper_id, citation_count, year)`.
    pub fn with_search(mut self, query: &str, hits: &[(&str, Option<u64>, Option<i32>)]) -> Self {
        let papers = hits
            .iter()
            .map(|(id, citations, year)| SecondaryPaper {
                paper_id: Some((*id).to_string()),
                title: None,
                year: *year,
                citation_count: *citations,
            })
            .collect();
        self.searches.insert(query.to_string(), papers);
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, key: &str) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(key) {
            return Err(fake_failure(key));
        }
        Ok(())
    }
}

#[async_trait]
impl SecondaryCatalog for FakeSecondary {
    async fn fetch_references(
        &self,
        paper_id: &str,
    ) -> Result<Vec<SecondaryReference>, FetchError> {
        self.enter(paper_id)?;
        Ok(self.references.get(paper_id).cloned().unwrap_or_default())
    }

    async fn search_papers(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SecondaryPaper>, FetchError> {
        self.enter(query)?;
        Ok(self
            .searches
            .get(query)
            .map(|papers| papers.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn paper_id_by_doi(&self, doi: &str) -> Result<Option<String>, FetchError> {
        self.enter(doi)?;
        Ok(self.dois.get(doi).cloned())
    }
}
