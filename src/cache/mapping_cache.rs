//! Persistent cross-catalog identifier mapping cache.
//!
//! Keys are prefixed by the evidence used for the lookup (`DOI:`, `ARXIV:`,
//! `S2:`, `TITLE:`); values are either a primary work ID or an explicit
//! `null`. A cached `null` is authoritative and is never re-queried.

use std::fmt;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::CacheStore;

/// Maximum characters of a normalized title kept in a `TITLE:` key.
const TITLE_KEY_MAX_CHARS: usize = 200;

/// Composite mapping cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingKey {
    /// Normalized DOI.
    Doi(String),
    /// Preprint identifier.
    Arxiv(String),
    /// Secondary-catalog paper ID.
    Secondary(String),
    /// Lowercased, trimmed, truncated title.
    Title(String),
}

impl MappingKey {
    /// Builds a `TITLE:` key from a raw title.
    #[must_use]
    pub fn title(raw: &str) -> Self {
        Self::Title(
            raw.trim()
                .to_lowercase()
                .chars()
                .take(TITLE_KEY_MAX_CHARS)
                .collect(),
        )
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doi(doi) => write!(f, "DOI:{doi}"),
            Self::Arxiv(id) => write!(f, "ARXIV:{id}"),
            Self::Secondary(id) => write!(f, "S2:{id}"),
            Self::Title(title) => write!(f, "TITLE:{title}"),
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingLookup {
    /// Never looked up.
    Miss,
    /// Previously resolved to this primary ID.
    Mapped(String),
    /// Previously looked up with no match.
    Unmapped,
}

/// Mapping cache, flushed to disk after every write.
#[derive(Debug)]
pub struct MappingCache {
    entries: DashMap<String, Option<String>>,
    store: CacheStore,
    flush: Mutex<()>,
}

impl MappingCache {
    /// Loads whatever `store` already holds.
    pub async fn load(store: CacheStore) -> Self {
        let entries: DashMap<String, Option<String>> =
            store.load::<Option<String>>().await.into_iter().collect();
        Self {
            entries,
            store,
            flush: Mutex::new(()),
        }
    }

    /// An empty cache that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            store: CacheStore::ephemeral(),
            flush: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn get(&self, key: &MappingKey) -> MappingLookup {
        match self.entries.get(&key.to_string()) {
            None => MappingLookup::Miss,
            Some(entry) => match entry.value() {
                Some(id) => MappingLookup::Mapped(id.clone()),
                None => MappingLookup::Unmapped,
            },
        }
    }

    /// Records a lookup outcome and flushes the cache file.
    pub async fn put(&self, key: &MappingKey, value: Option<String>) {
        self.entries.insert(key.to_string(), value);
        let _guard = self.flush.lock().await;
        self.store.save(&self.entries).await;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
