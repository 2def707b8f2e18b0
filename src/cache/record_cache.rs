//! Persistent primary ID → raw catalog record cache.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::catalog::PrimaryCatalog;
use crate::fetch::FetchError;

use super::CacheStore;

/// Raw primary-catalog records keyed by short work ID (`W…`).
///
/// Reads are concurrent; inserts go through a single flush lock and rewrite
/// the backing file every time, so a crash loses at most the record being
/// written.
#[derive(Debug)]
pub struct RecordCache {
    records: DashMap<String, Value>,
    store: CacheStore,
    flush: Mutex<()>,
}

impl RecordCache {
    /// Loads whatever `store` already holds.
    pub async fn load(store: CacheStore) -> Self {
        let records: DashMap<String, Value> = store.load::<Value>().await.into_iter().collect();
        Self {
            records,
            store,
            flush: Mutex::new(()),
        }
    }

    /// An empty cache that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            records: DashMap::new(),
            store: CacheStore::ephemeral(),
            flush: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Value> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stores `record` under `id` and flushes the cache file.
    pub async fn insert(&self, id: impl Into<String>, record: Value) {
        self.records.insert(id.into(), record);
        let _guard = self.flush.lock().await;
        self.store.save(&self.records).await;
    }

    /// Returns the cached record, fetching and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the catalog's [`FetchError`] on a miss that cannot be fetched.
    #[instrument(skip(self, catalog))]
    pub async fn get_or_fetch(
        &self,
        id: &str,
        catalog: &dyn PrimaryCatalog,
    ) -> Result<Value, FetchError> {
        if let Some(record) = self.get(id) {
            debug!("record cache hit");
            return Ok(record);
        }
        let record = catalog.fetch_work(id).await?;
        self.insert(id, record.clone()).await;
        Ok(record)
    }
}
