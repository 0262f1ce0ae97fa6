//! In-process cache storage

use crate::error::PrecacheResult;
use crate::request::{Request, Response};
use crate::store::{is_cacheable, CacheStorage, CacheStore, EntryInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredEntry {
    response: Response,
    cached_at: DateTime<Utc>,
}

/// A store held in memory
#[derive(Debug)]
pub struct MemoryCacheStore {
    name: String,
    entries: RwLock<BTreeMap<String, StoredEntry>>,
}

impl MemoryCacheStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> PrecacheResult<Option<Response>> {
        if !is_cacheable(request) {
            return Ok(None);
        }
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.cache_key())
            .map(|entry| entry.response.clone()))
    }

    async fn put_all(&self, batch: Vec<(Request, Response)>) -> PrecacheResult<()> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        for (request, response) in batch {
            entries.insert(
                request.cache_key(),
                StoredEntry {
                    response,
                    cached_at: now,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, request: &Request) -> PrecacheResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&request.cache_key()).is_some())
    }

    async fn entries(&self) -> PrecacheResult<Vec<EntryInfo>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|(url, entry)| EntryInfo {
                url: url.clone(),
                status: entry.response.status,
                size: entry.response.body.len(),
                cached_at: entry.cached_at,
            })
            .collect())
    }
}

/// Cache storage living for the lifetime of the process
///
/// Stores are kept in creation order.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<Vec<Arc<MemoryCacheStore>>>,
}

impl MemoryCacheStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn CacheStore>> {
        let mut stores = self.stores.write().await;
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }
        let store = Arc::new(MemoryCacheStore::new(name));
        stores.push(store.clone());
        Ok(store)
    }

    async fn get(&self, name: &str) -> PrecacheResult<Option<Arc<dyn CacheStore>>> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.clone() as Arc<dyn CacheStore>))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let stores = self.stores.read().await;
        Ok(stores.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    fn storage_name(&self) -> &'static str {
        "memory"
    }
}
