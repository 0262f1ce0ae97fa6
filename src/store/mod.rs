//! Named, versioned cache stores
//!
//! A [`CacheStorage`] holds any number of independently named
//! [`CacheStore`]s. Each store maps a request's cache key (absolute URL
//! without fragment) to the response captured when it was stored.
//!
//! # Matching
//!
//! | Request | Result |
//! |---------|--------|
//! | `GET` with a stored key | stored response, verbatim |
//! | `GET` without a stored key | `None` |
//! | any other method | `None` |
//!
//! Storage-wide matching walks stores in creation order and returns the
//! first hit.

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::{PrecacheError, PrecacheResult};
use crate::network::Network;
use crate::request::{Method, Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Summary of one stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Cache key (absolute URL)
    pub url: String,
    /// Stored status code
    pub status: u16,
    /// Body size in bytes
    pub size: usize,
    /// When the entry was stored
    pub cached_at: DateTime<Utc>,
}

/// Whether a request can be answered from a cache store
pub fn is_cacheable(request: &Request) -> bool {
    request.method == Method::Get
}

/// A single named store
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name (the cache version)
    fn name(&self) -> &str;

    /// Look up a stored response
    async fn match_request(&self, request: &Request) -> PrecacheResult<Option<Response>>;

    /// Store a batch of pairs; either all are visible afterwards or none
    async fn put_all(&self, entries: Vec<(Request, Response)>) -> PrecacheResult<()>;

    /// Remove one entry, returning whether it existed
    async fn delete(&self, request: &Request) -> PrecacheResult<bool>;

    /// All stored entries in key order
    async fn entries(&self) -> PrecacheResult<Vec<EntryInfo>>;

    /// Store a single pair
    async fn put(&self, request: Request, response: Response) -> PrecacheResult<()> {
        self.put_all(vec![(request, response)]).await
    }

    /// Fetch every request and store the results
    ///
    /// All requests are fetched before anything is written. A transport
    /// failure or a non-2xx status for any of them fails the whole batch
    /// and leaves the store untouched.
    async fn add_all(&self, network: &dyn Network, requests: &[Request]) -> PrecacheResult<usize> {
        let fetches = requests.iter().map(|request| async move {
            let response = network.fetch(request).await.map_err(|e| match e {
                PrecacheError::Network { url, reason } => PrecacheError::InstallPopulation {
                    version: self.name().to_string(),
                    url,
                    reason,
                },
                other => other,
            })?;

            if !response.is_ok() {
                return Err(PrecacheError::InstallPopulation {
                    version: self.name().to_string(),
                    url: request.url.to_string(),
                    reason: format!("HTTP {}", response.status),
                });
            }

            Ok((request.clone(), response))
        });

        let entries = try_join_all(fetches).await?;
        let count = entries.len();
        self.put_all(entries).await?;

        debug!("Stored {} entries in cache {}", count, self.name());
        Ok(count)
    }
}

/// The set of all named stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn CacheStore>>;

    /// Get an existing store
    async fn get(&self, name: &str) -> PrecacheResult<Option<Arc<dyn CacheStore>>>;

    /// Names of all stores, in creation order
    async fn keys(&self) -> PrecacheResult<Vec<String>>;

    /// Remove a store, returning whether it existed
    async fn delete(&self, name: &str) -> PrecacheResult<bool>;

    /// Human-readable backend name for display
    fn storage_name(&self) -> &'static str;

    /// Check whether a store exists
    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.keys().await?.iter().any(|key| key == name))
    }

    /// Look a request up across all stores, first match wins
    async fn match_request(&self, request: &Request) -> PrecacheResult<Option<Response>> {
        if !is_cacheable(request) {
            return Ok(None);
        }

        for name in self.keys().await? {
            // A store deleted between listing and lookup is simply skipped
            let Some(store) = self.get(&name).await? else {
                continue;
            };
            if let Some(response) = store.match_request(request).await? {
                debug!("Cache hit for {} in {}", request.url, name);
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
