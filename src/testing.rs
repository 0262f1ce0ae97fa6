//! Test fixtures shared by unit tests

use crate::error::{PrecacheError, PrecacheResult};
use crate::network::Network;
use crate::request::{Request, Response};
use crate::store::{CacheStorage, CacheStore, MemoryCacheStorage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Scripted network that records every request it sees
///
/// Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct RecordingNetwork {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    seen: Mutex<Vec<Request>>,
    offline: AtomicBool,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, url: &str, body: &str) -> Self {
        self.set(url, 200, body);
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set(url, status, "");
        self
    }

    /// Replace (or add) a route after construction
    pub fn set(&self, url: &str, status: u16, body: &str) {
        let key = Url::parse(url).unwrap().to_string();
        self.routes
            .lock()
            .unwrap()
            .insert(key, (status, body.as_bytes().to_vec()));
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Requests received for a URL
    pub fn calls(&self, url: &str) -> usize {
        let key = Url::parse(url).unwrap().to_string();
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.as_str() == key)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for RecordingNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        self.seen.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(PrecacheError::network(request.url.as_str(), "offline"));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some((status, body)) => Ok(Response::new(request.url.clone(), status)
                .with_header("content-type", "text/plain")
                .with_body(body)),
            None => Err(PrecacheError::network(request.url.as_str(), "connection refused")),
        }
    }

    fn network_name(&self) -> &'static str {
        "recording"
    }
}

/// Host that records the signals it receives
#[derive(Default)]
pub struct RecordingHost {
    skipped: AtomicBool,
    claims: std::sync::atomic::AtomicUsize,
}

impl RecordingHost {
    pub fn skipped_waiting(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::host::Host for RecordingHost {
    async fn skip_waiting(&self) {
        self.skipped.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) -> PrecacheResult<usize> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// In-memory storage that fails chosen operations
///
/// Lookups (`has`, `match_request`) bypass the fault switches so only the
/// operations under test are affected.
#[derive(Default)]
pub struct FaultyStorage {
    inner: MemoryCacheStorage,
    undeletable: Mutex<HashSet<String>>,
    listing_broken: AtomicBool,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `delete` fail for one store
    pub fn refuse_delete(&self, name: &str) {
        self.undeletable.lock().unwrap().insert(name.to_string());
    }

    /// Make `keys` fail from now on
    pub fn break_listing(&self) {
        self.listing_broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for FaultyStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn CacheStore>> {
        self.inner.open(name).await
    }

    async fn get(&self, name: &str) -> PrecacheResult<Option<Arc<dyn CacheStore>>> {
        self.inner.get(name).await
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        if self.listing_broken.load(Ordering::SeqCst) {
            return Err(PrecacheError::io(
                "listing caches",
                io::Error::other("device not ready"),
            ));
        }
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        if self.undeletable.lock().unwrap().contains(name) {
            return Err(PrecacheError::io(
                format!("removing {}", name),
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        self.inner.delete(name).await
    }

    fn storage_name(&self) -> &'static str {
        "faulty"
    }

    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        self.inner.has(name).await
    }

    async fn match_request(&self, request: &Request) -> PrecacheResult<Option<Response>> {
        self.inner.match_request(request).await
    }
}
