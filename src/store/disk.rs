//! Persistent cache storage on the local filesystem
//!
//! Each store lives in its own directory under the storage root:
//!
//! ```text
//! <root>/<sha256(name)[..16]>/
//!     _cache.json      store name, creation time, URL -> entry index
//!     <digest>.body    response bodies, content-addressed (SHA256)
//! ```
//!
//! Writes put new bodies in place first and then commit by renaming a fresh
//! index over `_cache.json`. Readers only ever see a complete index. Bodies
//! no longer referenced by the committed index are removed afterwards.

use crate::error::{PrecacheError, PrecacheResult};
use crate::request::{Request, Response};
use crate::store::{is_cacheable, CacheStorage, CacheStore, EntryInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Index file name inside a store directory
const INDEX_FILE: &str = "_cache.json";

/// Body file extension
const BODY_EXT: &str = "body";

/// Extension of in-flight writes
const TMP_EXT: &str = "tmp";

/// On-disk index of one store
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheIndex {
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    entries: BTreeMap<String, IndexEntry>,
}

/// One indexed response; the body lives in `<body>.body`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    response: Response,
    body: String,
    size: usize,
    cached_at: DateTime<Utc>,
}

/// Directory name for a store
fn store_dir_name(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..8])
}

/// Content digest used as a body file name
fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Write a file by writing a temporary sibling and renaming it into place
async fn write_atomic(path: &Path, contents: &[u8]) -> PrecacheResult<()> {
    let tmp = path.with_file_name(format!(".{}.{}", Uuid::new_v4(), TMP_EXT));
    fs::write(&tmp, contents)
        .await
        .map_err(|e| PrecacheError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| PrecacheError::io(format!("replacing {}", path.display()), e))
}

async fn read_index(dir: &Path) -> PrecacheResult<Option<CacheIndex>> {
    let path = dir.join(INDEX_FILE);
    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PrecacheError::io(
                format!("reading cache index {}", path.display()),
                e,
            ))
        }
    };

    let index = serde_json::from_str(&content).map_err(|e| PrecacheError::StoreCorrupt {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(Some(index))
}

async fn write_index(dir: &Path, index: &CacheIndex) -> PrecacheResult<()> {
    let content = serde_json::to_vec_pretty(index)?;
    write_atomic(&dir.join(INDEX_FILE), &content).await
}

async fn remove_store_dir(dir: &Path) -> PrecacheResult<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PrecacheError::io(format!("removing {}", dir.display()), e)),
    }
}

/// Temp file left behind by an interrupted write
fn is_leftover_tmp(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TMP_EXT)
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
}

/// A store backed by one directory
pub struct DiskCacheStore {
    name: String,
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl DiskCacheStore {
    async fn load_index(&self) -> PrecacheResult<CacheIndex> {
        read_index(&self.dir)
            .await?
            .ok_or_else(|| PrecacheError::CacheNotFound(self.name.clone()))
    }

    /// Remove body files the index no longer references, and stray temp files
    async fn collect_garbage(&self, index: &CacheIndex) -> PrecacheResult<()> {
        let live: HashSet<&str> = index.entries.values().map(|e| e.body.as_str()).collect();

        let mut dir = fs::read_dir(&self.dir)
            .await
            .map_err(|e| PrecacheError::io(format!("reading {}", self.dir.display()), e))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if is_leftover_tmp(&path) {
                debug!("Removing leftover temp file {}", path.display());
                if let Err(e) = fs::remove_file(&path).await {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
                continue;
            }
            if path.extension().is_none_or(|ext| ext != BODY_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !live.contains(stem) {
                debug!("Removing unreferenced body {}", path.display());
                if let Err(e) = fs::remove_file(&path).await {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> PrecacheResult<Option<Response>> {
        if !is_cacheable(request) {
            return Ok(None);
        }

        let index = self.load_index().await?;
        let Some(entry) = index.entries.get(&request.cache_key()) else {
            return Ok(None);
        };

        let body_path = self.dir.join(format!("{}.{}", entry.body, BODY_EXT));
        let body = fs::read(&body_path)
            .await
            .map_err(|e| PrecacheError::StoreCorrupt {
                path: body_path.clone(),
                reason: e.to_string(),
            })?;

        let mut response = entry.response.clone();
        response.body = body;
        Ok(Some(response))
    }

    async fn put_all(&self, batch: Vec<(Request, Response)>) -> PrecacheResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.load_index().await?;
        let now = Utc::now();

        for (request, mut response) in batch {
            let digest = body_digest(&response.body);
            let body_path = self.dir.join(format!("{}.{}", digest, BODY_EXT));
            let present = fs::try_exists(&body_path)
                .await
                .map_err(|e| PrecacheError::io(format!("checking {}", body_path.display()), e))?;
            if !present {
                write_atomic(&body_path, &response.body).await?;
            }

            let size = response.body.len();
            response.body = Vec::new();
            index.entries.insert(
                request.cache_key(),
                IndexEntry {
                    response,
                    body: digest,
                    size,
                    cached_at: now,
                },
            );
        }

        write_index(&self.dir, &index).await?;
        self.collect_garbage(&index).await
    }

    async fn delete(&self, request: &Request) -> PrecacheResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.load_index().await?;

        if index.entries.remove(&request.cache_key()).is_none() {
            return Ok(false);
        }

        write_index(&self.dir, &index).await?;
        self.collect_garbage(&index).await?;
        Ok(true)
    }

    async fn entries(&self) -> PrecacheResult<Vec<EntryInfo>> {
        let index = self.load_index().await?;
        Ok(index
            .entries
            .into_iter()
            .map(|(url, entry)| EntryInfo {
                url,
                status: entry.response.status,
                size: entry.size,
                cached_at: entry.cached_at,
            })
            .collect())
    }
}

/// Cache storage rooted at a directory
pub struct DiskCacheStorage {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl DiskCacheStorage {
    /// Create a storage rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(store_dir_name(name))
    }

    fn handle(&self, name: &str) -> Arc<DiskCacheStore> {
        Arc::new(DiskCacheStore {
            name: name.to_string(),
            dir: self.store_dir(name),
            write_lock: self.write_lock.clone(),
        })
    }

    /// Read the index of the store `name`, if present and really `name`
    async fn index_of(&self, name: &str) -> PrecacheResult<Option<CacheIndex>> {
        Ok(read_index(&self.store_dir(name))
            .await?
            .filter(|index| index.name == name))
    }

    /// Walk the root: readable stores as (created, name), and directories
    /// whose index cannot be read
    async fn scan(&self) -> PrecacheResult<(Vec<(DateTime<Utc>, String)>, Vec<PathBuf>)> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((vec![], vec![])),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading storage directory {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut found = vec![];
        let mut unreadable = vec![];
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading storage entry", e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| PrecacheError::io("reading storage entry", e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            let path = entry.path();
            match read_index(&path).await {
                Ok(Some(index)) => found.push((index.created_at, index.name)),
                Ok(None) => {}
                Err(e) => {
                    warn!("Unreadable cache at {}: {}", path.display(), e);
                    unreadable.push(path);
                }
            }
        }

        found.sort();
        Ok((found, unreadable))
    }

    /// Store directories whose index cannot be read
    ///
    /// Their names are unknown, so [`CacheStorage::keys`] leaves them out.
    pub async fn unreadable(&self) -> PrecacheResult<Vec<PathBuf>> {
        Ok(self.scan().await?.1)
    }

    /// Delete every unreadable store directory, returning what was removed
    pub async fn remove_unreadable(&self) -> PrecacheResult<Vec<PathBuf>> {
        let _guard = self.write_lock.lock().await;
        let unreadable = self.scan().await?.1;
        for dir in &unreadable {
            remove_store_dir(dir).await?;
            debug!("Removed unreadable cache {}", dir.display());
        }
        Ok(unreadable)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn CacheStore>> {
        let _guard = self.write_lock.lock().await;

        let existing = match self.index_of(name).await {
            Err(PrecacheError::StoreCorrupt { reason, .. }) => {
                warn!("Recreating corrupt cache {}: {}", name, reason);
                remove_store_dir(&self.store_dir(name)).await?;
                None
            }
            other => other?,
        };

        if existing.is_none() {
            let dir = self.store_dir(name);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| PrecacheError::io(format!("creating {}", dir.display()), e))?;

            let index = CacheIndex {
                name: name.to_string(),
                created_at: Utc::now(),
                entries: BTreeMap::new(),
            };
            write_index(&dir, &index).await?;
            debug!("Created cache {} at {}", name, dir.display());
        }

        Ok(self.handle(name))
    }

    async fn get(&self, name: &str) -> PrecacheResult<Option<Arc<dyn CacheStore>>> {
        Ok(self
            .index_of(name)
            .await?
            .map(|_| self.handle(name) as Arc<dyn CacheStore>))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let (found, _) = self.scan().await?;
        Ok(found.into_iter().map(|(_, name)| name).collect())
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        let _guard = self.write_lock.lock().await;

        match self.index_of(name).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(false),
            Err(PrecacheError::StoreCorrupt { reason, .. }) => {
                warn!("Deleting corrupt cache {}: {}", name, reason);
            }
            Err(e) => return Err(e),
        }

        remove_store_dir(&self.store_dir(name)).await?;

        debug!("Deleted cache {}", name);
        Ok(true)
    }

    fn storage_name(&self) -> &'static str {
        "disk"
    }
}
