//! The cache controller
//!
//! One [`CacheController`] exists per deployment. The host drives it through
//! three handlers and awaits each returned future before finalizing the
//! corresponding lifecycle event:
//!
//! | Event | Handler | Effect |
//! |-------|---------|--------|
//! | install | [`CacheController::on_install`] | populate the versioned store, request skip-waiting |
//! | activate | [`CacheController::on_activate`] | delete every other store, claim clients |
//! | fetch | [`CacheController::on_fetch`] | cache first, network fallback |
//!
//! The controller keeps no state between calls apart from the stores.

pub mod manifest;

pub use manifest::{Deployment, ResourceManifest, VersionTag};

use crate::error::{PrecacheError, PrecacheResult};
use crate::host::Host;
use crate::network::Network;
use crate::request::{Request, Response};
use crate::store::CacheStorage;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a fetch was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

impl fmt::Display for ServedFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Response to a fetch, with its origin
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ServedFrom,
}

/// Outcome of a successful install
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Version that was installed
    pub version: VersionTag,
    /// Resources stored
    pub cached: usize,
    /// Entries dropped because they are no longer in the manifest
    pub pruned: usize,
}

/// Outcome of an activation
#[derive(Debug)]
pub struct ActivateReport {
    /// Version that is now active
    pub version: VersionTag,
    /// Stale stores removed
    pub deleted: Vec<String>,
    /// Stale stores that could not be removed
    pub failed: Vec<PrecacheError>,
    /// Clients taken over
    pub claimed: usize,
}

/// Cache-first controller for one deployment
pub struct CacheController {
    deployment: Deployment,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl CacheController {
    /// Create a controller
    pub fn new(
        deployment: Deployment,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            deployment,
            storage,
            network,
        }
    }

    /// Deployment served by this controller
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Current version tag
    pub fn version(&self) -> &VersionTag {
        &self.deployment.version
    }

    /// Handle the install event
    ///
    /// Opens the store named by the version tag and populates it with the
    /// whole manifest. If any resource cannot be fetched the install fails,
    /// nothing from this attempt is written, and a store created by this
    /// attempt is removed again. On success the host is asked to skip the
    /// waiting phase.
    pub async fn on_install(&self, host: &dyn Host) -> PrecacheResult<InstallReport> {
        let version = self.version().clone();
        let name = version.as_str();
        let requests = self.deployment.manifest.requests();

        info!(
            "Installing cache {} ({} resources via {})",
            version,
            requests.len(),
            self.network.network_name()
        );

        let existed = self.storage.has(name).await?;
        let store = self.storage.open(name).await?;

        let cached = match store.add_all(self.network.as_ref(), &requests).await {
            Ok(cached) => cached,
            Err(e) => {
                if !existed {
                    if let Err(cleanup) = self.storage.delete(name).await {
                        warn!("Failed to remove incomplete cache {}: {}", name, cleanup);
                    }
                }
                return Err(e);
            }
        };

        // Same version reinstalled with an edited manifest: drop leftovers
        let wanted: HashSet<String> = requests.iter().map(Request::cache_key).collect();
        let mut pruned = 0;
        for entry in store.entries().await? {
            if !wanted.contains(&entry.url) {
                let request = Request::parse(&entry.url)?;
                if store.delete(&request).await? {
                    pruned += 1;
                }
            }
        }
        if pruned > 0 {
            debug!("Pruned {} entries no longer in the manifest", pruned);
        }

        host.skip_waiting().await;

        info!("Installed cache {} with {} resources", version, cached);
        Ok(InstallReport {
            version,
            cached,
            pruned,
        })
    }

    /// Handle the activate event
    ///
    /// Deletes every store whose name differs from the version tag. Each
    /// deletion is attempted independently and all of them are awaited;
    /// failures are reported, not fatal. Then asks the host to claim all
    /// in-scope clients.
    pub async fn on_activate(&self, host: &dyn Host) -> PrecacheResult<ActivateReport> {
        let version = self.version().clone();

        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name.as_str() != version.as_str())
            .collect();

        let results = join_all(stale.into_iter().map(|name| async move {
            let result = self.storage.delete(&name).await;
            (name, result)
        }))
        .await;

        let mut deleted = vec![];
        let mut failed = vec![];
        for (name, result) in results {
            match result {
                Ok(_) => {
                    debug!("Deleted stale cache {}", name);
                    deleted.push(name);
                }
                Err(e) => {
                    warn!("Failed to delete stale cache {}: {}", name, e);
                    failed.push(PrecacheError::StaleStoreDeletion {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let claimed = host.claim_clients().await?;

        info!(
            "Activated cache {} (removed {} stale, claimed {} clients)",
            version,
            deleted.len(),
            claimed
        );
        Ok(ActivateReport {
            version,
            deleted,
            failed,
            claimed,
        })
    }

    /// Handle a fetch event
    ///
    /// A stored response is returned verbatim without touching the network.
    /// Otherwise the request goes to the network unmodified and whatever it
    /// answers, HTTP errors included, is returned. Only a miss combined with
    /// a network failure is an error.
    pub async fn on_fetch(&self, request: &Request) -> PrecacheResult<Served> {
        if let Some(response) = self.storage.match_request(request).await? {
            debug!("{} {} served from cache", request.method, request.url);
            return Ok(Served {
                response,
                source: ServedFrom::Cache,
            });
        }

        debug!("{} {} not cached, forwarding", request.method, request.url);
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| e.unresolved(request.url.as_str()))?;
        Ok(Served {
            response,
            source: ServedFrom::Network,
        })
    }
}
