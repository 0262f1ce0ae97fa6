//! A scope's registration: its workers and the clients they control

use super::{ClientId, Host, WorkerState};
use crate::controller::{
    ActivateReport, CacheController, Deployment, InstallReport, Served, ServedFrom, VersionTag,
};
use crate::error::{PrecacheError, PrecacheResult};
use crate::network::Network;
use crate::request::Request;
use crate::store::CacheStorage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

struct Client {
    url: Url,
    controller: Option<Arc<CacheController>>,
}

type ClientTable = Arc<Mutex<HashMap<ClientId, Client>>>;

/// What one worker's controller sees as its host
struct WorkerHost {
    controller: Arc<CacheController>,
    clients: ClientTable,
    skip_waiting: AtomicBool,
}

impl WorkerHost {
    fn new(controller: Arc<CacheController>, clients: ClientTable) -> Self {
        Self {
            controller,
            clients,
            skip_waiting: AtomicBool::new(false),
        }
    }

    fn skipped_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Host for WorkerHost {
    async fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) -> PrecacheResult<usize> {
        let deployment = self.controller.deployment();
        let mut clients = self.clients.lock().await;

        let mut claimed = 0;
        for client in clients.values_mut() {
            if !deployment.in_scope(&client.url) {
                continue;
            }
            let owned = client
                .controller
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &self.controller));
            if !owned {
                client.controller = Some(self.controller.clone());
                claimed += 1;
            }
        }
        Ok(claimed)
    }
}

#[derive(Clone)]
struct Worker {
    controller: Arc<CacheController>,
    host: Arc<WorkerHost>,
}

#[derive(Default)]
struct Workers {
    active: Option<Worker>,
    waiting: Option<Worker>,
}

/// Outcome of [`Registration::update`]
#[derive(Debug)]
pub struct UpdateReport {
    /// Version that was deployed
    pub version: VersionTag,
    /// Install result, `None` when the version was already active
    pub install: Option<InstallReport>,
    /// Activation result, `None` when the worker is left waiting
    pub activate: Option<ActivateReport>,
    /// State the new worker ended in
    pub state: WorkerState,
}

/// Whether an installed worker takes over right away
fn should_promote(skipped_waiting: bool, active_clients: Option<usize>) -> bool {
    skipped_waiting || active_clients.is_none_or(|n| n == 0)
}

fn transition(version: &VersionTag, from: WorkerState, to: WorkerState) {
    debug!("Worker {}: {} -> {}", version, from, to);
}

/// Host lifecycle for one scope
///
/// At most one worker is active and at most one is waiting. Updates are
/// serialized; fetches from clients run concurrently with them and are
/// answered by whichever worker controls the client.
pub struct Registration {
    scope: Url,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: ClientTable,
    workers: Mutex<Workers>,
    updating: Mutex<()>,
}

impl Registration {
    /// Create an empty registration for a scope URL
    pub fn new(scope: Url, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            scope,
            storage,
            network,
            clients: Arc::new(Mutex::new(HashMap::new())),
            workers: Mutex::new(Workers::default()),
            updating: Mutex::new(()),
        }
    }

    /// Controlled scope
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Version of the active worker
    pub async fn active_version(&self) -> Option<VersionTag> {
        let workers = self.workers.lock().await;
        workers
            .active
            .as_ref()
            .map(|w| w.controller.version().clone())
    }

    /// Version of the worker waiting to take over
    pub async fn waiting_version(&self) -> Option<VersionTag> {
        let workers = self.workers.lock().await;
        workers
            .waiting
            .as_ref()
            .map(|w| w.controller.version().clone())
    }

    /// Number of open clients
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Version controlling a client, if any
    pub async fn controller_of(&self, client: ClientId) -> PrecacheResult<Option<VersionTag>> {
        let clients = self.clients.lock().await;
        let client = clients
            .get(&client)
            .ok_or_else(|| PrecacheError::InvalidState(format!("Unknown client {}", client)))?;
        Ok(client.controller.as_ref().map(|c| c.version().clone()))
    }

    /// Deploy a version
    ///
    /// Installs a new worker for the deployment. A failed install leaves the
    /// new worker redundant and the current one untouched. A successful one
    /// waits, or is activated straight away when it asked to skip waiting,
    /// when nothing is active, or when the active worker has no clients.
    pub async fn update(&self, deployment: Deployment) -> PrecacheResult<UpdateReport> {
        if deployment.scope != self.scope {
            return Err(PrecacheError::InvalidState(format!(
                "Deployment scope {} does not match registration scope {}",
                deployment.scope, self.scope
            )));
        }

        let _updating = self.updating.lock().await;
        let version = deployment.version.clone();

        if self.active_version().await.as_ref() == Some(&version) {
            debug!("Version {} is already active", version);
            return Ok(UpdateReport {
                version,
                install: None,
                activate: None,
                state: WorkerState::Activated,
            });
        }

        let controller = Arc::new(CacheController::new(
            deployment,
            self.storage.clone(),
            self.network.clone(),
        ));
        let host = Arc::new(WorkerHost::new(controller.clone(), self.clients.clone()));

        transition(&version, WorkerState::Parsed, WorkerState::Installing);
        let install = match controller.on_install(host.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                transition(&version, WorkerState::Installing, WorkerState::Redundant);
                warn!("Install of {} failed: {}", version, e);
                return Err(e);
            }
        };
        transition(&version, WorkerState::Installing, WorkerState::Installed);

        let skipped_waiting = host.skipped_waiting();
        let replaced = {
            let mut workers = self.workers.lock().await;
            workers.waiting.replace(Worker { controller, host })
        };
        if let Some(old) = replaced {
            transition(
                old.controller.version(),
                WorkerState::Installed,
                WorkerState::Redundant,
            );
        }

        let active_clients = self.active_client_count().await;
        if !should_promote(skipped_waiting, active_clients) {
            info!("Version {} installed, waiting for clients to close", version);
            return Ok(UpdateReport {
                version,
                install: Some(install),
                activate: None,
                state: WorkerState::Installed,
            });
        }

        let activate = self.activate_waiting().await?;
        Ok(UpdateReport {
            version,
            install: Some(install),
            state: if activate.is_some() {
                WorkerState::Activated
            } else {
                WorkerState::Installed
            },
            activate,
        })
    }

    /// Open a client by navigating to a URL
    ///
    /// The navigation request goes through the active worker when the URL is
    /// in scope, and the new client is then controlled by that worker.
    pub async fn navigate(&self, url: &str) -> PrecacheResult<(ClientId, Served)> {
        let request = Request::parse(url)?;
        let controller = self
            .active_controller()
            .await
            .filter(|c| c.deployment().in_scope(&request.url));

        let served = match &controller {
            Some(c) => c.on_fetch(&request).await?,
            None => self.direct(&request).await?,
        };

        let id = ClientId::new();
        debug!(
            "Client {} opened at {} ({})",
            id,
            request.url,
            if controller.is_some() {
                "controlled"
            } else {
                "uncontrolled"
            }
        );
        self.clients.lock().await.insert(
            id,
            Client {
                url: request.url,
                controller,
            },
        );
        Ok((id, served))
    }

    /// Issue a request from an open client
    pub async fn fetch(&self, client: ClientId, request: &Request) -> PrecacheResult<Served> {
        let controller = {
            let clients = self.clients.lock().await;
            let entry = clients
                .get(&client)
                .ok_or_else(|| PrecacheError::InvalidState(format!("Unknown client {}", client)))?;
            entry.controller.clone()
        };

        match controller.filter(|c| c.deployment().in_scope(&request.url)) {
            Some(c) => c.on_fetch(request).await,
            None => self.direct(request).await,
        }
    }

    /// Close a client
    ///
    /// Closing the last client of the active worker lets a waiting worker
    /// take over; its activation report is returned.
    pub async fn close_client(&self, client: ClientId) -> PrecacheResult<Option<ActivateReport>> {
        let _updating = self.updating.lock().await;

        if self.clients.lock().await.remove(&client).is_none() {
            return Err(PrecacheError::InvalidState(format!(
                "Unknown client {}",
                client
            )));
        }
        debug!("Client {} closed", client);

        if self.waiting_version().await.is_none() {
            return Ok(None);
        }
        if should_promote(false, self.active_client_count().await) {
            return self.activate_waiting().await;
        }
        Ok(None)
    }

    async fn active_controller(&self) -> Option<Arc<CacheController>> {
        let workers = self.workers.lock().await;
        workers.active.as_ref().map(|w| w.controller.clone())
    }

    /// Clients controlled by the active worker, `None` when nothing is active
    async fn active_client_count(&self) -> Option<usize> {
        let active = self.active_controller().await?;
        let clients = self.clients.lock().await;
        Some(
            clients
                .values()
                .filter(|c| c.controller.as_ref().is_some_and(|o| Arc::ptr_eq(o, &active)))
                .count(),
        )
    }

    /// Promote the waiting worker
    ///
    /// If its activate handler fails, the worker becomes redundant and the
    /// previously active one is restored.
    async fn activate_waiting(&self) -> PrecacheResult<Option<ActivateReport>> {
        let (worker, previous) = {
            let mut workers = self.workers.lock().await;
            let Some(worker) = workers.waiting.take() else {
                return Ok(None);
            };
            let previous = workers.active.replace(worker.clone());
            (worker, previous)
        };

        let version = worker.controller.version();
        transition(version, WorkerState::Installed, WorkerState::Activating);

        let report = match worker.controller.on_activate(worker.host.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                transition(version, WorkerState::Activating, WorkerState::Redundant);
                warn!("Activation of {} failed: {}", version, e);
                let mut workers = self.workers.lock().await;
                let still_ours = workers
                    .active
                    .as_ref()
                    .is_some_and(|w| Arc::ptr_eq(&w.controller, &worker.controller));
                if still_ours {
                    workers.active = previous;
                }
                return Err(e);
            }
        };
        for failure in &report.failed {
            warn!("{}", failure);
        }

        if let Some(old) = previous {
            transition(
                old.controller.version(),
                WorkerState::Activated,
                WorkerState::Redundant,
            );
        }
        transition(version, WorkerState::Activating, WorkerState::Activated);
        Ok(Some(report))
    }

    async fn direct(&self, request: &Request) -> PrecacheResult<Served> {
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
