//! CLI command implementations

pub mod clear;
pub mod config;
pub mod entries;
pub mod fetch;
pub mod init;
pub mod install;
pub mod list;

pub use clear::execute as clear;
pub use config::execute as config;
pub use entries::execute as entries;
pub use fetch::execute as fetch;
pub use init::execute as init;
pub use install::execute as install;
pub use list::execute as list;

use crate::config::{Config, ConfigManager, CONFIG_FILE_NAME};
use crate::controller::Deployment;
use crate::error::{PrecacheError, PrecacheResult};
use crate::network::{create_network, Network};
use crate::store::DiskCacheStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs from the environment: the loaded deployment
/// file and the storage directory it resolves to
pub struct Workspace {
    pub manager: ConfigManager,
    pub config: Config,
    pub storage_dir: PathBuf,
}

impl Workspace {
    /// Locate and load the deployment file
    ///
    /// An explicit path wins; otherwise the file is searched for upwards from
    /// the current directory.
    pub async fn load(
        config_path: Option<PathBuf>,
        storage_dir: Option<PathBuf>,
    ) -> PrecacheResult<Self> {
        let manager = match config_path {
            Some(path) => ConfigManager::with_path(path),
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|e| PrecacheError::io("getting current directory", e))?;
                let found = ConfigManager::find_config(&cwd)
                    .ok_or_else(|| PrecacheError::ConfigNotFound(cwd.join(CONFIG_FILE_NAME)))?;
                debug!("Found deployment file: {}", found.display());
                ConfigManager::with_path(found)
            }
        };

        let config = manager.load().await?;
        let storage_dir = storage_dir.unwrap_or_else(|| manager.storage_dir(&config));
        debug!("Cache storage: {}", storage_dir.display());

        Ok(Self {
            manager,
            config,
            storage_dir,
        })
    }

    /// Deployment described by the loaded file
    pub fn deployment(&self) -> PrecacheResult<Deployment> {
        Deployment::from_config(&self.config)
    }

    /// Persistent cache storage
    pub fn storage(&self) -> DiskCacheStorage {
        DiskCacheStorage::new(&self.storage_dir)
    }

    /// Network backend for a deployment
    pub fn network(&self, deployment: &Deployment) -> PrecacheResult<Arc<dyn Network>> {
        create_network(
            &self.config.network,
            &deployment.scope,
            &self.manager.base_dir(),
        )
    }
}

/// Format a byte count for tables
pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
