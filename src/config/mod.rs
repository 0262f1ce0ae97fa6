//! Deployment configuration management

pub mod schema;

pub use schema::Config;

use crate::error::{PrecacheError, PrecacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Deployment file name looked up from the working directory
pub const CONFIG_FILE_NAME: &str = "precache.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for a specific deployment file
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Find the deployment file by walking up from `start`
    pub fn find_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Get the default storage directory
    pub fn default_storage_dir() -> PathBuf {
        dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("precache")
    }

    /// Storage directory for a configuration, relative paths anchored at
    /// the deployment file's directory
    pub fn storage_dir(&self, config: &Config) -> PathBuf {
        match &config.storage.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_dir().join(dir),
            None => Self::default_storage_dir(),
        }
    }

    /// Directory containing the deployment file
    pub fn base_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Load the deployment file
    pub async fn load(&self) -> PrecacheResult<Config> {
        if !self.config_path.exists() {
            return Err(PrecacheError::ConfigNotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            PrecacheError::io(format!("reading config from {}", self.config_path.display()), e)
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| PrecacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;

        if config.deployment.version.trim().is_empty() {
            return Err(PrecacheError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: "deployment.version must not be empty".to_string(),
            });
        }

        debug!(
            "Loaded deployment {} from {}",
            config.deployment.version,
            self.config_path.display()
        );
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Starter deployment file written by `precache init`
pub fn template() -> &'static str {
    r#"# precache deployment file

[deployment]
# Cache version: change it on every deploy (a commit hash works well)
version = "v1"
origin = "http://localhost:8080/"
scope = "/"

[manifest]
# Resources cached at install time. Install fails if any is unreachable.
resources = [
  "/",
  "index.html",
]

[network]
# "http", "local" (serve `root` as the origin) or "offline"
mode = "http"
# root = "dist"
# timeout_secs = 30

[storage]
# dir = ".precache"
"#
}
