//! Deployment file schema
//!
//! The deployment file (`precache.toml`) is written at build/deploy time and
//! fixes the cache version and the resources to pre-cache.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment identity
    pub deployment: DeploymentConfig,

    /// Resources installed into the cache
    pub manifest: ManifestConfig,

    /// Network backend
    pub network: NetworkConfig,

    /// Cache storage location
    pub storage: StorageConfig,
}

/// Deployment identity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Cache version tag, unique per deployment
    pub version: String,

    /// Application origin, e.g. `https://app.example.com/`
    pub origin: String,

    /// Controlled scope path under the origin
    pub scope: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            origin: "http://localhost:8080/".to_string(),
            scope: "/".to_string(),
        }
    }
}

/// Resource manifest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Paths or URLs to pre-cache, in order
    pub resources: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            resources: vec!["/".to_string()],
        }
    }
}

/// Which network backend serves requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Real HTTP requests
    #[default]
    Http,
    /// Serve a build directory as the origin
    Local,
    /// No network at all
    Offline,
}

/// Network backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Backend to use
    pub mode: NetworkMode,

    /// Build directory for `local` mode, relative to the deployment file
    pub root: Option<PathBuf>,

    /// Overall HTTP request timeout in seconds (none by default)
    pub timeout_secs: Option<u64>,

    /// User-Agent sent by the HTTP backend
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: NetworkMode::Http,
            root: None,
            timeout_secs: None,
            user_agent: concat!("precache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Cache storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage directory (defaults to the user cache directory)
    pub dir: Option<PathBuf>,
}
