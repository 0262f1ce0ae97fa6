//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Lifecycle errors
    #[error("Install of cache {version} failed: {url}: {reason}")]
    InstallPopulation {
        version: String,
        url: String,
        reason: String,
    },

    #[error("Failed to delete stale cache {name}: {reason}")]
    StaleStoreDeletion { name: String, reason: String },

    #[error("Request failed: {url} is not cached and the network is unavailable: {reason}")]
    RequestResolution { url: String, reason: String },

    #[error("Invalid lifecycle state: {0}")]
    InvalidState(String),

    // Network errors
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    // Storage errors
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    #[error("Corrupt cache store at {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Resource listed twice in manifest: {0}")]
    DuplicateResource(String),

    #[error("Invalid URL {input}: {source}")]
    UrlParse {
        input: String,
        #[source]
        source: url::ParseError,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network transport error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a URL parse error
    pub fn url(input: impl Into<String>, source: url::ParseError) -> Self {
        Self::UrlParse {
            input: input.into(),
            source,
        }
    }

    /// Turn a failed network fetch into a failed request resolution
    pub fn unresolved(self, url: &str) -> Self {
        match self {
            Self::Network { url, reason } => Self::RequestResolution { url, reason },
            e @ Self::RequestResolution { .. } => e,
            e => Self::RequestResolution {
                url: url.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: precache init"),
            Self::InstallPopulation { .. } => {
                Some("Every manifest resource must be reachable; the previous cache is still active")
            }
            Self::RequestResolution { .. } => Some("Run: precache install while online"),
            Self::DuplicateResource(_) => Some("Remove the repeated entry from [manifest] resources"),
            Self::StoreCorrupt { .. } => Some("Run: precache clear --yes, then reinstall"),
            _ => None,
        }
    }
}
