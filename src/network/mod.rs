//! Network backends
//!
//! The controller only ever talks to the network through the [`Network`]
//! trait. An `Err` from [`Network::fetch`] means the transport failed
//! (offline, DNS, connection refused). HTTP error statuses are successful
//! fetches and come back as `Ok` responses.
//!
//! - `http`: real requests through a ureq agent
//! - `local`: serve a build directory as if it were the origin
//! - `offline`: every request fails

mod http;
mod local;

pub use http::HttpNetwork;
pub use local::LocalNetwork;

use crate::config::schema::{NetworkConfig, NetworkMode};
use crate::error::{PrecacheError, PrecacheResult};
use crate::request::{Request, Response};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Abstract network interface
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request and return whatever response the network yields
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response>;

    /// Human-readable backend name for display
    fn network_name(&self) -> &'static str;
}

/// A network that is never reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        Err(PrecacheError::network(request.url.as_str(), "offline"))
    }

    fn network_name(&self) -> &'static str {
        "offline"
    }
}

/// Create the network backend described by the configuration
///
/// `base_dir` anchors a relative `root` for the local backend (normally the
/// directory holding the deployment file).
pub fn create_network(
    config: &NetworkConfig,
    origin: &Url,
    base_dir: &Path,
) -> PrecacheResult<Arc<dyn Network>> {
    match config.mode {
        NetworkMode::Http => {
            let timeout = config.timeout_secs.map(Duration::from_secs);
            Ok(Arc::new(HttpNetwork::new(timeout, &config.user_agent)))
        }
        NetworkMode::Local => {
            let root = config.root.as_ref().ok_or_else(|| {
                PrecacheError::User("network.mode = \"local\" requires network.root".to_string())
            })?;
            let root = if root.is_absolute() {
                root.clone()
            } else {
                base_dir.join(root)
            };
            Ok(Arc::new(LocalNetwork::new(root, origin.clone())))
        }
        NetworkMode::Offline => Ok(Arc::new(OfflineNetwork)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn offline_always_fails() {
        let req = Request::parse("https://app.example.com/app.js").unwrap();
        let err = OfflineNetwork.fetch(&req).await.unwrap_err();
        assert!(matches!(err, PrecacheError::Network { .. }));
    }

    #[test]
    fn local_mode_requires_root() {
        let config = NetworkConfig {
            mode: NetworkMode::Local,
            root: None,
            ..NetworkConfig::default()
        };
        let origin = Url::parse("http://localhost/").unwrap();
        assert!(create_network(&config, &origin, Path::new(".")).is_err());
    }

    #[test]
    fn factory_names() {
        let origin = Url::parse("http://localhost/").unwrap();

        let http = create_network(&NetworkConfig::default(), &origin, Path::new(".")).unwrap();
        assert_eq!(http.network_name(), "http");

        let config = NetworkConfig {
            mode: NetworkMode::Local,
            root: Some(PathBuf::from("dist")),
            ..NetworkConfig::default()
        };
        let local = create_network(&config, &origin, Path::new("/srv/app")).unwrap();
        assert_eq!(local.network_name(), "local");
    }
}
