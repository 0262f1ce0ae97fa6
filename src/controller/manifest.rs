//! Deployment identity: version tag, scope and resource manifest

use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::request::{cache_key, Request};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Identifier of a deployment's cache generation
///
/// Used both as the store name and to tell stale stores apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionTag(String);

impl VersionTag {
    /// Create a version tag; surrounding whitespace is trimmed
    pub fn new(tag: impl AsRef<str>) -> PrecacheResult<Self> {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return Err(PrecacheError::User(
                "Version tag must not be empty".to_string(),
            ));
        }
        Ok(Self(tag.to_string()))
    }

    /// Tag as a store name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for VersionTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Ordered list of absolute resource URLs to pre-cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceManifest {
    resources: Vec<Url>,
}

impl ResourceManifest {
    /// Resolve manifest entries against a base URL
    ///
    /// Entries starting with `/` resolve against the origin root, bare
    /// paths against `base`. Fragments are dropped. An entry resolving to
    /// the same URL as an earlier one is an error.
    pub fn resolve<S: AsRef<str>>(base: &Url, entries: &[S]) -> PrecacheResult<Self> {
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.as_ref().trim();
            let mut url = base.join(entry).map_err(|e| PrecacheError::url(entry, e))?;
            url.set_fragment(None);

            if !seen.insert(cache_key(&url)) {
                return Err(PrecacheError::DuplicateResource(url.to_string()));
            }
            resources.push(url);
        }

        Ok(Self { resources })
    }

    /// Resolved resource URLs, in manifest order
    pub fn resources(&self) -> &[Url] {
        &self.resources
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the manifest lists nothing
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// GET requests for every resource, in manifest order
    pub fn requests(&self) -> Vec<Request> {
        self.resources.iter().cloned().map(Request::get).collect()
    }
}

/// Everything fixed at deploy time for one controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Cache generation
    pub version: VersionTag,
    /// Controlled scope URL (always ends with `/`)
    pub scope: Url,
    /// Resources installed into the cache
    pub manifest: ResourceManifest,
}

impl Deployment {
    /// Build a deployment from an origin, scope path and manifest entries
    pub fn new<S: AsRef<str>>(
        version: &str,
        origin: &str,
        scope: &str,
        resources: &[S],
    ) -> PrecacheResult<Self> {
        let origin = Url::parse(origin).map_err(|e| PrecacheError::url(origin, e))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(PrecacheError::User(format!(
                "Origin must be an http(s) URL, got {}",
                origin
            )));
        }

        let mut scope_path = scope.trim().to_string();
        if !scope_path.ends_with('/') {
            scope_path.push('/');
        }
        let scope = origin
            .join(&scope_path)
            .map_err(|e| PrecacheError::url(&scope_path, e))?;

        Ok(Self {
            version: VersionTag::new(version)?,
            manifest: ResourceManifest::resolve(&scope, resources)?,
            scope,
        })
    }

    /// Build the deployment described by a configuration
    pub fn from_config(config: &Config) -> PrecacheResult<Self> {
        Self::new(
            &config.deployment.version,
            &config.deployment.origin,
            &config.deployment.scope,
            config.manifest.resources.as_slice(),
        )
    }

    /// Whether a URL falls under this deployment's scope
    pub fn in_scope(&self, url: &Url) -> bool {
        url.as_str().starts_with(self.scope.as_str())
    }
}
