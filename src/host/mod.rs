//! Host side of the controller lifecycle
//!
//! The controller only ever talks to its host through [`Host`]. The
//! [`Registration`] type plays the host for one scope: it drives install and
//! activate, tracks which worker is active or waiting, and routes client
//! requests to the controller that controls them.

mod registration;

pub use registration::{Registration, UpdateReport};

use crate::error::PrecacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Signals a controller may send to its host
#[async_trait]
pub trait Host: Send + Sync {
    /// Ask to be activated without waiting for old clients to close
    async fn skip_waiting(&self);

    /// Take control of every open client in scope, returning how many changed
    async fn claim_clients(&self) -> PrecacheResult<usize>;
}

/// Lifecycle state of one deployed worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Identifier of an open client (a page or tab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
