//! precache - versioned offline cache for web application assets
//!
//! A [`CacheController`] installs a deployment's resources into a store
//! named after its version, deletes the stores of older versions when it
//! activates, and answers requests cache-first with network fallback.
//! [`Registration`] is the host that drives it.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod network;
pub mod request;
pub mod store;
pub mod ui;

#[cfg(test)]
mod testing;

pub use controller::{CacheController, Deployment, Served, ServedFrom, VersionTag};
pub use error::{PrecacheError, PrecacheResult};
pub use host::{Host, Registration};
pub use request::{Method, Request, Response};
pub use store::{CacheStorage, CacheStore, DiskCacheStorage, MemoryCacheStorage};
