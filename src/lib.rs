//! commonfs library — content-verified binary object gateway.
//!
//! This crate provides the core components for running a small binary-object
//! storage gateway: header parsing into a structured request descriptor,
//! local staging of uploaded bytes, SHA-256 verification against the
//! client-declared digest, and commit into a pluggable backing store with
//! indexed metadata.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod meta;
pub mod pipeline;
pub mod retrieval;
pub mod server;
pub mod staging;
pub mod store;

use crate::config::Config;
use crate::staging::StagingArea;
use crate::store::object::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Backing content store (blobs + metadata index).
    pub store: Arc<dyn ObjectStore>,
    /// Local scratch area for unverified uploads.
    pub staging: StagingArea,
}
