//! Collaborator interfaces consumed by the orchestrator.
//!
//! Every call is awaited to completion before the next one starts, so
//! implementations never see concurrent calls from the orchestrator.

use crate::types::{CatalogEntry, ResolvedAddress};
use anyhow::Result;
use async_trait::async_trait;

/// Authentication state of the remote platform.
#[async_trait]
pub trait SessionGate: Send + Sync {
    /// Whether a session already exists. Must not change any state.
    async fn is_authenticated(&self) -> Result<bool>;
    /// Establish a session. Only called when `is_authenticated` said no.
    async fn login(&self) -> Result<()>;
}

/// Discovers every downloadable item.
#[async_trait]
pub trait CatalogEnumerator: Send + Sync {
    /// Fully materialized, order-preserving list of slugs.
    async fn enumerate(&self, endpoint: &str) -> Result<Vec<CatalogEntry>>;
}

/// Downloads one item. Progress reporting and retries are its own business.
#[async_trait]
pub trait ItemDownloader: Send + Sync {
    async fn download(&self, address: &ResolvedAddress) -> Result<()>;
}

/// The long-lived automation resource shared by the other collaborators.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Start the resource, or reuse it if it is already running.
    async fn acquire(&self) -> Result<()>;
    /// Release the resource. Closing a handle that was never acquired is a
    /// no-op.
    async fn close(&self) -> Result<()>;
}
