//! Core data types shared by the orchestrator and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier (slug) of one downloadable catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogEntry(String);

impl CatalogEntry {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn slug(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogEntry {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

impl From<String> for CatalogEntry {
    fn from(slug: String) -> Self {
        Self(slug)
    }
}

/// The concrete address handed to an [`ItemDownloader`](crate::ports::ItemDownloader).
///
/// Either a catalog slug joined onto the fixed course prefix, or the
/// single configured target taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress(String);

impl ResolvedAddress {
    /// Address for an explicitly configured target.
    pub fn explicit(target: &str) -> Self {
        Self(target.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the catalog is discovered and how its slugs become addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Discovery endpoint passed to the enumerator.
    pub endpoint: String,
    /// Fixed prefix every slug is appended to.
    pub address_prefix: String,
}

impl CatalogSource {
    pub fn new(endpoint: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            address_prefix: address_prefix.into(),
        }
    }

    /// Join a slug onto the address prefix.
    pub fn resolve(&self, entry: &CatalogEntry) -> ResolvedAddress {
        ResolvedAddress(format!("{}{}", self.address_prefix, entry.slug()))
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The mode guard rejected the configuration; nothing was touched.
    NothingToDo,
    /// Catalog mode found no items.
    EmptyCatalog,
    /// Every requested item was downloaded.
    Completed { downloaded: usize },
}
