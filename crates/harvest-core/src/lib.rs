//! Harvest core: run configuration, mode guard, collaborator ports, the
//! run orchestrator and process-wide fatal-error containment.
//!
//! Nothing in this crate talks to a browser or the network. The concrete
//! collaborators live in the `course-harvest` runtime crate and plug in
//! through the traits in [`ports`].

pub mod config;
pub mod containment;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod timing;
pub mod types;

pub use config::{RunConfiguration, RunMode};
pub use containment::{FailureSource, FatalContainment, ProcessExit, Terminate};
pub use error::{ConfigError, HarvestError, NoTarget};
pub use orchestrator::{Collaborators, Orchestrator};
pub use ports::{CatalogEnumerator, ItemDownloader, ProcessHandle, SessionGate};
pub use timing::Stopwatch;
pub use types::*;
