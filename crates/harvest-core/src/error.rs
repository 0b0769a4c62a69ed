//! Error types for the harvest core.

/// The run has neither a single target nor catalog mode enabled.
///
/// This is a configuration diagnostic, not a failure: the orchestrator
/// reports it and returns without touching any collaborator.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Either set courseUrl or make downloadAllCourses true in config file.")]
pub struct NoTarget;

/// Invalid run configuration input.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false, 1/0, yes/no, on/off), got {value:?}")]
    InvalidFlag { var: String, value: String },
}

/// A collaborator failure surfaced by the orchestrator.
///
/// The orchestrator never recovers from any of these; they are escalated to
/// fatal containment by the caller.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("session check failed")]
    SessionCheck(#[source] anyhow::Error),

    #[error("login failed")]
    Login(#[source] anyhow::Error),

    #[error("catalog enumeration of {endpoint} failed")]
    Enumerate {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("download of {address} failed")]
    Download {
        address: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("closing the browser failed")]
    Close(#[source] anyhow::Error),
}
