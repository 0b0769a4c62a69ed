//! The run orchestrator: mode guard, session gating, catalog sequencing and
//! teardown of the shared process handle.
//!
//! The orchestrator recovers nothing. A collaborator failure stops the run,
//! the process handle is still released, and the failure is returned for
//! the caller to hand to [`FatalContainment`](crate::containment::FatalContainment).

use crate::config::{RunConfiguration, RunMode};
use crate::error::HarvestError;
use crate::ports::{CatalogEnumerator, ItemDownloader, ProcessHandle, SessionGate};
use crate::timing::Stopwatch;
use crate::types::{CatalogSource, ResolvedAddress, RunOutcome};
use tracing::{info, warn};

/// Label used for the enumeration timing line.
const ENUMERATE_LABEL: &str = "fetchAllCoursesAvailableToDownload";

/// The collaborators one run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub session: &'a dyn SessionGate,
    pub catalog: &'a dyn CatalogEnumerator,
    pub downloader: &'a dyn ItemDownloader,
    pub process: &'a dyn ProcessHandle,
}

/// Drives one run over borrowed configuration and collaborators.
pub struct Orchestrator<'a> {
    config: &'a RunConfiguration,
    source: &'a CatalogSource,
    collaborators: Collaborators<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        source: &'a CatalogSource,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            source,
            collaborators,
        }
    }

    /// Execute the run.
    ///
    /// Returns `NothingToDo` without any collaborator call when the mode
    /// guard rejects the configuration. On every other path the process
    /// handle is closed exactly once before returning.
    pub async fn run(&self) -> Result<RunOutcome, HarvestError> {
        let mode = match self.config.mode() {
            Ok(mode) => mode,
            Err(no_target) => {
                warn!("{no_target} Exiting now...");
                return Ok(RunOutcome::NothingToDo);
            }
        };

        let run_watch = Stopwatch::start("run");
        let driven = self.drive(&mode).await;
        let closed = self
            .collaborators
            .process
            .close()
            .await
            .map_err(HarvestError::Close);

        match (driven, closed) {
            (Ok(outcome), Ok(())) => {
                if matches!(outcome, RunOutcome::Completed { .. }) {
                    info!("=> Done");
                }
                run_watch.finish();
                Ok(outcome)
            }
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "browser did not close cleanly after a failed run");
                Err(err)
            }
        }
    }

    async fn drive(&self, mode: &RunMode) -> Result<RunOutcome, HarvestError> {
        self.gate_session().await?;

        match mode {
            RunMode::Catalog => self.download_catalog().await,
            RunMode::Single(target) => {
                let address = ResolvedAddress::explicit(target);
                self.download_one(target, &address).await?;
                Ok(RunOutcome::Completed { downloaded: 1 })
            }
        }
    }

    async fn gate_session(&self) -> Result<(), HarvestError> {
        info!("CHECK IF ALREADY LOGGED IN: {}", self.config.login_check);
        if !self.config.login_check {
            return Ok(());
        }

        let session = self.collaborators.session;
        let logged_in = session
            .is_authenticated()
            .await
            .map_err(HarvestError::SessionCheck)?;

        if logged_in {
            info!("Already logged in");
        } else {
            session.login().await.map_err(HarvestError::Login)?;
        }
        Ok(())
    }

    async fn download_catalog(&self) -> Result<RunOutcome, HarvestError> {
        info!("Getting all the available courses to download...");

        let watch = Stopwatch::start(ENUMERATE_LABEL);
        let entries = self
            .collaborators
            .catalog
            .enumerate(&self.source.endpoint)
            .await
            .map_err(|source| HarvestError::Enumerate {
                endpoint: self.source.endpoint.clone(),
                source,
            })?;
        watch.finish();

        if entries.is_empty() {
            info!("No Courses Available to download.");
            return Ok(RunOutcome::EmptyCatalog);
        }

        info!("Found a total of {} courses to download.", entries.len());
        info!("Downloading all the available courses now.");

        let addresses: Vec<_> = entries
            .iter()
            .map(|entry| (entry, self.source.resolve(entry)))
            .collect();
        for (_, address) in &addresses {
            info!("{address}");
        }

        for (entry, address) in &addresses {
            self.download_one(entry.slug(), address).await?;
        }

        Ok(RunOutcome::Completed {
            downloaded: addresses.len(),
        })
    }

    async fn download_one(&self, label: &str, address: &ResolvedAddress) -> Result<(), HarvestError> {
        let watch = Stopwatch::start(label);
        self.collaborators
            .downloader
            .download(address)
            .await
            .map_err(|source| HarvestError::Download {
                address: address.to_string(),
                source,
            })?;
        watch.finish();
        Ok(())
    }
}
