//! `course-harvest run`: the default command.

use crate::browser::chromium::ChromiumProcess;
use crate::http_client::HttpClient;
use crate::platform::{BrowserSessionGate, HttpCatalog, PageDownloader};
use crate::settings::{Overrides, Settings};
use anyhow::Result;
use harvest_core::{Collaborators, FatalContainment, Orchestrator, RunOutcome};
use std::path::Path;
use std::sync::Arc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Load settings, wire the Chromium-backed collaborators and run once.
///
/// The browser is only launched by the first collaborator that needs it, so
/// a run rejected by the mode guard never starts Chromium.
pub async fn run(
    config: Option<&Path>,
    overrides: &Overrides,
    containment: FatalContainment,
) -> Result<RunOutcome> {
    let mut settings = Settings::load(config)?;
    settings.apply_overrides(overrides);

    let span = info_span!("run", run_id = %Uuid::new_v4());
    execute(&settings, containment).instrument(span).await
}

async fn execute(settings: &Settings, containment: FatalContainment) -> Result<RunOutcome> {
    let process = Arc::new(ChromiumProcess::new(settings.browser.clone(), containment));
    let http = HttpClient::new(settings.browser.navigation_timeout_ms);

    let session = BrowserSessionGate::new(Arc::clone(&process), &settings.platform, &settings.browser);
    let catalog = HttpCatalog::new(Arc::clone(&process), http, &settings.platform);
    let downloader = PageDownloader::new(Arc::clone(&process), &settings.download);

    let source = settings.catalog_source();
    let collaborators = Collaborators {
        session: &session,
        catalog: &catalog,
        downloader: &downloader,
        process: &*process,
    };

    let outcome = Orchestrator::new(&settings.run, &source, collaborators)
        .run()
        .await?;
    Ok(outcome)
}
