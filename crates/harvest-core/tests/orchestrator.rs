//! Orchestrator behaviour against recording collaborators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use harvest_core::*;
use std::sync::{Arc, Mutex};

// ─────────────────────── test doubles ───────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    CheckSession,
    Login,
    Enumerate(String),
    DownloadStart(String),
    DownloadEnd(String),
    Acquire,
    Close,
}

/// One double standing in for every collaborator, logging calls in order.
#[derive(Default)]
struct Platform {
    calls: Mutex<Vec<Call>>,
    authenticated: bool,
    catalog: Vec<&'static str>,
    fail_check: bool,
    fail_enumerate: bool,
    fail_download: Option<String>,
    fail_login: bool,
    fail_close: bool,
}

impl Platform {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|c| *c == wanted).count()
    }

    fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DownloadStart(a) => Some(a),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionGate for Platform {
    async fn is_authenticated(&self) -> Result<bool> {
        self.record(Call::CheckSession);
        if self.fail_check {
            return Err(anyhow!("session check page timed out"));
        }
        Ok(self.authenticated)
    }

    async fn login(&self) -> Result<()> {
        self.record(Call::Login);
        if self.fail_login {
            return Err(anyhow!("login page never showed the session marker"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogEnumerator for Platform {
    async fn enumerate(&self, endpoint: &str) -> Result<Vec<CatalogEntry>> {
        self.record(Call::Enumerate(endpoint.to_string()));
        if self.fail_enumerate {
            return Err(anyhow!("GET {endpoint} returned HTTP 401"));
        }
        Ok(self.catalog.iter().map(|s| CatalogEntry::from(*s)).collect())
    }
}

#[async_trait]
impl ItemDownloader for Platform {
    async fn download(&self, address: &ResolvedAddress) -> Result<()> {
        self.record(Call::DownloadStart(address.to_string()));
        tokio::task::yield_now().await;
        if self.fail_download.as_deref() == Some(address.as_str()) {
            return Err(anyhow!("page crashed"));
        }
        self.record(Call::DownloadEnd(address.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ProcessHandle for Platform {
    async fn acquire(&self) -> Result<()> {
        self.record(Call::Acquire);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close);
        if self.fail_close {
            return Err(anyhow!("browser already gone"));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingExit(Arc<Mutex<Vec<i32>>>);

impl Terminate for RecordingExit {
    fn terminate(&self, code: i32) {
        self.0.lock().unwrap().push(code);
    }
}

// ─────────────────────── helpers ───────────────────────

const ENDPOINT: &str = "https://learn.test/api/user/courses";
const PREFIX: &str = "https://learn.test/courses/";

fn source() -> CatalogSource {
    CatalogSource::new(ENDPOINT, PREFIX)
}

fn config(target: &str, login_check: bool, download_all: bool) -> RunConfiguration {
    RunConfiguration {
        target_url: target.to_string(),
        login_check,
        download_all,
    }
}

async fn run(config: &RunConfiguration, platform: &Platform) -> Result<RunOutcome, HarvestError> {
    let source = source();
    let collaborators = Collaborators {
        session: platform,
        catalog: platform,
        downloader: platform,
        process: platform,
    };
    Orchestrator::new(config, &source, collaborators).run().await
}

// ─────────────────────── mode guard ───────────────────────

#[tokio::test]
async fn test_no_target_makes_zero_calls() {
    let platform = Platform::default();
    let outcome = run(&config("", true, false), &platform).await.unwrap();
    assert_eq!(outcome, RunOutcome::NothingToDo);
    assert!(platform.calls().is_empty());
}

// ─────────────────────── session gating ───────────────────────

#[tokio::test]
async fn test_login_skipped_when_authenticated() {
    let platform = Platform {
        authenticated: true,
        ..Default::default()
    };
    run(&config("course/z", true, false), &platform).await.unwrap();
    assert_eq!(platform.count(&Call::CheckSession), 1);
    assert_eq!(platform.count(&Call::Login), 0);
}

#[tokio::test]
async fn test_login_runs_once_before_any_download() {
    let platform = Platform {
        authenticated: false,
        catalog: vec!["a"],
        ..Default::default()
    };
    run(&config("", true, true), &platform).await.unwrap();
    let calls = platform.calls();
    assert_eq!(platform.count(&Call::Login), 1);
    let login_at = calls.iter().position(|c| *c == Call::Login).unwrap();
    let first_download = calls
        .iter()
        .position(|c| matches!(c, Call::DownloadStart(_)))
        .unwrap();
    assert!(login_at < first_download);
}

#[tokio::test]
async fn test_session_not_checked_when_disabled() {
    let platform = Platform::default();
    run(&config("course/z", false, false), &platform).await.unwrap();
    assert_eq!(platform.count(&Call::CheckSession), 0);
    assert_eq!(platform.count(&Call::Login), 0);
}

#[tokio::test]
async fn test_login_failure_stops_run_and_closes() {
    let platform = Platform {
        fail_login: true,
        catalog: vec!["a"],
        ..Default::default()
    };
    let err = run(&config("", true, true), &platform).await.unwrap_err();
    assert!(matches!(err, HarvestError::Login(_)));
    assert_eq!(
        platform.calls(),
        vec![Call::CheckSession, Call::Login, Call::Close]
    );
}

#[tokio::test]
async fn test_session_check_failure_stops_run_and_closes() {
    let platform = Platform {
        fail_check: true,
        catalog: vec!["a"],
        ..Default::default()
    };
    let err = run(&config("", true, true), &platform).await.unwrap_err();
    assert!(matches!(err, HarvestError::SessionCheck(_)));
    assert_eq!(platform.calls(), vec![Call::CheckSession, Call::Close]);
    assert!(platform.downloads().is_empty());
}

// ─────────────────────── catalog mode ───────────────────────

#[tokio::test]
async fn test_enumerate_failure_stops_run_and_closes() {
    let platform = Platform {
        fail_enumerate: true,
        catalog: vec!["a", "b"],
        ..Default::default()
    };
    let err = run(&config("", false, true), &platform).await.unwrap_err();
    match &err {
        HarvestError::Enumerate { endpoint, .. } => assert_eq!(endpoint, ENDPOINT),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        platform.calls(),
        vec![Call::Enumerate(ENDPOINT.to_string()), Call::Close]
    );
    assert!(platform.downloads().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_closes_without_downloading() {
    let platform = Platform::default();
    let outcome = run(&config("", false, true), &platform).await.unwrap();
    assert_eq!(outcome, RunOutcome::EmptyCatalog);
    assert_eq!(
        platform.calls(),
        vec![Call::Enumerate(ENDPOINT.to_string()), Call::Close]
    );
}

#[tokio::test]
async fn test_catalog_downloads_sequentially_in_order() {
    let platform = Platform {
        catalog: vec!["a", "b", "c"],
        ..Default::default()
    };
    let outcome = run(&config("", false, true), &platform).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { downloaded: 3 });

    let expected: Vec<Call> = std::iter::once(Call::Enumerate(ENDPOINT.to_string()))
        .chain(["a", "b", "c"].into_iter().flat_map(|slug| {
            let address = format!("{PREFIX}{slug}");
            [Call::DownloadStart(address.clone()), Call::DownloadEnd(address)]
        }))
        .chain(std::iter::once(Call::Close))
        .collect();
    assert_eq!(platform.calls(), expected);
}

#[tokio::test]
async fn test_scenario_two_courses() {
    let platform = Platform {
        catalog: vec!["intro-to-x", "advanced-y"],
        ..Default::default()
    };
    let outcome = run(&config("", false, true), &platform).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { downloaded: 2 });
    assert_eq!(
        platform.downloads(),
        vec![
            format!("{PREFIX}intro-to-x"),
            format!("{PREFIX}advanced-y")
        ]
    );
    assert_eq!(platform.count(&Call::Close), 1);
    assert_eq!(platform.calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_download_failure_stops_remaining_entries() {
    let platform = Platform {
        catalog: vec!["a", "b", "c"],
        fail_download: Some(format!("{PREFIX}b")),
        ..Default::default()
    };
    let err = run(&config("", false, true), &platform).await.unwrap_err();
    match &err {
        HarvestError::Download { address, .. } => assert_eq!(address, &format!("{PREFIX}b")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        platform.downloads(),
        vec![format!("{PREFIX}a"), format!("{PREFIX}b")]
    );
    assert_eq!(platform.count(&Call::Close), 1);

    let exits = RecordingExit::default();
    let containment = FatalContainment::new(exits.clone());
    assert!(containment.contain(Err::<RunOutcome, _>(err)).is_none());
    assert_eq!(*exits.0.lock().unwrap(), vec![1]);
}

// ─────────────────────── single mode ───────────────────────

#[tokio::test]
async fn test_scenario_single_course() {
    let platform = Platform::default();
    let outcome = run(&config("course/z", false, false), &platform).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { downloaded: 1 });
    assert_eq!(
        platform.calls(),
        vec![
            Call::DownloadStart("course/z".to_string()),
            Call::DownloadEnd("course/z".to_string()),
            Call::Close,
        ]
    );
    assert_eq!(platform.count(&Call::Acquire), 0);
}

#[tokio::test]
async fn test_catalog_mode_ignores_target() {
    let platform = Platform {
        catalog: vec!["a"],
        ..Default::default()
    };
    run(&config("course/z", false, true), &platform).await.unwrap();
    assert_eq!(platform.downloads(), vec![format!("{PREFIX}a")]);
}

// ─────────────────────── teardown ───────────────────────

#[tokio::test]
async fn test_close_failure_after_success_is_reported() {
    let platform = Platform {
        fail_close: true,
        ..Default::default()
    };
    let err = run(&config("course/z", false, false), &platform).await.unwrap_err();
    assert!(matches!(err, HarvestError::Close(_)));
    assert_eq!(platform.count(&Call::Close), 1);
}

#[tokio::test]
async fn test_close_failure_does_not_mask_download_failure() {
    let platform = Platform {
        fail_close: true,
        fail_download: Some("course/z".to_string()),
        ..Default::default()
    };
    let err = run(&config("course/z", false, false), &platform).await.unwrap_err();
    assert!(matches!(err, HarvestError::Download { .. }));
    assert_eq!(platform.count(&Call::Close), 1);
}
