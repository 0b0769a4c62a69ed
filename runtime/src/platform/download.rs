//! Page downloader: render each course page and save its HTML.
//!
//! Retries belong here, not in the orchestrator: a failed attempt is retried
//! with jittered exponential backoff until the configured attempt count is
//! used up.

use super::manifest::{DownloadRecord, Manifest};
use crate::browser::{Tab, TabSource};
use crate::settings::DownloadSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use harvest_core::{ItemDownloader, ResolvedAddress};
use rand::Rng;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"))
}

/// File stem for an address: its last path segment, made filesystem-safe.
pub fn file_stem_for(address: &str) -> String {
    let segment = match Url::parse(address) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
            .or_else(|| url.host_str().map(str::to_string)),
        Err(_) => address
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string),
    };
    let cleaned = segment
        .map(|s| unsafe_chars().replace_all(&s, "-").trim_matches('-').to_string())
        .unwrap_or_default();
    if cleaned.is_empty() {
        "index".to_string()
    } else {
        cleaned
    }
}

/// Delay before retry number `attempt` (1-based): 500ms doubling, plus up to
/// half of that again as jitter.
fn backoff(attempt: u32) -> Duration {
    let base = 500u64 * 2u64.pow(attempt.saturating_sub(1).min(6));
    let jitter = rand::thread_rng().gen_range(0..=base / 2);
    Duration::from_millis(base + jitter)
}

pub struct PageDownloader<S> {
    tabs: Arc<S>,
    output_dir: PathBuf,
    attempts: u32,
    manifest: Manifest,
}

impl<S: TabSource> PageDownloader<S> {
    pub fn new(tabs: Arc<S>, settings: &DownloadSettings) -> Self {
        Self {
            tabs,
            output_dir: settings.output_dir.clone(),
            attempts: settings.attempts.max(1),
            manifest: Manifest::in_dir(&settings.output_dir),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    async fn render(&self, tab: &mut dyn Tab, address: &str) -> Result<(String, String)> {
        let nav = tab.navigate(address).await?;
        let html = tab.html().await?;
        Ok((nav.final_url, html))
    }

    async fn attempt(&self, address: &ResolvedAddress) -> Result<DownloadRecord> {
        let mut tab = self.tabs.open_tab().await?;
        let rendered = self.render(tab.as_mut(), address.as_str()).await;
        tab.close().await?;
        let (final_url, html) = rendered?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;
        let file = self
            .output_dir
            .join(format!("{}.html", file_stem_for(address.as_str())));
        tokio::fs::write(&file, html.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", file.display()))?;

        Ok(DownloadRecord::now(
            address.as_str(),
            &final_url,
            Path::new(&file),
            html.len() as u64,
        ))
    }
}

#[async_trait]
impl<S: TabSource> ItemDownloader for PageDownloader<S> {
    async fn download(&self, address: &ResolvedAddress) -> Result<()> {
        let mut attempt = 1;
        let record = loop {
            match self.attempt(address).await {
                Ok(record) => break record,
                Err(e) if attempt < self.attempts => {
                    let delay = backoff(attempt);
                    warn!(
                        address = %address,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "download failed, retrying: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("gave up after {attempt} attempt(s)")));
                }
            }
        };

        info!(file = %record.file, bytes = record.bytes, "saved {address}");
        self.manifest.append(&record)?;
        Ok(())
    }
}
