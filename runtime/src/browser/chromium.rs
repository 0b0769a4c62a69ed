//! Chromium process handle using chromiumoxide.
//!
//! One browser per run: launched on the first tab request, reused by every
//! collaborator afterwards, closed once by the orchestrator's teardown.

use super::{BrowserCookie, NavigationResult, Tab, TabSource};
use crate::settings::BrowserSettings;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use harvest_core::{FatalContainment, ProcessHandle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Overrides every other Chromium lookup.
pub const ENV_CHROMIUM_PATH: &str = "HARVEST_CHROMIUM_PATH";

/// Find the Chromium binary path.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    // 1. HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(ENV_CHROMIUM_PATH) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. browser.chromiumPath setting
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 3. ~/.course-harvest/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".course-harvest/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".course-harvest/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".course-harvest/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".course-harvest/chromium/chrome-linux64/chrome"),
                home.join(".course-harvest/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 4. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 5. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Lazily launched, shared Chromium instance.
pub struct ChromiumProcess {
    settings: BrowserSettings,
    containment: FatalContainment,
    browser: Mutex<Option<Browser>>,
    launches: AtomicUsize,
}

impl ChromiumProcess {
    /// Nothing is launched until the first tab is requested.
    pub fn new(settings: BrowserSettings, containment: FatalContainment) -> Self {
        Self {
            settings,
            containment,
            browser: Mutex::new(None),
            launches: AtomicUsize::new(0),
        }
    }

    /// How many times a browser was actually launched.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    async fn launch(&self) -> Result<Browser> {
        let chrome_path = find_chromium(self.settings.chromium_path.as_deref()).context(
            "Chromium not found. Set browser.chromiumPath or HARVEST_CHROMIUM_PATH.",
        )?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        builder = if self.settings.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(profile) = self.settings.resolved_profile_dir() {
            builder = builder.user_data_dir(profile);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Nobody awaits the handler, so it runs under containment.
        self.containment.spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {e}");
                }
            }
            Ok(())
        });

        self.launches.fetch_add(1, Ordering::Relaxed);
        info!(headless = self.settings.headless, "Chromium launched");
        Ok(browser)
    }

    /// Launch into `slot` unless a browser is already there.
    async fn ensure_running<'g>(&self, slot: &'g mut Option<Browser>) -> Result<&'g mut Browser> {
        let browser = match slot.take() {
            Some(browser) => browser,
            None => self.launch().await?,
        };
        Ok(slot.insert(browser))
    }
}

#[async_trait]
impl TabSource for ChromiumProcess {
    async fn open_tab(&self) -> Result<Box<dyn Tab>> {
        let page = {
            let mut slot = self.browser.lock().await;
            let browser = self.ensure_running(&mut slot).await?;
            browser
                .new_page("about:blank")
                .await
                .context("failed to create new page")?
        };

        Ok(Box::new(ChromiumTab {
            page,
            timeout: Duration::from_millis(self.settings.navigation_timeout_ms),
        }))
    }
}

#[async_trait]
impl ProcessHandle for ChromiumProcess {
    async fn acquire(&self) -> Result<()> {
        let mut slot = self.browser.lock().await;
        self.ensure_running(&mut slot).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            debug!("browser was never launched, nothing to close");
            return Ok(());
        };
        browser.close().await.context("failed to close Chromium")?;
        browser
            .wait()
            .await
            .context("failed waiting for Chromium to exit")?;
        info!("Chromium closed");
        Ok(())
    }
}

/// A single Chromium page.
pub struct ChromiumTab {
    page: Page,
    timeout: Duration,
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(self.timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                let load_time_ms = start.elapsed().as_millis() as u64;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!(
                "navigation to {url} timed out after {}ms",
                self.timeout.as_millis()
            ),
        }
    }

    async fn html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("failed to read cookies")?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close tab")?;
        Ok(())
    }
}
