//! Session gate backed by the shared browser profile.
//!
//! Logging in is left to the user: `login` opens the login page (in a headed
//! browser) and waits until the logged-in marker shows up.

use crate::browser::{Tab, TabSource};
use crate::settings::{BrowserSettings, PlatformSettings};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use harvest_core::SessionGate;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Whether `html` contains an element matching `selector`.
pub fn has_marker(html: &str, selector: &str) -> Result<bool> {
    let selector = Selector::parse(selector)
        .map_err(|e| anyhow!("invalid loggedInSelector {selector:?}: {e:?}"))?;
    Ok(Html::parse_document(html).select(&selector).next().is_some())
}

pub struct BrowserSessionGate<S> {
    tabs: Arc<S>,
    check_url: String,
    login_url: String,
    marker: String,
    login_timeout: Duration,
    poll_interval: Duration,
}

impl<S: TabSource> BrowserSessionGate<S> {
    pub fn new(tabs: Arc<S>, platform: &PlatformSettings, browser: &BrowserSettings) -> Self {
        Self {
            tabs,
            check_url: platform.session_check_url.clone(),
            login_url: platform.login_url.clone(),
            marker: platform.logged_in_selector.clone(),
            login_timeout: Duration::from_secs(browser.login_timeout_secs),
            poll_interval: Duration::from_millis(browser.login_poll_ms),
        }
    }

    fn require(value: &str, key: &str) -> Result<()> {
        if value.trim().is_empty() {
            bail!("platform.{key} is not configured");
        }
        Ok(())
    }

    async fn probe(&self, tab: &mut dyn Tab) -> Result<bool> {
        let nav = tab.navigate(&self.check_url).await?;
        debug!(url = %nav.final_url, "session check page loaded");
        let html = tab.html().await?;
        has_marker(&html, &self.marker)
    }

    async fn wait_for_marker(&self, tab: &mut dyn Tab) -> Result<()> {
        tab.navigate(&self.login_url).await?;
        info!(url = %self.login_url, "Log in using the browser window; waiting for the session...");

        let deadline = Instant::now() + self.login_timeout;
        loop {
            let html = tab.html().await?;
            if has_marker(&html, &self.marker)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!(
                    "not logged in after {}s (marker {:?} never appeared)",
                    self.login_timeout.as_secs(),
                    self.marker
                );
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl<S: TabSource> SessionGate for BrowserSessionGate<S> {
    async fn is_authenticated(&self) -> Result<bool> {
        Self::require(&self.check_url, "sessionCheckUrl")?;
        Self::require(&self.marker, "loggedInSelector")?;

        let mut tab = self.tabs.open_tab().await?;
        let result = self.probe(tab.as_mut()).await;
        tab.close().await?;
        result
    }

    async fn login(&self) -> Result<()> {
        Self::require(&self.login_url, "loginUrl")?;
        Self::require(&self.marker, "loggedInSelector")?;

        let mut tab = self.tabs.open_tab().await?;
        let result = self.wait_for_marker(tab.as_mut()).await;
        tab.close().await?;
        result?;
        info!("Logged in");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_found() {
        let html = r#"<html><body><nav><a class="avatar" href="/me">Me</a></nav></body></html>"#;
        assert!(has_marker(html, "nav a.avatar").unwrap());
    }

    #[test]
    fn test_marker_absent() {
        let html = r#"<html><body><a href="/login">Log in</a></body></html>"#;
        assert!(!has_marker(html, "a.avatar").unwrap());
    }

    #[test]
    fn test_invalid_selector() {
        assert!(has_marker("<p></p>", "a[").is_err());
    }
}
