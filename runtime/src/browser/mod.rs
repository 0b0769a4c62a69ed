//! Browser abstraction shared by the platform collaborators.
//!
//! Defines the `TabSource` and `Tab` traits that abstract over the browser
//! engine (currently Chromium via chromiumoxide), so the session gate,
//! catalog and downloader can be exercised without a real browser.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A cookie held by the browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
}

/// Render a `Cookie` request header from browser cookies.
pub fn cookie_header(cookies: &[BrowserCookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Something that can open browser tabs.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Open a new blank tab, launching the browser first if needed.
    async fn open_tab(&self) -> Result<Box<dyn Tab>>;
}

/// A single browser tab.
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigate and wait for the page to load.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult>;
    /// Full rendered HTML of the current page.
    async fn html(&self) -> Result<String>;
    /// Cookies visible to the current page.
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;
    /// Close this tab.
    async fn close(self: Box<Self>) -> Result<()>;
}
