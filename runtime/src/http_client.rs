//! Async HTTP client wrapping reqwest.
//!
//! Used for JSON endpoints that do not need a rendered page. Handles
//! redirects, timeouts, retry on 5xx and backoff on 429.

use anyhow::{bail, Context, Result};
use reqwest::header::{ACCEPT, COOKIE};
use std::time::Duration;
use tracing::debug;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// HTTP client for catalog discovery.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with standard Chrome user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_retries: 2,
        }
    }

    /// Perform a GET with retry on 5xx and backoff on 429.
    ///
    /// Non-retryable statuses are returned as-is; callers decide.
    pub async fn get(&self, url: &str, cookie: Option<&str>) -> Result<HttpResponse> {
        let mut retries = 0u32;

        loop {
            let mut request = self.client.get(url).header(ACCEPT, "application/json");
            if let Some(cookie) = cookie {
                request = request.header(COOKIE, cookie);
            }

            match request.send().await {
                Ok(r) => {
                    let status = r.status().as_u16();
                    let final_url = r.url().to_string();

                    // Retry on 5xx
                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        debug!(url, status, retries, "server error, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    // Backoff on 429
                    if status == 429 && retries < self.max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        let delay = Duration::from_secs(retry_after.min(10));
                        debug!(url, retries, "rate limited, backing off");
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = r
                        .text()
                        .await
                        .with_context(|| format!("reading response body from {final_url} failed"))?;

                    return Ok(HttpResponse {
                        url: url.to_string(),
                        final_url,
                        status,
                        body,
                    });
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e).with_context(|| format!("GET {url} failed"));
                }
            }
        }
    }

    /// GET a JSON document, failing on any non-2xx status.
    pub async fn get_json(&self, url: &str, cookie: Option<&str>) -> Result<serde_json::Value> {
        let response = self.get(url, cookie).await?;
        if !(200..300).contains(&response.status) {
            bail!("GET {} returned HTTP {}", response.final_url, response.status);
        }
        serde_json::from_str(&response.body)
            .with_context(|| format!("response from {} is not valid JSON", response.final_url))
    }
}
