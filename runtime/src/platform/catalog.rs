//! Catalog enumeration over the platform's JSON API.
//!
//! The endpoint is fetched with plain HTTP, carrying the browser session's
//! cookies so it sees the same account as the browser.

use crate::browser::{cookie_header, TabSource};
use crate::http_client::HttpClient;
use crate::settings::PlatformSettings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use harvest_core::{CatalogEntry, CatalogEnumerator};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Pull slugs out of a catalog response.
///
/// Accepts a top-level array, or an object holding the array under
/// `list_field`. Each element is either a slug string or an object with the
/// slug under `slug_field`. Blank slugs are skipped; order is preserved.
pub fn extract_slugs(
    body: &Value,
    list_field: Option<&str>,
    slug_field: &str,
) -> Result<Vec<CatalogEntry>> {
    let items = match (body, list_field) {
        (Value::Array(items), _) => items,
        (Value::Object(map), Some(field)) => match map.get(field) {
            Some(Value::Array(items)) => items,
            Some(_) => bail!("catalog field {field:?} is not an array"),
            None => bail!("catalog response has no {field:?} field"),
        },
        (Value::Object(_), None) => {
            bail!("catalog response is an object; set platform.catalogListField")
        }
        _ => bail!("catalog response is neither an array nor an object"),
    };

    let slugs = items
        .iter()
        .filter_map(|item| match item {
            Value::String(slug) => Some(slug.as_str()),
            Value::Object(fields) => fields.get(slug_field).and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(CatalogEntry::from)
        .collect();
    Ok(slugs)
}

pub struct HttpCatalog<S> {
    tabs: Arc<S>,
    http: HttpClient,
    list_field: Option<String>,
    slug_field: String,
}

impl<S: TabSource> HttpCatalog<S> {
    pub fn new(tabs: Arc<S>, http: HttpClient, platform: &PlatformSettings) -> Self {
        Self {
            tabs,
            http,
            list_field: platform.catalog_list_field.clone(),
            slug_field: platform.catalog_slug_field.clone(),
        }
    }

    /// Cookies the browser holds for the endpoint's origin.
    async fn session_cookie(&self, endpoint: &Url) -> Result<Option<String>> {
        let origin = endpoint.origin().ascii_serialization();
        let mut tab = self.tabs.open_tab().await?;
        let cookies = match tab.navigate(&origin).await {
            Ok(_) => tab.cookies().await,
            Err(e) => Err(e),
        };
        tab.close().await?;
        let cookies = cookies?;
        debug!(origin = %origin, count = cookies.len(), "copied browser cookies");
        Ok(cookie_header(&cookies))
    }
}

#[async_trait]
impl<S: TabSource> CatalogEnumerator for HttpCatalog<S> {
    async fn enumerate(&self, endpoint: &str) -> Result<Vec<CatalogEntry>> {
        if endpoint.trim().is_empty() {
            bail!("platform.catalogEndpoint is not configured");
        }
        let url = Url::parse(endpoint)
            .with_context(|| format!("invalid catalog endpoint {endpoint:?}"))?;

        let cookie = self.session_cookie(&url).await?;
        let body = self.http.get_json(url.as_str(), cookie.as_deref()).await?;
        extract_slugs(&body, self.list_field.as_deref(), &self.slug_field)
    }
}
