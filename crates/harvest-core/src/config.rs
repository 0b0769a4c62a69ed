//! Run configuration and the mode guard.

use crate::error::{ConfigError, NoTarget};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Overrides `courseUrl`.
pub const ENV_COURSE_URL: &str = "HARVEST_COURSE_URL";
/// Overrides `loginCheck`.
pub const ENV_LOGIN_CHECK: &str = "HARVEST_LOGIN_CHECK";
/// Overrides `downloadAllCourses`.
pub const ENV_DOWNLOAD_ALL: &str = "HARVEST_DOWNLOAD_ALL";

/// What a single run should do. Built once at startup and only ever
/// borrowed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    /// Single course address; empty when unset.
    #[serde(rename = "courseUrl")]
    pub target_url: String,
    /// Check for an existing session before doing anything else.
    #[serde(rename = "loginCheck")]
    pub login_check: bool,
    /// Enumerate and download the whole catalog.
    #[serde(rename = "downloadAllCourses")]
    pub download_all: bool,
}

/// The decision made by the mode guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Catalog,
    Single(String),
}

impl RunConfiguration {
    /// Mode guard: decide between catalog and single-item mode.
    ///
    /// Catalog mode wins when both are configured.
    pub fn mode(&self) -> Result<RunMode, NoTarget> {
        let target = self.target_url.trim();
        if self.download_all {
            if !target.is_empty() {
                warn!(course_url = %target, "downloadAllCourses is set, ignoring courseUrl");
            }
            return Ok(RunMode::Catalog);
        }
        if target.is_empty() {
            return Err(NoTarget);
        }
        Ok(RunMode::Single(target.to_string()))
    }

    /// Apply `HARVEST_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_COURSE_URL) {
            self.target_url = url;
        }
        if let Some(value) = lookup(ENV_LOGIN_CHECK) {
            self.login_check = parse_flag(ENV_LOGIN_CHECK, &value)?;
        }
        if let Some(value) = lookup(ENV_DOWNLOAD_ALL) {
            self.download_all = parse_flag(ENV_DOWNLOAD_ALL, &value)?;
        }
        Ok(())
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}
