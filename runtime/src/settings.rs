//! Settings file loading and resolution.
//!
//! The file is JSON. Top-level `courseUrl`, `loginCheck` and
//! `downloadAllCourses` form the [`RunConfiguration`]; the nested sections
//! configure the concrete collaborators.

use harvest_core::{CatalogSource, ConfigError, RunConfiguration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Points at the settings file when `--config` is not given.
pub const ENV_CONFIG: &str = "HARVEST_CONFIG";

/// Settings errors.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("settings file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Env(#[from] ConfigError),
}

/// Everything one invocation needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub run: RunConfiguration,
    pub platform: PlatformSettings,
    pub browser: BrowserSettings,
    pub download: DownloadSettings,
}

/// Where the platform keeps its catalog, courses and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformSettings {
    /// JSON endpoint listing every course available to the account.
    pub catalog_endpoint: String,
    /// Prefix each catalog slug is appended to.
    pub course_url_prefix: String,
    /// Page where the user signs in.
    pub login_url: String,
    /// Page that shows the logged-in marker when a session exists.
    pub session_check_url: String,
    /// CSS selector present only for a logged-in user.
    pub logged_in_selector: String,
    /// Field holding the course array when the endpoint returns an object.
    pub catalog_list_field: Option<String>,
    /// Field holding the slug inside each course object.
    pub catalog_slug_field: String,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            catalog_endpoint: String::new(),
            course_url_prefix: String::new(),
            login_url: String::new(),
            session_check_url: String::new(),
            logged_in_selector: String::new(),
            catalog_list_field: None,
            catalog_slug_field: "slug".to_string(),
        }
    }
}

/// Chromium launch and navigation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit Chromium binary; searched for when unset.
    pub chromium_path: Option<PathBuf>,
    /// Persistent profile so a login survives between runs.
    pub profile_dir: Option<PathBuf>,
    pub navigation_timeout_ms: u64,
    pub login_timeout_secs: u64,
    pub login_poll_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            profile_dir: None,
            navigation_timeout_ms: 30_000,
            login_timeout_secs: 300,
            login_poll_ms: 2_000,
        }
    }
}

impl BrowserSettings {
    /// Profile directory, defaulting to `~/.course-harvest/profile`.
    pub fn resolved_profile_dir(&self) -> Option<PathBuf> {
        self.profile_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".course-harvest").join("profile")))
    }
}

/// Where snapshots go and how hard to try.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DownloadSettings {
    pub output_dir: PathBuf,
    pub attempts: u32,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            attempts: 3,
        }
    }
}

/// Command-line overrides; they win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub course_url: Option<String>,
    pub download_all: Option<bool>,
    pub login_check: Option<bool>,
}

impl Settings {
    /// Load settings from the resolved path, then apply `HARVEST_*`
    /// environment overrides. Missing implicit files fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match resolve_settings_path(explicit) {
            Some(path) => {
                info!(path = %path.display(), "loading settings");
                Self::from_file(&path)?
            }
            None => {
                if let Some(path) = explicit {
                    return Err(SettingsError::Missing(path.to_path_buf()));
                }
                debug!("no settings file found, using defaults");
                Self::default()
            }
        };
        settings.run.apply_env()?;
        Ok(settings)
    }

    /// Parse one settings file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.course_url {
            self.run.target_url = url.clone();
        }
        if let Some(all) = overrides.download_all {
            self.run.download_all = all;
        }
        if let Some(check) = overrides.login_check {
            self.run.login_check = check;
        }
    }

    pub fn catalog_source(&self) -> CatalogSource {
        CatalogSource::new(
            self.platform.catalog_endpoint.clone(),
            self.platform.course_url_prefix.clone(),
        )
    }
}

/// Resolve the settings file path.
///
/// Order: explicit path, `HARVEST_CONFIG`, `./config/default.json`,
/// `~/.course-harvest/config.json`. Only existing files are returned.
pub fn resolve_settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from("config/default.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    dirs::home_dir()
        .map(|home| home.join(".course-harvest").join("config.json"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "courseUrl": "",
        "loginCheck": true,
        "downloadAllCourses": true,
        "platform": {
            "catalogEndpoint": "https://learn.test/api/user/courses",
            "courseUrlPrefix": "https://learn.test/courses/",
            "catalogListField": "courses"
        },
        "browser": { "headless": false },
        "download": { "outputDir": "/tmp/harvest", "attempts": 5 }
    }"#;

    #[test]
    fn test_parse_full_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert!(settings.run.login_check);
        assert!(settings.run.download_all);
        assert_eq!(settings.platform.catalog_list_field.as_deref(), Some("courses"));
        assert_eq!(settings.platform.catalog_slug_field, "slug");
        assert!(!settings.browser.headless);
        assert_eq!(settings.browser.navigation_timeout_ms, 30_000);
        assert_eq!(settings.download.attempts, 5);
        assert_eq!(
            settings.catalog_source().resolve(&"a".into()).as_str(),
            "https://learn.test/courses/a"
        );
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::Missing(_)));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::default();
        settings.apply_overrides(&Overrides {
            course_url: Some("course/z".into()),
            download_all: Some(false),
            login_check: Some(true),
        });
        assert_eq!(settings.run.target_url, "course/z");
        assert!(!settings.run.download_all);
        assert!(settings.run.login_check);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.browser.headless);
        assert_eq!(settings.download.output_dir, PathBuf::from("downloads"));
        assert!(settings.run.mode().is_err());
    }
}
