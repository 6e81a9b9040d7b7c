use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::NlQueryError;
use crate::paginator::DEFAULT_PAGE_SIZE;

/// API key sent when none is configured; matches the service's development default
pub const DEVELOPMENT_API_KEY: &str = "development";

pub const DEFAULT_HISTORY_PATH: &str = "history";

pub const API_URL_ENV: &str = "NLQUERY_API_URL";
pub const API_KEY_ENV: &str = "NLQUERY_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the query service, e.g. `http://localhost:8000/api/v1`
    pub api_base_url: String,

    /// Key sent in the `X-API-Key` header
    pub api_key: Option<String>,

    pub request_timeout_secs: u64,

    /// Rows per result page
    pub page_size: usize,

    /// Fetch prior exchanges from the service on startup
    pub load_history: bool,

    /// Path of the history endpoint, relative to `api_base_url`
    pub history_path: String,

    pub ui: UiConfig,

    /// nlquery home directory; derived at load time
    #[serde(skip)]
    pub home: PathBuf,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show completion time and row count under each history entry
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nlquery");

        Config {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            page_size: DEFAULT_PAGE_SIZE,
            load_history: true,
            history_path: DEFAULT_HISTORY_PATH.to_string(),
            ui: UiConfig::default(),
            home,
        }
    }
}

impl Config {
    /// Load configuration from `~/.nlquery/config.toml`, applying environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir()
            .context("Could not find home directory")?
            .join(".nlquery");
        let mut config = Self::load_from(&home.join("config.toml"))?;
        config.home = home;
        Ok(config)
    }

    /// Load configuration from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        if let Some(parent) = path.parent() {
            config.home = parent.to_path_buf();
        }
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
    }

    /// Save configuration to `<home>/config.toml`
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.home).context("Failed to create .nlquery directory")?;
        let config_path = self.config_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(config_path)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("nlquery.log")
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> std::result::Result<(), NlQueryError> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(NlQueryError::Config("api_base_url must not be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NlQueryError::Config(format!(
                "api_base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.history_path.trim().trim_matches('/').is_empty() {
            return Err(NlQueryError::Config("history_path must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(NlQueryError::Config("page_size must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(NlQueryError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API key from config, falling back to the development key
    pub fn api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| DEVELOPMENT_API_KEY.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.base_url(), "http://localhost:8000/api/v1");
    }

    #[test]
    fn test_api_key_falls_back_to_development() {
        let mut config = Config::default();
        config.api_key = None;
        assert_eq!(config.api_key(), DEVELOPMENT_API_KEY);
        config.api_key = Some("secret".to_string());
        assert_eq!(config.api_key(), "secret");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.page_size = 0;
        assert!(matches!(config.validate(), Err(NlQueryError::Config(_))));

        let mut config = Config::default();
        config.api_base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.history_path = " / ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let mut config = Config::default();
        config.api_base_url = "https://nlq.example.com/api/v1/ ".to_string();
        assert_eq!(config.base_url(), "https://nlq.example.com/api/v1");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.home = dir.path().to_path_buf();
        config.page_size = 25;
        config.load_history = false;
        config.ui.show_timestamps = false;

        let path = config.save().unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.page_size, 25);
        assert!(!loaded.load_history);
        assert!(!loaded.ui.show_timestamps);
        assert_eq!(loaded.home, dir.path());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = 5\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.page_size, 5);
        assert_eq!(loaded.request_timeout_secs, 60);
        assert!(loaded.ui.show_timestamps);
    }

    #[test]
    fn test_ui_section_ignores_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\ntheme = \"dark\"\nshow_timestamps = false\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.ui.show_timestamps);
        assert!(!toml::to_string(&loaded).unwrap().contains("theme"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.page_size, DEFAULT_PAGE_SIZE);
    }
}
