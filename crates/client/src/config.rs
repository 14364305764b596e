//! Client configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::session::FileBackend;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the users API.
    pub api_url: String,

    /// Where the session is persisted. `None` keeps it in memory.
    pub session_file: Option<PathBuf>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_url = env_value("USERHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let session_file = match env_value("USERHUB_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => FileBackend::default_path().context("Failed to resolve session file path")?,
        };

        let timeout_secs: u64 = std::env::var("USERHUB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            api_url,
            session_file: Some(session_file),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}

/// Read `key`, treating unset, empty and whitespace-only values alike.
pub fn env_value(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert!(config.session_file.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_blank_env_values_are_unset() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("  \t".to_string())), None);
        assert_eq!(
            non_empty(Some("http://api:9000".to_string())),
            Some("http://api:9000".to_string())
        );
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::default()
            .with_api_url("http://api:9000")
            .with_session_file("/tmp/s.json");
        assert_eq!(config.api_url, "http://api:9000");
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/s.json")));
    }
}
