use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use userhub_client::ClientConfig;

/// Persistent CLI settings, stored as YAML.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".userhub").join("config.yaml"))
    }

    /// Fill in values the environment did not set.
    ///
    /// `config` comes from [`ClientConfig::from_env`], so anything the
    /// environment provided wins over the settings file.
    pub fn apply(&self, mut config: ClientConfig, env: &dyn Fn(&str) -> bool) -> ClientConfig {
        if !env("USERHUB_API_URL") {
            if let Some(url) = &self.api_url {
                config.api_url = url.clone();
            }
        }
        if !env("USERHUB_SESSION_FILE") {
            if let Some(path) = &self.session_file {
                config.session_file = Some(path.clone());
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.yaml");
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());

        let settings = Settings {
            api_url: Some("http://api:9000".to_string()),
            session_file: None,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_environment_wins() {
        let settings = Settings {
            api_url: Some("http://from-file:1".to_string()),
            session_file: Some(PathBuf::from("/tmp/file-session.json")),
        };
        let base = ClientConfig::default().with_api_url("http://from-env:2");

        let config = settings.apply(base.clone(), &|key| key == "USERHUB_API_URL");
        assert_eq!(config.api_url, "http://from-env:2");
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/file-session.json")));

        let config = settings.apply(base, &|_| false);
        assert_eq!(config.api_url, "http://from-file:1");
    }
}
