use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::utils::EnvProvider;

pub const URL_ENV_VAR: &str = "GHQC_URL";
const CONFIG_FILE: &str = "client.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfiguration {
    // Base URL of the ghqc server. Default: http://localhost:3103
    pub base_url: String,
    // Per-request timeout. Default: 30
    pub timeout_secs: u64,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3103".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClientConfiguration {
    /// Read `client.yaml` from `dir`, falling back to defaults when the file
    /// is absent. A file that exists but does not parse is an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            log::debug!(
                "No client configuration at {}. Using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        log::debug!("Loaded client configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the effective configuration: file, then environment, then an
    /// explicit override (the CLI `--url` flag).
    pub fn load(
        config_dir: Option<&Path>,
        url_override: Option<&str>,
        env: &impl EnvProvider,
    ) -> Result<Self, ConfigurationError> {
        let dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => determine_config_dir()?,
        };
        let mut config = Self::from_dir(&dir)?;

        if let Ok(url) = env.var(URL_ENV_VAR) {
            log::debug!("Using server URL from {URL_ENV_VAR}");
            config.base_url = url;
        }
        if let Some(url) = url_override {
            config.base_url = url.to_string();
        }

        config.base_url()?;
        Ok(config)
    }

    /// The base URL, normalized to end in `/` so relative endpoint paths
    /// join beneath it.
    pub fn base_url(&self) -> Result<Url, ConfigurationError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ConfigurationError::InvalidUrl(self.base_url.clone(), e))?;
        if url.cannot_be_a_base() {
            return Err(ConfigurationError::NotABase(self.base_url.clone()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

pub fn determine_config_dir() -> Result<PathBuf, ConfigurationError> {
    let strategy = etcetera::choose_base_strategy()
        .map_err(|e| ConfigurationError::HomeDir(e.to_string()))?;
    Ok(strategy.config_dir().join("ghqc"))
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid server URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Server URL '{0}' cannot be used as a base URL")]
    NotABase(String),
    #[error("Could not determine configuration directory: {0}")]
    HomeDir(String),
}
