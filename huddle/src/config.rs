//! Configuration of the client.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_API_URL: &str = "http://10.0.2.2:8000/api/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid API url {url:?}: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub api: Api,
    pub storage: Storage,
    pub log: Log,
}

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    /// Origin every endpoint path is resolved against.
    pub url: String,
}
impl Default for Api {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_owned(),
        }
    }
}

/// Where credentials are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub path: PathBuf,
}
impl Default for Storage {
    fn default() -> Self {
        Self {
            path: "./LoginInfo".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    /// `tracing` filter directive, e.g. `info` or `huddle=debug`.
    pub level: String,
}
impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Configuration {
    /// Reads `path`. `None` when the file does not exist, the caller then
    /// runs on defaults.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(yaml) => Self::from_yaml(&yaml).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.api_url()?;
        Ok(config)
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api.url).map_err(|source| ConfigError::Url {
            url: self.api.url.clone(),
            source,
        })
    }
}
