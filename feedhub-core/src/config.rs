use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::ConfigError;

/// Process configuration, read once at startup from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Feed URLs, which double as cache keys.
    pub values: Vec<String>,
    /// Minutes between refresh cycles.
    pub refresh: u64,
    /// Minutes between push passes on a streaming connection; 0 sends one pass and closes.
    #[serde(default)]
    pub auto_update_push: u64,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_db_path() -> PathBuf {
    PathBuf::from("db")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    pub fn new(values: Vec<String>, refresh: u64, auto_update_push: u64) -> Self {
        Self {
            values,
            refresh,
            auto_update_push,
            listen: default_listen(),
            db_path: default_db_path(),
            static_dir: default_static_dir(),
            index_file: default_index_file(),
            request_timeout_seconds: default_request_timeout(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh == 0 {
            return Err(ConfigError::Invalid(
                "refresh interval must be at least one minute".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "requestTimeoutSeconds must be positive".into(),
            ));
        }
        if self.refresh.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid(format!(
                "refresh interval of {} minutes is too large",
                self.refresh
            )));
        }
        if self.auto_update_push.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid(format!(
                "autoUpdatePush interval of {} minutes is too large",
                self.auto_update_push
            )));
        }
        // a bad source only fails its own fetch each cycle
        for value in &self.values {
            if let Err(e) = Url::parse(value) {
                warn!(source = %value, error = %e, "source is not a valid url");
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.saturating_mul(60))
    }

    /// `None` when pushing is disabled.
    pub fn push_interval(&self) -> Option<Duration> {
        (self.auto_update_push > 0)
            .then(|| Duration::from_secs(self.auto_update_push.saturating_mul(60)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
