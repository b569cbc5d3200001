use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(String),
}

/// How to reach the backend REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Sent as the `Girder-Token` header.
    pub token: Option<String>,
    /// Cookie header for the pre-authorization exchange.
    pub cookie: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_response_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1/".to_string(),
            token: None,
            cookie: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            max_response_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ApiSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub image_page_size: usize,
    /// Where OAuth providers send the user back; the host's own URL when unset.
    pub redirect: Option<String>,
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            image_page_size: 50,
            redirect: None,
            event_buffer: 256,
        }
    }
}

impl EngineConfig {
    /// Loads a RON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}
