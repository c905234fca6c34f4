use crate::error::{Result, StreamError};
use serde::Deserialize;
use std::env;
use std::fs;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CHAT_PATH: &str = "/api/chat/stream";
const DEFAULT_PULL_PATH: &str = "/api/models/pull";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub chat_path: String,
    pub pull_path: String,
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            pull_path: DEFAULT_PULL_PATH.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Join the base URL with an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Largest undelimited remainder a session buffers before giving up
    pub max_frame_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Ok(base_url) = env::var("AGENT_CHAT_BASE_URL") {
            config.backend.base_url = base_url;
        }
        if let Ok(chat_path) = env::var("AGENT_CHAT_CHAT_PATH") {
            config.backend.chat_path = chat_path;
        }
        if let Ok(pull_path) = env::var("AGENT_CHAT_PULL_PATH") {
            config.backend.pull_path = pull_path;
        }
        if let Ok(timeout) = env::var("AGENT_CHAT_CONNECT_TIMEOUT") {
            config.backend.connect_timeout_secs = timeout.parse::<u64>().map_err(|e| {
                StreamError::ConfigError(format!("Invalid connect timeout value: {}", e))
            })?;
        }
        if let Ok(max_frame) = env::var("AGENT_CHAT_MAX_FRAME_BYTES") {
            config.stream.max_frame_bytes = max_frame.parse::<usize>().map_err(|e| {
                StreamError::ConfigError(format!("Invalid max frame bytes value: {}", e))
            })?;
        }

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| StreamError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| StreamError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        if let Ok(base_url) = env::var("AGENT_CHAT_BASE_URL") {
            config.backend.base_url = base_url;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.backend.base_url;
        if base_url.is_empty() {
            return Err(StreamError::ConfigError("Base URL is empty".to_string()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StreamError::ConfigError(format!(
                "Base URL must be http(s): {}",
                base_url
            )));
        }

        for path in [&self.backend.chat_path, &self.backend.pull_path] {
            if !path.starts_with('/') {
                return Err(StreamError::ConfigError(format!(
                    "Endpoint path must start with '/': {}",
                    path
                )));
            }
        }

        if self.backend.connect_timeout_secs == 0 {
            return Err(StreamError::ConfigError(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.stream.max_frame_bytes == 0 {
            return Err(StreamError::ConfigError(
                "Max frame bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
