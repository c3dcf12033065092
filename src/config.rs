use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::env;
use std::fs;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BUFFER_CAPACITY: usize = 8192;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    /// Bounds connecting, each gap between two reads of a stream, and a
    /// whole health check
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Initial byte capacity of each session's chunk buffer
    #[serde(default = "default_buffer_capacity")]
    pub initial_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("SCRIPTORIA_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = env::var("SCRIPTORIA_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| ClientError::Config(format!("Invalid timeout value: {}", e)))?;

        Ok(ClientConfig {
            server: ServerConfig {
                base_url,
                timeout_secs,
            },
            stream: StreamConfig::default(),
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| ClientError::Config(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        if let Ok(base_url) = env::var("SCRIPTORIA_API_BASE_URL") {
            config.server.base_url = base_url;
        }

        Ok(config)
    }

    /// Endpoint URL for a path relative to the configured base
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = self.server.base_url.trim();
        if base_url.is_empty() {
            return Err(ClientError::Config("Base URL is empty".to_string()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "Base URL must start with http:// or https://: {}",
                base_url
            )));
        }

        if self.server.timeout_secs == 0 {
            return Err(ClientError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.stream.initial_capacity == 0 {
            return Err(ClientError::Config(
                "Stream buffer capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
