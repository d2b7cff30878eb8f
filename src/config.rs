use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::fetch::FetchConfig;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Maximum number of references accepted in one batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fetch stage settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// OCR engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            max_batch_size: default_max_batch_size(),
            log_level: default_log_level(),
            fetch: FetchConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

#[cfg(feature = "server")]
impl ServiceConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("textlift").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("TEXTLIFT").separator("__"));

        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_max_batch_size() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}
