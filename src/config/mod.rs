//! Engine configuration
//!
//! Loaded from a YAML file with per-field serde defaults, so a partial file
//! (or none at all) yields a runnable configuration. The credential master
//! key is never read from the file; it comes from the environment.

use serde::{Deserialize, Serialize};

use crate::core::retry::RetryPolicy;
use crate::utils::error::{EngineError, Result};

/// Environment variable holding the credential master key
pub const MASTER_KEY_ENV: &str = "GENBATCH_MASTER_KEY";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// External provider endpoint and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-attempt hard ceiling (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connection establishment timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Dispatcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Worker pool size per execution; 1 processes items serially
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Client polling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Fixed polling interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,
    /// Provider endpoint and timeouts
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Dispatcher tuning
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Retry policy for item attempts
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Client polling cadence
    #[serde(default)]
    pub poller: PollerConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Read the credential master key from the environment
    pub fn master_key() -> Result<Vec<u8>> {
        match std::env::var(MASTER_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key.into_bytes()),
            _ => Err(EngineError::Config(format!(
                "{} must be set to the credential master key",
                MASTER_KEY_ENV
            ))),
        }
    }
}
