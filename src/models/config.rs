// src/models/config.rs

//! Client and monitor configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FandomError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Activity monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User-Agent header sent with every request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

/// Activity monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay before the first poll, in seconds
    #[serde(default = "defaults::initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Poll period, in seconds
    #[serde(default = "defaults::poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on waiting for one event's observers, in milliseconds
    #[serde(default = "defaults::dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Recent changes fetched per poll
    #[serde(default = "defaults::change_limit")]
    pub change_limit: u32,

    /// Posts fetched per feed per poll
    #[serde(default = "defaults::post_limit")]
    pub post_limit: u32,

    /// Start from an empty watermark instead of the persisted one
    #[serde(default)]
    pub reset_watermark: bool,
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fandom-api/0.1)".to_string()
    }

    pub fn timeout_secs() -> u64 {
        30
    }

    pub fn initial_delay_secs() -> u64 {
        1
    }

    pub fn poll_interval_secs() -> u64 {
        10
    }

    pub fn dispatch_timeout_ms() -> u64 {
        2000
    }

    pub fn change_limit() -> u32 {
        30
    }

    pub fn post_limit() -> u32 {
        15
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout_secs(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: defaults::initial_delay_secs(),
            poll_interval_secs: defaults::poll_interval_secs(),
            dispatch_timeout_ms: defaults::dispatch_timeout_ms(),
            change_limit: defaults::change_limit(),
            post_limit: defaults::post_limit(),
            reset_watermark: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|e| {
            log::warn!(
                "Failed to load config from {:?}: {e}. Using defaults.",
                path.as_ref()
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.monitor.validate()
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(FandomError::validation("client.user_agent must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(FandomError::validation("client.timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(FandomError::validation(
                "monitor.poll_interval_secs must be positive",
            ));
        }
        if self.dispatch_timeout_ms == 0 {
            return Err(FandomError::validation(
                "monitor.dispatch_timeout_ms must be positive",
            ));
        }
        if self.change_limit > 100 {
            return Err(FandomError::validation("monitor.change_limit must be at most 100"));
        }
        if self.post_limit == 0 || self.post_limit > 100 {
            return Err(FandomError::validation(
                "monitor.post_limit must be between 1 and 100",
            ));
        }
        Ok(())
    }
}
