//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackupConfig {
    /// Plugin cache and distribution settings.
    pub plugins: PluginSettings,
    /// Download retry policy.
    pub retry: RetrySettings,
    /// HTTP transport settings.
    pub http: HttpSettings,
}

/// Where plugins come from and where they are installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Plugin cache directory. Defaults to `~/.stackup/plugins`.
    pub cache_dir: Option<PathBuf>,
    /// Base URL for canonical plugin downloads.
    pub download_base_url: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            download_base_url: "https://get.pulumi.com/releases/plugins".to_string(),
        }
    }
}

/// Download retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry (ms).
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after every retry.
    pub backoff_factor: f64,
    /// Upper bound for a single delay (ms).
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}
