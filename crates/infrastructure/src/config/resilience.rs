//! Upstream provider and telemetry configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

// ==============================
// Provider Configuration
// ==============================

/// OpenWeatherMap connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL (without trailing endpoint)
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// API key (sensitive - never serialized or logged)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

const fn default_provider_timeout() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Whether a non-blank API key is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    /// Convert to the HTTP client configuration
    #[must_use]
    pub fn to_client_config(&self) -> integration_weather::WeatherConfig {
        integration_weather::WeatherConfig {
            base_url: self.base_url.clone(),
            api_key: self
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string())
                .unwrap_or_default(),
            timeout_secs: self.timeout_secs,
        }
    }
}

// ==============================
// Telemetry Configuration
// ==============================

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryAppConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TelemetryAppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json: false,
        }
    }
}
