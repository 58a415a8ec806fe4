//! Application configuration
//!
//! Split into focused sub-modules by domain:
//! - `database`: SQLite pool settings
//! - `cache`: Entry TTL and sweep interval
//! - `resilience`: Upstream provider and telemetry
//!
//! Retry and batch settings reuse the structs of the code they drive
//! ([`RetryConfig`], [`BatchConfig`]).
//!
//! Sources, later ones winning: built-in defaults, an optional
//! `config.toml`, then `WEATHERCACHE_*` environment variables with `__`
//! between nested keys (e.g. `WEATHERCACHE_PROVIDER__API_KEY`).

mod cache;
mod database;
mod resilience;

use std::path::Path;

use application::{ApplicationError, BatchConfig, WeatherServiceConfig};
use serde::{Deserialize, Serialize};

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use resilience::{ProviderConfig, TelemetryAppConfig};

use crate::retry::RetryConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WEATHERCACHE";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Upstream weather provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Cache TTL and sweep
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch sizing and pacing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Log output
    #[serde(default)]
    pub telemetry: TelemetryAppConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(
            config::File::with_name("config").required(false),
            config::Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Load configuration from an explicit file plus the environment
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::build(
            config::File::from(path).required(true),
            config::Environment::with_prefix(ENV_PREFIX),
        )
    }

    fn build<F>(file: F, env: config::Environment) -> Result<Self, config::ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(file)
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Build from a file and an explicit variable map instead of the process
    /// environment
    #[cfg(test)]
    fn load_with_vars(
        path: &Path,
        vars: config::Map<String, String>,
    ) -> Result<Self, config::ConfigError> {
        Self::build(
            config::File::from(path).required(false),
            config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)),
        )
    }

    /// Check the settings the service cannot run without
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] listing every problem.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let mut problems = Vec::new();

        if !self.provider.has_api_key() {
            problems.push("provider.api_key is not set".to_string());
        }
        if self.provider.timeout_secs == 0 {
            problems.push("provider.timeout_secs must be greater than 0".to_string());
        }
        if self.database.max_connections == 0 {
            problems.push("database.max_connections must be greater than 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            problems.push("retry.max_attempts must be greater than 0".to_string());
        }
        if self.batch.chunk_size == 0 {
            problems.push("batch.chunk_size must be greater than 0".to_string());
        }
        if self.batch.max_destinations == 0 {
            problems.push("batch.max_destinations must be greater than 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::Configuration(problems.join("; ")))
        }
    }

    /// Settings for the weather cache facade
    #[must_use]
    pub fn service_config(&self) -> WeatherServiceConfig {
        WeatherServiceConfig {
            ttl: self.cache.ttl(),
            batch: self.batch.clone(),
        }
    }
}
