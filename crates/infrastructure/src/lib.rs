//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports: the SQLite weather cache and the
//! retrying OpenWeatherMap provider. Also owns configuration loading,
//! tracing setup and the periodic expiry sweep.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod retry;
pub mod scheduled_tasks;
pub mod telemetry;

pub use adapters::*;
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, ProviderConfig, TelemetryAppConfig,
};
pub use persistence::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError, SqliteWeatherCache};
pub use retry::{Backoff, RetryConfig, RetryResult, Retryable, with_retry};
pub use scheduled_tasks::spawn_cache_sweeper;
pub use telemetry::{TelemetryError, init_tracing};
