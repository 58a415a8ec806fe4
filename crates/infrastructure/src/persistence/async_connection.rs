//! Async database connection using sqlx
//!
//! Provides async database operations using sqlx with SQLite.
//! Migrations are managed via sqlx's `migrate!()` macro using SQL
//! files in the workspace `migrations/` directory.

use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;

/// Error type for async database operations
#[derive(Debug, thiserror::Error)]
pub enum AsyncDatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for async database connection
#[derive(Debug, Clone)]
pub struct AsyncDatabaseConfig {
    /// Database URL (e.g., "sqlite:weathercache.db" or "sqlite::memory:")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep open
    pub min_connections: u32,
    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,
}

impl Default for AsyncDatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:weathercache.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            wal_mode: true,
        }
    }
}

impl AsyncDatabaseConfig {
    /// Create an in-memory database configuration for testing
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1, // Single connection for in-memory
            min_connections: 1,
            wal_mode: false, // Not supported for in-memory
        }
    }

    /// Create a file-based database configuration
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().display().to_string();
        Self {
            url: format!("sqlite:{path_str}"),
            ..Default::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

impl From<&DatabaseConfig> for AsyncDatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        if config.url.contains(":memory:") {
            return Self::in_memory();
        }
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: 1,
            wal_mode: config.wal_mode,
        }
    }
}

/// Async database connection pool
#[derive(Debug, Clone)]
pub struct AsyncDatabase {
    pool: SqlitePool,
}

impl AsyncDatabase {
    /// Create a new async database connection pool
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn new(config: &AsyncDatabaseConfig) -> Result<Self, AsyncDatabaseError> {
        if config.max_connections == 0 {
            return Err(AsyncDatabaseError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .connect_with(options)
            .await?;

        // Enable WAL mode if configured
        if config.wal_mode && !config.is_in_memory() {
            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await?;
            debug!("WAL mode enabled");
        }

        // Set busy timeout for concurrent access
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&pool)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Async database pool created"
        );

        Ok(Self { pool })
    }

    /// Create an in-memory database for testing
    pub async fn in_memory() -> Result<Self, AsyncDatabaseError> {
        Self::new(&AsyncDatabaseConfig::in_memory()).await
    }

    /// Get the underlying pool for raw queries
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations using the workspace migration SQL files
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), AsyncDatabaseError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_in_memory_database() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        let _ = db.pool();
    }

    #[tokio::test]
    async fn run_migrations_creates_cache_table() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM weather_cache")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        // Running twice should not fail
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn zero_connections_rejected() {
        let config = AsyncDatabaseConfig {
            max_connections: 0,
            ..AsyncDatabaseConfig::in_memory()
        };
        let err = AsyncDatabase::new(&config).await.unwrap_err();
        assert!(matches!(err, AsyncDatabaseError::Config(_)));
    }

    #[test]
    fn memory_url_from_app_config_uses_single_connection() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 8,
            wal_mode: true,
        };
        let async_config = AsyncDatabaseConfig::from(&config);
        assert_eq!(async_config.max_connections, 1);
        assert!(!async_config.wal_mode);
    }

    #[tokio::test]
    async fn wal_mode_for_file_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("cache.db");

        let config = AsyncDatabaseConfig::file(&db_path);
        let db = AsyncDatabase::new(&config).await.unwrap();
        db.migrate().await.unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0.to_lowercase(), "wal");

        db.close().await;
    }
}
