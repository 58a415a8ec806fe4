//! Database (SQLite) configuration.

use serde::{Deserialize, Serialize};

use super::default_true;

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:weathercache.db` or `sqlite::memory:`
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Maximum number of concurrent database connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Use WAL journaling for file databases (default: true)
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

fn default_db_url() -> String {
    "sqlite:weathercache.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            wal_mode: true,
        }
    }
}
