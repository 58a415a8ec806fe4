//! Cache lifetime and sweep configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache TTL and cleanup cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a freshly written entry in minutes (default: 10)
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Interval of the expired-entry sweep in seconds (default: 5 minutes)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

const fn default_ttl_minutes() -> u64 {
    10
}

const fn default_cleanup_interval() -> u64 {
    5 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }

    /// Sweep interval
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}
