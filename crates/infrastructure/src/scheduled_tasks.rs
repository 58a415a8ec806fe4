//! Expired cache entry sweep
//!
//! Reads already ignore expired rows; the sweep only keeps the table from
//! growing without bound.

use std::sync::Arc;
use std::time::Duration;

use application::ports::WeatherCachePort;
use tracing::{debug, error, info};

/// Default sweep interval: every five minutes
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawn a background task that periodically deletes expired cache entries.
///
/// The first sweep runs one interval after startup. Failures are logged and
/// the task keeps going.
///
/// Returns a `JoinHandle` that can be used to abort the task when shutting down.
///
/// # Example
///
/// ```ignore
/// let sweeper = spawn_cache_sweeper(cache, None);
///
/// // On shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_cache_sweeper(
    cache: Arc<dyn WeatherCachePort>,
    sweep_interval: Option<Duration>,
) -> tokio::task::JoinHandle<()> {
    let interval = sweep_interval.unwrap_or(DEFAULT_SWEEP_INTERVAL);

    info!(
        interval_secs = interval.as_secs(),
        "Starting weather cache sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Don't run immediately on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match cache.cleanup_expired().await {
                Ok(0) => debug!("No expired cache entries"),
                Ok(removed) => info!(removed_count = removed, "Swept expired cache entries"),
                Err(e) => error!(error = %e, "Failed to sweep expired cache entries"),
            }
        }
    })
}
