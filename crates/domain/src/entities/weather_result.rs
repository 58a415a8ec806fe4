//! Result handed back to callers of the weather cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache_entry::CacheEntry;
use super::weather::{CurrentConditions, DailySummary};
use crate::value_objects::{Coordinates, Destination};

/// Weather for one destination plus cache provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResult {
    /// Normalized destination
    pub destination: Destination,
    /// Position reported by the provider
    pub coordinates: Coordinates,
    /// Current conditions
    pub current: CurrentConditions,
    /// Up to five daily summaries
    pub forecast: Vec<DailySummary>,
    /// Whether the data was served from a valid cache entry
    pub from_cache: bool,
    /// When the underlying entry was written
    pub cached_at: DateTime<Utc>,
    /// When the underlying entry expires
    pub expires_at: DateTime<Utc>,
}

impl WeatherResult {
    /// Build a result view over a cache entry
    #[must_use]
    pub fn from_entry(entry: CacheEntry, from_cache: bool) -> Self {
        Self {
            destination: entry.destination,
            coordinates: entry.coordinates,
            current: entry.current,
            forecast: entry.forecast,
            from_cache,
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
        }
    }
}
