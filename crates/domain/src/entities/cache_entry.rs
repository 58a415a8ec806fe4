//! Persisted cache entry for one destination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::weather::{CurrentConditions, DailySummary};
use crate::value_objects::{Coordinates, Destination};

/// Everything a fresh fetch produces, ready to be written to the cache
///
/// Timestamps and bookkeeping are assigned by the store at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePayload {
    /// Position reported by the provider
    pub coordinates: Coordinates,
    /// Current conditions
    pub current: CurrentConditions,
    /// Up to five daily summaries, ascending by date
    pub forecast: Vec<DailySummary>,
    /// Compressed raw provider response (diagnostics only)
    pub raw_data_compressed: Option<String>,
    /// Provider identifier
    pub api_source: String,
}

/// One cached weather record
///
/// There is exactly one entry per normalized destination. The entry is
/// valid while `now < expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Normalized destination (unique key)
    pub destination: Destination,
    /// Position reported by the provider
    pub coordinates: Coordinates,
    /// Current conditions at fetch time
    pub current: CurrentConditions,
    /// Up to five daily summaries, ascending by date
    pub forecast: Vec<DailySummary>,
    /// Compressed raw provider response; never part of normal reads
    #[serde(skip)]
    pub raw_data_compressed: Option<String>,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
    /// When the entry stops being served
    pub expires_at: DateTime<Utc>,
    /// Number of valid reads since the entry was written
    pub hit_count: u64,
    /// Last valid read (or write time if never read)
    pub last_accessed_at: DateTime<Utc>,
    /// Provider identifier
    pub api_source: String,
}

impl CacheEntry {
    /// Whether the entry may be served at `now`
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
