//! Weather cache port
//!
//! Persistent, TTL-keyed store with exactly one entry per normalized
//! destination.

use std::time::Duration;

use async_trait::async_trait;
use domain::{CacheEntry, CachePayload, Destination};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Port for the persistent weather cache
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherCachePort: Send + Sync {
    /// Return the entry for `destination` only if it is still valid
    ///
    /// A valid read also bumps the hit counter and last-access time. That
    /// bookkeeping is best-effort: its failure must never fail the read.
    async fn find_valid(
        &self,
        destination: &Destination,
    ) -> Result<Option<CacheEntry>, ApplicationError>;

    /// Replace (or create) the entry for `destination` in a single atomic write
    ///
    /// Sets `cached_at = now` and `expires_at = now + ttl`. Nothing from a
    /// prior entry survives.
    async fn upsert(
        &self,
        destination: &Destination,
        payload: CachePayload,
        ttl: Duration,
    ) -> Result<CacheEntry, ApplicationError>;

    /// Increment the hit counter and touch `last_accessed_at`
    async fn record_hit(&self, destination: &Destination) -> Result<(), ApplicationError>;

    /// Stored compressed raw payload, valid or not
    async fn raw_payload(
        &self,
        destination: &Destination,
    ) -> Result<Option<String>, ApplicationError>;

    /// Aggregate statistics over all stored entries
    async fn stats(&self) -> Result<CacheStats, ApplicationError>;

    /// Delete every entry with `expires_at <= now`, returning how many
    async fn cleanup_expired(&self) -> Result<u64, ApplicationError>;

    /// Delete every entry, returning how many
    async fn clear_all(&self) -> Result<u64, ApplicationError>;
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Stored entries, valid or not
    pub total_entries: u64,
    /// Entries with `expires_at > now`
    pub valid_entries: u64,
    /// Entries awaiting cleanup
    pub expired_entries: u64,
    /// Sum of hit counters
    pub total_hits: u64,
    /// `total_hits / total_entries`, rounded; 0 when empty
    pub avg_hits_per_entry: u64,
}

impl CacheStats {
    /// Build stats from raw counts, deriving the expired count and average
    #[must_use]
    pub fn from_counts(total_entries: u64, valid_entries: u64, total_hits: u64) -> Self {
        let avg_hits_per_entry = if total_entries == 0 {
            0
        } else {
            (total_hits + total_entries / 2) / total_entries
        };
        Self {
            total_entries,
            valid_entries,
            expired_entries: total_entries.saturating_sub(valid_entries),
            total_hits,
            avg_hits_per_entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_average_is_zero() {
        let stats = CacheStats::from_counts(0, 0, 0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn average_rounds_to_nearest() {
        assert_eq!(CacheStats::from_counts(4, 4, 10).avg_hits_per_entry, 3); // 2.5
        assert_eq!(CacheStats::from_counts(3, 3, 4).avg_hits_per_entry, 1); // 1.33
        assert_eq!(CacheStats::from_counts(3, 3, 5).avg_hits_per_entry, 2); // 1.67
    }

    #[test]
    fn expired_is_total_minus_valid() {
        let stats = CacheStats::from_counts(5, 2, 0);
        assert_eq!(stats.expired_entries, 3);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(CacheStats::from_counts(2, 1, 7)).unwrap();
        assert_eq!(json["totalEntries"], 2);
        assert_eq!(json["avgHitsPerEntry"], 4);
    }
}
