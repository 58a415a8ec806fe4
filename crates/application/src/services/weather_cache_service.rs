//! Weather cache facade
//!
//! The single entry point callers use. Wires the coalescer and the batch
//! orchestrator over one cache and one provider, and exposes the cache
//! maintenance operations.

use std::sync::Arc;
use std::time::Duration;

use domain::{Destination, WeatherResult};
use serde::Serialize;
use tracing::info;

use super::{
    BatchConfig, BatchOrchestrator, BatchUpdateReport, BatchWeatherItem, DecodedPayload,
    PayloadCodec, RequestCoalescer,
};
use crate::error::ApplicationError;
use crate::ports::{CacheStats, WeatherCachePort, WeatherProviderPort};

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Facade configuration
#[derive(Debug, Clone)]
pub struct WeatherServiceConfig {
    /// Lifetime of freshly written entries
    pub ttl: Duration,
    /// Batch sizing and pacing
    pub batch: BatchConfig,
}

impl Default for WeatherServiceConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            batch: BatchConfig::default(),
        }
    }
}

/// Decoded diagnostic payload for one destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawPayloadReport {
    /// Normalized destination
    pub destination: Destination,
    /// Decoded upstream response, or the unavailable marker
    pub payload: DecodedPayload,
}

/// Destination weather cache
pub struct WeatherCacheService {
    cache: Arc<dyn WeatherCachePort>,
    coalescer: Arc<RequestCoalescer>,
    batch: BatchOrchestrator,
}

impl std::fmt::Debug for WeatherCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCacheService")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl WeatherCacheService {
    /// Wire the service over a cache and a provider
    pub fn new(
        cache: Arc<dyn WeatherCachePort>,
        provider: Arc<dyn WeatherProviderPort>,
        config: WeatherServiceConfig,
    ) -> Self {
        let coalescer = Arc::new(RequestCoalescer::new(
            Arc::clone(&cache),
            provider,
            config.ttl,
        ));
        let batch = BatchOrchestrator::new(Arc::clone(&coalescer), Arc::clone(&cache), config.batch);
        Self {
            cache,
            coalescer,
            batch,
        }
    }

    /// Weather for one destination, from cache when valid
    ///
    /// # Errors
    ///
    /// `Domain` for an invalid destination, `NotFound`, `AuthError`,
    /// `RateLimited`, `Transient` or `Generic` from the provider, `Storage`
    /// from the cache.
    pub async fn get_weather(
        &self,
        destination: &str,
        force_refresh: bool,
    ) -> Result<WeatherResult, ApplicationError> {
        self.coalescer.get_weather(destination, force_refresh).await
    }

    /// One row per unique destination; see [`BatchOrchestrator::get_multiple_weather`]
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the batch size is out of range.
    pub async fn get_multiple_weather<S: AsRef<str>>(
        &self,
        destinations: &[S],
    ) -> Result<Vec<BatchWeatherItem>, ApplicationError> {
        self.batch.get_multiple_weather(destinations).await
    }

    /// Refresh stale destinations in paced chunks; see
    /// [`BatchOrchestrator::update_multiple_destinations`]
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the batch size is out of range.
    pub async fn update_multiple_destinations<S: AsRef<str>>(
        &self,
        destinations: &[S],
    ) -> Result<BatchUpdateReport, ApplicationError> {
        self.batch.update_multiple_destinations(destinations).await
    }

    /// Cache statistics
    ///
    /// # Errors
    ///
    /// `Storage` if the cache cannot be read.
    pub async fn get_stats(&self) -> Result<CacheStats, ApplicationError> {
        self.cache.stats().await
    }

    /// Delete expired entries, returning how many were removed
    ///
    /// # Errors
    ///
    /// `Storage` if the cache cannot be written.
    pub async fn cleanup(&self) -> Result<u64, ApplicationError> {
        let removed = self.cache.cleanup_expired().await?;
        info!(removed, "Removed expired cache entries");
        Ok(removed)
    }

    /// Delete every entry, returning how many were removed
    ///
    /// # Errors
    ///
    /// `Storage` if the cache cannot be written.
    pub async fn clear_all(&self) -> Result<u64, ApplicationError> {
        let removed = self.cache.clear_all().await?;
        info!(removed, "Cleared weather cache");
        Ok(removed)
    }

    /// Decode the stored raw provider response for a destination
    ///
    /// Missing entries and unreadable blobs both report
    /// [`DecodedPayload::Unavailable`].
    ///
    /// # Errors
    ///
    /// `Domain` for an invalid destination, `Storage` if the cache cannot be read.
    pub async fn get_raw_payload(
        &self,
        destination: &str,
    ) -> Result<RawPayloadReport, ApplicationError> {
        let destination = Destination::parse(destination)?;
        let payload = self
            .cache
            .raw_payload(&destination)
            .await?
            .map_or(DecodedPayload::Unavailable, |blob| {
                PayloadCodec::decompress(&blob)
            });
        Ok(RawPayloadReport {
            destination,
            payload,
        })
    }

    /// Number of lookups currently running
    pub fn in_flight_count(&self) -> usize {
        self.coalescer.in_flight_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockWeatherCachePort;
    use crate::services::test_support::{FakeProvider, InMemoryWeatherCache};

    fn service(cache: &Arc<InMemoryWeatherCache>, provider: &Arc<FakeProvider>) -> WeatherCacheService {
        WeatherCacheService::new(
            cache.clone(),
            provider.clone(),
            WeatherServiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn stats_reflect_hits() {
        let cache = InMemoryWeatherCache::new();
        let svc = service(&cache, &FakeProvider::new());

        svc.get_weather("Kandy", false).await.unwrap();
        svc.get_weather("Kandy", false).await.unwrap();
        svc.get_weather("Kandy", false).await.unwrap();
        svc.get_weather("Ella", false).await.unwrap();

        let stats = svc.get_stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.total_hits, 2);
        assert_eq!(stats.avg_hits_per_entry, 1);
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired() {
        let cache = InMemoryWeatherCache::new();
        let svc = service(&cache, &FakeProvider::new());

        svc.get_weather("Kandy", false).await.unwrap();
        svc.get_weather("Ella", false).await.unwrap();
        cache.expire("Ella");

        assert_eq!(svc.cleanup().await.unwrap(), 1);
        assert!(cache.get("kandy").is_some());
        assert!(cache.get("ella").is_none());
    }

    #[tokio::test]
    async fn clear_all_empties_cache() {
        let cache = InMemoryWeatherCache::new();
        let svc = service(&cache, &FakeProvider::new());

        svc.get_multiple_weather(&["Kandy", "Ella", "Galle"]).await.unwrap();

        assert_eq!(svc.clear_all().await.unwrap(), 3);
        assert_eq!(cache.len(), 0);
        assert_eq!(svc.get_stats().await.unwrap(), CacheStats::default());
    }

    #[tokio::test]
    async fn raw_payload_decodes_stored_response() {
        let cache = InMemoryWeatherCache::new();
        let svc = service(&cache, &FakeProvider::new());

        svc.get_weather("Kandy", false).await.unwrap();
        let report = svc.get_raw_payload("KANDY").await.unwrap();

        assert_eq!(report.destination.as_str(), "kandy");
        let json = report.payload.as_json().unwrap();
        assert_eq!(json["current"]["name"], "kandy");
        assert_eq!(json["forecast"]["cnt"], 16);
    }

    #[tokio::test]
    async fn raw_payload_missing_entry_is_unavailable() {
        let svc = service(&InMemoryWeatherCache::new(), &FakeProvider::new());

        let report = svc.get_raw_payload("Nowhere").await.unwrap();

        assert_eq!(report.payload, DecodedPayload::Unavailable);
    }

    #[tokio::test]
    async fn raw_payload_corrupt_blob_is_unavailable() {
        let mut cache = MockWeatherCachePort::new();
        cache
            .expect_raw_payload()
            .returning(|_| Ok(Some("@@corrupt@@".to_string())));

        let svc = WeatherCacheService::new(
            Arc::new(cache),
            FakeProvider::new(),
            WeatherServiceConfig::default(),
        );
        let report = svc.get_raw_payload("Kandy").await.unwrap();

        assert!(!report.payload.is_available());
    }

    #[tokio::test]
    async fn storage_errors_propagate_from_maintenance() {
        let mut cache = MockWeatherCachePort::new();
        cache
            .expect_cleanup_expired()
            .returning(|| Err(ApplicationError::Storage("readonly".into())));

        let svc = WeatherCacheService::new(
            Arc::new(cache),
            FakeProvider::new(),
            WeatherServiceConfig::default(),
        );

        assert!(matches!(svc.cleanup().await, Err(ApplicationError::Storage(_))));
    }
}
