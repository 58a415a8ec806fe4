//! Request coalescing for single-destination lookups
//!
//! At most one lookup pipeline runs per normalized destination. Every caller
//! that arrives while it is running awaits the same result.
//!
//! The pipeline runs in its own task. A caller that stops waiting does not
//! cancel it, and the slot is released by a guard owned by that task, so a
//! failed or panicked fetch never leaves a stale slot behind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use domain::{CachePayload, Destination, WeatherResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{ForecastAggregator, PayloadCodec};
use crate::error::ApplicationError;
use crate::ports::{WeatherCachePort, WeatherProviderPort};

type SharedLookup = Shared<BoxFuture<'static, Result<WeatherResult, ApplicationError>>>;
type InFlightMap = Arc<Mutex<HashMap<Destination, InFlight>>>;

struct InFlight {
    generation: u64,
    lookup: SharedLookup,
}

/// Removes a slot when its pipeline settles, unless a newer one replaced it
struct SlotGuard {
    in_flight: InFlightMap,
    destination: Destination,
    generation: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(&self.destination)
            .is_some_and(|slot| slot.generation == self.generation)
        {
            in_flight.remove(&self.destination);
        }
    }
}

/// Cache-first weather lookup with per-destination deduplication
pub struct RequestCoalescer {
    cache: Arc<dyn WeatherCachePort>,
    provider: Arc<dyn WeatherProviderPort>,
    ttl: Duration,
    in_flight: InFlightMap,
    next_generation: AtomicU64,
}

impl fmt::Debug for RequestCoalescer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("ttl", &self.ttl)
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl RequestCoalescer {
    /// Create a coalescer writing entries with the given TTL
    pub fn new(
        cache: Arc<dyn WeatherCachePort>,
        provider: Arc<dyn WeatherProviderPort>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            ttl,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Weather for a raw destination string
    ///
    /// # Errors
    ///
    /// `Domain` if the destination is empty or too long, otherwise whatever
    /// the cache or provider reported.
    pub async fn get_weather(
        &self,
        destination: &str,
        force_refresh: bool,
    ) -> Result<WeatherResult, ApplicationError> {
        let destination = Destination::parse(destination)?;
        self.get_destination(&destination, force_refresh).await
    }

    /// Weather for an already normalized destination
    ///
    /// Joins a running lookup for the same destination if there is one,
    /// whatever its `force_refresh` flag was.
    ///
    /// # Errors
    ///
    /// Whatever the cache or provider reported.
    #[instrument(skip(self, destination), fields(destination = %destination))]
    pub async fn get_destination(
        &self,
        destination: &Destination,
        force_refresh: bool,
    ) -> Result<WeatherResult, ApplicationError> {
        let lookup = {
            let mut in_flight = self.in_flight.lock();
            if let Some(slot) = in_flight.get(destination) {
                debug!("Joining in-flight lookup");
                slot.lookup.clone()
            } else {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let lookup = self.spawn_lookup(destination.clone(), force_refresh, generation);
                in_flight.insert(
                    destination.clone(),
                    InFlight {
                        generation,
                        lookup: lookup.clone(),
                    },
                );
                lookup
            }
        };

        lookup.await
    }

    /// Number of destinations with a lookup currently running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn spawn_lookup(
        &self,
        destination: Destination,
        force_refresh: bool,
        generation: u64,
    ) -> SharedLookup {
        let guard = SlotGuard {
            in_flight: Arc::clone(&self.in_flight),
            destination: destination.clone(),
            generation,
        };
        let cache = Arc::clone(&self.cache);
        let provider = Arc::clone(&self.provider);
        let ttl = self.ttl;

        let handle = tokio::spawn(async move {
            let _guard = guard;
            lookup(cache.as_ref(), provider.as_ref(), ttl, &destination, force_refresh).await
        });

        handle
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    warn!(error = %e, "Weather lookup task aborted");
                    Err(ApplicationError::Internal(format!(
                        "Weather lookup task failed: {e}"
                    )))
                })
            })
            .boxed()
            .shared()
    }
}

/// Cache check, then fetch, aggregate, compress and store
async fn lookup(
    cache: &dyn WeatherCachePort,
    provider: &dyn WeatherProviderPort,
    ttl: Duration,
    destination: &Destination,
    force_refresh: bool,
) -> Result<WeatherResult, ApplicationError> {
    if !force_refresh {
        if let Some(entry) = cache.find_valid(destination).await? {
            debug!(destination = %destination, "Cache hit");
            return Ok(WeatherResult::from_entry(entry, true));
        }
    }

    info!(destination = %destination, force_refresh, "Fetching fresh weather");
    let snapshot = provider.fetch(destination).await?;

    let payload = CachePayload {
        coordinates: snapshot.coordinates,
        forecast: ForecastAggregator::aggregate(&snapshot.samples),
        raw_data_compressed: PayloadCodec::compress(&snapshot.raw),
        current: snapshot.current,
        api_source: provider.source_name().to_string(),
    };

    let entry = cache.upsert(destination, payload, ttl).await?;
    debug!(
        destination = %destination,
        days = entry.forecast.len(),
        expires_at = %entry.expires_at,
        "Stored fresh weather"
    );
    Ok(WeatherResult::from_entry(entry, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockWeatherCachePort, MockWeatherProviderPort};
    use crate::services::test_support::{FakeProvider, InMemoryWeatherCache, sample_snapshot};
    use futures::future::join_all;

    const TTL: Duration = Duration::from_secs(600);

    fn coalescer(cache: Arc<InMemoryWeatherCache>, provider: Arc<FakeProvider>) -> RequestCoalescer {
        RequestCoalescer::new(cache, provider, TTL)
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::new();
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        let first = service.get_weather("Kandy", false).await.unwrap();
        let second = service.get_weather("Kandy", false).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.cached_at, second.cached_at);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn fresh_result_carries_aggregated_forecast() {
        let cache = InMemoryWeatherCache::new();
        let service = coalescer(Arc::clone(&cache), FakeProvider::new());

        let result = service.get_weather("  Kandy ", false).await.unwrap();

        assert_eq!(result.destination.as_str(), "kandy");
        assert_eq!(result.forecast.len(), 2);
        assert_eq!(result.expires_at - result.cached_at, chrono::Duration::seconds(600));

        let stored = cache.get("kandy").unwrap();
        assert_eq!(stored.api_source, "fake");
        assert!(stored.raw_data_compressed.is_some());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::with_delay(Duration::from_millis(50));
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        let results = join_all((0..10).map(|_| service.get_weather("Kandy", false))).await;

        assert_eq!(provider.calls(), 1);
        let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert!(results.iter().all(|r| r == &results[0]));
        assert!(results.iter().all(|r| !r.from_cache));
        assert_eq!(service.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn differently_cased_callers_share_one_fetch() {
        let provider = FakeProvider::with_delay(Duration::from_millis(20));
        let service = coalescer(InMemoryWeatherCache::new(), Arc::clone(&provider));

        let (a, b) = tokio::join!(
            service.get_weather("KANDY", false),
            service.get_weather(" kandy", false)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn force_refresh_always_fetches_and_replaces() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::new();
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        let first = service.get_weather("Kandy", false).await.unwrap();
        service.get_weather("Kandy", false).await.unwrap();
        let forced = service.get_weather("Kandy", true).await.unwrap();

        assert!(!forced.from_cache);
        assert!(forced.cached_at >= first.cached_at);
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.get("kandy").unwrap().hit_count, 0);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::new();
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        service.get_weather("Kandy", false).await.unwrap();
        cache.expire("Kandy");
        let result = service.get_weather("Kandy", false).await.unwrap();

        assert!(!result.from_cache);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn failure_releases_slot_for_retry() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::new();
        provider.fail_with(
            "kandy",
            vec![ApplicationError::Transient("upstream down".into())],
        );
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        let err = service.get_weather("Kandy", false).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Transient(_)));
        assert_eq!(service.in_flight_count(), 0);
        assert_eq!(cache.len(), 0);

        let result = service.get_weather("Kandy", false).await.unwrap();
        assert!(!result.from_cache);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_failure() {
        let provider = FakeProvider::with_delay(Duration::from_millis(20));
        provider.fail_with("atlantis", vec![ApplicationError::NotFound("atlantis".into())]);
        let service = coalescer(InMemoryWeatherCache::new(), Arc::clone(&provider));

        let results = join_all((0..3).map(|_| service.get_weather("Atlantis", false))).await;

        assert_eq!(provider.calls(), 1);
        for result in results {
            assert_eq!(
                result.unwrap_err(),
                ApplicationError::NotFound("atlantis".into())
            );
        }
    }

    #[tokio::test]
    async fn abandoned_caller_does_not_cancel_fetch() {
        let cache = InMemoryWeatherCache::new();
        let provider = FakeProvider::with_delay(Duration::from_millis(100));
        let service = coalescer(Arc::clone(&cache), Arc::clone(&provider));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), service.get_weather("Kandy", false))
                .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.in_flight_count(), 0);
        assert!(cache.get("kandy").is_some());

        let result = service.get_weather("Kandy", false).await.unwrap();
        assert!(result.from_cache);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_destination_is_rejected_before_lookup() {
        let provider = FakeProvider::new();
        let service = coalescer(InMemoryWeatherCache::new(), Arc::clone(&provider));

        let err = service.get_weather("   ", false).await.unwrap_err();

        assert!(matches!(err, ApplicationError::Domain(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn cache_hit_never_reaches_provider() {
        let mut cache = MockWeatherCachePort::new();
        let mut provider = MockWeatherProviderPort::new();

        let snapshot = sample_snapshot("kandy");
        let now = chrono::Utc::now();
        let entry = domain::CacheEntry {
            destination: Destination::parse("kandy").unwrap(),
            coordinates: snapshot.coordinates,
            current: snapshot.current,
            forecast: Vec::new(),
            raw_data_compressed: None,
            cached_at: now,
            expires_at: now + chrono::Duration::minutes(10),
            hit_count: 3,
            last_accessed_at: now,
            api_source: "openweathermap".into(),
        };
        cache
            .expect_find_valid()
            .times(1)
            .returning(move |_| Ok(Some(entry.clone())));
        provider.expect_fetch().never();

        let service = RequestCoalescer::new(Arc::new(cache), Arc::new(provider), TTL);
        let result = service.get_weather("Kandy", false).await.unwrap();

        assert!(result.from_cache);
    }

    #[tokio::test]
    async fn storage_failure_on_write_surfaces() {
        let mut cache = MockWeatherCachePort::new();
        let mut provider = MockWeatherProviderPort::new();

        cache.expect_find_valid().returning(|_| Ok(None));
        cache
            .expect_upsert()
            .returning(|_, _, _| Err(ApplicationError::Storage("disk full".into())));
        provider
            .expect_fetch()
            .times(1)
            .returning(|d| Ok(sample_snapshot(d.as_str())));
        provider.expect_source_name().return_const("mock");

        let service = RequestCoalescer::new(Arc::new(cache), Arc::new(provider), TTL);
        let err = service.get_weather("Kandy", false).await.unwrap_err();

        assert_eq!(err, ApplicationError::Storage("disk full".into()));
        assert_eq!(service.in_flight_count(), 0);
    }
}
