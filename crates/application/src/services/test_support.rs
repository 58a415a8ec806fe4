//! In-memory fakes for service tests
//!
//! `mockall` covers one-shot expectations; these fakes cover the stateful
//! cases (counting upstream calls under concurrency, expiring entries).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use domain::{
    CacheEntry, CachePayload, ConditionInfo, Coordinates, CurrentConditions, Destination,
    ForecastSample,
};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::ApplicationError;
use crate::ports::{CacheStats, ProviderSnapshot, WeatherCachePort, WeatherProviderPort};

/// Cache fake backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryWeatherCache {
    entries: Mutex<HashMap<Destination, CacheEntry>>,
    pub upserts: AtomicUsize,
}

impl InMemoryWeatherCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push an entry's expiry into the past
    pub fn expire(&self, destination: &str) {
        let key = Destination::parse(destination).unwrap();
        if let Some(entry) = self.entries.lock().get_mut(&key) {
            entry.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    pub fn get(&self, destination: &str) -> Option<CacheEntry> {
        let key = Destination::parse(destination).unwrap();
        self.entries.lock().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl WeatherCachePort for InMemoryWeatherCache {
    async fn find_valid(
        &self,
        destination: &Destination,
    ) -> Result<Option<CacheEntry>, ApplicationError> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        Ok(entries.get_mut(destination).and_then(|entry| {
            if entry.is_valid_at(now) {
                entry.hit_count += 1;
                entry.last_accessed_at = now;
                Some(entry.clone())
            } else {
                None
            }
        }))
    }

    async fn upsert(
        &self,
        destination: &Destination,
        payload: CachePayload,
        ttl: Duration,
    ) -> Result<CacheEntry, ApplicationError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        let entry = CacheEntry {
            destination: destination.clone(),
            coordinates: payload.coordinates,
            current: payload.current,
            forecast: payload.forecast,
            raw_data_compressed: payload.raw_data_compressed,
            cached_at: now,
            expires_at: now + ttl,
            hit_count: 0,
            last_accessed_at: now,
            api_source: payload.api_source,
        };
        self.entries
            .lock()
            .insert(destination.clone(), entry.clone());
        Ok(entry)
    }

    async fn record_hit(&self, destination: &Destination) -> Result<(), ApplicationError> {
        if let Some(entry) = self.entries.lock().get_mut(destination) {
            entry.hit_count += 1;
        }
        Ok(())
    }

    async fn raw_payload(
        &self,
        destination: &Destination,
    ) -> Result<Option<String>, ApplicationError> {
        Ok(self
            .entries
            .lock()
            .get(destination)
            .and_then(|e| e.raw_data_compressed.clone()))
    }

    async fn stats(&self) -> Result<CacheStats, ApplicationError> {
        let now = Utc::now();
        let entries = self.entries.lock();
        let total = entries.len() as u64;
        let valid = entries.values().filter(|e| e.is_valid_at(now)).count() as u64;
        let hits = entries.values().map(|e| e.hit_count).sum();
        Ok(CacheStats::from_counts(total, valid, hits))
    }

    async fn cleanup_expired(&self) -> Result<u64, ApplicationError> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_valid_at(now));
        Ok((before - entries.len()) as u64)
    }

    async fn clear_all(&self) -> Result<u64, ApplicationError> {
        let mut entries = self.entries.lock();
        let count = entries.len() as u64;
        entries.clear();
        Ok(count)
    }
}

/// Provider fake that counts calls and can be scripted to fail
#[derive(Debug, Default)]
pub struct FakeProvider {
    calls: AtomicUsize,
    delay: Duration,
    /// Errors returned for a destination, consumed front to back
    failures: Mutex<HashMap<String, Vec<ApplicationError>>>,
    /// Destination and dispatch time of every call
    pub log: Mutex<Vec<(String, Instant)>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    /// Queue errors for a destination; later calls succeed
    pub fn fail_with(&self, destination: &str, errors: Vec<ApplicationError>) {
        self.failures
            .lock()
            .insert(destination.to_string(), errors);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, destination: &str) -> usize {
        self.log.lock().iter().filter(|(d, _)| d == destination).count()
    }
}

#[async_trait]
impl WeatherProviderPort for FakeProvider {
    async fn fetch(&self, destination: &Destination) -> Result<ProviderSnapshot, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .push((destination.to_string(), Instant::now()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = {
            let mut failures = self.failures.lock();
            failures
                .get_mut(destination.as_str())
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0))
        };
        if let Some(err) = scripted {
            return Err(err);
        }

        Ok(sample_snapshot(destination.as_str()))
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

/// Two days of samples plus current conditions for any destination
pub fn sample_snapshot(destination: &str) -> ProviderSnapshot {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let samples = (0..16)
        .map(|i| ForecastSample {
            timestamp: base + chrono::Duration::hours(3 * i),
            temp: 20.0 + f64::from(i32::try_from(i).unwrap_or(0)),
            humidity: 65,
            condition: ConditionInfo {
                main: "Clouds".to_string(),
                id: 803,
                description: "broken clouds".to_string(),
            },
            icon: if i % 8 >= 2 && i % 8 <= 5 { "04d" } else { "04n" }.to_string(),
            pop: 0.1,
        })
        .collect();

    ProviderSnapshot {
        coordinates: Coordinates::new_unchecked(7.29, 80.63),
        current: CurrentConditions {
            temp: 24,
            feels_like: 25,
            humidity: 78,
            pressure: 1011,
            wind_speed: 3.2,
            wind_deg: 210,
            clouds: 75,
            visibility: Some(10_000),
            condition: "Clouds".to_string(),
            condition_id: 803,
            description: "broken clouds".to_string(),
            icon: "04d".to_string(),
            sunrise: base,
            sunset: base,
        },
        samples,
        raw: serde_json::json!({ "current": { "name": destination }, "forecast": { "cnt": 16 } }),
    }
}
