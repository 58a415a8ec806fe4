//! SQLite weather cache using sqlx
//!
//! One row per normalized destination, keyed by primary key, so a write is a
//! single `INSERT … ON CONFLICT DO UPDATE`. Timestamps are stored as epoch
//! milliseconds; current conditions and the daily forecast as JSON text.
//!
//! Reads only return rows whose `expires_at` lies in the future. The hit
//! counter is bumped before a valid read returns; a failed bump is logged and
//! never reaches the reader.

use std::time::Duration;

use application::{
    error::ApplicationError,
    ports::{CacheStats, WeatherCachePort},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{CacheEntry, CachePayload, Coordinates, Destination};
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use super::error::map_sqlx_error;

const SELECT_COLUMNS: &str = "destination, lat, lon, current_json, forecast_json, \
     raw_data_compressed, cached_at, expires_at, hit_count, last_accessed_at, api_source";

/// Row shape of the `weather_cache` table
#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    destination: String,
    lat: f64,
    lon: f64,
    current_json: String,
    forecast_json: String,
    raw_data_compressed: Option<String>,
    cached_at: i64,
    expires_at: i64,
    hit_count: i64,
    last_accessed_at: i64,
    api_source: String,
}

impl CacheRow {
    fn into_entry(self) -> Result<CacheEntry, ApplicationError> {
        let destination = Destination::parse(&self.destination)
            .map_err(|e| corrupt(&self.destination, "destination", e))?;
        let current = serde_json::from_str(&self.current_json)
            .map_err(|e| corrupt(&self.destination, "current", e))?;
        let forecast = serde_json::from_str(&self.forecast_json)
            .map_err(|e| corrupt(&self.destination, "forecast", e))?;

        Ok(CacheEntry {
            destination,
            coordinates: Coordinates::new_unchecked(self.lat, self.lon),
            current,
            forecast,
            cached_at: from_millis(self.cached_at)?,
            expires_at: from_millis(self.expires_at)?,
            hit_count: to_count(self.hit_count),
            last_accessed_at: from_millis(self.last_accessed_at)?,
            raw_data_compressed: self.raw_data_compressed,
            api_source: self.api_source,
        })
    }
}

fn corrupt(destination: &str, column: &str, e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Storage(format!("Corrupt cache row for '{destination}': {column}: {e}"))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| ApplicationError::Storage(format!("Invalid stored timestamp: {ms}")))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Weather cache backed by a SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteWeatherCache {
    pool: SqlitePool,
}

impl SqliteWeatherCache {
    /// Create a cache over an already migrated pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bump the hit counter, logging instead of failing
    async fn record_hit_best_effort(&self, destination: &Destination) {
        if let Err(e) = self.record_hit(destination).await {
            warn!(destination = %destination, error = %e, "Failed to record cache hit");
        }
    }
}

#[async_trait]
impl WeatherCachePort for SqliteWeatherCache {
    #[instrument(skip(self, destination), fields(destination = %destination))]
    async fn find_valid(
        &self,
        destination: &Destination,
    ) -> Result<Option<CacheEntry>, ApplicationError> {
        let row: Option<CacheRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM weather_cache \
             WHERE destination = $1 AND expires_at > $2"
        ))
        .bind(destination.as_str())
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            debug!("Cache miss");
            return Ok(None);
        };

        let entry = row.into_entry()?;
        debug!(hit_count = entry.hit_count, "Cache hit");
        self.record_hit_best_effort(destination).await;
        Ok(Some(entry))
    }

    #[instrument(skip(self, destination, payload), fields(destination = %destination))]
    async fn upsert(
        &self,
        destination: &Destination,
        payload: CachePayload,
        ttl: Duration,
    ) -> Result<CacheEntry, ApplicationError> {
        let ttl_ms = i64::try_from(ttl.as_millis())
            .map_err(|_| ApplicationError::InvalidInput(format!("TTL too large: {ttl:?}")))?;
        let cached_ms = now_millis();
        let expires_ms = cached_ms.saturating_add(ttl_ms);

        let current_json = serde_json::to_string(&payload.current)
            .map_err(|e| ApplicationError::Internal(format!("Serialize current: {e}")))?;
        let forecast_json = serde_json::to_string(&payload.forecast)
            .map_err(|e| ApplicationError::Internal(format!("Serialize forecast: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO weather_cache (
                destination, lat, lon, current_json, forecast_json, raw_data_compressed,
                cached_at, expires_at, hit_count, last_accessed_at, api_source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10)
            ON CONFLICT(destination) DO UPDATE SET
                lat = excluded.lat,
                lon = excluded.lon,
                current_json = excluded.current_json,
                forecast_json = excluded.forecast_json,
                raw_data_compressed = excluded.raw_data_compressed,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at,
                hit_count = 0,
                last_accessed_at = excluded.last_accessed_at,
                api_source = excluded.api_source
            ",
        )
        .bind(destination.as_str())
        .bind(payload.coordinates.lat)
        .bind(payload.coordinates.lon)
        .bind(&current_json)
        .bind(&forecast_json)
        .bind(payload.raw_data_compressed.as_deref())
        .bind(cached_ms)
        .bind(expires_ms)
        .bind(cached_ms)
        .bind(&payload.api_source)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let cached_at = from_millis(cached_ms)?;
        debug!(expires_ms, "Cache entry written");

        Ok(CacheEntry {
            destination: destination.clone(),
            coordinates: payload.coordinates,
            current: payload.current,
            forecast: payload.forecast,
            raw_data_compressed: payload.raw_data_compressed,
            cached_at,
            expires_at: from_millis(expires_ms)?,
            hit_count: 0,
            last_accessed_at: cached_at,
            api_source: payload.api_source,
        })
    }

    async fn record_hit(&self, destination: &Destination) -> Result<(), ApplicationError> {
        sqlx::query(
            "UPDATE weather_cache \
             SET hit_count = hit_count + 1, last_accessed_at = $2 \
             WHERE destination = $1",
        )
        .bind(destination.as_str())
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn raw_payload(
        &self,
        destination: &Destination,
    ) -> Result<Option<String>, ApplicationError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT raw_data_compressed FROM weather_cache WHERE destination = $1")
                .bind(destination.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.and_then(|(blob,)| blob))
    }

    async fn stats(&self) -> Result<CacheStats, ApplicationError> {
        let (total, valid, hits): (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN expires_at > $1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(hit_count), 0)
            FROM weather_cache
            ",
        )
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(CacheStats::from_counts(
            to_count(total),
            to_count(valid),
            to_count(hits),
        ))
    }

    #[instrument(skip(self))]
    async fn cleanup_expired(&self) -> Result<u64, ApplicationError> {
        let result = sqlx::query("DELETE FROM weather_cache WHERE expires_at <= $1")
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!(removed = result.rows_affected(), "Expired entries deleted");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn clear_all(&self) -> Result<u64, ApplicationError> {
        let result = sqlx::query("DELETE FROM weather_cache")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
