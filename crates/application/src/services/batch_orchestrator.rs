//! Multi-destination lookups
//!
//! Two batch shapes are offered:
//!
//! - [`BatchOrchestrator::get_multiple_weather`] runs one coalesced lookup per
//!   unique destination, all concurrently, and reports one row each.
//! - [`BatchOrchestrator::update_multiple_destinations`] partitions the input
//!   into "already cached" and "needs fetch", then fetches the latter in
//!   paced chunks so a large refresh never bursts the upstream quota.
//!
//! One destination failing never affects the others.

use std::sync::Arc;
use std::time::Duration;

use domain::{Destination, WeatherResult};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::RequestCoalescer;
use crate::error::ApplicationError;
use crate::ports::WeatherCachePort;

/// Batch sizing and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Destinations fetched concurrently per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Pause between consecutive chunks (milliseconds)
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    /// Largest accepted batch
    #[serde(default = "default_max_destinations")]
    pub max_destinations: usize,
}

const fn default_chunk_size() -> usize {
    5
}

const fn default_chunk_delay_ms() -> u64 {
    500
}

const fn default_max_destinations() -> usize {
    20
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            max_destinations: default_max_destinations(),
        }
    }
}

impl BatchConfig {
    /// Pause between chunks
    #[must_use]
    pub const fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

/// One row of a [`BatchOrchestrator::get_multiple_weather`] result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWeatherItem {
    /// Normalized destination (or the trimmed input if it did not normalize)
    pub destination: String,
    /// Whether `data` is present
    pub success: bool,
    /// Weather on success
    pub data: Option<WeatherResult>,
    /// Error message on failure
    pub error: Option<String>,
}

impl BatchWeatherItem {
    fn from_outcome(destination: String, outcome: Result<WeatherResult, ApplicationError>) -> Self {
        match outcome {
            Ok(data) => Self {
                destination,
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                destination,
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// One destination in a [`BatchUpdateReport`] bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateItem {
    /// Normalized destination
    pub destination: String,
    /// Weather, for the `success` and `from_cache` buckets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WeatherResult>,
    /// Error message, for the `failed` bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchUpdateItem {
    fn ok(destination: String, data: WeatherResult) -> Self {
        Self {
            destination,
            data: Some(data),
            error: None,
        }
    }

    fn failed(destination: String, error: &ApplicationError) -> Self {
        Self {
            destination,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Outcome of [`BatchOrchestrator::update_multiple_destinations`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateReport {
    /// Freshly fetched
    pub success: Vec<BatchUpdateItem>,
    /// Fetch failed
    pub failed: Vec<BatchUpdateItem>,
    /// Already validly cached, not fetched
    pub from_cache: Vec<BatchUpdateItem>,
}

/// Input after normalization and deduplication
#[derive(Debug, Default)]
struct Deduped {
    unique: Vec<Destination>,
    rejected: Vec<Rejected>,
}

/// An input that did not normalize
#[derive(Debug)]
struct Rejected {
    /// Row index among all output rows, in first-appearance order
    position: usize,
    input: String,
    error: ApplicationError,
}

/// Batch front-end over the coalescer
pub struct BatchOrchestrator {
    coalescer: Arc<RequestCoalescer>,
    cache: Arc<dyn WeatherCachePort>,
    config: BatchConfig,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("coalescer", &self.coalescer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    /// Create an orchestrator sharing the given coalescer
    pub fn new(
        coalescer: Arc<RequestCoalescer>,
        cache: Arc<dyn WeatherCachePort>,
        config: BatchConfig,
    ) -> Self {
        Self {
            coalescer,
            cache,
            config,
        }
    }

    /// Current batch configuration
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Look up every unique destination concurrently
    ///
    /// Rows follow first-appearance order of the normalized destinations.
    /// Inputs that do not normalize become failed rows.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the batch is empty or larger than the configured
    /// maximum. Per-destination failures are reported in their rows.
    pub async fn get_multiple_weather<S: AsRef<str>>(
        &self,
        destinations: &[S],
    ) -> Result<Vec<BatchWeatherItem>, ApplicationError> {
        self.check_size(destinations.len())?;
        let Deduped { unique, rejected } = dedupe(destinations);
        debug!(unique = unique.len(), rejected = rejected.len(), "Batch lookup");

        let outcomes = join_all(
            unique
                .iter()
                .map(|destination| self.coalescer.get_destination(destination, false)),
        )
        .await;

        let mut rows: Vec<BatchWeatherItem> = unique
            .into_iter()
            .zip(outcomes)
            .map(|(destination, outcome)| {
                BatchWeatherItem::from_outcome(destination.into_inner(), outcome)
            })
            .collect();
        // Positions ascend, so each insert lands at its final index.
        for Rejected { position, input, error } in rejected {
            let row = BatchWeatherItem::from_outcome(input, Err(error));
            rows.insert(position.min(rows.len()), row);
        }
        Ok(rows)
    }

    /// Refresh every destination that is not validly cached
    ///
    /// Cached destinations are reported under `from_cache` without any
    /// upstream call. The rest are fetched `chunk_size` at a time, chunks in
    /// sequence with `chunk_delay` between them.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the batch is empty or larger than the configured
    /// maximum. Per-destination failures land in `failed`.
    pub async fn update_multiple_destinations<S: AsRef<str>>(
        &self,
        destinations: &[S],
    ) -> Result<BatchUpdateReport, ApplicationError> {
        self.check_size(destinations.len())?;
        let Deduped { unique, rejected } = dedupe(destinations);

        let mut report = BatchUpdateReport::default();
        report.failed.extend(
            rejected
                .iter()
                .map(|r| BatchUpdateItem::failed(r.input.clone(), &r.error)),
        );

        let needs_fetch = self.partition(unique, &mut report).await;
        info!(
            cached = report.from_cache.len(),
            to_fetch = needs_fetch.len(),
            "Batch update"
        );

        let chunk_size = self.config.chunk_size.max(1);
        for (index, chunk) in needs_fetch.chunks(chunk_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.chunk_delay()).await;
            }
            debug!(chunk = index, size = chunk.len(), "Dispatching fetch chunk");

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|destination| self.coalescer.get_destination(destination, false)),
            )
            .await;

            for (destination, outcome) in chunk.iter().zip(outcomes) {
                let name = destination.as_str().to_string();
                match outcome {
                    Ok(data) => report.success.push(BatchUpdateItem::ok(name, data)),
                    Err(e) => {
                        warn!(destination = %destination, error = %e, "Batch fetch failed");
                        report.failed.push(BatchUpdateItem::failed(name, &e));
                    },
                }
            }
        }

        Ok(report)
    }

    /// Move validly cached destinations into the report; return the rest
    async fn partition(
        &self,
        unique: Vec<Destination>,
        report: &mut BatchUpdateReport,
    ) -> Vec<Destination> {
        let lookups = join_all(unique.iter().map(|d| self.cache.find_valid(d))).await;

        let mut needs_fetch = Vec::new();
        for (destination, lookup) in unique.into_iter().zip(lookups) {
            match lookup {
                Ok(Some(entry)) => report.from_cache.push(BatchUpdateItem::ok(
                    destination.into_inner(),
                    WeatherResult::from_entry(entry, true),
                )),
                Ok(None) => needs_fetch.push(destination),
                Err(e) => {
                    warn!(destination = %destination, error = %e, "Cache lookup failed, fetching");
                    needs_fetch.push(destination);
                },
            }
        }
        needs_fetch
    }

    fn check_size(&self, len: usize) -> Result<(), ApplicationError> {
        if len == 0 || len > self.config.max_destinations {
            return Err(ApplicationError::InvalidInput(format!(
                "Expected 1 to {} destinations, got {len}",
                self.config.max_destinations
            )));
        }
        Ok(())
    }
}

/// Normalize and deduplicate, keeping first-appearance order
fn dedupe<S: AsRef<str>>(destinations: &[S]) -> Deduped {
    let mut deduped = Deduped::default();
    for raw in destinations {
        match Destination::parse(raw.as_ref()) {
            Ok(destination) if !deduped.unique.contains(&destination) => {
                deduped.unique.push(destination);
            },
            Ok(_) => {},
            Err(e) => {
                let position = deduped.unique.len() + deduped.rejected.len();
                deduped.rejected.push(Rejected {
                    position,
                    input: raw.as_ref().trim().to_string(),
                    error: e.into(),
                });
            },
        }
    }
    deduped
}
