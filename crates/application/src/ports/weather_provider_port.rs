//! Weather provider port
//!
//! The upstream source of fresh weather. Implementations are expected to do
//! their own retrying and to classify failures into `ApplicationError`
//! variants (`NotFound`, `AuthError`, `RateLimited`, `Transient`, `Generic`).

use async_trait::async_trait;
use domain::{Coordinates, CurrentConditions, Destination, ForecastSample};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// One successful provider round-trip, before aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSnapshot {
    /// Position the provider resolved the destination to
    pub coordinates: Coordinates,
    /// Current conditions
    pub current: CurrentConditions,
    /// Flat, ordered 3-hour forecast samples
    pub samples: Vec<ForecastSample>,
    /// Untouched upstream JSON, kept for diagnostics
    pub raw: serde_json::Value,
}

/// Port for the upstream weather provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherProviderPort: Send + Sync {
    /// Fetch current conditions and forecast samples for a destination
    async fn fetch(&self, destination: &Destination) -> Result<ProviderSnapshot, ApplicationError>;

    /// Identifier stored as `api_source` on cache entries
    fn source_name(&self) -> &'static str;
}
