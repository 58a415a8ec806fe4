//! Weather adapter - Implements WeatherProviderPort using integration_weather
//!
//! Classifies client failures into application errors and retries the
//! retryable ones (rate limiting, transient) within the configured budget.

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::{ProviderSnapshot, WeatherProviderPort};
use async_trait::async_trait;
use domain::Destination;
use integration_weather::{
    API_SOURCE, OpenWeatherMapClient, ProviderErrorKind, WeatherClient, WeatherConfig,
    WeatherError, WeatherReport,
};
use tracing::{debug, error, instrument};

use crate::retry::{RetryConfig, with_retry};

/// Retrying provider adapter over an OpenWeatherMap-style client
pub struct RetryingWeatherAdapter {
    client: Arc<dyn WeatherClient>,
    retry: RetryConfig,
}

impl std::fmt::Debug for RetryingWeatherAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingWeatherAdapter")
            .field("client", &API_SOURCE)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RetryingWeatherAdapter {
    /// Create an adapter with a fresh OpenWeatherMap client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_config(config: WeatherConfig, retry: RetryConfig) -> Result<Self, ApplicationError> {
        let client = OpenWeatherMapClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(client), retry))
    }

    /// Wrap an existing client
    #[must_use]
    pub fn new(client: Arc<dyn WeatherClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Map integration weather error to application error
    fn map_error(err: &WeatherError, destination: &Destination) -> ApplicationError {
        match err.kind() {
            ProviderErrorKind::NotFound => ApplicationError::NotFound(destination.to_string()),
            ProviderErrorKind::Auth => ApplicationError::AuthError,
            ProviderErrorKind::RateLimited => ApplicationError::RateLimited,
            ProviderErrorKind::Transient => ApplicationError::Transient(err.to_string()),
            ProviderErrorKind::Generic => ApplicationError::Generic(err.to_string()),
        }
    }

    fn into_snapshot(report: WeatherReport) -> ProviderSnapshot {
        ProviderSnapshot {
            coordinates: report.coordinates,
            current: report.current,
            samples: report.samples,
            raw: report.raw,
        }
    }
}

#[async_trait]
impl WeatherProviderPort for RetryingWeatherAdapter {
    #[instrument(skip(self, destination), fields(destination = %destination))]
    async fn fetch(&self, destination: &Destination) -> Result<ProviderSnapshot, ApplicationError> {
        let outcome = with_retry(&self.retry, || async {
            self.client
                .fetch_weather(destination.as_str())
                .await
                .map_err(|e| Self::map_error(&e, destination))
        })
        .await;

        debug!(
            attempts = outcome.attempts,
            duration_ms = u64::try_from(outcome.total_duration.as_millis()).unwrap_or(u64::MAX),
            ok = outcome.is_ok(),
            "Provider fetch finished"
        );
        if let Some(e) = outcome.result.as_ref().err().filter(|e| e.is_operational_alarm()) {
            error!(error = %e, "Weather provider rejected the configured credentials");
        }
        outcome.into_result().map(Self::into_snapshot)
    }

    fn source_name(&self) -> &'static str {
        API_SOURCE
    }
}
