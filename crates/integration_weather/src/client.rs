//! OpenWeatherMap client
//!
//! HTTP client for the OpenWeatherMap current-weather and 5 day / 3 hour
//! forecast endpoints. Both requests run concurrently; either failing fails
//! the whole fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{ConditionInfo, Coordinates, CurrentConditions, ForecastSample};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{CurrentResponse, ForecastResponse, WeatherReport, primary_tag};

/// Identifier recorded as the source of cached data
pub const API_SOURCE: &str = "openweathermap";

/// How a failure should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Unknown destination (HTTP 404)
    NotFound,
    /// Rejected credentials (HTTP 401)
    Auth,
    /// Quota exceeded (HTTP 429)
    RateLimited,
    /// No response, timeout, or HTTP 5xx
    Transient,
    /// Anything else
    Generic,
}

/// Weather client errors
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The provider does not know the destination
    #[error("Destination not found: {0}")]
    NotFound(String),

    /// The API key was rejected
    #[error("Invalid API key")]
    Unauthorized,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No response was received (connect failure or timeout)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request was answered with an unexpected status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse response from weather service
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The HTTP client could not be built
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
}

impl WeatherError {
    /// Classification that drives retry and user-facing messages
    #[must_use]
    pub const fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::NotFound(_) => ProviderErrorKind::NotFound,
            Self::Unauthorized => ProviderErrorKind::Auth,
            Self::RateLimitExceeded => ProviderErrorKind::RateLimited,
            Self::ServiceUnavailable(_) | Self::ConnectionFailed(_) => {
                ProviderErrorKind::Transient
            },
            Self::RequestFailed(_) | Self::ParseError(_) | Self::ClientInit(_) => {
                ProviderErrorKind::Generic
            },
        }
    }

    /// Map a reqwest failure that happened before a full body arrived
    ///
    /// The URL carries the API key, so it is stripped from the message.
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::RequestFailed(err.without_url().to_string())
        } else {
            Self::ConnectionFailed(err.without_url().to_string())
        }
    }

    /// Map a non-success status to an error
    fn from_status(status: StatusCode, destination: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(destination.to_string()),
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded,
            s if s.is_server_error() => Self::ServiceUnavailable(format!("HTTP {s}")),
            s => Self::RequestFailed(format!("HTTP {s}")),
        }
    }
}

/// Weather service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API base URL (default: <https://api.openweathermap.org/data/2.5>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `appid`
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

const fn default_timeout() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Weather client trait for fetching weather data
#[async_trait]
pub trait WeatherClient: Send + Sync {
    /// Current conditions and forecast samples for a destination name
    async fn fetch_weather(&self, destination: &str) -> Result<WeatherReport, WeatherError>;
}

/// OpenWeatherMap HTTP client implementation
#[derive(Debug)]
pub struct OpenWeatherMapClient {
    client: Client,
    config: WeatherConfig,
}

impl OpenWeatherMapClient {
    /// Create a new client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::ClientInit(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    /// GET one endpoint and return its JSON body
    async fn get_json(
        &self,
        endpoint: &str,
        destination: &str,
    ) -> Result<serde_json::Value, WeatherError> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, "Requesting weather endpoint");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", destination),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(WeatherError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::from_status(status, destination));
        }

        // Read the body before decoding so a stalled transfer stays a
        // transport failure rather than a parse failure.
        let body = response.bytes().await.map_err(WeatherError::from_transport)?;
        serde_json::from_slice(&body).map_err(|e| WeatherError::ParseError(e.to_string()))
    }

    /// Map a `/weather` body into current conditions
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn parse_current(
        body: &serde_json::Value,
    ) -> Result<(Coordinates, CurrentConditions), WeatherError> {
        let data: CurrentResponse = serde_json::from_value(body.clone())
            .map_err(|e| WeatherError::ParseError(format!("current weather: {e}")))?;

        let coordinates = Coordinates::new(data.coord.lat, data.coord.lon)
            .map_err(|e| WeatherError::ParseError(e.to_string()))?;
        let tag = primary_tag(&data.weather);

        let current = CurrentConditions {
            temp: data.main.temp.round() as i32,
            feels_like: data.main.feels_like.round() as i32,
            humidity: data.main.humidity.round().clamp(0.0, 100.0) as u8,
            pressure: data.main.pressure.round().max(0.0) as u32,
            wind_speed: data.wind.speed,
            wind_deg: data.wind.deg.round().clamp(0.0, 360.0) as u16,
            clouds: data.clouds.all.round().clamp(0.0, 100.0) as u8,
            visibility: data.visibility,
            condition: tag.main,
            condition_id: tag.id,
            description: tag.description,
            icon: tag.icon,
            sunrise: Self::parse_epoch(data.sys.sunrise)?,
            sunset: Self::parse_epoch(data.sys.sunset)?,
        };

        Ok((coordinates, current))
    }

    /// Map a `/forecast` body into samples, keeping provider order
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn parse_samples(body: &serde_json::Value) -> Result<Vec<ForecastSample>, WeatherError> {
        let data: ForecastResponse = serde_json::from_value(body.clone())
            .map_err(|e| WeatherError::ParseError(format!("forecast: {e}")))?;

        data.list
            .into_iter()
            .map(|item| {
                let tag = primary_tag(&item.weather);
                Ok(ForecastSample {
                    timestamp: Self::parse_epoch(item.dt)?,
                    temp: item.main.temp,
                    humidity: item.main.humidity.round().clamp(0.0, 100.0) as u8,
                    condition: ConditionInfo {
                        main: tag.main,
                        id: tag.id,
                        description: tag.description,
                    },
                    icon: tag.icon,
                    pop: item.pop,
                })
            })
            .collect()
    }

    /// Convert epoch seconds to a UTC timestamp
    fn parse_epoch(secs: i64) -> Result<DateTime<Utc>, WeatherError> {
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| WeatherError::ParseError(format!("Invalid timestamp: {secs}")))
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn fetch_weather(&self, destination: &str) -> Result<WeatherReport, WeatherError> {
        let (current_raw, forecast_raw) = tokio::try_join!(
            self.get_json("weather", destination),
            self.get_json("forecast", destination)
        )?;

        let (coordinates, current) = Self::parse_current(&current_raw)?;
        let samples = Self::parse_samples(&forecast_raw)?;
        debug!(samples = samples.len(), "Parsed weather response");

        Ok(WeatherReport {
            coordinates,
            current,
            samples,
            raw: serde_json::json!({ "current": current_raw, "forecast": forecast_raw }),
        })
    }
}
