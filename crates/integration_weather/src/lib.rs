//! OpenWeatherMap integration
//!
//! Client for the OpenWeatherMap current-weather and 5 day / 3 hour forecast
//! API (<https://openweathermap.org/api>). Requires an API key.
//!
//! Failures carry a [`ProviderErrorKind`] so callers can decide what to
//! retry without matching on HTTP details.

pub mod client;
mod models;

pub use client::{
    API_SOURCE, OpenWeatherMapClient, ProviderErrorKind, WeatherClient, WeatherConfig,
    WeatherError,
};
pub use models::WeatherReport;
