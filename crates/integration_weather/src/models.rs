//! Weather data models
//!
//! Wire types for the OpenWeatherMap `/weather` and `/forecast` endpoints,
//! plus the combined report handed to callers. Only the fields the cache
//! uses are modelled; everything else survives in the raw JSON.

use domain::{Coordinates, CurrentConditions, ForecastSample};
use serde::Deserialize;

/// Result of one successful current + forecast round-trip
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// Position the provider resolved the destination to
    pub coordinates: Coordinates,
    /// Current conditions, temperatures rounded to whole degrees
    pub current: CurrentConditions,
    /// 3-hour forecast samples in provider order
    pub samples: Vec<ForecastSample>,
    /// Both upstream bodies as `{"current": …, "forecast": …}`
    pub raw: serde_json::Value,
}

/// `GET /weather` body
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CurrentResponse {
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<WeatherTag>,
    pub main: CurrentMain,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    pub sys: Sys,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the `weather` array
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WeatherTag {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Default for WeatherTag {
    fn default() -> Self {
        Self {
            id: 0,
            main: "Unknown".to_string(),
            description: "unknown".to_string(),
            icon: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct CurrentMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct Clouds {
    #[serde(default)]
    pub all: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Sys {
    pub sunrise: i64,
    pub sunset: i64,
}

/// `GET /forecast` body
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastItem>,
}

/// One 3-hour slot
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastItem {
    pub dt: i64,
    pub main: ForecastMain,
    #[serde(default)]
    pub weather: Vec<WeatherTag>,
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ForecastMain {
    pub temp: f64,
    pub humidity: f64,
}

/// First entry of a `weather` array, or an "Unknown" placeholder
pub(crate) fn primary_tag(tags: &[WeatherTag]) -> WeatherTag {
    tags.first().cloned().unwrap_or_default()
}
