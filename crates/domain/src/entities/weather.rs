//! Weather observations and forecasts in their internal shape
//!
//! The provider adapter maps upstream JSON into these types; everything past
//! that boundary only ever sees this schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Provider condition classification (`main` group, numeric id, free text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    /// Condition group, e.g. `"Rain"` or `"Clouds"`
    pub main: String,
    /// Provider condition code
    pub id: u32,
    /// Human readable description, e.g. `"light rain"`
    pub description: String,
}

/// Current conditions at a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    /// Temperature in °C, rounded
    pub temp: i32,
    /// Apparent temperature in °C, rounded
    pub feels_like: i32,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Sea-level pressure in hPa
    pub pressure: u32,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in degrees
    pub wind_deg: u16,
    /// Cloud cover in percent
    pub clouds: u8,
    /// Visibility in meters, when reported
    pub visibility: Option<u32>,
    /// Condition group, e.g. `"Clear"`
    pub condition: String,
    /// Provider condition code
    pub condition_id: u32,
    /// Condition description
    pub description: String,
    /// Provider icon code, e.g. `"01d"`
    pub icon: String,
    /// Sunrise (UTC)
    pub sunrise: DateTime<Utc>,
    /// Sunset (UTC)
    pub sunset: DateTime<Utc>,
}

/// One 3-hour forecast sample as delivered by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Start of the sampled interval (UTC)
    pub timestamp: DateTime<Utc>,
    /// Temperature in °C, unrounded
    pub temp: f64,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Condition classification
    pub condition: ConditionInfo,
    /// Provider icon code
    pub icon: String,
    /// Probability of precipitation (0.0 - 1.0)
    pub pop: f64,
}

/// Aggregated forecast for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Calendar date (UTC)
    pub date: NaiveDate,
    /// Rounded minimum temperature in °C
    pub temp_min: i32,
    /// Rounded maximum temperature in °C
    pub temp_max: i32,
    /// Rounded mean relative humidity in percent
    pub humidity: u8,
    /// Most frequent condition group of the day
    pub condition: String,
    /// Condition code belonging to `condition`
    pub condition_id: u32,
    /// Description belonging to `condition`
    pub description: String,
    /// Day-variant icon if the day has one
    pub icon: String,
    /// Maximum precipitation probability, percent
    pub pop: u8,
}
