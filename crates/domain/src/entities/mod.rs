//! Domain entities - Objects with identity and lifecycle

mod cache_entry;
mod weather;
mod weather_result;

pub use cache_entry::{CacheEntry, CachePayload};
pub use weather::{ConditionInfo, CurrentConditions, DailySummary, ForecastSample};
pub use weather_result::WeatherResult;
