//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod weather_cache_port;
mod weather_provider_port;

#[cfg(test)]
pub use weather_cache_port::MockWeatherCachePort;
pub use weather_cache_port::{CacheStats, WeatherCachePort};
#[cfg(test)]
pub use weather_provider_port::MockWeatherProviderPort;
pub use weather_provider_port::{ProviderSnapshot, WeatherProviderPort};
