//! Application services - Use case implementations

mod batch_orchestrator;
mod forecast_aggregator;
mod payload_codec;
mod request_coalescer;
#[cfg(test)]
pub(crate) mod test_support;
mod weather_cache_service;

pub use batch_orchestrator::{
    BatchConfig, BatchOrchestrator, BatchUpdateItem, BatchUpdateReport, BatchWeatherItem,
};
pub use forecast_aggregator::{ForecastAggregator, MAX_FORECAST_DAYS};
pub use payload_codec::{DecodedPayload, PayloadCodec};
pub use request_coalescer::RequestCoalescer;
pub use weather_cache_service::{
    DEFAULT_TTL, RawPayloadReport, WeatherCacheService, WeatherServiceConfig,
};
