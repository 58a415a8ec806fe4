//! Persistence module
//!
//! SQLite-backed weather cache on an async sqlx pool.

pub mod async_connection;
pub mod error;
pub mod sqlite_weather_cache;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use error::map_sqlx_error;
pub use sqlite_weather_cache::SqliteWeatherCache;
