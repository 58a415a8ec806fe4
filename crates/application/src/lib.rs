//! Application layer - Use cases and orchestration
//!
//! Holds the weather cache use cases (coalesced lookup, batch fetch, stats)
//! and the ports the infrastructure layer implements for storage and the
//! upstream provider.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
