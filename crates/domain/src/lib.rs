//! Domain layer for the destination weather cache
//!
//! Contains the cache entry model, daily forecast summaries, and the value
//! objects every other layer keys on. No I/O happens here.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
