//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Destination name is empty or malformed
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// Coordinates outside of the valid latitude/longitude range
    #[error("Invalid coordinates: latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates,
}
