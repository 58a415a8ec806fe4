//! Application-level errors
//!
//! Provider failures arrive here already classified. The variant, not the
//! message, decides whether the retrying fetcher tries again.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
///
/// `Clone` so a single coalesced fetch result can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplicationError {
    /// Domain-level error (invalid destination, coordinates, ...)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Upstream could not resolve the destination
    #[error("Destination not found: {0}")]
    NotFound(String),

    /// Upstream rejected the API credentials
    #[error("Invalid API key")]
    AuthError,

    /// Upstream rate limit hit
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Network failure, timeout or upstream 5xx
    #[error("Weather service unavailable: {0}")]
    Transient(String),

    /// Any other upstream failure, message passed through
    #[error("{0}")]
    Generic(String),

    /// Caller supplied an unusable request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistent cache failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    ///
    /// Only transient failures and rate limiting are worth another attempt.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient(_))
    }

    /// Whether this error points at broken credentials or configuration
    /// rather than at the request
    pub const fn is_operational_alarm(&self) -> bool {
        matches!(self, Self::AuthError | Self::Configuration(_))
    }
}
