//! Generic retry logic with linear or exponential backoff
//!
//! Provides a configurable retry mechanism for fallible operations. Only
//! errors reporting [`Retryable::is_retryable`] are retried; everything else
//! fails on the first attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use infrastructure::retry::{RetryConfig, with_retry};
//!
//! let config = RetryConfig::default();
//! let result = with_retry(&config, || async {
//!     provider.fetch_weather("kandy").await
//! }).await;
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `k × base` after the k-th failure
    #[default]
    Linear,
    /// `base × 2^(k-1)` after the k-th failure
    Exponential,
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds (default: 1000ms)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds (default: 10000ms = 10s)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Delay growth (default: linear)
    #[serde(default)]
    pub backoff: Backoff,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> u64 {
    1000
}

const fn default_max_delay() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Create a linear retry configuration
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            backoff: Backoff::Linear,
        }
    }

    /// Switch to exponential backoff
    #[must_use]
    pub const fn exponential(mut self) -> Self {
        self.backoff = Backoff::Exponential;
        self
    }

    /// Delay after the `failed_attempt`-th failure (1-indexed)
    ///
    /// Capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let k = u64::from(failed_attempt.max(1));
        let raw = match self.backoff {
            Backoff::Linear => self.base_delay_ms.saturating_mul(k),
            Backoff::Exponential => {
                let factor = 1u64.checked_shl(u32::try_from(k - 1).unwrap_or(u32::MAX));
                factor.map_or(u64::MAX, |f| self.base_delay_ms.saturating_mul(f))
            },
        };
        Duration::from_millis(raw.min(self.max_delay_ms))
    }
}

/// Trait for errors that can be checked for retryability
pub trait Retryable {
    /// Returns true if this error is retryable
    fn is_retryable(&self) -> bool;
}

// Implement Retryable for ApplicationError
impl Retryable for application::ApplicationError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Retry result containing either success or the last error
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The result of the operation
    pub result: Result<T, E>,
    /// Number of attempts made (1 = no retries, 2 = one retry, etc.)
    pub attempts: u32,
    /// Total time spent including retries
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Convert to standard Result, discarding metadata
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Execute an async operation with retry logic
///
/// Retries the operation according to the configuration when it fails
/// with a retryable error. The last error is returned once attempts run out.
#[allow(clippy::cast_possible_truncation)]
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let start = tokio::time::Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let result = operation().await;

        match result {
            Ok(value) => {
                if attempts > 1 {
                    debug!(
                        attempts = attempts,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Operation succeeded after retries"
                    );
                }
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            },
            Err(err) => {
                if !err.is_retryable() {
                    debug!(
                        attempts = attempts,
                        error = %err,
                        "Operation failed with non-retryable error"
                    );
                    return RetryResult {
                        result: Err(err),
                        attempts,
                        total_duration: start.elapsed(),
                    };
                }

                if attempts >= max_attempts {
                    warn!(
                        attempts = attempts,
                        max_attempts = max_attempts,
                        error = %err,
                        "Operation failed after max attempts"
                    );
                    return RetryResult {
                        result: Err(err),
                        attempts,
                        total_duration: start.elapsed(),
                    };
                }

                let delay = config.delay_after(attempts);
                warn!(
                    attempt = attempts,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            },
        }
    }
}
