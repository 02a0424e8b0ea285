//! Retry bookkeeping with capped exponential backoff
//!
//! This module provides the retry primitives used by failure supervisors:
//! - [`BackoffPolicy`]: delay `min(initial * multiplier^n, max)` for the n-th retry
//! - [`RetryTracker`]: bounded retry counter around an async retry action

use crate::logging::{log_debug, log_warn};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Default retry budget for a supervised subtree.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry budget and backoff curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Maximum number of retries before giving up
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay before recovering from the retry numbered `retry_count` (0-based).
    ///
    /// With the defaults: 100ms, 200ms, 400ms, 800ms, then capped at 1s.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        if capped_ms.is_finite() && capped_ms >= 0.0 {
            Duration::from_millis(capped_ms.round() as u64)
        } else {
            self.max_delay
        }
    }

    pub fn can_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

/// Bounded retry counter around a user-triggered retry action.
///
/// Each [`retry`](Self::retry) consumes one attempt. A successful attempt
/// resets the tracker; a failed one keeps the count and returns the error.
/// Once the budget is spent further calls do nothing.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    max_retries: u32,
    retry_count: u32,
    is_retrying: bool,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryTracker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_count: 0,
            is_retrying: false,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_retrying(&self) -> bool {
        self.is_retrying
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.is_retrying = false;
    }

    /// Run one retry attempt.
    ///
    /// Returns `Ok(false)` without running `action` when the budget is spent,
    /// `Ok(true)` when the attempt succeeded.
    pub async fn retry<F, Fut, E>(&mut self, action: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if !self.can_retry() {
            log_debug!(
                retry_count = self.retry_count,
                max_retries = self.max_retries,
                "Retry budget exhausted, ignoring retry request"
            );
            return Ok(false);
        }

        self.is_retrying = true;
        self.retry_count += 1;

        match action().await {
            Ok(()) => {
                log_debug!(attempt = self.retry_count, "Retry attempt succeeded");
                self.reset();
                Ok(true)
            }
            Err(error) => {
                log_warn!(
                    attempt = self.retry_count,
                    max_retries = self.max_retries,
                    "Retry attempt failed"
                );
                self.is_retrying = false;
                Err(error)
            }
        }
    }
}

/// Serialize durations as integer milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
