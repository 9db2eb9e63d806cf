//! Retry policy for item attempts
//!
//! The policy is a plain value object: maximum attempts, exponential backoff
//! with a cap, and a retriable-error predicate delegated to the provider
//! error classification. Sleeping goes through the `Sleeper` trait so tests
//! never wait on real delays.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::provider::ProviderError;

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Retry configuration for one item attempt sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum provider calls per item (first attempt included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff ceiling (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt may follow the given failure. `attempt` is
    /// the number of calls already made.
    pub fn should_retry(&self, error: &ProviderError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retriable()
    }

    /// Exponential backoff after the given attempt number (1-based), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Backoff adjusted for the failure that triggered it. A rate-limited
    /// call honors the server-suggested delay when it exceeds the backoff,
    /// so remaining items do not hammer a shared credential.
    pub fn delay_after(&self, attempt: u32, error: &ProviderError) -> Duration {
        let backoff = self.backoff(attempt);
        if let ProviderError::RateLimited {
            retry_after: Some(seconds),
            ..
        } = error
        {
            return backoff.max(Duration::from_secs(*seconds));
        }
        backoff
    }
}

/// Injectable sleep, so retry and polling delays run on virtual time in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
