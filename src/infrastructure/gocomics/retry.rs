//! Retry budget and backoff schedule for strip downloads.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::NetworkConfig;

/// Exponent ceiling; beyond this the cap always wins.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`,
    /// capped at `max_delay`, plus up to `jitter`.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay.as_millis() as u64;
        let max_delay = self.max_delay.as_millis() as u64;
        let jitter_max = self.jitter.as_millis() as u64;

        let exponential_delay =
            base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT)));
        let capped_delay = exponential_delay.min(max_delay);

        let jitter = if jitter_max == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_max)
        };

        Duration::from_millis(capped_delay.saturating_add(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for RetryPolicy {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }
}
