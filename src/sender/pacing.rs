//! Send pacing: inter-send jitter, retry backoff and transport timeouts.
//!
//! The jittered delay between contacts is what keeps a campaign looking
//! like a person typing rather than a script.

use crate::config::PacingConfig;
use rand::Rng;
use std::time::Duration;

/// Default retry ceiling per contact.
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry_backoff: Duration,
    pub max_retries: u32,
    pub resolve_timeout: Duration,
    pub ready_timeout: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(5_000),
            max_delay: Duration::from_millis(15_000),
            retry_backoff: Duration::from_millis(2_000),
            max_retries: MAX_RETRIES,
            resolve_timeout: Duration::from_millis(5_000),
            ready_timeout: Duration::from_millis(10_000),
        }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_retries: config.max_retries,
            resolve_timeout: Duration::from_millis(config.resolve_timeout_ms),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
        }
    }
}

impl Pacing {
    /// No waiting anywhere. Retry ceiling unchanged.
    pub fn immediate() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Uniform draw from `[min_delay, max_delay]` at millisecond resolution.
    pub fn next_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}
