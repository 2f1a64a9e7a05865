//! Delay strategies between append retries.
//!
//! The strategy is injected into [`AppendService`](crate::AppendService) so
//! tests can run conflict and exhaustion scenarios without real delays.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Computes the delay before a retry.
pub trait Backoff: Send + Sync {
    /// Delay before retry number `retry` (0 for the first retry).
    fn delay(&self, retry: u32) -> Duration;
}

/// Exponential backoff with jitter:
/// `min(initial * 2^retry, max) + random(0..=50% of that)`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.initial_backoff(), config.max_backoff())
    }

    fn base(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, retry: u32) -> Duration {
        let capped = self.base(retry);
        let jitter_range = capped.as_millis() as u64 / 2;
        if jitter_range > 0 {
            capped + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_range))
        } else {
            capped
        }
    }
}

/// No delay at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _retry: u32) -> Duration {
        Duration::ZERO
    }
}
