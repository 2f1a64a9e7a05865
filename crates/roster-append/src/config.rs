use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppendError, AppendResult};

/// Default maximum number of commit attempts per append.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default number of re-fetches allowed after transient failures.
pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Default upper bound on a single retry delay (before jitter).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Retry budgets for [`AppendService`](crate::AppendService).
///
/// Conflicts and transient fetch failures are budgeted separately: a burst
/// of contention does not eat into tolerance for a flaky network, and the
/// other way around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Commit attempts before giving up on conflicts. At least 1.
    pub max_attempts: u32,
    /// Re-fetches after transient failures, across the whole append.
    pub max_transient_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF.as_millis() as u64,
            max_backoff_ms: DEFAULT_MAX_BACKOFF.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn validate(&self) -> AppendResult<()> {
        if self.max_attempts == 0 {
            return Err(AppendError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(AppendError::InvalidConfig(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Builder for [`RetryConfig`]; `build` validates.
#[derive(Clone, Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn max_transient_retries(mut self, n: u32) -> Self {
        self.config.max_transient_retries = n;
        self
    }

    pub fn initial_backoff(mut self, d: Duration) -> Self {
        self.config.initial_backoff_ms = d.as_millis() as u64;
        self
    }

    pub fn max_backoff(mut self, d: Duration) -> Self {
        self.config.max_backoff_ms = d.as_millis() as u64;
        self
    }

    pub fn build(self) -> AppendResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
