//! Backoff for the Telegram polling loop

use std::time::{Duration, SystemTime};

/// Backoff applied between failed `getUpdates` calls
///
/// Delays grow exponentially from `base_delay` and are capped at
/// `max_delay`. A server-supplied `retry_after` wins over the computed delay.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    /// Delay after the first failure (doubles on each consecutive failure)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    failures: u32,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl PollBackoff {
    /// Create a backoff with the given bounds
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            failures: 0,
        }
    }

    /// Consecutive failures recorded since the last success
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Forget previous failures after a successful poll
    pub const fn reset(&mut self) {
        self.failures = 0;
    }

    /// Record a failure and return how long to wait before polling again
    ///
    /// Jitter of 0-25% is derived from the system clock's subsecond nanos.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Duration {
        let attempt = self.failures;
        self.failures = self.failures.saturating_add(1);

        if let Some(ra) = retry_after {
            return ra.min(self.max_delay);
        }

        let base = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter = base.mul_f64(f64::from(nanos % 250) / 1000.0);

        (base + jitter).min(self.max_delay)
    }
}

/// Whether a failed Bot API call is worth polling again
///
/// Rate limits (429) and server errors (5xx) are transient. Anything else
/// (revoked token, deleted bot, conflicting webhook) ends the subscription.
#[must_use]
pub fn is_recoverable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
