//! Fixed-delay retry for attachment downloads
//!
//! A download is attempted up to [`RetryPolicy::max_attempts`] times with a
//! constant pause between attempts. Whether an error is worth another attempt
//! is decided by a caller-supplied predicate; [`any_error`] retries
//! everything.
//!
//! # Example
//!
//! ```no_run
//! use telegram_grabber::download::retry::{RetryPolicy, any_error, with_retry};
//!
//! # async fn example() -> telegram_grabber::Result<()> {
//! let policy = RetryPolicy::default();
//! with_retry(&policy, any_error, |attempt| async move {
//!     tracing::debug!(attempt, "trying");
//!     Ok(())
//! })
//! .await
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// Default number of attempts per download
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Bounded retry with a fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Predicate that treats every error as retryable
#[must_use]
pub const fn any_error(_: &Error) -> bool {
    true
}

/// Run `operation` until it succeeds or the policy gives up
///
/// `operation` receives the 1-based attempt number. On failure the last error
/// is returned wrapped in [`Error::Download`] together with the number of
/// attempts made.
///
/// # Errors
///
/// Returns [`Error::Download`] when every attempt failed or the predicate
/// rejected an error
pub async fn with_retry<F, Fut, T, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "download succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis(),
                    "download attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Error::Download {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}
