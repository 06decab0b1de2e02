//! Request pacing and retry shared by network providers.
//!
//! - [`Pacer`] wraps a `governor` direct rate limiter so a full-year backfill
//!   does not hammer the vendor with ~365 back-to-back calls.
//! - [`RetryPolicy`] repeats a request with exponential backoff while the
//!   error says it is worth it ([`ProviderError::is_retryable`]).

use std::{future::Future, num::NonZeroU32, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use tracing::warn;

use crate::providers::ProviderError;

/// Requests per second used when the configuration does not set a rate.
pub const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(2u32);

/// Rate limiter for outgoing requests.
pub struct Pacer {
    limiter: DefaultDirectRateLimiter,
}

impl Pacer {
    /// Build a pacer allowing `rps` requests per second. `0` disables pacing.
    pub fn per_second(rps: u32) -> Option<Self> {
        NonZeroU32::new(rps).map(|n| Self {
            limiter: RateLimiter::direct(Quota::per_second(n)),
        })
    }

    /// Wait until the next request is allowed.
    pub async fn until_ready(&self) {
        self.limiter.until_ready().await;
    }
}

/// Exponential backoff retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempts = 0;
        let mut delay = self.base_delay;

        loop {
            attempts += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempts >= max || !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        "request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, max, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}
