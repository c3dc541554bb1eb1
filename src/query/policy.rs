//! Staleness, eviction and retry policy per resource kind.

use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::tmdb::client::TransportError;

/// Exponential backoff for failed fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first failure.
  pub retries: u32,
  pub base_delay: Duration,
  pub max_delay: Duration,
}

impl RetryPolicy {
  pub const DEFAULT: Self = Self {
    retries: 3,
    base_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(30),
  };

  pub const NONE: Self = Self {
    retries: 0,
    base_delay: Duration::ZERO,
    max_delay: Duration::ZERO,
  };

  /// Whether another attempt is allowed after `failures` consecutive failures.
  pub fn should_retry(&self, failures: u32, error: &TransportError) -> bool {
    error.is_retryable() && failures <= self.retries
  }

  /// Delay before the retry that follows failure number `failures` (1-based).
  pub fn delay(&self, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(20);
    self
      .base_delay
      .saturating_mul(1u32 << exponent)
      .min(self.max_delay)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Caching policy for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
  pub stale_after: Duration,
  /// Never shorter than `stale_after`.
  pub evict_after: Duration,
  pub retry: RetryPolicy,
}

impl QueryPolicy {
  pub const fn new(stale_after: Duration, evict_after: Duration) -> Self {
    let evict_after = if evict_after.as_nanos() < stale_after.as_nanos() {
      stale_after
    } else {
      evict_after
    };
    Self {
      stale_after,
      evict_after,
      retry: RetryPolicy::DEFAULT,
    }
  }

  pub const fn minutes(stale: u64, evict: u64) -> Self {
    Self::new(Duration::from_secs(stale * 60), Duration::from_secs(evict * 60))
  }

  pub const fn hours(stale: u64, evict: u64) -> Self {
    Self::minutes(stale * 60, evict * 60)
  }

  pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }
}

impl Default for QueryPolicy {
  fn default() -> Self {
    Self::minutes(5, 10)
  }
}

/// Run `attempt` until it succeeds or `policy` gives up, sleeping between tries.
pub async fn retrying<T, F>(key: &QueryKey, policy: RetryPolicy, attempt: F) -> Result<T, TransportError>
where
  F: Fn() -> BoxFuture<'static, Result<T, TransportError>>,
{
  let mut failures = 0;
  loop {
    match attempt().await {
      Ok(value) => return Ok(value),
      Err(error) => {
        failures += 1;
        if !policy.should_retry(failures, &error) {
          warn!(%key, failures, %error, "query failed");
          return Err(error);
        }
        let delay = policy.delay(failures);
        debug!(%key, failures, ?delay, "retrying query");
        tokio::time::sleep(delay).await;
      }
    }
  }
}
