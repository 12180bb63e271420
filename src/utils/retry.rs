//! Retry utilities for graph queries
//!
//! Remote SPARQL endpoints fail transiently under load. This module provides
//! a retry policy with a linearly growing backoff and an injectable sleeper
//! so tests can simulate failures without waiting.

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Suspends the current task between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// Backoff function: attempt number (1-based, the attempt that just failed) to delay
pub type BackoffFn = fn(u32) -> Duration;

/// Default backoff: `5 + 2 × attempt` seconds
pub fn linear_backoff(attempt: u32) -> Duration {
    Duration::from_secs(5 + 2 * u64::from(attempt))
}

/// Configuration for retry behavior
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the next attempt
    pub backoff: BackoffFn,

    /// Clock used to wait between attempts
    pub sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            backoff: linear_backoff,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom attempt count and the default backoff
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Replace the sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the backoff function
    pub fn with_backoff(mut self, backoff: BackoffFn) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay applied after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }
}

/// Outcome of a retried operation that never succeeded
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Number of attempts made
    pub attempts: u32,

    /// Error of the final attempt
    pub last: E,

    /// Whether the loop stopped early on a non-retryable error
    pub permanent: bool,
}

/// Execute an operation, retrying only errors accepted by `should_retry`
///
/// A rejected error stops the loop immediately and is reported with
/// `permanent` set.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, Exhausted<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(attempt, error = %e, "Non-retryable error encountered");
                    return Err(Exhausted {
                        attempts: attempt,
                        last: e,
                        permanent: true,
                    });
                }

                if attempt >= max_attempts {
                    warn!(attempt, max_attempts, error = %e, "Retry attempts exhausted");
                    return Err(Exhausted {
                        attempts: attempt,
                        last: e,
                        permanent: false,
                    });
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Operation failed, will retry"
                );
                policy.sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
