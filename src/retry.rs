//! Retry policy for remote model calls.
//!
//! Every model request goes through [`RetryPolicy::run`]: a blocking loop
//! with a fixed attempt count and a fixed delay between failed attempts.
//! There is no jitter and no exponential growth — the delay is the same flat
//! interval after every failure.
//!
//! ## Known weakness (current behaviour)
//!
//! The policy does not distinguish retryable failures (timeout, 429, 503)
//! from non-retryable ones (bad API key, 400). Every error kind is retried
//! identically up to the attempt limit. Callers that can classify errors
//! should give up early themselves rather than rely on the policy.
//!
//! ## Testing without real delays
//!
//! Sleeping is abstracted behind the [`Sleeper`] trait so the policy itself
//! is testable in microseconds: inject a recording sleeper and assert on the
//! requested durations instead of waiting them out. Production code uses
//! [`TokioSleeper`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Something that can wait. Production uses [`TokioSleeper`]; tests inject
/// a recording no-op so retry behaviour is verifiable without wall-clock time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping via `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Must be ≥ 1.
    pub max_attempts: u32,
    /// Flat delay between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts with a 2-second flat delay.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// A successful result together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// 1-based: `1` means the first attempt succeeded.
    pub attempts: u32,
}

/// All attempts failed; carries the final attempt's error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or `max_attempts` is reached.
    ///
    /// On failure the policy waits `delay` (via the injected `sleeper`) and
    /// tries again. When every attempt fails, the last error is returned as a
    /// value inside [`RetryExhausted`] — this function never panics and never
    /// raises beyond its `Result`.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
    ) -> Result<Retried<T>, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // Struct literals can bypass `new`'s clamp; a zero here must still
        // mean one attempt, not zero.
        let max_attempts = self.max_attempts.max(1);
        let mut last_error: Option<E> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                sleeper.sleep(self.delay).await;
            }

            match op().await {
                Ok(value) => return Ok(Retried { value, attempts: attempt }),
                Err(e) => {
                    warn!(
                        "attempt {}/{} failed: {}",
                        attempt, max_attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        // max_attempts ≥ 1, so at least one attempt ran and stored its error.
        let last_error = last_error.expect("at least one attempt must have run");
        Err(RetryExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}
