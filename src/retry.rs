// src/retry.rs

use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::{Error, Result};

/// Attempts allowed before a rate-limited call is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How long to wait between rate-limited attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay every time.
    Fixed(Duration),
    /// `base * 2^attempt`, with `attempt` counted from zero.
    Exponential(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// 30s between attempts, five attempts. Used for Azure and Grafana.
    pub fn fixed() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Fixed(Duration::from_secs(30)),
        }
    }

    /// 1s, 2s, 4s, 8s. Used for the spreadsheet and Drive sinks.
    pub fn exponential() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Exponential(Duration::from_secs(1)),
        }
    }

    /// Delay before retrying after the `attempt`-th rate-limited call (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential(base) => base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed()
    }
}

/// Run `call` until it succeeds, fails with something other than
/// [`Error::RateLimited`], or the policy runs out of attempts.
///
/// Each rate-limited attempt except the last is followed by exactly one
/// sleep. Non-throttling errors are returned immediately.
pub async fn with_rate_limit_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        match call().await {
            Err(Error::RateLimited(reason)) => {
                attempts += 1;
                if attempts >= policy.max_attempts {
                    error!(operation, attempts, "rate limit retries exhausted");
                    return Err(Error::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts,
                    });
                }
                let delay = policy.delay(attempts - 1);
                warn!(
                    operation,
                    attempt = attempts,
                    delay_secs = delay.as_secs_f64(),
                    %reason,
                    "rate limit hit, retrying"
                );
                sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            backoff,
        }
    }

    #[test]
    fn exponential_delays_double() {
        let p = RetryPolicy::exponential();
        let delays: Vec<u64> = (0..5).map(|i| p.delay(i).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
        assert_eq!(RetryPolicy::fixed().delay(3), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_payload_after_n_sleeps() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let p = policy(Backoff::Fixed(Duration::from_secs(30)));

        let out = with_rate_limit_retry(&p, "query", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(Error::RateLimited("429".into()))
                } else {
                    Ok("payload")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out, "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // three sleeps of 30s each, nothing more
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn exponential_sleeps_sum() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let p = policy(Backoff::Exponential(Duration::from_secs(1)));

        with_rate_limit_retry(&p, "append", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::RateLimited("429".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_budget_stops_calling() {
        let calls = AtomicU32::new(0);
        let p = policy(Backoff::Fixed(Duration::from_secs(30)));

        let err = with_rate_limit_retry(&p, "query", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::RateLimited("429".into())) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match err {
            Error::RetriesExhausted {
                operation,
                attempts,
            } => {
                assert_eq!(operation, "query");
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = with_rate_limit_retry(&RetryPolicy::fixed(), "query", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::Api {
                    status: 500,
                    body: "boom".into(),
                })
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
