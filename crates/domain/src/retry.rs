//! Retry policy for upstream operations
//!
//! Re-expresses the retry-as-decorator pattern as an explicit policy value:
//! rate-limit responses wait for the upstream reset without consuming the
//! attempt budget, fatal errors short-circuit, and everything else backs off
//! exponentially with bounded jitter.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::model::Post;
use crate::ports::{FetchError, PostSource};

/// How a failed operation should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Wait until the given reset duration (fallback: current backoff delay),
    /// then retry without spending an attempt
    RateLimited(Option<Duration>),
    /// Back off and retry, up to the attempt budget
    Transient,
    /// Retrying cannot succeed; fail immediately
    Fatal,
}

/// Classification of an error for retry purposes
pub trait Retryable {
    fn retry_class(&self) -> RetryClass;
}

impl Retryable for FetchError {
    fn retry_class(&self) -> RetryClass {
        match self {
            FetchError::RateLimited(reset) => RetryClass::RateLimited(*reset),
            FetchError::Auth(_) => RetryClass::Fatal,
            FetchError::Api(_) | FetchError::Network(_) => RetryClass::Transient,
        }
    }
}

/// Retry tuning for upstream fetch operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts for transient failures
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_factor: f64,
    /// Add a random sub-second jitter to each backoff wait
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Run `operation` under this policy, returning its first success or the
    /// last error once the attempt budget is exhausted.
    ///
    /// Rate-limit waits are controlled waits, not failures: they are logged at
    /// warn level and do not count against `max_attempts`.
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match error.retry_class() {
                RetryClass::RateLimited(reset) => {
                    let wait = reset.unwrap_or(delay);
                    tracing::warn!(
                        operation = name,
                        wait_secs = wait.as_secs(),
                        "Rate limit hit, waiting for reset"
                    );
                    sleep(wait).await;
                }
                RetryClass::Fatal => {
                    tracing::error!(operation = name, error = %error, "Fatal error, not retrying");
                    return Err(error);
                }
                RetryClass::Transient => {
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            operation = name,
                            attempts = attempt,
                            error = %error,
                            "Retries exhausted"
                        );
                        return Err(error);
                    }

                    let wait = if self.jitter {
                        delay + Duration::from_secs_f64(rand::random::<f64>())
                    } else {
                        delay
                    };

                    tracing::warn!(
                        operation = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "Transient error, retrying"
                    );

                    sleep(wait).await;
                    delay = delay.mul_f64(self.backoff_factor);
                    attempt += 1;
                }
            }
        }
    }
}

/// Decorator applying a [`RetryPolicy`] to both read operations of any
/// [`PostSource`]
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: PostSource> PostSource for RetryingSource<S> {
    async fn fetch_original_posts(
        &self,
        account: &str,
        limit: u32,
    ) -> Result<Vec<Post>, FetchError> {
        self.policy
            .run("fetch_original_posts", || {
                self.inner.fetch_original_posts(account, limit)
            })
            .await
    }

    async fn fetch_thread_replies(
        &self,
        account: &str,
        root_post_id: &str,
        max_results: u32,
    ) -> Result<Vec<Post>, FetchError> {
        self.policy
            .run("fetch_thread_replies", || {
                self.inner
                    .fetch_thread_replies(account, root_post_id, max_results)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn no_jitter_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            jitter: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = no_jitter_policy(5);

        let result: Result<u32, FetchError> = policy
            .run("test_op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(FetchError::Network("connection reset".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);
        let policy = no_jitter_policy(5);

        let result: Result<(), FetchError> = policy
            .run("test_op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Api("boom".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_grow_exponentially() {
        let policy = no_jitter_policy(4);
        let start = Instant::now();

        let result: Result<(), FetchError> = policy
            .run("test_op", || async {
                Err(FetchError::Network("down".to_string()))
            })
            .await;

        assert!(result.is_err());
        // Three waits before giving up: 100ms + 200ms + 400ms
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_for_reset_without_spending_attempts() {
        let calls = AtomicU32::new(0);
        let policy = no_jitter_policy(1);
        let start = Instant::now();

        let result: Result<u32, FetchError> = policy
            .run("test_op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        Err(FetchError::RateLimited(Some(Duration::from_secs(30))))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        // max_attempts = 1, so a rate limit must not count as a failed attempt
        assert_eq!(result.unwrap(), 2);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_without_reset_falls_back_to_backoff_delay() {
        let calls = AtomicU32::new(0);
        let policy = no_jitter_policy(1);
        let start = Instant::now();

        let result: Result<u32, FetchError> = policy
            .run("test_op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 1 {
                        Err(FetchError::RateLimited(None))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let policy = no_jitter_policy(5);

        let result: Result<(), FetchError> = policy
            .run("test_op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Auth("bad token".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
