use crate::config::DeliveryConfig;
use backon::{ExponentialBuilder, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Result of running an operation under a `RetryPolicy`.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Bounded exponential backoff: delays of `min_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: usize,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), min_delay, max_delay: max_delay.max(min_delay) }
    }

    #[must_use]
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts - 1)
    }

    /// Runs `op` until it succeeds, returns an error `should_retry` rejects, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempts = 0u32;

        let result = (|| {
            attempts += 1;
            op()
        })
        .retry(self.backoff())
        .when(|e| should_retry(e))
        .notify(|e, delay| {
            tracing::warn!(error = %e, retry_in_ms = %delay.as_millis(), "Attempt failed, retrying");
        })
        .await;

        RetryOutcome { result, attempts }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DeliveryConfig::default())
    }
}
