use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

/// Bounded exponential backoff for calls to external services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: usize, min_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
            max_delay: Duration::from_secs(60),
        }
    }

    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay.max(self.min_delay))
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }
}

pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    f: F,
) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    retry_when(policy, operation, f, |_| true).await
}

/// Like [`retry`], but gives up at once on errors `retryable` rejects.
pub async fn retry_when<T, F, Fut, W>(
    policy: &RetryPolicy,
    operation: &str,
    f: F,
    retryable: W,
) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
    W: FnMut(&eyre::Report) -> bool,
{
    f.retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(retryable)
        .notify(|err: &eyre::Report, after: Duration| {
            warn!("{operation} failed, retrying in {after:?}: {err:#}");
        })
        .await
}
