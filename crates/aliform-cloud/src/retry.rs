//! Bounded retry and status polling
//!
//! Cloud APIs fail transiently (throttling, task conflicts) and most
//! mutations complete asynchronously. [`retry`] re-runs an operation until it
//! succeeds or gives up, [`wait_for`] polls until a target status shows up.
//! Both are bounded by a wall-clock timeout.

use crate::error::CloudError;
use crate::provider::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Outcome of a failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    /// Try again after a back-off
    Retryable(E),
    /// Stop and return the error
    NonRetryable(E),
}

/// Run `op` until it succeeds, fails permanently, or `timeout` elapses
pub async fn retry<T, E, F, Fut>(timeout: Duration, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: From<CloudError> + Display,
{
    retry_with(&RetryConfig::default(), timeout, op).await
}

/// [`retry`] with an explicit back-off configuration
pub async fn retry_with<T, E, F, Fut>(
    config: &RetryConfig,
    timeout: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: From<CloudError> + Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(e)) => return Err(e),
            Err(RetryError::Retryable(e)) => {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(attempts = attempt + 1, "Giving up after {:?}: {}", timeout, e);
                    return Err(CloudError::Timeout(format!(
                        "operation did not succeed within {:?}: {}",
                        timeout, e
                    ))
                    .into());
                }

                let delay = config.delay_for_attempt(attempt).min(deadline - now);
                tracing::debug!(attempt, ?delay, "Retryable error: {}", e);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Result of one poll in [`wait_for`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    /// Target status observed
    Reached,
    /// Still transitioning; carries the observed status for diagnostics
    Pending(String),
}

/// Poll `refresh` every `interval` until it reports [`WaitStatus::Reached`]
///
/// Errors from `refresh` end the wait immediately.
pub async fn wait_for<E, F, Fut>(
    description: &str,
    timeout: Duration,
    interval: Duration,
    mut refresh: F,
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WaitStatus, E>>,
    E: From<CloudError>,
{
    let deadline = Instant::now() + timeout;

    loop {
        let last = match refresh().await? {
            WaitStatus::Reached => return Ok(()),
            WaitStatus::Pending(status) => status,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(CloudError::Timeout(format!(
                "waiting for {} timed out after {:?}, last status: {}",
                description, timeout, last
            ))
            .into());
        }

        tracing::debug!(status = %last, "Waiting for {}", description);
        sleep(interval.min(deadline - now)).await;
    }
}
