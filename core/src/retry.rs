//! Poll-until-consistent wrapper.
//!
//! The task management API is eventually consistent: an entity created a
//! moment ago may still answer 404, and a deleted one may still be readable.
//! Callers wrap such calls in [`poll_until`] with a check that classifies
//! each attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, TaskMgmtError};

/// Name lookups after a create
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);
/// Waiting for a deleted entity to disappear
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(180);
/// Replaying status transition patches that hit a cancelled transaction
pub const PATCH_TIMEOUT: Duration = Duration::from_secs(60);
/// Reads right after a write
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of a single check attempt
#[derive(Debug)]
pub enum Poll<T> {
    Done(T),
    Retry(TaskMgmtError),
    Fatal(TaskMgmtError),
}

impl<T> Poll<T> {
    /// Classify a call result with [`TaskMgmtError::is_retryable`]
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Poll::Done(value),
            Err(err) if err.is_retryable() => Poll::Retry(err),
            Err(err) => Poll::Fatal(err),
        }
    }
}

/// Run `check` until it is done, fails hard, or `timeout` elapses.
///
/// The check always runs at least once. On expiry the last retryable error
/// is returned inside [`TaskMgmtError::Timeout`].
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Poll<T>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match check().await {
            Poll::Done(value) => return Ok(value),
            Poll::Fatal(err) => return Err(err),
            Poll::Retry(err) => {
                let elapsed = started.elapsed();
                if elapsed + interval > timeout {
                    return Err(TaskMgmtError::Timeout {
                        elapsed_secs: elapsed.as_secs(),
                        last_error: Box::new(err),
                    });
                }
                debug!(attempt, error = %err, "Retrying after retryable error");
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Timeouts used by the resource functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub lookup_timeout: Duration,
    pub delete_timeout: Duration,
    pub patch_timeout: Duration,
    pub read_timeout: Duration,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            lookup_timeout: LOOKUP_TIMEOUT,
            delete_timeout: DELETE_TIMEOUT,
            patch_timeout: PATCH_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up right away; useful against fakes
    pub fn immediate() -> Self {
        Self {
            lookup_timeout: Duration::ZERO,
            delete_timeout: Duration::ZERO,
            patch_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            interval: Duration::from_millis(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_after_retries() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::from_secs(15), DEFAULT_INTERVAL, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Poll::Retry(TaskMgmtError::not_found("workbin", "Inbox"))
            } else {
                Poll::Done(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_with_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = poll_until(Duration::from_secs(15), DEFAULT_INTERVAL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Poll::Retry(TaskMgmtError::api(404, "still missing"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout_on_not_found());
        let calls = calls.load(Ordering::SeqCst);
        assert!((30..=31).contains(&calls), "unexpected attempt count {calls}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_on_fatal() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = poll_until(Duration::from_secs(60), DEFAULT_INTERVAL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Poll::Fatal(TaskMgmtError::api(500, "boom"))
        })
        .await;

        assert_eq!(result.unwrap_err(), TaskMgmtError::api(500, "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = poll_until(Duration::ZERO, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Poll::Retry(TaskMgmtError::NotFound("x".to_string()))
        })
        .await;

        assert!(matches!(result, Err(TaskMgmtError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_result_classification() {
        assert!(matches!(Poll::from_result(Ok(1)), Poll::Done(1)));
        assert!(matches!(
            Poll::<()>::from_result(Err(TaskMgmtError::api(429, "throttled"))),
            Poll::Retry(_)
        ));
        assert!(matches!(
            Poll::<()>::from_result(Err(TaskMgmtError::api(403, "forbidden"))),
            Poll::Fatal(_)
        ));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.lookup_timeout, Duration::from_secs(15));
        assert_eq!(policy.delete_timeout, Duration::from_secs(180));
        assert_eq!(policy.patch_timeout, Duration::from_secs(60));
        assert_eq!(policy.interval, Duration::from_millis(500));
    }
}
