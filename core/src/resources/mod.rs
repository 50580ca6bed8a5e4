//! Resource CRUD surface.
//!
//! One module per resource type. Every operation takes the proxy it needs
//! and a [`RetryPolicy`], and reports failures as [`Diagnostics`].

pub mod config;
pub mod export;
pub mod flow_rule;
pub mod workbin;
pub mod worktype;
pub mod worktype_status;
pub mod worktype_status_transition;

use std::future::Future;

use crate::{
    diagnostics::Diagnostics,
    error::{Result, TaskMgmtError},
    retry::{poll_until, Poll, RetryPolicy},
};

pub use config::{
    FlowRuleConfig, FlowRuleState, StatusConfig, StatusTransitionConfig, WorkbinConfig, WorkbinState,
    WorktypeConfig, WorktypeState, WorktypeStatusConfig,
};

/// Result of a write that may also carry warnings
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub state: T,
    pub warnings: Diagnostics,
}

impl<T> Applied<T> {
    pub fn clean(state: T) -> Self {
        Self {
            state,
            warnings: Diagnostics::default(),
        }
    }
}

/// Read an entity, riding out the window where it may still 404.
///
/// `Ok(None)` means the entity is gone and should be dropped from state.
pub(crate) async fn read_with_retries<T, F, Fut>(policy: &RetryPolicy, mut check: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let result = poll_until(policy.read_timeout, policy.interval, || {
        let attempt = check();
        async move { Poll::from_result(attempt.await) }
    })
    .await;

    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_timeout_on_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Poll until the entity reads as not found.
///
/// Any error other than not-found while confirming is fatal.
pub(crate) async fn confirm_deleted<T, F, Fut>(
    policy: &RetryPolicy,
    entity: &str,
    id: &str,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    poll_until(policy.delete_timeout, policy.interval, || {
        let attempt = check();
        async move {
            match attempt.await {
                Err(err) if err.is_not_found() => Poll::Done(()),
                Err(err) => Poll::Fatal(err),
                Ok(_) => Poll::Retry(TaskMgmtError::Internal(format!("{entity} {id} still exists"))),
            }
        }
    })
    .await
}

/// Name lookup that retries while the name is not visible yet
pub(crate) async fn lookup_with_retries<F, Fut>(policy: &RetryPolicy, mut check: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    poll_until(policy.lookup_timeout, policy.interval, || {
        let attempt = check();
        async move { Poll::from_result(attempt.await) }
    })
    .await
}

/// Replay a status write while the API reports a cancelled transaction
pub(crate) async fn patch_with_retries<T, F, Fut>(policy: &RetryPolicy, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    poll_until(policy.patch_timeout, policy.interval, || {
        let attempt = check();
        async move { Poll::from_result(attempt.await) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(500),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_of_vanished_entity_is_none() {
        let result: Result<Option<()>> = read_with_retries(&fast_policy(), || async {
            Err(TaskMgmtError::api(404, "gone"))
        })
        .await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_hard_error_surfaces() {
        let result: Result<Option<()>> =
            read_with_retries(&fast_policy(), || async { Err(TaskMgmtError::api(403, "forbidden")) }).await;
        assert_eq!(result.unwrap_err(), TaskMgmtError::api(403, "forbidden"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_deleted_waits_for_not_found() {
        let reads = AtomicU32::new(0);
        confirm_deleted(&fast_policy(), "workbin", "wb-1", || async {
            if reads.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(())
            } else {
                Err(TaskMgmtError::not_found("workbin", "wb-1"))
            }
        })
        .await
        .unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_deleted_fatal_on_other_errors() {
        let err = confirm_deleted::<(), _, _>(&fast_policy(), "workbin", "wb-1", || async {
            Err(TaskMgmtError::api(500, "boom"))
        })
        .await
        .unwrap_err();
        assert_eq!(err, TaskMgmtError::api(500, "boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_deleted_times_out() {
        let err = confirm_deleted(&fast_policy(), "workbin", "wb-1", || async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskMgmtError::Timeout { elapsed_secs, .. } if elapsed_secs >= 179));
    }
}
