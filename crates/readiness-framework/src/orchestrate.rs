//! # Mutate-then-Wait Orchestration
//!
//! Long-running cloud operations share one shape: issue a single mutating
//! request, then wait until the resource manager reflects it. This module
//! provides that shape in two variants.
//!
//! | Operation | After the mutation succeeds |
//! |-----------|-----------------------------|
//! | [`create_and_wait`] | spawns the given [`Watcher`] and blocks on its outcome |
//! | [`transition_and_verify`] | asks a caller-supplied [`ConditionChecker`] |
//!
//! ## Guarantees
//!
//! - The mutation is awaited to completion before any observation starts.
//!   Mutations are futures, so nothing is sent before the orchestrator polls them.
//! - A failed mutation is returned as [`WaitError::MutationFailed`] and never
//!   re-issued. Only the observation step repeats.
//! - The caller suspends on a single point: the watch's result slot (or the
//!   checker, which typically holds one of its own).

use crate::checker::ConditionChecker;
use crate::error::{BoxError, WaitError};
use crate::watch::{StateAccessor, Watcher};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info, warn};

/// Issues `mutation`, then waits on `watcher` until the resource is ready.
///
/// Returns the mutation's value once the watch reports `Ready`. A watch that
/// times out becomes [`WaitError::Timeout`].
pub async fn create_and_wait<T, E, Fut, C, A, P>(
    mutation: Fut,
    watcher: Watcher<C, A, P>,
) -> Result<T, WaitError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
    C: Display + Send + Sync + 'static,
    A: StateAccessor<C> + 'static,
    P: Fn(&A::State) -> bool + Send + Sync + 'static,
{
    let resource = watcher.coords().to_string();
    let value = issue(&resource, mutation).await?;

    debug!(%resource, "Mutation accepted, waiting for target state");
    watcher.spawn().ready().await?;

    info!(%resource, "Resource ready");
    Ok(value)
}

/// Issues `mutation`, then asks `verifier` whether the transition took effect.
///
/// `Ok(true)` returns the mutation's value, an error from the checker is
/// returned unchanged, and `Ok(false)` becomes [`WaitError::VerificationFailed`].
pub async fn transition_and_verify<T, E, Fut, C, V>(
    coords: &C,
    mutation: Fut,
    verifier: &V,
) -> Result<T, WaitError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
    C: Display + Send + Sync,
    V: ConditionChecker<C> + ?Sized,
{
    let resource = coords.to_string();
    let value = issue(&resource, mutation).await?;

    debug!(%resource, "Mutation accepted, verifying transition");
    if verifier.check(coords).await? {
        info!(%resource, "Transition verified");
        Ok(value)
    } else {
        warn!(%resource, "Transition rejected by checker");
        Err(WaitError::VerificationFailed { resource })
    }
}

async fn issue<T, E, Fut>(resource: &str, mutation: Fut) -> Result<T, WaitError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    mutation.await.map_err(|e| {
        let source = e.into();
        warn!(resource, error = %source, "Mutation failed");
        WaitError::MutationFailed {
            resource: resource.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChecker, ScriptedAccessor};
    use crate::watch::WatchPolicy;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded")]
    struct QuotaError;

    fn is_ready(status: &&'static str) -> bool {
        *status == "READY"
    }

    fn policy(timeout_ms: u64) -> WatchPolicy {
        WatchPolicy::new(Duration::from_millis(10), Duration::from_millis(timeout_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_wait_returns_mutation_value() {
        let accessor = ScriptedAccessor::new();
        accessor.expect_missing();
        accessor.expect_state("CREATING");
        accessor.expect_state("READY");

        let watcher = Watcher::new("disk-1", accessor.clone(), is_ready, policy(1_000));
        let op = create_and_wait(async { Ok::<_, QuotaError>("op-42") }, watcher)
            .await
            .unwrap();

        assert_eq!(op, "op-42");
        accessor.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mutation_never_starts_watch() {
        let accessor = ScriptedAccessor::<&'static str>::new();
        let watcher = Watcher::new("disk-1", accessor.clone(), is_ready, policy(1_000));

        let err = create_and_wait(async { Err::<(), _>(QuotaError) }, watcher)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::MutationFailed { ref resource, ref source }
                if resource == "disk-1" && source.to_string() == "quota exceeded"
        ));
        assert_eq!(accessor.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_wait_times_out() {
        let accessor = ScriptedAccessor::new();
        accessor.otherwise_state("CREATING");

        let watcher = Watcher::new("disk-1", accessor, is_ready, policy(100));
        let err = create_and_wait(async { Ok::<_, QuotaError>(()) }, watcher)
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout {
                resource,
                elapsed,
                timeout,
            } => {
                assert_eq!(resource, "disk-1");
                assert_eq!(timeout, Duration::from_millis(100));
                assert!(elapsed >= timeout);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_completes_before_observation() {
        let issued = Arc::new(AtomicBool::new(false));
        let seen_before_issue = Arc::new(AtomicBool::new(false));

        let accessor = {
            let issued = issued.clone();
            let seen_before_issue = seen_before_issue.clone();
            crate::watch::accessor_fn(move |_: &'static str| {
                if !issued.load(Ordering::SeqCst) {
                    seen_before_issue.store(true, Ordering::SeqCst);
                }
                async { Ok::<_, String>("READY") }
            })
        };

        let mutation = {
            let issued = issued.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                issued.store(true, Ordering::SeqCst);
                Ok::<_, QuotaError>(())
            }
        };

        create_and_wait(mutation, Watcher::new("vm-1", accessor, is_ready, policy(1_000)))
            .await
            .unwrap();
        assert!(!seen_before_issue.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_transition_verified() {
        let checker = MockChecker::new();
        checker.expect_check().return_ok(true);

        let op = transition_and_verify(&"vm-1", async { Ok::<_, QuotaError>("op-stop") }, &checker)
            .await
            .unwrap();

        assert_eq!(op, "op-stop");
        assert_eq!(checker.checked(), vec!["vm-1".to_string()]);
        checker.verify();
    }

    #[tokio::test]
    async fn test_transition_rejected_without_reason() {
        let checker = MockChecker::new();
        checker.expect_check().return_ok(false);
        let checker: &dyn ConditionChecker<&'static str> = &checker;

        let err = transition_and_verify(&"vm-1", async { Ok::<_, QuotaError>(()) }, checker)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::VerificationFailed { ref resource } if resource == "vm-1"));
    }

    #[tokio::test]
    async fn test_transition_propagates_checker_error() {
        let checker = MockChecker::new();
        checker.expect_check().return_err(WaitError::WatchDropped);

        let err = transition_and_verify(&"vm-1", async { Ok::<_, QuotaError>(()) }, &checker)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::WatchDropped));
    }

    #[tokio::test]
    async fn test_failed_transition_skips_checker() {
        let checker = MockChecker::new();

        let err = transition_and_verify(&"vm-1", async { Err::<(), _>(QuotaError) }, &checker)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::MutationFailed { .. }));
        assert!(checker.checked().is_empty());
    }
}
