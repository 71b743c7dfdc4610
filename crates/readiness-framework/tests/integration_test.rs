use readiness_framework::mock::ScriptedAccessor;
use readiness_framework::{
    accessor_fn, confirm, create_and_wait, retry_until_success, transition_and_verify,
    watch_until, RetryBudget, WaitError, WatchChecker, WatchOutcome, WatchPolicy, Watcher,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum VmStatus {
    Provisioning,
    Running,
    Stopping,
    Terminated,
}

#[derive(Debug, thiserror::Error)]
#[error("backend unavailable")]
struct BackendError;

fn is_running(status: &VmStatus) -> bool {
    *status == VmStatus::Running
}

fn is_terminated(status: &VmStatus) -> bool {
    *status == VmStatus::Terminated
}

#[tokio::test(start_paused = true)]
async fn test_stop_verified_by_watch_checker() {
    let accessor = ScriptedAccessor::new();
    accessor.expect_state(VmStatus::Running);
    accessor.expect_state(VmStatus::Stopping);
    accessor.otherwise_state(VmStatus::Terminated);

    let checker = WatchChecker::new(
        accessor.clone(),
        is_terminated,
        WatchPolicy::new(Duration::from_secs(10), Duration::from_secs(180)),
    );

    let started = Instant::now();
    let op = transition_and_verify(&"proj/zone/vm-1", async { Ok::<_, BackendError>("stop-op") }, &checker)
        .await
        .unwrap();

    assert_eq!(op, "stop-op");
    assert_eq!(accessor.calls(), 3);
    assert!(started.elapsed() >= Duration::from_secs(20));
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_watches_on_same_resource_are_independent() {
    let accessor = ScriptedAccessor::new();
    accessor.expect_missing();
    accessor.otherwise_state(VmStatus::Running);

    let policy = WatchPolicy::new(Duration::from_millis(10), Duration::from_secs(1));
    let first = Watcher::new("vm-1", accessor.clone(), is_running, policy).spawn();
    let second = Watcher::new("vm-1", accessor.clone(), is_running, policy).spawn();

    assert_eq!(first.outcome().await.unwrap(), WatchOutcome::Ready);
    assert_eq!(second.outcome().await.unwrap(), WatchOutcome::Ready);
    // One watch saw the missing resource and polled again; the other was ready at once.
    assert_eq!(accessor.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_independent_watches_deliver_their_own_outcomes() {
    let ready = ScriptedAccessor::new();
    ready.expect_state(VmStatus::Provisioning);
    ready.expect_state(VmStatus::Running);

    let stuck = ScriptedAccessor::new();
    stuck.otherwise_state(VmStatus::Provisioning);

    let policy = WatchPolicy::new(Duration::from_millis(10), Duration::from_millis(200));
    let fast = Watcher::new("vm-fast", ready, is_running, policy).spawn();
    let slow = Watcher::new("vm-slow", stuck, is_running, policy).spawn();

    let (fast, slow) = tokio::join!(fast.outcome(), slow.outcome());
    assert_eq!(fast.unwrap(), WatchOutcome::Ready);
    assert_eq!(slow.unwrap(), WatchOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_retry_drives_eventually_successful_cleanup() {
    let attempts = Arc::new(AtomicU32::new(0));

    let deleted = retry_until_success(RetryBudget::new(5, Duration::from_secs(2)), || {
        let attempts = attempts.clone();
        async move {
            // Disk still attached for the first two attempts.
            attempts.fetch_add(1, Ordering::SeqCst) >= 2
        }
    })
    .await;

    assert!(deleted);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_confirm_stable_status_after_watch() {
    let accessor = ScriptedAccessor::new();
    accessor.expect_state(VmStatus::Provisioning);
    accessor.otherwise_state(VmStatus::Running);

    let outcome = watch_until(
        "vm-1",
        accessor.clone(),
        is_running,
        WatchPolicy::new(Duration::from_millis(10), Duration::from_secs(1)),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WatchOutcome::Ready);

    let stable = confirm(RetryBudget::new(3, Duration::from_millis(10)), || {
        let accessor = accessor.clone();
        async move {
            use readiness_framework::StateAccessor;
            matches!(accessor.observe(&"vm-1").await, Ok(VmStatus::Running))
        }
    })
    .await;

    assert!(stable);
    assert_eq!(accessor.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_create_with_closure_accessor_and_timeout_error() {
    let accessor = accessor_fn(|name: String| async move {
        Err::<VmStatus, _>(format!("{name}: permission denied"))
    });
    let watcher = Watcher::new(
        "vm-locked".to_string(),
        accessor,
        is_running,
        WatchPolicy::new(Duration::from_millis(10), Duration::from_millis(100)),
    );

    let err = create_and_wait(async { Ok::<_, BackendError>(()) }, watcher)
        .await
        .unwrap_err();

    assert!(matches!(err, WaitError::Timeout { ref resource, .. } if resource == "vm-locked"));
    assert!(err.to_string().contains("vm-locked"));
}
