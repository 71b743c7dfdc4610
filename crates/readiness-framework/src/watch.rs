//! # Readiness Watcher
//!
//! A [`Watcher`] samples a resource through a [`StateAccessor`] at a fixed cadence
//! until a target predicate holds or a deadline passes.
//!
//! ## State Machine
//!
//! ```text
//!             accessor error / predicate false, before deadline
//!              ┌──────┐
//!              ▼      │
//!   start ─► Polling ─┘──── predicate true ────► Ready
//!              │
//!              └─────── deadline reached ──────► TimedOut
//! ```
//!
//! Each cycle calls the accessor once. An accessor error means "not yet
//! observable" and is handled exactly like a state that misses the target:
//! sleep, then sample again. Sleeps never run past the deadline, and the watch
//! samples once more when the deadline arrives, so a resource that settles
//! during the last interval is still reported `Ready`. An accessor call still
//! pending at the deadline is cut off; the sample taken at the deadline itself
//! gets one interval. A watch therefore finishes within its timeout plus one
//! interval.
//!
//! ## Running a Watch
//!
//! [`Watcher::spawn`] starts the loop as its own Tokio task and returns a
//! [`WatchHandle`], a one-shot result slot. The initiator awaits
//! [`WatchHandle::outcome`] (or [`WatchHandle::ready`]) without stalling other
//! work. Exactly one [`WatchOutcome`] is delivered per watch.
//!
//! Dropping a handle detaches the task: it keeps polling until it reaches
//! `Ready` or `TimedOut`. Only [`WatchHandle::abort`] stops it early.

use crate::error::WaitError;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Capability returning the current observable state of a resource.
///
/// Any `Err` is read as "not observable yet"; the watcher does not distinguish a
/// resource that does not exist yet from a permanently failing read.
#[async_trait]
pub trait StateAccessor<C: Send + Sync>: Send + Sync {
    /// The observed state handed to the target predicate.
    type State: Send;

    /// The accessor's failure, logged by the watcher and otherwise ignored.
    type Error: Display + Send;

    /// Reads the current state of the resource at `coords`.
    async fn observe(&self, coords: &C) -> Result<Self::State, Self::Error>;
}

/// Adapter turning an async closure into a [`StateAccessor`]. See [`accessor_fn`].
#[derive(Clone)]
pub struct FnAccessor<F>(F);

/// Wraps `f` (called with an owned copy of the coordinates) as a [`StateAccessor`].
pub fn accessor_fn<F>(f: F) -> FnAccessor<F> {
    FnAccessor(f)
}

#[async_trait]
impl<C, F, Fut, S, E> StateAccessor<C> for FnAccessor<F>
where
    C: Clone + Send + Sync + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S, E>> + Send,
    S: Send,
    E: Display + Send,
{
    type State = S;
    type Error = E;

    async fn observe(&self, coords: &C) -> Result<S, E> {
        (self.0)(coords.clone()).await
    }
}

/// Terminal result of a single watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Ready,
    TimedOut,
}

/// Cadence and deadline of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    /// Pause after a sample that missed the target state.
    pub interval: Duration,
    /// Pause after a sample whose accessor failed. Defaults to `interval`.
    pub absent_interval: Duration,
    /// Ceiling on the whole watch, measured from its start.
    pub timeout: Duration,
}

impl WatchPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            absent_interval: interval,
            timeout,
        }
    }

    /// Uses a different pause while the resource cannot be read yet.
    pub const fn with_absent_interval(mut self, absent_interval: Duration) -> Self {
        self.absent_interval = absent_interval;
        self
    }
}

/// One deadline-bounded polling cycle over a single resource.
pub struct Watcher<C, A, P> {
    coords: C,
    accessor: A,
    is_target: P,
    policy: WatchPolicy,
}

impl<C, A, P> Watcher<C, A, P>
where
    C: Display + Send + Sync,
    A: StateAccessor<C>,
    P: Fn(&A::State) -> bool + Send + Sync,
{
    pub fn new(coords: C, accessor: A, is_target: P, policy: WatchPolicy) -> Self {
        Self {
            coords,
            accessor,
            is_target,
            policy,
        }
    }

    pub fn coords(&self) -> &C {
        &self.coords
    }

    pub fn policy(&self) -> WatchPolicy {
        self.policy
    }

    /// Runs the polling loop on the current task until `Ready` or `TimedOut`.
    pub async fn run(self) -> WatchOutcome {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            // A sample issued at the deadline still gets one interval to answer.
            let sample_start = Instant::now();
            let cutoff = if sample_start < deadline {
                deadline
            } else {
                sample_start + self.policy.interval
            };
            let sample = tokio::time::timeout_at(cutoff, self.accessor.observe(&self.coords)).await;

            let pause = match sample {
                Ok(Ok(state)) if (self.is_target)(&state) => {
                    info!(
                        resource = %self.coords,
                        polls,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Target state reached"
                    );
                    return WatchOutcome::Ready;
                }
                Ok(Ok(_)) => {
                    trace!(resource = %self.coords, polls, "Not in target state yet");
                    self.policy.interval
                }
                Ok(Err(e)) => {
                    trace!(resource = %self.coords, polls, error = %e, "Not observable yet");
                    self.policy.absent_interval
                }
                Err(_) => {
                    debug!(resource = %self.coords, polls, "Sample cut off");
                    Duration::ZERO
                }
            };

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    resource = %self.coords,
                    polls,
                    timeout_ms = self.policy.timeout.as_millis() as u64,
                    "Watch timed out"
                );
                return WatchOutcome::TimedOut;
            }

            tokio::time::sleep_until(std::cmp::min(now + pause, deadline)).await;
        }
    }
}

impl<C, A, P> Watcher<C, A, P>
where
    C: Display + Send + Sync + 'static,
    A: StateAccessor<C> + 'static,
    P: Fn(&A::State) -> bool + Send + Sync + 'static,
{
    /// Starts the watch as an independent task and returns its result slot.
    pub fn spawn(self) -> WatchHandle {
        let resource = self.coords.to_string();
        let timeout = self.policy.timeout;
        let (observer, outcome) = oneshot::channel();

        debug!(%resource, timeout_ms = timeout.as_millis() as u64, "Watch started");
        let task = tokio::spawn(async move {
            let result = self.run().await;
            let _ = observer.send(result);
        });

        WatchHandle {
            resource,
            timeout,
            started: Instant::now(),
            outcome,
            task,
        }
    }
}

/// Result slot of a spawned [`Watcher`].
#[derive(Debug)]
pub struct WatchHandle {
    resource: String,
    timeout: Duration,
    started: Instant,
    outcome: oneshot::Receiver<WatchOutcome>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// The watched resource, as rendered by its coordinates.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the watch task. A later [`outcome`](Self::outcome) reports
    /// [`WaitError::WatchDropped`] unless the watch had already finished.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the single outcome of the watch.
    pub async fn outcome(self) -> Result<WatchOutcome, WaitError> {
        self.outcome.await.map_err(|_| WaitError::WatchDropped)
    }

    /// Waits for the outcome and reports `TimedOut` as [`WaitError::Timeout`].
    pub async fn ready(self) -> Result<(), WaitError> {
        let resource = self.resource.clone();
        let timeout = self.timeout;
        let started = self.started;

        match self.outcome().await? {
            WatchOutcome::Ready => Ok(()),
            WatchOutcome::TimedOut => Err(WaitError::Timeout {
                resource,
                elapsed: started.elapsed(),
                timeout,
            }),
        }
    }
}

/// Spawns a watch over `coords` and waits for its outcome.
pub async fn watch_until<C, A, P>(
    coords: C,
    accessor: A,
    is_target: P,
    policy: WatchPolicy,
) -> Result<WatchOutcome, WaitError>
where
    C: Display + Send + Sync + 'static,
    A: StateAccessor<C> + 'static,
    P: Fn(&A::State) -> bool + Send + Sync + 'static,
{
    Watcher::new(coords, accessor, is_target, policy)
        .spawn()
        .outcome()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedAccessor;

    const INTERVAL: Duration = Duration::from_millis(10);

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Status {
        Provisioning,
        Running,
    }

    fn is_running(status: &Status) -> bool {
        *status == Status::Running
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_resource_appears() {
        let accessor = ScriptedAccessor::new();
        accessor.expect_missing();
        accessor.expect_missing();
        accessor.expect_state(Status::Running);

        let started = Instant::now();
        let outcome = watch_until(
            "vm-1",
            accessor.clone(),
            is_running,
            WatchPolicy::new(INTERVAL, Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Ready);
        assert_eq!(accessor.calls(), 3);
        assert!(started.elapsed() <= Duration::from_millis(30));
        accessor.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_interval() {
        let accessor = ScriptedAccessor::new();
        accessor.otherwise_state(Status::Provisioning);

        let timeout = Duration::from_millis(100);
        let started = Instant::now();
        let outcome = watch_until("vm-1", accessor.clone(), is_running, WatchPolicy::new(INTERVAL, timeout))
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert!(elapsed >= timeout, "elapsed {elapsed:?}");
        assert!(elapsed < timeout + INTERVAL, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_accessor_error_polls_until_timeout() {
        // A read that can never succeed is not told apart from a missing resource.
        let accessor = ScriptedAccessor::<Status>::new();

        let outcome = watch_until(
            "vm-denied",
            accessor.clone(),
            is_running,
            WatchPolicy::new(INTERVAL, Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert!(accessor.calls() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_interval_applies_to_accessor_errors() {
        let accessor = ScriptedAccessor::new();
        accessor.expect_missing();
        accessor.expect_state(Status::Provisioning);
        accessor.expect_state(Status::Running);

        let policy = WatchPolicy::new(Duration::from_millis(5), Duration::from_secs(1))
            .with_absent_interval(Duration::from_millis(20));
        let started = Instant::now();
        let outcome = watch_until("disk-1", accessor, is_running, policy).await.unwrap();

        let elapsed = started.elapsed();
        assert_eq!(outcome, WatchOutcome::Ready);
        assert!(elapsed >= Duration::from_millis(25), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(30), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_accessor_is_cut_off_at_deadline() {
        let accessor = ScriptedAccessor::<Status>::new();
        accessor.expect_stall();

        let timeout = Duration::from_millis(100);
        let started = Instant::now();
        let outcome = watch_until("vm-1", accessor, is_running, WatchPolicy::new(INTERVAL, timeout))
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert!(elapsed >= timeout, "elapsed {elapsed:?}");
        assert!(elapsed < timeout + INTERVAL, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_at_deadline_can_report_ready() {
        let started = Instant::now();
        let accessor = accessor_fn(move |_: &'static str| async move {
            tokio::task::yield_now().await;
            let status = if started.elapsed() >= Duration::from_millis(95) {
                Status::Running
            } else {
                Status::Provisioning
            };
            Ok::<_, String>(status)
        });

        let timeout = Duration::from_millis(100);
        let outcome = watch_until("vm-1", accessor, is_running, WatchPolicy::new(INTERVAL, timeout))
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::Ready);
        assert_eq!(started.elapsed(), timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_sample_at_deadline_gets_one_interval() {
        let accessor = ScriptedAccessor::new();
        for _ in 0..10 {
            accessor.expect_state(Status::Provisioning);
        }
        accessor.expect_stall();

        let timeout = Duration::from_millis(100);
        let started = Instant::now();
        let outcome = watch_until("vm-1", accessor.clone(), is_running, WatchPolicy::new(INTERVAL, timeout))
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert_eq!(accessor.calls(), 11);
        assert_eq!(started.elapsed(), timeout + INTERVAL);
        accessor.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_maps_timeout_to_error() {
        let accessor = ScriptedAccessor::new();
        accessor.otherwise_state(Status::Provisioning);

        let handle = Watcher::new(
            "vm-7",
            accessor,
            is_running,
            WatchPolicy::new(INTERVAL, Duration::from_millis(40)),
        )
        .spawn();
        assert_eq!(handle.resource(), "vm-7");

        let err = handle.ready().await.unwrap_err();
        assert!(matches!(
            err,
            WaitError::Timeout { ref resource, timeout, .. }
                if resource == "vm-7" && timeout == Duration::from_millis(40)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_watch_reports_dropped() {
        let accessor = ScriptedAccessor::<Status>::new();
        let handle = Watcher::new(
            "vm-1",
            accessor,
            is_running,
            WatchPolicy::new(INTERVAL, Duration::from_secs(60)),
        )
        .spawn();

        handle.abort();
        let result = handle.outcome().await;
        assert!(matches!(result, Err(WaitError::WatchDropped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_accessor() {
        let accessor = accessor_fn(|name: String| async move {
            if name == "vm-1" {
                Ok(Status::Running)
            } else {
                Err(format!("{name} not found"))
            }
        });

        let outcome = watch_until(
            "vm-1".to_string(),
            accessor,
            is_running,
            WatchPolicy::new(INTERVAL, Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Ready);
    }
}
