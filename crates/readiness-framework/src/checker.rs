//! # ConditionChecker Capability
//!
//! A [`ConditionChecker`] answers "did the transition I just requested take
//! effect?" for a resource. [`transition_and_verify`](crate::orchestrate::transition_and_verify)
//! calls it after a successful mutation, so the same mutate-then-verify skeleton
//! serves stop, start, or any other transition; only the checker changes.
//!
//! Checkers are trait objects (`&dyn ConditionChecker<C>`) so they can be built,
//! stored and tested independently of the operation that uses them:
//!
//! - [`WatchChecker`] runs a fresh [`Watcher`] on every check.
//! - [`checker_fn`] adapts an async closure.
//! - [`MockChecker`](crate::mock::MockChecker) replays scripted answers in tests.

use crate::error::WaitError;
use crate::watch::{StateAccessor, WatchPolicy, Watcher};
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;

/// Verifies that a resource reached the state a transition was meant to produce.
///
/// `Ok(true)` confirms the transition. `Ok(false)` rejects it without a specific
/// reason; `Err` rejects it with one.
#[async_trait]
pub trait ConditionChecker<C: Send + Sync>: Send + Sync {
    async fn check(&self, coords: &C) -> Result<bool, WaitError>;
}

/// Checker that waits for a target state with a readiness watch.
///
/// Every call to [`check`](ConditionChecker::check) spawns its own watch, bound
/// to the coordinates it is given, and blocks on it. A watch that times out is
/// reported as [`WaitError::Timeout`].
#[derive(Debug, Clone)]
pub struct WatchChecker<A, P> {
    accessor: A,
    is_target: P,
    policy: WatchPolicy,
}

impl<A, P> WatchChecker<A, P> {
    pub fn new(accessor: A, is_target: P, policy: WatchPolicy) -> Self {
        Self {
            accessor,
            is_target,
            policy,
        }
    }

    pub fn policy(&self) -> WatchPolicy {
        self.policy
    }
}

#[async_trait]
impl<C, A, P> ConditionChecker<C> for WatchChecker<A, P>
where
    C: Clone + Display + Send + Sync + 'static,
    A: StateAccessor<C> + Clone + 'static,
    P: Fn(&A::State) -> bool + Clone + Send + Sync + 'static,
{
    async fn check(&self, coords: &C) -> Result<bool, WaitError> {
        Watcher::new(
            coords.clone(),
            self.accessor.clone(),
            self.is_target.clone(),
            self.policy,
        )
        .spawn()
        .ready()
        .await?;
        Ok(true)
    }
}

/// Adapter turning an async closure into a [`ConditionChecker`]. See [`checker_fn`].
#[derive(Clone)]
pub struct CheckerFn<F>(F);

/// Wraps `f` (called with an owned copy of the coordinates) as a [`ConditionChecker`].
pub fn checker_fn<F>(f: F) -> CheckerFn<F> {
    CheckerFn(f)
}

#[async_trait]
impl<C, F, Fut> ConditionChecker<C> for CheckerFn<F>
where
    C: Clone + Send + Sync + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, WaitError>> + Send,
{
    async fn check(&self, coords: &C) -> Result<bool, WaitError> {
        (self.0)(coords.clone()).await
    }
}
