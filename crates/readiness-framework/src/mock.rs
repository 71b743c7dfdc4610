//! # Test Doubles
//!
//! Scripted stand-ins for the two capabilities the framework consumes, so watch
//! and orchestration logic can be tested without a resource manager.
//!
//! | Double | Replaces | Scripted with |
//! |--------|----------|---------------|
//! | [`ScriptedAccessor`] | a [`StateAccessor`] | `expect_state`, `expect_missing`, `expect_stall`, `otherwise_state` |
//! | [`MockChecker`] | a [`ConditionChecker`] | `expect_check().return_ok(..)` / `.return_err(..)` |
//!
//! Both are cheap to clone and share their script, so a test can hand one clone
//! to the code under test and keep another to inspect calls afterwards.
//!
//! ## Example
//!
//! ```rust
//! use readiness_framework::mock::ScriptedAccessor;
//! use readiness_framework::{watch_until, WatchOutcome, WatchPolicy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let accessor = ScriptedAccessor::new();
//!     accessor.expect_missing();
//!     accessor.expect_state("RUNNING");
//!
//!     let outcome = watch_until(
//!         "vm-1",
//!         accessor.clone(),
//!         |status: &&str| *status == "RUNNING",
//!         WatchPolicy::new(Duration::from_millis(1), Duration::from_secs(1)),
//!     )
//!     .await
//!     .unwrap();
//!
//!     assert_eq!(outcome, WatchOutcome::Ready);
//!     assert_eq!(accessor.calls(), 2);
//!     accessor.verify(); // Ensures every scripted step was consumed
//! }
//! ```

use crate::checker::ConditionChecker;
use crate::error::WaitError;
use crate::watch::StateAccessor;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// SCRIPTED ACCESSOR
// =============================================================================

/// One scripted answer of a [`ScriptedAccessor`].
#[derive(Debug, Clone)]
enum Step<S> {
    State(S),
    Missing,
    Stall,
}

/// A [`StateAccessor`] that replays a queue of scripted observations.
///
/// Once the queue is empty it keeps answering with the fallback set by
/// [`otherwise_state`](Self::otherwise_state), or with "not found" if none was set.
pub struct ScriptedAccessor<S> {
    script: Arc<Mutex<VecDeque<Step<S>>>>,
    fallback: Arc<Mutex<Step<S>>>,
    calls: Arc<AtomicUsize>,
}

impl<S> Clone for ScriptedAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            script: self.script.clone(),
            fallback: self.fallback.clone(),
            calls: self.calls.clone(),
        }
    }
}

impl<S: Clone + Send + 'static> Default for ScriptedAccessor<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + 'static> ScriptedAccessor<S> {
    /// Creates an accessor with an empty script.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(Step::Missing)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The next observation reports `state`.
    pub fn expect_state(&self, state: S) {
        self.script.lock().unwrap().push_back(Step::State(state));
    }

    /// The next observation fails as if the resource did not exist yet.
    pub fn expect_missing(&self) {
        self.script.lock().unwrap().push_back(Step::Missing);
    }

    /// The next observation never completes.
    pub fn expect_stall(&self) {
        self.script.lock().unwrap().push_back(Step::Stall);
    }

    /// Observations past the end of the script report `state`.
    pub fn otherwise_state(&self, state: S) {
        *self.fallback.lock().unwrap() = Step::State(state);
    }

    /// Number of observations made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Verifies that every scripted observation was consumed.
    pub fn verify(&self) {
        let script = self.script.lock().unwrap();
        if !script.is_empty() {
            panic!("Not all scripted observations were made. {} remaining", script.len());
        }
    }

    fn next_step(&self) -> Step<S> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

#[async_trait]
impl<C, S> StateAccessor<C> for ScriptedAccessor<S>
where
    C: Display + Send + Sync,
    S: Clone + Send + 'static,
{
    type State = S;
    type Error = WaitError;

    async fn observe(&self, coords: &C) -> Result<S, WaitError> {
        match self.next_step() {
            Step::State(state) => Ok(state),
            Step::Missing => Err(WaitError::NotYetObservable {
                resource: coords.to_string(),
                reason: "not found".to_string(),
            }),
            Step::Stall => std::future::pending().await,
        }
    }
}

// =============================================================================
// MOCK CHECKER
// =============================================================================

/// A [`ConditionChecker`] with expectation tracking.
///
/// Every `check` consumes the next expectation and records the coordinates it
/// was asked about. A check with no expectation left panics.
#[derive(Clone, Default)]
pub struct MockChecker {
    expectations: Arc<Mutex<VecDeque<Result<bool, WaitError>>>>,
    checked: Arc<Mutex<Vec<String>>>,
}

impl MockChecker {
    /// Creates a mock checker with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects one `check` call.
    pub fn expect_check(&self) -> CheckExpectationBuilder {
        CheckExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Coordinates of every check made so far, rendered with `Display`.
    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

#[async_trait]
impl<C> ConditionChecker<C> for MockChecker
where
    C: Display + Send + Sync,
{
    async fn check(&self, coords: &C) -> Result<bool, WaitError> {
        self.checked.lock().unwrap().push(coords.to_string());
        let expectation = self.expectations.lock().unwrap().pop_front();
        match expectation {
            Some(response) => response,
            None => panic!("Unexpected check of {coords}"),
        }
    }
}

/// Builder for `check` expectations.
pub struct CheckExpectationBuilder {
    expectations: Arc<Mutex<VecDeque<Result<bool, WaitError>>>>,
}

impl CheckExpectationBuilder {
    /// Sets the expectation to return a verdict.
    pub fn return_ok(self, verdict: bool) {
        self.expectations.lock().unwrap().push_back(Ok(verdict));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: WaitError) {
        self.expectations.lock().unwrap().push_back(Err(error));
    }
}
