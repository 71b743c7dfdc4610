//! # Readiness Framework
//!
//! Building blocks for talking to an eventually-consistent resource manager: issue
//! a mutating request, then wait until the manager's own view of the resource
//! catches up before reporting success.
//!
//! The crate never talks to a network. It is parameterised by capabilities the
//! caller supplies:
//!
//! | Capability | Role |
//! |------------|------|
//! | [`StateAccessor`] | reads the current observable state of a resource |
//! | target predicate (`Fn(&State) -> bool`) | decides whether that state is the one awaited |
//! | [`ConditionChecker`] | confirms that a transition took effect |
//!
//! ## Primitives
//!
//! 1. **Confirmation** ([`confirm`]) - a condition must hold on *every* one of N probes.
//! 2. **Retry** ([`retry_until_success`]) - an operation must succeed on *any* of N attempts.
//! 3. **Readiness watch** ([`Watcher`], [`watch_until`]) - sample a resource at a fixed
//!    cadence until it reaches a target state or a deadline passes.
//! 4. **Orchestration** ([`create_and_wait`], [`transition_and_verify`]) - the
//!    mutate-then-wait skeleton shared by every long-running operation.
//!
//! ## Guarantees
//!
//! - Exactly one [`WatchOutcome`] is delivered per watch.
//! - A watch finishes within its timeout plus one interval. Sleeps never
//!   overshoot the deadline, one last sample is taken when it arrives, and a
//!   hanging accessor call is cut off.
//! - Mutations are issued once and never retried. Only observation repeats.
//! - Intervals are fixed: no backoff, no jitter.
//!
//! ## Quick Start
//!
//! ```rust
//! use readiness_framework::mock::ScriptedAccessor;
//! use readiness_framework::{create_and_wait, WaitError, WatchPolicy, Watcher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WaitError> {
//!     // The resource manager reports the disk as missing, then creating, then ready.
//!     let accessor = ScriptedAccessor::new();
//!     accessor.expect_missing();
//!     accessor.expect_state("CREATING");
//!     accessor.expect_state("READY");
//!
//!     let watcher = Watcher::new(
//!         "demo/us-central1-f/data-1",
//!         accessor,
//!         |status: &&str| *status == "READY",
//!         WatchPolicy::new(Duration::from_millis(5), Duration::from_secs(1)),
//!     );
//!
//!     let op = create_and_wait(async { Ok::<_, WaitError>("operation-1") }, watcher).await?;
//!     assert_eq!(op, "operation-1");
//!     Ok(())
//! }
//! ```
//!
//! ## Known Limitation
//!
//! A watch cannot tell "the resource does not exist yet" from "the resource can
//! never be read" (for example a denied permission). Both surface as accessor
//! errors and the watch keeps polling until its deadline.
//!
//! ## Testing
//!
//! See [`mock`] for scripted accessors and checkers. Timing tests run on Tokio's
//! paused clock (`#[tokio::test(start_paused = true)]`), so every sleep is virtual.

pub mod checker;
pub mod confirm;
pub mod error;
pub mod mock;
pub mod orchestrate;
pub mod retry;
pub mod telemetry;
pub mod watch;

pub use checker::{checker_fn, CheckerFn, ConditionChecker, WatchChecker};
pub use confirm::confirm;
pub use error::{BoxError, WaitError};
pub use orchestrate::{create_and_wait, transition_and_verify};
pub use retry::{retry_until_success, RetryBudget};
pub use watch::{
    accessor_fn, watch_until, FnAccessor, StateAccessor, WatchHandle, WatchOutcome, WatchPolicy,
    Watcher,
};
