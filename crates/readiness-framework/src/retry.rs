//! # Retry Primitive
//!
//! [`retry_until_success`] re-invokes a fallible operation until it reports success
//! or the attempt budget runs out. It looks for *any* success, whereas
//! [`confirm`](crate::confirm::confirm) requires *every* probe to pass.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Attempt budget shared by [`confirm`](crate::confirm::confirm) and [`retry_until_success`].
///
/// The interval is fixed: no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum number of invocations.
    pub attempts: u32,
    /// Pause between two consecutive invocations.
    pub interval: Duration,
}

impl RetryBudget {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// Invokes `operation` up to `budget.attempts` times, sleeping `budget.interval`
/// between attempts, and returns `true` on the first success.
///
/// Returns `false` once every attempt has failed. A budget of zero attempts
/// never invokes the operation.
///
/// ```rust
/// use readiness_framework::{retry_until_success, RetryBudget};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let mut calls = 0;
///     let budget = RetryBudget::new(5, Duration::from_millis(1));
///     let ok = retry_until_success(budget, || {
///         calls += 1;
///         let n = calls;
///         async move { n == 2 }
///     })
///     .await;
///     assert!(ok);
///     assert_eq!(calls, 2);
/// }
/// ```
pub async fn retry_until_success<F, Fut>(budget: RetryBudget, mut operation: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=budget.attempts {
        if operation().await {
            debug!(attempt, "Operation succeeded");
            return true;
        }
        trace!(attempt, attempts = budget.attempts, "Attempt failed");
        if attempt < budget.attempts {
            tokio::time::sleep(budget.interval).await;
        }
    }

    debug!(attempts = budget.attempts, "Retry budget exhausted");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const BUDGET_INTERVAL: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let mut calls = 0;
        let ok = retry_until_success(RetryBudget::new(5, BUDGET_INTERVAL), || {
            calls += 1;
            let n = calls;
            async move { n >= 3 }
        })
        .await;

        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget_on_failure() {
        let started = Instant::now();
        let mut calls = 0;
        let ok = retry_until_success(RetryBudget::new(3, BUDGET_INTERVAL), || {
            calls += 1;
            async { false }
        })
        .await;

        assert!(!ok);
        assert_eq!(calls, 3);
        // Two pauses between three attempts, none after the last one.
        let elapsed = started.elapsed();
        assert!(elapsed >= BUDGET_INTERVAL * 2, "elapsed {elapsed:?}");
        assert!(elapsed < BUDGET_INTERVAL * 3, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_never_invokes() {
        let mut calls = 0;
        let ok = retry_until_success(RetryBudget::new(0, BUDGET_INTERVAL), || {
            calls += 1;
            async { true }
        })
        .await;

        assert!(!ok);
        assert_eq!(calls, 0);
    }
}
