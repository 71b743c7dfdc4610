//! # Confirmation Primitive
//!
//! [`confirm`] certifies that a condition is *stably* true: the predicate has to
//! hold on every one of N consecutive probes, spaced by a fixed interval.

use crate::retry::RetryBudget;
use std::future::Future;
use tracing::{debug, trace};

/// Invokes `predicate` up to `budget.attempts` times, sleeping `budget.interval`
/// between invocations.
///
/// Returns `true` only if every invocation returned `true`. The first `false`
/// ends the confirmation immediately; the rest of the budget is not consumed.
/// A budget of zero attempts is vacuously confirmed.
pub async fn confirm<F, Fut>(budget: RetryBudget, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for probe in 1..=budget.attempts {
        if !predicate().await {
            debug!(probe, attempts = budget.attempts, "Confirmation broken");
            return false;
        }
        trace!(probe, attempts = budget.attempts, "Probe held");
        if probe < budget.attempts {
            tokio::time::sleep(budget.interval).await;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn budget(attempts: u32) -> RetryBudget {
        RetryBudget::new(attempts, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_holds_on_every_probe() {
        let mut calls = 0;
        let confirmed = confirm(budget(3), || {
            calls += 1;
            async { true }
        })
        .await;

        assert!(confirmed);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_fast_on_first_negative() {
        let mut calls = 0;
        let confirmed = confirm(budget(3), || {
            calls += 1;
            async { false }
        })
        .await;

        assert!(!confirmed);
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flapping_condition_is_not_confirmed() {
        let mut calls = 0;
        let confirmed = confirm(budget(5), || {
            calls += 1;
            let n = calls;
            async move { n != 4 }
        })
        .await;

        assert!(!confirmed);
        assert_eq!(calls, 4);
    }
}
