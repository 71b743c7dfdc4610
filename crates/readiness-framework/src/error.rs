//! # Wait Errors
//!
//! This module defines the error type shared by every primitive in the framework.
//! A caller of an orchestrated operation receives either success or exactly one
//! [`WaitError`], at most one timeout budget after the mutation was accepted.

use std::time::Duration;

/// Boxed error coming from a caller-supplied mutation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while issuing a mutation and waiting for its effect.
///
/// Only observation is ever retried. A failed mutation is reported as-is and
/// never re-issued.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The initiating request itself was rejected.
    #[error("Mutation failed for {resource}: {source}")]
    MutationFailed {
        resource: String,
        #[source]
        source: BoxError,
    },

    /// The target state was not observed before the deadline.
    #[error("Timed out after {elapsed:?} waiting for {resource} (limit {timeout:?})")]
    Timeout {
        resource: String,
        elapsed: Duration,
        timeout: Duration,
    },

    /// The resource could not be read yet.
    ///
    /// Inside a watch every accessor error is handled as this case, including
    /// permanent ones such as a denied permission: the watch keeps polling until
    /// its deadline instead of failing fast.
    #[error("{resource} not yet observable: {reason}")]
    NotYetObservable { resource: String, reason: String },

    /// A condition checker answered `false` without reporting why.
    #[error("Verification failed for {resource}")]
    VerificationFailed { resource: String },

    /// The watch task ended (aborted or panicked) without delivering an outcome.
    #[error("Watch dropped before reporting an outcome")]
    WatchDropped,
}
