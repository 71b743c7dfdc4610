//! # Simulated Compute Engine
//!
//! An in-process stand-in for a remote compute engine, built as an actor: one
//! task ([`SimEngine`]) owns all resources and processes requests from a
//! channel; any number of cloned [`SimClient`]s send requests and await replies
//! on one-shot channels. `SimClient` implements [`ComputeApi`](crate::api::ComputeApi),
//! so a [`ComputeManager`](crate::manager::ComputeManager) runs on it unchanged.
//!
//! ## Eventual Consistency
//!
//! The engine reproduces the behaviour readiness watches exist for:
//!
//! | Request | Accepted | Visible | Settled |
//! |---------|----------|---------|---------|
//! | insert instance | at once | after `visibility_delay` (`PROVISIONING`) | `RUNNING` after `settle_delay` more |
//! | insert disk | at once | after `visibility_delay` (`CREATING`/`RESTORING`) | `READY` after `settle_delay` more |
//! | stop instance | at once | `STOPPING` at once | `TERMINATED` after `settle_delay` |
//! | start instance | at once | `STAGING` at once | `RUNNING` after `settle_delay` |
//!
//! Until a resource is visible, reads answer [`ComputeError::NotFound`](crate::error::ComputeError::NotFound).
//!
//! ## Rules Enforced
//!
//! - Names are unique per project and zone, visible or not.
//! - Stop needs `RUNNING` or `STAGING`; start and machine type changes need `TERMINATED`.
//! - Tags are replaced only with the current fingerprint.
//! - A disk attached to an instance cannot be deleted.
//!
//! ## Lifecycle
//!
//! ```rust
//! use compute_manager::api::ComputeApi;
//! use compute_manager::sim::{SimEngine, SimTiming};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (engine, client) = SimEngine::new(32, SimTiming::default());
//!     let handle = tokio::spawn(engine.run());
//!
//!     assert!(client.list_images("demo").await.unwrap().is_empty());
//!
//!     drop(client); // Closes the channel
//!     handle.await.unwrap();
//! }
//! ```

pub mod client;
pub mod engine;
pub mod message;

pub use client::SimClient;
pub use engine::SimEngine;
pub use message::{Response, SimRequest};

use std::time::Duration;

/// Delays of the simulated engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTiming {
    /// Time before a created resource can be read.
    pub visibility_delay: Duration,
    /// Time from first visibility (or from a stop/start) to the final status.
    pub settle_delay: Duration,
}

impl Default for SimTiming {
    fn default() -> Self {
        Self {
            visibility_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(20),
        }
    }
}
