//! # Compute Manager
//!
//! Long-running compute-engine operations (create a VM, stop it, restore a
//! disk from a snapshot) that return only once the engine reports the result,
//! built on [`readiness_framework`].
//!
//! - **[model]**: instances, disks, snapshots, tags, and the pure helpers over
//!   them (latest snapshot, tag rewrite, machine type patch, templates).
//! - **[api]**: the [`ComputeApi`](api::ComputeApi) contract a compute engine implements.
//! - **[manager]**: [`ComputeManager`](manager::ComputeManager), the orchestrated operations.
//! - **[config]**: JSON configuration with per-kind watch timeouts.
//! - **[sim]**: an in-process, eventually-consistent compute engine.
//! - **[lifecycle]**: [`CloudSystem`](lifecycle::CloudSystem), which starts and stops the simulator.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod model;
pub mod sim;

pub use error::ComputeError;
