//! # System Lifecycle
//!
//! [`CloudSystem`] wires a [`ComputeManager`] to a freshly spawned simulated
//! compute engine and tears both down again.
//!
//! ```rust,ignore
//! let system = CloudSystem::new(SimTiming::default(), config.timeouts());
//! system.manager.new_vm(&scope, spec).await?;
//! system.shutdown().await?;
//! ```
//!
//! ## Shutdown
//!
//! 1. Drop the manager and the client: the engine's channel closes.
//! 2. The engine's `recv()` returns `None`; it logs its final state and exits.
//! 3. Await the engine task.
//!
//! Clones of the client or the manager held elsewhere keep the engine alive,
//! so `shutdown` waits for them to be dropped too.

use crate::error::ComputeError;
use crate::manager::{ComputeManager, Timeouts};
use crate::sim::{SimClient, SimEngine, SimTiming};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

const ENGINE_BUFFER: usize = 64;

pub struct CloudSystem {
    pub manager: ComputeManager<SimClient>,
    /// Direct access to the engine, for seeding snapshots and images.
    pub client: SimClient,
    handle: JoinHandle<()>,
}

impl CloudSystem {
    /// Spawns the simulated engine and builds a manager over it.
    pub fn new(timing: SimTiming, timeouts: Timeouts) -> Self {
        let (engine, client) = SimEngine::new(ENGINE_BUFFER, timing);
        let handle = tokio::spawn(engine.run());
        let manager = ComputeManager::new(Arc::new(client.clone())).with_timeouts(timeouts);

        Self {
            manager,
            client,
            handle,
        }
    }

    pub async fn shutdown(self) -> Result<(), ComputeError> {
        info!("Shutting down cloud system");
        drop(self.manager);
        drop(self.client);
        self.handle.await?;
        Ok(())
    }
}
