//! # Compute Engine Contract
//!
//! [`ComputeApi`] is everything the compute layer needs from a compute engine.
//! Transport, authentication and serialization belong to implementations; this
//! crate ships one, the in-process simulator in [`crate::sim`].
//!
//! Mutating calls return an [`Operation`] as soon as the engine *accepts* the
//! request. The resource reflects the change later, which is why
//! [`ComputeManager`](crate::manager::ComputeManager) pairs them with readiness
//! watches.
//!
//! | Resource | Calls |
//! |----------|-------|
//! | instances | get, list, insert, delete, stop, start, reset, set machine type, set tags |
//! | disks | get, list, insert, delete |
//! | snapshots | list, get |
//! | images | list |
//! | instance groups | add instances |

use crate::error::ComputeError;
use crate::model::{
    Disk, DiskSpec, DiskStatus, Image, Instance, InstanceSpec, InstanceStatus, Operation, Snapshot,
    Tags, ZoneCoords, ZoneScope,
};
use async_trait::async_trait;

#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn get_instance(&self, at: &ZoneCoords) -> Result<Instance, ComputeError>;
    async fn list_instances(&self, scope: &ZoneScope) -> Result<Vec<Instance>, ComputeError>;
    async fn insert_instance(&self, scope: &ZoneScope, spec: InstanceSpec) -> Result<Operation, ComputeError>;
    async fn delete_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError>;
    async fn stop_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError>;
    async fn start_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError>;
    async fn reset_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError>;

    /// `machine_type` is a zonal URI such as `zones/<zone>/machineTypes/<type>`.
    async fn set_machine_type(&self, at: &ZoneCoords, machine_type: String) -> Result<Operation, ComputeError>;

    /// Replaces the tags of an instance. `tags.fingerprint` must match the
    /// instance's current fingerprint.
    async fn set_tags(&self, at: &ZoneCoords, tags: Tags) -> Result<Operation, ComputeError>;

    async fn get_disk(&self, at: &ZoneCoords) -> Result<Disk, ComputeError>;
    async fn list_disks(&self, scope: &ZoneScope) -> Result<Vec<Disk>, ComputeError>;
    async fn insert_disk(&self, scope: &ZoneScope, spec: DiskSpec) -> Result<Operation, ComputeError>;
    async fn delete_disk(&self, at: &ZoneCoords) -> Result<Operation, ComputeError>;

    async fn list_snapshots(&self, project: &str) -> Result<Vec<Snapshot>, ComputeError>;
    async fn get_snapshot(&self, project: &str, name: &str) -> Result<Snapshot, ComputeError>;

    async fn list_images(&self, project: &str) -> Result<Vec<Image>, ComputeError>;

    /// Adds instances (by name, same zone) to the instance group at `group`.
    async fn add_instances_to_group(
        &self,
        group: &ZoneCoords,
        instances: Vec<String>,
    ) -> Result<Operation, ComputeError>;

    /// Current status of an instance.
    async fn instance_status(&self, at: &ZoneCoords) -> Result<InstanceStatus, ComputeError> {
        Ok(self.get_instance(at).await?.status)
    }

    /// Current status of a disk.
    async fn disk_status(&self, at: &ZoneCoords) -> Result<DiskStatus, ComputeError> {
        Ok(self.get_disk(at).await?.status)
    }
}
