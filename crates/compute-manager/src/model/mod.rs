//! # Compute Resource Model
//!
//! Plain data: what the compute engine reports and what callers submit to it.
//! Serialization follows the engine's JSON field names.

pub mod coords;
pub mod disk;
pub mod image;
pub mod instance;
pub mod operation;
pub mod snapshot;
pub mod tags;

pub use coords::{ZoneCoords, ZoneScope};
pub use disk::{Disk, DiskSpec, DiskStatus};
pub use image::Image;
pub use instance::{
    patch_machine_type, AccessConfig, AttachedDisk, InitializeParams, Instance, InstanceSpec,
    InstanceStatus, NetworkInterface,
};
pub use operation::{Operation, OperationKind};
pub use snapshot::{latest_snapshot, Snapshot};
pub use tags::{append_tags, remove_tags, Tags};
