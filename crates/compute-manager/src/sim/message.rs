use crate::error::ComputeError;
use crate::model::{
    Disk, DiskSpec, Image, Instance, InstanceSpec, Operation, Snapshot, Tags, ZoneCoords, ZoneScope,
};
use tokio::sync::oneshot;

/// One-shot reply channel of a simulator request.
pub type Response<T> = oneshot::Sender<Result<T, ComputeError>>;

/// Requests understood by the [`SimEngine`](super::SimEngine).
///
/// One variant per [`ComputeApi`](crate::api::ComputeApi) call, plus `Seed*`
/// variants that install read-only resources (snapshots, images) and an
/// inspection request for instance groups.
#[derive(Debug)]
pub enum SimRequest {
    GetInstance {
        at: ZoneCoords,
        respond_to: Response<Instance>,
    },
    ListInstances {
        scope: ZoneScope,
        respond_to: Response<Vec<Instance>>,
    },
    InsertInstance {
        scope: ZoneScope,
        spec: InstanceSpec,
        respond_to: Response<Operation>,
    },
    DeleteInstance {
        at: ZoneCoords,
        respond_to: Response<Operation>,
    },
    StopInstance {
        at: ZoneCoords,
        respond_to: Response<Operation>,
    },
    StartInstance {
        at: ZoneCoords,
        respond_to: Response<Operation>,
    },
    ResetInstance {
        at: ZoneCoords,
        respond_to: Response<Operation>,
    },
    SetMachineType {
        at: ZoneCoords,
        machine_type: String,
        respond_to: Response<Operation>,
    },
    SetTags {
        at: ZoneCoords,
        tags: Tags,
        respond_to: Response<Operation>,
    },
    GetDisk {
        at: ZoneCoords,
        respond_to: Response<Disk>,
    },
    ListDisks {
        scope: ZoneScope,
        respond_to: Response<Vec<Disk>>,
    },
    InsertDisk {
        scope: ZoneScope,
        spec: DiskSpec,
        respond_to: Response<Operation>,
    },
    DeleteDisk {
        at: ZoneCoords,
        respond_to: Response<Operation>,
    },
    ListSnapshots {
        project: String,
        respond_to: Response<Vec<Snapshot>>,
    },
    GetSnapshot {
        project: String,
        name: String,
        respond_to: Response<Snapshot>,
    },
    ListImages {
        project: String,
        respond_to: Response<Vec<Image>>,
    },
    AddInstances {
        group: ZoneCoords,
        instances: Vec<String>,
        respond_to: Response<Operation>,
    },
    GroupMembers {
        group: ZoneCoords,
        respond_to: Response<Vec<String>>,
    },
    SeedSnapshot {
        project: String,
        snapshot: Snapshot,
        respond_to: Response<()>,
    },
    SeedImage {
        project: String,
        image: Image,
        respond_to: Response<()>,
    },
}
