use super::message::{Response, SimRequest};
use crate::api::ComputeApi;
use crate::error::ComputeError;
use crate::model::{
    Disk, DiskSpec, Image, Instance, InstanceSpec, Operation, Snapshot, Tags, ZoneCoords, ZoneScope,
};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Handle to a running [`SimEngine`](super::SimEngine).
///
/// Cheap to clone; the engine stops once every clone is dropped.
#[derive(Clone)]
pub struct SimClient {
    sender: mpsc::Sender<SimRequest>,
}

impl SimClient {
    pub fn new(sender: mpsc::Sender<SimRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(&self, build: impl FnOnce(Response<T>) -> SimRequest) -> Result<T, ComputeError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ComputeError::SimulatorClosed)?;
        response.await.map_err(|_| ComputeError::SimulatorDropped)?
    }

    /// Makes a snapshot available to `project`.
    pub async fn seed_snapshot(&self, project: &str, snapshot: Snapshot) -> Result<(), ComputeError> {
        let project = project.to_string();
        self.request(|respond_to| SimRequest::SeedSnapshot {
            project,
            snapshot,
            respond_to,
        })
        .await
    }

    /// Makes an image available to `project`.
    pub async fn seed_image(&self, project: &str, image: Image) -> Result<(), ComputeError> {
        let project = project.to_string();
        self.request(|respond_to| SimRequest::SeedImage {
            project,
            image,
            respond_to,
        })
        .await
    }

    /// Instance names in the group at `group`.
    pub async fn group_members(&self, group: &ZoneCoords) -> Result<Vec<String>, ComputeError> {
        let group = group.clone();
        self.request(|respond_to| SimRequest::GroupMembers { group, respond_to })
            .await
    }
}

#[async_trait]
impl ComputeApi for SimClient {
    async fn get_instance(&self, at: &ZoneCoords) -> Result<Instance, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::GetInstance { at, respond_to })
            .await
    }

    async fn list_instances(&self, scope: &ZoneScope) -> Result<Vec<Instance>, ComputeError> {
        let scope = scope.clone();
        self.request(|respond_to| SimRequest::ListInstances { scope, respond_to })
            .await
    }

    async fn insert_instance(&self, scope: &ZoneScope, spec: InstanceSpec) -> Result<Operation, ComputeError> {
        let scope = scope.clone();
        self.request(|respond_to| SimRequest::InsertInstance {
            scope,
            spec,
            respond_to,
        })
        .await
    }

    async fn delete_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::DeleteInstance { at, respond_to })
            .await
    }

    async fn stop_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::StopInstance { at, respond_to })
            .await
    }

    async fn start_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::StartInstance { at, respond_to })
            .await
    }

    async fn reset_instance(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::ResetInstance { at, respond_to })
            .await
    }

    async fn set_machine_type(&self, at: &ZoneCoords, machine_type: String) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::SetMachineType {
            at,
            machine_type,
            respond_to,
        })
        .await
    }

    async fn set_tags(&self, at: &ZoneCoords, tags: Tags) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::SetTags {
            at,
            tags,
            respond_to,
        })
        .await
    }

    async fn get_disk(&self, at: &ZoneCoords) -> Result<Disk, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::GetDisk { at, respond_to })
            .await
    }

    async fn list_disks(&self, scope: &ZoneScope) -> Result<Vec<Disk>, ComputeError> {
        let scope = scope.clone();
        self.request(|respond_to| SimRequest::ListDisks { scope, respond_to })
            .await
    }

    async fn insert_disk(&self, scope: &ZoneScope, spec: DiskSpec) -> Result<Operation, ComputeError> {
        let scope = scope.clone();
        self.request(|respond_to| SimRequest::InsertDisk {
            scope,
            spec,
            respond_to,
        })
        .await
    }

    async fn delete_disk(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        let at = at.clone();
        self.request(|respond_to| SimRequest::DeleteDisk { at, respond_to })
            .await
    }

    async fn list_snapshots(&self, project: &str) -> Result<Vec<Snapshot>, ComputeError> {
        let project = project.to_string();
        self.request(|respond_to| SimRequest::ListSnapshots {
            project,
            respond_to,
        })
        .await
    }

    async fn get_snapshot(&self, project: &str, name: &str) -> Result<Snapshot, ComputeError> {
        let project = project.to_string();
        let name = name.to_string();
        self.request(|respond_to| SimRequest::GetSnapshot {
            project,
            name,
            respond_to,
        })
        .await
    }

    async fn list_images(&self, project: &str) -> Result<Vec<Image>, ComputeError> {
        let project = project.to_string();
        self.request(|respond_to| SimRequest::ListImages {
            project,
            respond_to,
        })
        .await
    }

    async fn add_instances_to_group(
        &self,
        group: &ZoneCoords,
        instances: Vec<String>,
    ) -> Result<Operation, ComputeError> {
        let group = group.clone();
        self.request(|respond_to| SimRequest::AddInstances {
            group,
            instances,
            respond_to,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InstanceStatus;

    /// A client whose requests land in `receiver` instead of an engine.
    fn detached_client() -> (SimClient, mpsc::Receiver<SimRequest>) {
        let (sender, receiver) = mpsc::channel(4);
        (SimClient::new(sender), receiver)
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (client, mut receiver) = detached_client();
        let at = ZoneCoords::new("demo", "us-central1-f", "vm-1");

        let task = {
            let at = at.clone();
            tokio::spawn(async move { client.instance_status(&at).await })
        };

        match receiver.recv().await {
            Some(SimRequest::GetInstance { at: asked, respond_to }) => {
                assert_eq!(asked, at);
                let instance = Instance {
                    name: "vm-1".into(),
                    zone: "us-central1-f".into(),
                    machine_type: "f1-micro".into(),
                    status: InstanceStatus::Staging,
                    tags: Tags::default(),
                    disks: Vec::new(),
                    network_interfaces: Vec::new(),
                };
                respond_to.send(Ok(instance)).unwrap();
            }
            other => panic!("unexpected request: {other:?}"),
        }

        assert_eq!(task.await.unwrap().unwrap(), InstanceStatus::Staging);
    }

    #[tokio::test]
    async fn test_closed_engine() {
        let (client, receiver) = detached_client();
        drop(receiver);

        let err = client.list_images("demo").await.unwrap_err();
        assert!(matches!(err, ComputeError::SimulatorClosed));
    }

    #[tokio::test]
    async fn test_dropped_response() {
        let (client, mut receiver) = detached_client();
        let task = tokio::spawn(async move { client.list_snapshots("demo").await });

        // Receive the request and drop its reply channel unanswered.
        drop(receiver.recv().await);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ComputeError::SimulatorDropped));
    }
}
