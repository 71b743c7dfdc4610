use super::client::SimClient;
use super::message::{Response, SimRequest};
use super::SimTiming;
use crate::error::ComputeError;
use crate::model::{
    Disk, DiskSpec, DiskStatus, Image, Instance, InstanceSpec, InstanceStatus, Operation,
    OperationKind, Snapshot, Tags, ZoneCoords, ZoneScope,
};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A resource and the statuses it will go through.
///
/// The resource is invisible before the first step; afterwards its status is
/// the latest step whose instant has passed.
struct Tracked<R, S> {
    resource: R,
    timeline: Vec<(Instant, S)>,
}

impl<R, S: Copy> Tracked<R, S> {
    fn status_at(&self, now: Instant) -> Option<S> {
        self.timeline
            .iter()
            .rev()
            .find(|(at, _)| *at <= now)
            .map(|(_, status)| *status)
    }
}

fn not_found(at: &impl std::fmt::Display) -> ComputeError {
    ComputeError::NotFound(at.to_string())
}

fn invalid_state(at: &ZoneCoords, reason: impl Into<String>) -> ComputeError {
    ComputeError::InvalidState {
        resource: at.to_string(),
        reason: reason.into(),
    }
}

fn in_scope(at: &ZoneCoords, scope: &ZoneScope) -> bool {
    at.project == scope.project && at.zone == scope.zone
}

fn reply<T>(request: &'static str, respond_to: Response<T>, result: Result<T, ComputeError>) {
    if let Err(e) = &result {
        warn!(request, error = %e, "Request rejected");
    }
    let _ = respond_to.send(result);
}

/// An in-process, eventually-consistent compute engine.
///
/// Like a real engine it accepts mutations at once and applies them later:
/// a created resource stays invisible for `visibility_delay`, then needs
/// `settle_delay` more to reach its final status. Stop and start take
/// `settle_delay`. Requests are processed one at a time from a channel, so
/// the engine owns its state without locks.
///
/// Time is read from Tokio's clock, so tests on a paused runtime run the
/// whole lifecycle in virtual time.
pub struct SimEngine {
    receiver: mpsc::Receiver<SimRequest>,
    timing: SimTiming,
    instances: HashMap<ZoneCoords, Tracked<Instance, InstanceStatus>>,
    disks: HashMap<ZoneCoords, Tracked<Disk, DiskStatus>>,
    snapshots: HashMap<String, Vec<Snapshot>>,
    images: HashMap<String, Vec<Image>>,
    groups: HashMap<ZoneCoords, Vec<String>>,
    next_operation: u64,
    next_address: u32,
    next_fingerprint: u64,
}

impl SimEngine {
    /// Creates an engine and the client that talks to it.
    ///
    /// `buffer_size` bounds the request channel; the engine does nothing until
    /// [`run`](Self::run) is spawned.
    pub fn new(buffer_size: usize, timing: SimTiming) -> (Self, SimClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let engine = Self {
            receiver,
            timing,
            instances: HashMap::new(),
            disks: HashMap::new(),
            snapshots: HashMap::new(),
            images: HashMap::new(),
            groups: HashMap::new(),
            next_operation: 1,
            next_address: 2,
            next_fingerprint: 1,
        };
        (engine, SimClient::new(sender))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!(
            visibility_ms = self.timing.visibility_delay.as_millis() as u64,
            settle_ms = self.timing.settle_delay.as_millis() as u64,
            "Compute simulator started"
        );

        while let Some(request) = self.receiver.recv().await {
            self.handle(request);
        }

        info!(
            instances = self.instances.len(),
            disks = self.disks.len(),
            "Compute simulator shutdown"
        );
    }

    fn handle(&mut self, request: SimRequest) {
        let now = Instant::now();
        match request {
            SimRequest::GetInstance { at, respond_to } => {
                debug!(resource = %at, "Get instance");
                reply("get_instance", respond_to, self.instance(&at, now));
            }
            SimRequest::ListInstances { scope, respond_to } => {
                debug!(%scope, "List instances");
                reply("list_instances", respond_to, Ok(self.list_instances(&scope, now)));
            }
            SimRequest::InsertInstance {
                scope,
                spec,
                respond_to,
            } => {
                debug!(%scope, ?spec, "Insert instance");
                reply("insert_instance", respond_to, self.insert_instance(&scope, spec, now));
            }
            SimRequest::DeleteInstance { at, respond_to } => {
                reply("delete_instance", respond_to, self.delete_instance(&at, now));
            }
            SimRequest::StopInstance { at, respond_to } => {
                reply("stop_instance", respond_to, self.stop_instance(&at, now));
            }
            SimRequest::StartInstance { at, respond_to } => {
                reply("start_instance", respond_to, self.start_instance(&at, now));
            }
            SimRequest::ResetInstance { at, respond_to } => {
                reply("reset_instance", respond_to, self.reset_instance(&at, now));
            }
            SimRequest::SetMachineType {
                at,
                machine_type,
                respond_to,
            } => {
                let result = self.set_machine_type(&at, machine_type, now);
                reply("set_machine_type", respond_to, result);
            }
            SimRequest::SetTags {
                at,
                tags,
                respond_to,
            } => {
                reply("set_tags", respond_to, self.set_tags(&at, tags, now));
            }
            SimRequest::GetDisk { at, respond_to } => {
                debug!(resource = %at, "Get disk");
                reply("get_disk", respond_to, self.disk(&at, now));
            }
            SimRequest::ListDisks { scope, respond_to } => {
                debug!(%scope, "List disks");
                reply("list_disks", respond_to, Ok(self.list_disks(&scope, now)));
            }
            SimRequest::InsertDisk {
                scope,
                spec,
                respond_to,
            } => {
                debug!(%scope, ?spec, "Insert disk");
                reply("insert_disk", respond_to, self.insert_disk(&scope, spec, now));
            }
            SimRequest::DeleteDisk { at, respond_to } => {
                reply("delete_disk", respond_to, self.delete_disk(&at, now));
            }
            SimRequest::ListSnapshots {
                project,
                respond_to,
            } => {
                let snapshots = self.snapshots.get(&project).cloned().unwrap_or_default();
                reply("list_snapshots", respond_to, Ok(snapshots));
            }
            SimRequest::GetSnapshot {
                project,
                name,
                respond_to,
            } => {
                let snapshot = self
                    .find_snapshot(&project, &name)
                    .cloned()
                    .ok_or_else(|| ComputeError::NotFound(format!("{project}/snapshots/{name}")));
                reply("get_snapshot", respond_to, snapshot);
            }
            SimRequest::ListImages {
                project,
                respond_to,
            } => {
                let images = self.images.get(&project).cloned().unwrap_or_default();
                reply("list_images", respond_to, Ok(images));
            }
            SimRequest::AddInstances {
                group,
                instances,
                respond_to,
            } => {
                let result = self.add_instances(&group, instances, now);
                reply("add_instances", respond_to, result);
            }
            SimRequest::GroupMembers { group, respond_to } => {
                let members = self.groups.get(&group).cloned().ok_or_else(|| not_found(&group));
                reply("group_members", respond_to, members);
            }
            SimRequest::SeedSnapshot {
                project,
                snapshot,
                respond_to,
            } => {
                debug!(%project, snapshot = %snapshot.name, "Seed snapshot");
                self.snapshots.entry(project).or_default().push(snapshot);
                let _ = respond_to.send(Ok(()));
            }
            SimRequest::SeedImage {
                project,
                image,
                respond_to,
            } => {
                debug!(%project, image = %image.name, "Seed image");
                self.images.entry(project).or_default().push(image);
                let _ = respond_to.send(Ok(()));
            }
        }
    }

    fn operation(&mut self, kind: OperationKind, target: &ZoneCoords) -> Operation {
        let name = format!("operation-{}", self.next_operation);
        self.next_operation += 1;
        info!(operation = %name, ?kind, resource = %target, "Accepted");
        Operation {
            name,
            kind,
            target: target.to_string(),
        }
    }

    fn fingerprint(&mut self) -> String {
        let fingerprint = format!("{:016x}", self.next_fingerprint);
        self.next_fingerprint += 1;
        fingerprint
    }

    fn find_snapshot(&self, project: &str, name: &str) -> Option<&Snapshot> {
        self.snapshots.get(project)?.iter().find(|s| s.name == name)
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    fn instance(&self, at: &ZoneCoords, now: Instant) -> Result<Instance, ComputeError> {
        let tracked = self.instances.get(at).ok_or_else(|| not_found(at))?;
        let status = tracked.status_at(now).ok_or_else(|| not_found(at))?;
        Ok(Instance {
            status,
            ..tracked.resource.clone()
        })
    }

    fn visible_instance(
        &mut self,
        at: &ZoneCoords,
        now: Instant,
    ) -> Result<(&mut Tracked<Instance, InstanceStatus>, InstanceStatus), ComputeError> {
        let tracked = self.instances.get_mut(at).ok_or_else(|| not_found(at))?;
        let status = tracked.status_at(now).ok_or_else(|| not_found(at))?;
        Ok((tracked, status))
    }

    fn list_instances(&self, scope: &ZoneScope, now: Instant) -> Vec<Instance> {
        let mut found: Vec<Instance> = self
            .instances
            .keys()
            .filter(|at| in_scope(at, scope))
            .filter_map(|at| self.instance(at, now).ok())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    fn insert_instance(
        &mut self,
        scope: &ZoneScope,
        spec: InstanceSpec,
        now: Instant,
    ) -> Result<Operation, ComputeError> {
        let at = scope.coords(&spec.name);
        if self.instances.contains_key(&at) {
            return Err(ComputeError::AlreadyExists(at.to_string()));
        }

        let mut attached = Vec::new();
        for disk in &spec.disks {
            if let Some(name) = disk.source_name() {
                let disk_at = scope.coords(name);
                self.disk(&disk_at, now)?;
                attached.push(disk_at);
            }
        }
        for disk_at in attached {
            if let Some(disk) = self.disks.get_mut(&disk_at) {
                disk.resource.users.push(spec.name.clone());
            }
        }

        let host = self.next_address;
        self.next_address += 1;
        let mut network_interfaces = spec.network_interfaces;
        for interface in &mut network_interfaces {
            interface.network_ip = Some(format!("10.240.0.{host}"));
            for access in &mut interface.access_configs {
                access.nat_ip = Some(format!("104.155.0.{host}"));
            }
        }

        let tags = Tags {
            items: spec.tags.items,
            fingerprint: self.fingerprint(),
        };
        let instance = Instance {
            name: spec.name,
            zone: scope.zone.clone(),
            machine_type: spec.machine_type,
            status: InstanceStatus::Provisioning,
            tags,
            disks: spec.disks,
            network_interfaces,
        };

        let visible = now + self.timing.visibility_delay;
        let settled = visible + self.timing.settle_delay;
        let timeline = vec![
            (visible, InstanceStatus::Provisioning),
            (visible + self.timing.settle_delay / 2, InstanceStatus::Staging),
            (settled, InstanceStatus::Running),
        ];
        self.instances.insert(
            at.clone(),
            Tracked {
                resource: instance,
                timeline,
            },
        );

        Ok(self.operation(OperationKind::Insert, &at))
    }

    fn delete_instance(&mut self, at: &ZoneCoords, now: Instant) -> Result<Operation, ComputeError> {
        self.instance(at, now)?;
        self.instances.remove(at);

        for (disk_at, disk) in self.disks.iter_mut() {
            if disk_at.project == at.project && disk_at.zone == at.zone {
                disk.resource.users.retain(|user| *user != at.name);
            }
        }
        for (group, members) in self.groups.iter_mut() {
            if group.project == at.project && group.zone == at.zone {
                members.retain(|member| *member != at.name);
            }
        }

        Ok(self.operation(OperationKind::Delete, at))
    }

    fn stop_instance(&mut self, at: &ZoneCoords, now: Instant) -> Result<Operation, ComputeError> {
        let settle = self.timing.settle_delay;
        {
            let (tracked, status) = self.visible_instance(at, now)?;
            if !matches!(status, InstanceStatus::Running | InstanceStatus::Staging) {
                return Err(invalid_state(at, format!("cannot stop an instance in {status}")));
            }
            tracked.timeline = vec![
                (now, InstanceStatus::Stopping),
                (now + settle, InstanceStatus::Terminated),
            ];
        }
        Ok(self.operation(OperationKind::Stop, at))
    }

    fn start_instance(&mut self, at: &ZoneCoords, now: Instant) -> Result<Operation, ComputeError> {
        let settle = self.timing.settle_delay;
        {
            let (tracked, status) = self.visible_instance(at, now)?;
            if status != InstanceStatus::Terminated {
                return Err(invalid_state(at, format!("cannot start an instance in {status}")));
            }
            tracked.timeline = vec![
                (now, InstanceStatus::Staging),
                (now + settle, InstanceStatus::Running),
            ];
        }
        Ok(self.operation(OperationKind::Start, at))
    }

    fn reset_instance(&mut self, at: &ZoneCoords, now: Instant) -> Result<Operation, ComputeError> {
        let (_, status) = self.visible_instance(at, now)?;
        if status != InstanceStatus::Running {
            return Err(invalid_state(at, format!("cannot reset an instance in {status}")));
        }
        Ok(self.operation(OperationKind::Reset, at))
    }

    fn set_machine_type(
        &mut self,
        at: &ZoneCoords,
        machine_type: String,
        now: Instant,
    ) -> Result<Operation, ComputeError> {
        {
            let (tracked, status) = self.visible_instance(at, now)?;
            if status != InstanceStatus::Terminated {
                return Err(invalid_state(at, "machine type can only change while stopped"));
            }
            tracked.resource.machine_type = machine_type;
        }
        Ok(self.operation(OperationKind::SetMachineType, at))
    }

    fn set_tags(&mut self, at: &ZoneCoords, tags: Tags, now: Instant) -> Result<Operation, ComputeError> {
        let fresh = self.fingerprint();
        {
            let (tracked, _) = self.visible_instance(at, now)?;
            if tracked.resource.tags.fingerprint != tags.fingerprint {
                return Err(invalid_state(at, "stale tag fingerprint"));
            }
            tracked.resource.tags = Tags {
                items: tags.items,
                fingerprint: fresh,
            };
        }
        Ok(self.operation(OperationKind::SetTags, at))
    }

    fn add_instances(
        &mut self,
        group: &ZoneCoords,
        instances: Vec<String>,
        now: Instant,
    ) -> Result<Operation, ComputeError> {
        let scope = group.scope();
        for name in &instances {
            self.instance(&scope.coords(name), now)?;
        }

        let members = self.groups.entry(group.clone()).or_default();
        for name in instances {
            if !members.contains(&name) {
                members.push(name);
            }
        }
        Ok(self.operation(OperationKind::AddInstances, group))
    }

    // -------------------------------------------------------------------------
    // Disks
    // -------------------------------------------------------------------------

    fn disk(&self, at: &ZoneCoords, now: Instant) -> Result<Disk, ComputeError> {
        let tracked = self.disks.get(at).ok_or_else(|| not_found(at))?;
        let status = tracked.status_at(now).ok_or_else(|| not_found(at))?;
        Ok(Disk {
            status,
            ..tracked.resource.clone()
        })
    }

    fn list_disks(&self, scope: &ZoneScope, now: Instant) -> Vec<Disk> {
        let mut found: Vec<Disk> = self
            .disks
            .keys()
            .filter(|at| in_scope(at, scope))
            .filter_map(|at| self.disk(at, now).ok())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    fn insert_disk(&mut self, scope: &ZoneScope, spec: DiskSpec, now: Instant) -> Result<Operation, ComputeError> {
        let at = scope.coords(&spec.name);
        if self.disks.contains_key(&at) {
            return Err(ComputeError::AlreadyExists(at.to_string()));
        }

        let source_snapshot = match spec.source_snapshot.as_deref() {
            Some(uri) => {
                let name = uri.rsplit('/').next().unwrap_or(uri);
                let snapshot = self
                    .find_snapshot(&scope.project, name)
                    .ok_or_else(|| ComputeError::NotFound(format!("{}/snapshots/{name}", scope.project)))?;
                Some(snapshot.self_link.clone())
            }
            None => None,
        };

        let first = if source_snapshot.is_some() {
            DiskStatus::Restoring
        } else {
            DiskStatus::Creating
        };
        let visible = now + self.timing.visibility_delay;
        let disk = Disk {
            name: spec.name,
            zone: scope.zone.clone(),
            size_gb: spec.size_gb,
            status: first,
            source_snapshot,
            users: Vec::new(),
        };
        self.disks.insert(
            at.clone(),
            Tracked {
                resource: disk,
                timeline: vec![(visible, first), (visible + self.timing.settle_delay, DiskStatus::Ready)],
            },
        );

        Ok(self.operation(OperationKind::Insert, &at))
    }

    fn delete_disk(&mut self, at: &ZoneCoords, now: Instant) -> Result<Operation, ComputeError> {
        let disk = self.disk(at, now)?;
        if !disk.users.is_empty() {
            return Err(invalid_state(at, format!("disk in use by {}", disk.users.join(", "))));
        }
        self.disks.remove(at);
        Ok(self.operation(OperationKind::Delete, at))
    }
}
