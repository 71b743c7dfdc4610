//! # Compute Manager
//!
//! [`ComputeManager`] turns the fire-and-forget calls of a [`ComputeApi`] into
//! operations that return only once the engine's own view of the resource agrees
//! with the request.
//!
//! ## Operations
//!
//! | Operation | Mutation | Then |
//! |-----------|----------|------|
//! | [`new_vm`](ComputeManager::new_vm) | insert instance | watch until `RUNNING` |
//! | [`new_disk`](ComputeManager::new_disk) | insert disk | watch until `READY` |
//! | [`stop_vm`](ComputeManager::stop_vm) | stop instance | ask the caller's checker |
//! | [`start_vm`](ComputeManager::start_vm) | start instance | ask the caller's checker |
//! | [`attach_tags`](ComputeManager::attach_tags) / [`detach_tags`](ComputeManager::detach_tags) | read, rewrite, set tags | - |
//!
//! Everything else (get, list, delete, reset, machine type, snapshots, images,
//! instance groups) is forwarded as-is, with logging.
//!
//! ## Checkers
//!
//! `stop_vm` and `start_vm` take any `&dyn ConditionChecker<ZoneCoords>`. The
//! usual ones are [`vm_stopped_checker`](ComputeManager::vm_stopped_checker) and
//! [`vm_running_checker`](ComputeManager::vm_running_checker), which watch the
//! instance status with the configured [`Timeouts`]:
//!
//! ```rust,ignore
//! let stopped = manager.vm_stopped_checker();
//! let op = manager.stop_vm(&at, &stopped).await?;
//! ```
//!
//! ## Errors
//!
//! A rejected mutation, a timeout and a failed verification all surface as
//! [`ComputeError::Wait`]. Mutations are never retried.

use crate::api::ComputeApi;
use crate::error::ComputeError;
use crate::model::{
    append_tags, latest_snapshot, patch_machine_type, remove_tags, Disk, DiskSpec, DiskStatus, Image, Instance,
    InstanceSpec, InstanceStatus, Operation, Snapshot, Tags, ZoneCoords, ZoneScope,
};
use async_trait::async_trait;
use readiness_framework::{
    confirm, create_and_wait, retry_until_success, transition_and_verify, ConditionChecker,
    RetryBudget, StateAccessor, WatchChecker, WatchPolicy, Watcher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const VM_RUNNING_TIMEOUT: Duration = Duration::from_secs(180);
pub const VM_STOPPED_TIMEOUT: Duration = Duration::from_secs(180);
pub const DISK_READY_TIMEOUT: Duration = Duration::from_secs(180);

const VM_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DISK_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DISK_ABSENT_INTERVAL: Duration = Duration::from_secs(10);

/// Watch policies per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub vm_running: WatchPolicy,
    pub vm_stopped: WatchPolicy,
    pub disk_ready: WatchPolicy,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            vm_running: WatchPolicy::new(VM_POLL_INTERVAL, VM_RUNNING_TIMEOUT),
            vm_stopped: WatchPolicy::new(VM_POLL_INTERVAL, VM_STOPPED_TIMEOUT),
            disk_ready: WatchPolicy::new(DISK_POLL_INTERVAL, DISK_READY_TIMEOUT)
                .with_absent_interval(DISK_ABSENT_INTERVAL),
        }
    }
}

fn is_running(status: &InstanceStatus) -> bool {
    *status == InstanceStatus::Running
}

fn is_terminated(status: &InstanceStatus) -> bool {
    *status == InstanceStatus::Terminated
}

fn is_disk_ready(status: &DiskStatus) -> bool {
    *status == DiskStatus::Ready
}

/// Reads instance status through a [`ComputeApi`].
pub struct InstanceStatusAccessor<A> {
    api: Arc<A>,
}

impl<A> Clone for InstanceStatusAccessor<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

#[async_trait]
impl<A: ComputeApi> StateAccessor<ZoneCoords> for InstanceStatusAccessor<A> {
    type State = InstanceStatus;
    type Error = ComputeError;

    async fn observe(&self, at: &ZoneCoords) -> Result<InstanceStatus, ComputeError> {
        self.api.instance_status(at).await
    }
}

/// Reads disk status through a [`ComputeApi`].
pub struct DiskStatusAccessor<A> {
    api: Arc<A>,
}

impl<A> Clone for DiskStatusAccessor<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

#[async_trait]
impl<A: ComputeApi> StateAccessor<ZoneCoords> for DiskStatusAccessor<A> {
    type State = DiskStatus;
    type Error = ComputeError;

    async fn observe(&self, at: &ZoneCoords) -> Result<DiskStatus, ComputeError> {
        self.api.disk_status(at).await
    }
}

/// Checker that waits for an instance to reach one status.
pub type InstanceStatusChecker<A> = WatchChecker<InstanceStatusAccessor<A>, fn(&InstanceStatus) -> bool>;

/// Long-running compute operations over a [`ComputeApi`].
pub struct ComputeManager<A> {
    api: Arc<A>,
    timeouts: Timeouts,
}

impl<A> Clone for ComputeManager<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            timeouts: self.timeouts,
        }
    }
}

impl<A: ComputeApi + 'static> ComputeManager<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn instance_status_accessor(&self) -> InstanceStatusAccessor<A> {
        InstanceStatusAccessor {
            api: self.api.clone(),
        }
    }

    pub fn disk_status_accessor(&self) -> DiskStatusAccessor<A> {
        DiskStatusAccessor {
            api: self.api.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    /// Creates an instance and waits until it is `RUNNING`.
    #[instrument(skip(self, spec), fields(vm = %spec.name))]
    pub async fn new_vm(&self, scope: &ZoneScope, spec: InstanceSpec) -> Result<Operation, ComputeError> {
        let watcher = Watcher::new(
            scope.coords(&spec.name),
            self.instance_status_accessor(),
            is_running,
            self.timeouts.vm_running,
        );
        let op = create_and_wait(self.api.insert_instance(scope, spec), watcher).await?;
        info!(operation = %op.name, "VM running");
        Ok(op)
    }

    /// Stops an instance, then asks `verifier` whether it really stopped.
    #[instrument(skip(self, verifier), fields(vm = %at))]
    pub async fn stop_vm(
        &self,
        at: &ZoneCoords,
        verifier: &dyn ConditionChecker<ZoneCoords>,
    ) -> Result<Operation, ComputeError> {
        Ok(transition_and_verify(at, self.api.stop_instance(at), verifier).await?)
    }

    /// Starts an instance, then asks `verifier` whether it really started.
    #[instrument(skip(self, verifier), fields(vm = %at))]
    pub async fn start_vm(
        &self,
        at: &ZoneCoords,
        verifier: &dyn ConditionChecker<ZoneCoords>,
    ) -> Result<Operation, ComputeError> {
        Ok(transition_and_verify(at, self.api.start_instance(at), verifier).await?)
    }

    /// Checker that waits for `RUNNING` within the `vm_running` policy.
    pub fn vm_running_checker(&self) -> InstanceStatusChecker<A> {
        WatchChecker::new(
            self.instance_status_accessor(),
            is_running as fn(&InstanceStatus) -> bool,
            self.timeouts.vm_running,
        )
    }

    /// Checker that waits for `TERMINATED` within the `vm_stopped` policy.
    pub fn vm_stopped_checker(&self) -> InstanceStatusChecker<A> {
        WatchChecker::new(
            self.instance_status_accessor(),
            is_terminated as fn(&InstanceStatus) -> bool,
            self.timeouts.vm_stopped,
        )
    }

    /// Probes the instance status `budget.attempts` times and reports whether
    /// every probe saw `status`.
    #[instrument(skip(self), fields(vm = %at))]
    pub async fn confirm_vm_status(&self, at: &ZoneCoords, status: InstanceStatus, budget: RetryBudget) -> bool {
        let api = &self.api;
        let confirmed = confirm(budget, || async move {
            matches!(api.instance_status(at).await, Ok(observed) if observed == status)
        })
        .await;
        debug!(%status, confirmed, "Status confirmation");
        confirmed
    }

    #[instrument(skip(self), fields(vm = %at))]
    pub async fn get_vm(&self, at: &ZoneCoords) -> Result<Instance, ComputeError> {
        self.api.get_instance(at).await
    }

    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn list_vms(&self, scope: &ZoneScope) -> Result<Vec<Instance>, ComputeError> {
        let vms = self.api.list_instances(scope).await?;
        debug!(count = vms.len(), "Listed VMs");
        Ok(vms)
    }

    #[instrument(skip(self), fields(vm = %at))]
    pub async fn delete_vm(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        self.api.delete_instance(at).await
    }

    #[instrument(skip(self), fields(vm = %at))]
    pub async fn reset_vm(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        self.api.reset_instance(at).await
    }

    /// Changes the machine type of a stopped instance. `machine_type` is a bare
    /// type name such as `n1-standard-2`; it replaces the last segment of the
    /// instance's current machine type URI.
    #[instrument(skip(self), fields(vm = %at))]
    pub async fn set_machine_type(&self, at: &ZoneCoords, machine_type: &str) -> Result<Operation, ComputeError> {
        let vm = self.api.get_instance(at).await?;
        let uri = patch_machine_type(&vm.machine_type, machine_type);
        debug!(from = %vm.machine_type, to = %uri, "Patching machine type");
        self.api.set_machine_type(at, uri).await
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    /// Appends `tags` to the instance's tags. Existing tags are not deduplicated.
    #[instrument(skip(self), fields(vm = %at))]
    pub async fn attach_tags(&self, at: &ZoneCoords, tags: &[String]) -> Result<Operation, ComputeError> {
        self.adjust_tags(at, tags, append_tags).await
    }

    /// Removes every occurrence of each of `tags` from the instance's tags.
    #[instrument(skip(self), fields(vm = %at))]
    pub async fn detach_tags(&self, at: &ZoneCoords, tags: &[String]) -> Result<Operation, ComputeError> {
        self.adjust_tags(at, tags, remove_tags).await
    }

    async fn adjust_tags(
        &self,
        at: &ZoneCoords,
        tags: &[String],
        transform: fn(&[String], &[String]) -> Vec<String>,
    ) -> Result<Operation, ComputeError> {
        let vm = self.api.get_instance(at).await?;
        let items = transform(&vm.tags.items, tags);
        debug!(before = ?vm.tags.items, after = ?items, "Replacing tags");

        let replacement = Tags {
            items,
            fingerprint: vm.tags.fingerprint,
        };
        self.api.set_tags(at, replacement).await
    }

    // -------------------------------------------------------------------------
    // Disks
    // -------------------------------------------------------------------------

    /// Creates a disk and waits until it is `READY`.
    #[instrument(skip(self, spec), fields(disk = %spec.name))]
    pub async fn new_disk(&self, scope: &ZoneScope, spec: DiskSpec) -> Result<Operation, ComputeError> {
        let watcher = Watcher::new(
            scope.coords(&spec.name),
            self.disk_status_accessor(),
            is_disk_ready,
            self.timeouts.disk_ready,
        );
        let op = create_and_wait(self.api.insert_disk(scope, spec), watcher).await?;
        info!(operation = %op.name, "Disk ready");
        Ok(op)
    }

    #[instrument(skip(self), fields(disk = %at))]
    pub async fn get_disk(&self, at: &ZoneCoords) -> Result<Disk, ComputeError> {
        self.api.get_disk(at).await
    }

    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn list_disks(&self, scope: &ZoneScope) -> Result<Vec<Disk>, ComputeError> {
        self.api.list_disks(scope).await
    }

    #[instrument(skip(self), fields(disk = %at))]
    pub async fn delete_disk(&self, at: &ZoneCoords) -> Result<Operation, ComputeError> {
        self.api.delete_disk(at).await
    }

    /// Re-issues the delete until the engine accepts it or `budget` runs out.
    ///
    /// Deleting a disk that is still detaching from an instance fails for a
    /// while; this keeps trying instead.
    #[instrument(skip(self), fields(disk = %at))]
    pub async fn delete_disk_with_retry(&self, at: &ZoneCoords, budget: RetryBudget) -> bool {
        let api = &self.api;
        let deleted = retry_until_success(budget, || async move {
            match api.delete_disk(at).await {
                Ok(op) => {
                    debug!(operation = %op.name, "Delete accepted");
                    true
                }
                Err(e) => {
                    debug!(error = %e, "Delete rejected");
                    false
                }
            }
        })
        .await;
        if !deleted {
            warn!(attempts = budget.attempts, "Disk could not be deleted");
        }
        deleted
    }

    // -------------------------------------------------------------------------
    // Snapshots, images, groups
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_snapshots(&self, project: &str) -> Result<Vec<Snapshot>, ComputeError> {
        let snapshots = self.api.list_snapshots(project).await?;
        debug!(count = snapshots.len(), "Listed snapshots");
        Ok(snapshots)
    }

    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, project: &str, name: &str) -> Result<Snapshot, ComputeError> {
        self.api.get_snapshot(project, name).await
    }

    /// Lists the project's snapshots and returns the latest one matching `prefix`.
    #[instrument(skip(self))]
    pub async fn latest_snapshot_in(&self, project: &str, prefix: &str) -> Result<Snapshot, ComputeError> {
        let snapshots = self.api.list_snapshots(project).await?;
        latest_snapshot(prefix, &snapshots).cloned()
    }

    #[instrument(skip(self))]
    pub async fn list_images(&self, project: &str) -> Result<Vec<Image>, ComputeError> {
        self.api.list_images(project).await
    }

    #[instrument(skip(self), fields(group = %group))]
    pub async fn add_instances_to_group(
        &self,
        group: &ZoneCoords,
        instances: &[String],
    ) -> Result<Operation, ComputeError> {
        self.api.add_instances_to_group(group, instances.to_vec()).await
    }
}
