//! # Compute Manager Demo
//!
//! Runs a full instance and disk lifecycle against the simulated compute engine:
//!
//! 1. Create a VM from a JSON template and wait until it is `RUNNING`.
//! 2. Stop it, resize it, start it again, each transition verified by a watch.
//! 3. Restore a data disk from the latest snapshot and wait until it is `READY`.
//! 4. Attach and detach network tags; add the VM to an instance group.
//! 5. Delete the VM and the disk, then shut the simulator down.
//!
//! Pass a config file path as the first argument to override project, zone and
//! timeouts; see [`compute_manager::config`].
//!
//! ```bash
//! RUST_LOG=info cargo run -p compute-manager
//! RUST_LOG=debug cargo run -p compute-manager -- config.json
//! ```

use compute_manager::config::ComputeConfig;
use compute_manager::error::ComputeError;
use compute_manager::lifecycle::CloudSystem;
use compute_manager::model::{DiskSpec, Image, InstanceSpec, Snapshot};
use compute_manager::sim::SimTiming;
use readiness_framework::telemetry::setup_tracing;
use readiness_framework::RetryBudget;
use std::time::Duration;
use tracing::{info, warn, Instrument};

const VM_TEMPLATE: &str = r#"{
    "name": "web-1",
    "machineType": "zones/{zone}/machineTypes/f1-micro",
    "tags": { "items": ["http-server"] },
    "disks": [{
        "boot": true,
        "autoDelete": true,
        "initializeParams": { "sourceImage": "global/images/debian-12" }
    }],
    "networkInterfaces": [{
        "network": "global/networks/default",
        "accessConfigs": [{ "name": "External NAT", "type": "ONE_TO_ONE_NAT" }]
    }]
}"#;

const SNAPSHOTS: [&str; 3] = ["p-snap-201502131103", "p-snap-201502161516", "p-snap-201503032021"];

#[tokio::main]
async fn main() -> Result<(), ComputeError> {
    setup_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => ComputeConfig::load(path)?,
        None => ComputeConfig {
            project_id: "demo-project".to_string(),
            ..ComputeConfig::default()
        },
    };
    let scope = config.scope();
    info!(%scope, "Starting compute manager demo");

    let timing = SimTiming {
        visibility_delay: Duration::from_secs(1),
        settle_delay: Duration::from_secs(12),
    };
    let system = CloudSystem::new(timing, config.timeouts());
    let manager = &system.manager;

    for name in SNAPSHOTS {
        system
            .client
            .seed_snapshot(&config.project_id, Snapshot::new(&config.project_id, name, 20))
            .await?;
    }
    let image = Image {
        name: "debian-12".to_string(),
        family: Some("debian".to_string()),
        disk_size_gb: 10,
        self_link: "global/images/debian-12".to_string(),
    };
    system.client.seed_image(&config.project_id, image).await?;
    let images = manager.list_images(&config.project_id).await?;
    info!(count = images.len(), "Images available");

    // Instance lifecycle
    let spec = InstanceSpec::from_template(VM_TEMPLATE, &scope.zone)?;
    let vm = scope.coords(&spec.name);

    let span = tracing::info_span!("vm_lifecycle");
    async {
        manager.new_vm(&scope, spec).await?;
        let created = manager.get_vm(&vm).await?;
        info!(
            nat_ip = created.nat_ip().unwrap_or("none"),
            network_ip = created.network_ip().unwrap_or("none"),
            "VM addresses"
        );

        manager.stop_vm(&vm, &manager.vm_stopped_checker()).await?;
        manager.set_machine_type(&vm, "g1-small").await?;
        manager.start_vm(&vm, &manager.vm_running_checker()).await?;

        let budget = RetryBudget::new(3, Duration::from_secs(2));
        if !manager.confirm_vm_status(&vm, created.status, budget).await {
            warn!("VM status did not hold after restart");
        }
        Ok::<_, ComputeError>(())
    }
    .instrument(span)
    .await?;

    // Disk from the latest snapshot
    let snapshot = manager.latest_snapshot_in(&config.project_id, "p-snap").await?;
    info!(snapshot = %snapshot.name, "Restoring from latest snapshot");
    let disk_spec = DiskSpec::from_snapshot("data-1", snapshot.self_link.clone(), snapshot.disk_size_gb);
    let disk = scope.coords(&disk_spec.name);
    manager
        .new_disk(&scope, disk_spec)
        .instrument(tracing::info_span!("disk_restore"))
        .await?;

    // Tags and groups
    let tags = vec!["https-server".to_string(), "http-server".to_string()];
    manager.attach_tags(&vm, &tags).await?;
    manager.detach_tags(&vm, &tags[1..]).await?;
    info!(tags = ?manager.get_vm(&vm).await?.tags.items, "Tags adjusted");

    let group = scope.coords("web-group");
    manager.add_instances_to_group(&group, &[vm.name.clone()]).await?;
    info!(members = ?system.client.group_members(&group).await?, "Instance group updated");

    // Cleanup
    manager.delete_vm(&vm).await?;
    if !manager
        .delete_disk_with_retry(&disk, RetryBudget::new(5, Duration::from_secs(2)))
        .await
    {
        warn!(disk = %disk, "Disk left behind");
    }

    system.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}
