//! # Instances
//!
//! [`Instance`] is a virtual machine as the compute engine reports it;
//! [`InstanceSpec`] is what a caller submits to create one. Field names follow the
//! engine's JSON (camelCase, with `networkIP` / `natIP` spelled as the engine
//! spells them), so a spec can be loaded straight from a JSON template.

use crate::error::ComputeError;
use crate::model::Tags;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle status of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Provisioning,
    Staging,
    Running,
    Stopping,
    Suspending,
    Suspended,
    Repairing,
    Terminated,
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Provisioning => "PROVISIONING",
            Self::Staging => "STAGING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Suspending => "SUSPENDING",
            Self::Suspended => "SUSPENDED",
            Self::Repairing => "REPAIRING",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "natIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub network: String,
    #[serde(rename = "networkIP", default, skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u64>,
}

/// A disk attached to an instance: either an existing disk (`source`) or one
/// created with the instance (`initialize_params`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub boot: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize_params: Option<InitializeParams>,
}

impl AttachedDisk {
    /// Name of the existing disk this attachment refers to, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().and_then(|uri| uri.rsplit('/').next())
    }
}

/// A virtual machine as reported by the compute engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    pub zone: String,
    pub machine_type: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl Instance {
    /// External address of the first access config of the first interface.
    pub fn nat_ip(&self) -> Option<&str> {
        self.network_interfaces
            .first()?
            .access_configs
            .first()?
            .nat_ip
            .as_deref()
    }

    /// Internal address of the first interface.
    pub fn network_ip(&self) -> Option<&str> {
        self.network_interfaces.first()?.network_ip.as_deref()
    }
}

/// Creation request for an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    pub name: String,
    pub machine_type: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl InstanceSpec {
    /// Builds a spec from a JSON template, substituting every `{zone}`
    /// placeholder first.
    ///
    /// ```rust
    /// use compute_manager::model::InstanceSpec;
    ///
    /// let template = r#"{
    ///     "name": "web-1",
    ///     "machineType": "zones/{zone}/machineTypes/n1-standard-1"
    /// }"#;
    /// let spec = InstanceSpec::from_template(template, "asia-east1-a").unwrap();
    /// assert_eq!(spec.machine_type, "zones/asia-east1-a/machineTypes/n1-standard-1");
    /// ```
    pub fn from_template(template: &str, zone: &str) -> Result<Self, ComputeError> {
        let rendered = template.replace("{zone}", zone);
        serde_json::from_str(&rendered).map_err(ComputeError::InvalidTemplate)
    }
}

/// Replaces the last path segment of a machine type URI with `target`.
///
/// `zones/z/machineTypes/n1-standard-1` becomes `zones/z/machineTypes/<target>`.
/// A URI without a `/` is replaced entirely.
pub fn patch_machine_type(machine_type: &str, target: &str) -> String {
    match machine_type.rsplit_once('/') {
        Some((prefix, _)) => format!("{prefix}/{target}"),
        None => target.to_string(),
    }
}
