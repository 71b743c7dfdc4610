use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle status of a persistent disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiskStatus {
    Creating,
    Restoring,
    Failed,
    Ready,
    Deleting,
}

impl Display for DiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Creating => "CREATING",
            Self::Restoring => "RESTORING",
            Self::Failed => "FAILED",
            Self::Ready => "READY",
            Self::Deleting => "DELETING",
        };
        f.write_str(s)
    }
}

/// A persistent disk as reported by the compute engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    pub zone: String,
    pub size_gb: u64,
    pub status: DiskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_snapshot: Option<String>,
    /// Instances the disk is attached to.
    #[serde(default)]
    pub users: Vec<String>,
}

impl Disk {
    /// Name of the snapshot the disk was restored from: the last segment of
    /// `source_snapshot`.
    pub fn source_snapshot_name(&self) -> Option<&str> {
        self.source_snapshot.as_deref()?.rsplit('/').next()
    }
}

/// Creation request for a disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    pub name: String,
    pub size_gb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_snapshot: Option<String>,
}

impl DiskSpec {
    /// A disk restored from `source_snapshot` (a snapshot name or URI).
    pub fn from_snapshot(name: impl Into<String>, source_snapshot: impl Into<String>, size_gb: u64) -> Self {
        Self {
            name: name.into(),
            size_gb,
            source_snapshot: Some(source_snapshot.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_snapshot_name_is_last_segment() {
        let disk = Disk {
            name: "data-1".into(),
            zone: "us-central1-f".into(),
            size_gb: 10,
            status: DiskStatus::Ready,
            source_snapshot: Some("projects/demo/global/snapshots/p-snap-201503032021".into()),
            users: Vec::new(),
        };
        assert_eq!(disk.source_snapshot_name(), Some("p-snap-201503032021"));

        let blank = Disk {
            source_snapshot: None,
            ..disk
        };
        assert_eq!(blank.source_snapshot_name(), None);
    }
}
