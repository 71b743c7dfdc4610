//! Snapshots and latest-snapshot selection.
//!
//! Snapshot names are expected to embed a fixed-width, zero-padded timestamp
//! (`p-snap-201503032021`), so the lexicographically greatest name is the most
//! recent. Nothing checks that convention: names that break it select the wrong
//! snapshot.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub disk_size_gb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_disk: Option<String>,
    #[serde(default)]
    pub self_link: String,
}

impl Snapshot {
    pub fn new(project: &str, name: impl Into<String>, disk_size_gb: u64) -> Self {
        let name = name.into();
        Self {
            self_link: format!("projects/{project}/global/snapshots/{name}"),
            name,
            disk_size_gb,
            source_disk: None,
        }
    }
}

/// Returns the snapshot with the greatest name among those whose name contains
/// `prefix` anywhere (the match is not anchored).
pub fn latest_snapshot<'a>(prefix: &str, snapshots: &'a [Snapshot]) -> Result<&'a Snapshot, ComputeError> {
    let latest = snapshots
        .iter()
        .filter(|s| s.name.contains(prefix))
        .max_by(|a, b| a.name.cmp(&b.name));

    match latest {
        Some(snapshot) => {
            trace!(prefix, snapshot = %snapshot.name, "Latest snapshot found");
            Ok(snapshot)
        }
        None => {
            warn!(prefix, candidates = snapshots.len(), "No snapshot found");
            Err(ComputeError::SnapshotNotFound {
                prefix: prefix.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots(names: &[&str]) -> Vec<Snapshot> {
        names.iter().map(|n| Snapshot::new("demo", *n, 10)).collect()
    }

    #[test]
    fn test_latest_is_greatest_name() {
        let all = snapshots(&["p-snap-201502161516", "p-snap-201503032021", "p-snap-201502131103"]);
        assert_eq!(latest_snapshot("p", &all).unwrap().name, "p-snap-201503032021");
    }

    #[test]
    fn test_prefix_match_is_unanchored() {
        let all = snapshots(&["web-snap-201501010000", "db-snap-201412310000", "db-snap-201501020000"]);
        assert_eq!(latest_snapshot("db", &all).unwrap().name, "db-snap-201501020000");
        // "snap" occurs in every name.
        assert_eq!(latest_snapshot("snap", &all).unwrap().name, "web-snap-201501010000");
    }

    #[test]
    fn test_no_match_is_an_error() {
        let all = snapshots(&["p-snap-201502131103"]);
        let err = latest_snapshot("q", &all).unwrap_err();
        assert!(matches!(err, ComputeError::SnapshotNotFound { ref prefix } if prefix == "q"));
        assert!(latest_snapshot("p", &[]).is_err());
    }
}
