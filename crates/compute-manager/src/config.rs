//! # Configuration
//!
//! [`ComputeConfig`] is read from a JSON file:
//!
//! ```json
//! {
//!     "service_account": "robot@demo.iam.gserviceaccount.com",
//!     "project_id": "demo",
//!     "zone": "asia-east1-a",
//!     "timeouts": {
//!         "vm_running": { "timeout_secs": 300, "interval_secs": 10 },
//!         "disk_ready": { "timeout_secs": 120, "interval_secs": 5, "absent_interval_secs": 10 }
//!     }
//! }
//! ```
//!
//! Every key is optional except `project_id`. Omitted timeouts keep their
//! defaults: 180 s for every kind, polling every 10 s for instances and every
//! 5 s for disks (10 s while the disk does not exist yet).
//!
//! Log verbosity is not part of the file; it comes from `RUST_LOG`.

use crate::error::ComputeError;
use crate::manager::Timeouts;
use crate::model::ZoneScope;
use readiness_framework::WatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    pub service_account: String,
    pub project_id: String,
    pub zone: String,
    pub timeouts: TimeoutsConfig,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            service_account: String::new(),
            project_id: String::new(),
            zone: "us-central1-f".to_string(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

/// Watch overrides per resource kind. An empty entry keeps that kind's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub vm_running: WatchConfig,
    pub vm_stopped: WatchConfig,
    pub disk_ready: WatchConfig,
}

/// One watch policy, in whole seconds. Each omitted key falls back to the
/// default of the kind it configures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Pause while the resource cannot be read yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absent_interval_secs: Option<u64>,
}

impl WatchConfig {
    /// Applies the overrides to `default`.
    ///
    /// Without `absent_interval_secs`, a kind whose default has no separate
    /// absent interval follows the configured `interval_secs`.
    pub fn policy(&self, default: WatchPolicy) -> WatchPolicy {
        let interval = self.interval_secs.map_or(default.interval, Duration::from_secs);
        let timeout = self.timeout_secs.map_or(default.timeout, Duration::from_secs);
        let absent = match self.absent_interval_secs {
            Some(secs) => Duration::from_secs(secs),
            None if default.absent_interval == default.interval => interval,
            None => default.absent_interval,
        };
        WatchPolicy::new(interval, timeout).with_absent_interval(absent)
    }

    fn validate(&self, kind: &str) -> Result<(), ComputeError> {
        if self.timeout_secs == Some(0) {
            return Err(ComputeError::ConfigInvalid(format!("{kind}: timeout_secs must be positive")));
        }
        if self.interval_secs == Some(0) || self.absent_interval_secs == Some(0) {
            return Err(ComputeError::ConfigInvalid(format!("{kind}: intervals must be positive")));
        }
        Ok(())
    }
}

impl ComputeConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json).map_err(ComputeError::ConfigParse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ComputeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), project = %config.project_id, zone = %config.zone, "Config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.project_id.trim().is_empty() {
            return Err(ComputeError::ConfigInvalid("project_id is required".to_string()));
        }
        if self.zone.trim().is_empty() {
            return Err(ComputeError::ConfigInvalid("zone must not be empty".to_string()));
        }
        self.timeouts.vm_running.validate("vm_running")?;
        self.timeouts.vm_stopped.validate("vm_stopped")?;
        self.timeouts.disk_ready.validate("disk_ready")
    }

    /// The project and zone operations default to.
    pub fn scope(&self) -> ZoneScope {
        ZoneScope::new(&self.project_id, &self.zone)
    }

    /// Watch policies with the configured overrides applied.
    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        Timeouts {
            vm_running: self.timeouts.vm_running.policy(defaults.vm_running),
            vm_stopped: self.timeouts.vm_stopped.policy(defaults.vm_stopped),
            disk_ready: self.timeouts.disk_ready.policy(defaults.disk_ready),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_default_timeouts() {
        let config = ComputeConfig::from_json_str(r#"{ "project_id": "demo" }"#).unwrap();

        assert_eq!(config.zone, "us-central1-f");
        assert_eq!(config.timeouts(), Timeouts::default());

        let disk = config.timeouts().disk_ready;
        assert_eq!(disk.timeout, Duration::from_secs(180));
        assert_eq!(disk.interval, Duration::from_secs(5));
        assert_eq!(disk.absent_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides_one_kind() {
        let json = r#"{
            "service_account": "robot@demo.iam.gserviceaccount.com",
            "project_id": "demo",
            "zone": "asia-east1-a",
            "timeouts": { "vm_running": { "timeout_secs": 300, "interval_secs": 15 } }
        }"#;
        let config = ComputeConfig::from_json_str(json).unwrap();

        let running = config.timeouts().vm_running;
        assert_eq!(running.timeout, Duration::from_secs(300));
        assert_eq!(running.interval, Duration::from_secs(15));
        assert_eq!(running.absent_interval, Duration::from_secs(15));
        assert_eq!(config.timeouts().vm_stopped, Timeouts::default().vm_stopped);
        assert_eq!(config.scope(), ZoneScope::new("demo", "asia-east1-a"));
    }

    #[test]
    fn test_single_key_entry_keeps_other_defaults() {
        let json = r#"{
            "project_id": "demo",
            "timeouts": {
                "vm_running": { "timeout_secs": 300 },
                "disk_ready": { "interval_secs": 2 }
            }
        }"#;
        let config = ComputeConfig::from_json_str(json).unwrap();
        let defaults = Timeouts::default();

        let running = config.timeouts().vm_running;
        assert_eq!(running.timeout, Duration::from_secs(300));
        assert_eq!(running.interval, defaults.vm_running.interval);
        assert_eq!(running.absent_interval, defaults.vm_running.absent_interval);

        let disk = config.timeouts().disk_ready;
        assert_eq!(disk.timeout, defaults.disk_ready.timeout);
        assert_eq!(disk.interval, Duration::from_secs(2));
        assert_eq!(disk.absent_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_project_is_rejected() {
        let err = ComputeConfig::from_json_str(r#"{ "service_account": "robot" }"#).unwrap_err();
        assert!(matches!(err, ComputeError::ConfigInvalid(_)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let json = r#"{
            "project_id": "demo",
            "timeouts": { "disk_ready": { "timeout_secs": 60, "interval_secs": 0 } }
        }"#;
        let err = ComputeConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("disk_ready"));
    }

    #[test]
    fn test_malformed_json() {
        let err = ComputeConfig::from_json_str("{ project_id: demo }").unwrap_err();
        assert!(matches!(err, ComputeError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("compute-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "project_id": "demo", "zone": "europe-west1-b" }"#).unwrap();

        let config = ComputeConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.zone, "europe-west1-b");

        let err = ComputeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ComputeError::ConfigRead { .. }));
    }
}
