use readiness_framework::WaitError;
use std::path::PathBuf;

/// Errors returned by the compute layer.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The resource exists but the request does not apply to its current state.
    #[error("Invalid state for {resource}: {reason}")]
    InvalidState { resource: String, reason: String },

    #[error("No snapshot found matching {prefix:?}")]
    SnapshotNotFound { prefix: String },

    #[error("Invalid instance template: {0}")]
    InvalidTemplate(#[source] serde_json::Error),

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    ConfigParse(#[source] serde_json::Error),

    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    /// An orchestrated operation failed to issue, timed out, or was not verified.
    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("Simulated compute engine closed")]
    SimulatorClosed,

    #[error("Simulated compute engine dropped response channel")]
    SimulatorDropped,

    #[error("Simulated compute engine task failed: {0}")]
    SimulatorFailed(#[from] tokio::task::JoinError),
}

impl ComputeError {
    /// True for errors meaning the resource does not exist (yet).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
