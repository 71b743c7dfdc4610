use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The kind of mutation an [`Operation`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Insert,
    Delete,
    Start,
    Stop,
    Reset,
    SetMachineType,
    SetTags,
    AddInstances,
}

/// Handle returned by the compute engine for an accepted mutation.
///
/// Acceptance says nothing about completion; the resource catches up later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    /// Rendered coordinates of the resource the operation acts on.
    pub target: String,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?} {})", self.name, self.kind, self.target)
    }
}
