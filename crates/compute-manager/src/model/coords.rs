use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifies a zonal resource (instance, disk, instance group).
///
/// Rendered as `project/zone/name`, which is also the `resource` field of every
/// log line about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneCoords {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl ZoneCoords {
    pub fn new(project: impl Into<String>, zone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    /// The project and zone this resource lives in.
    pub fn scope(&self) -> ZoneScope {
        ZoneScope::new(&self.project, &self.zone)
    }
}

impl Display for ZoneCoords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.name)
    }
}

/// A project and zone, the scope of list and insert calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneScope {
    pub project: String,
    pub zone: String,
}

impl ZoneScope {
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
        }
    }

    /// Coordinates of the resource called `name` in this scope.
    pub fn coords(&self, name: impl Into<String>) -> ZoneCoords {
        ZoneCoords::new(&self.project, &self.zone, name)
    }
}

impl Display for ZoneScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.zone)
    }
}
