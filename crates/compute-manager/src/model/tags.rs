//! Network tags of an instance.
//!
//! Tags are replaced as a whole: a caller reads the current [`Tags`], computes
//! the new item list with [`append_tags`] or [`remove_tags`], and submits it
//! together with the fingerprint it read. A stale fingerprint is rejected by the
//! compute engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub items: Vec<String>,
    /// Opaque version of `items`, issued by the compute engine.
    #[serde(default)]
    pub fingerprint: String,
}

/// Appends every added tag to `current`, keeping duplicates.
pub fn append_tags(current: &[String], added: &[String]) -> Vec<String> {
    current.iter().chain(added).cloned().collect()
}

/// Drops every occurrence of every removed tag from `current`.
pub fn remove_tags(current: &[String], removed: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|tag| !removed.contains(tag))
        .cloned()
        .collect()
}
