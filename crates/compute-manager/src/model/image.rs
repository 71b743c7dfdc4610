use serde::{Deserialize, Serialize};

/// A boot image available to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default)]
    pub disk_size_gb: u64,
    #[serde(default)]
    pub self_link: String,
}
