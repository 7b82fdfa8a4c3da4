use serde::{Deserialize, Serialize};

/// Display metadata for a monitored element. Near-static, so it is the
/// typical payload of the entity cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementInfo {
    pub name: String,
    #[serde(rename = "protocolName")]
    pub protocol_name: Option<String>,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
}

impl ElementInfo {
    /// Label shown when a lookup fails and the caller degrades to a
    /// placeholder.
    pub fn placeholder(owner_id: i64, element_id: i64) -> Self {
        Self {
            name: format!("{}/{}", owner_id, element_id),
            protocol_name: None,
            protocol_version: None,
        }
    }
}
