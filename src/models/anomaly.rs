use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single detected relational anomaly as reported by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(rename = "ownerId")]
    pub owner_id: i64,
    #[serde(rename = "groupName")]
    pub group_name: String,
    #[serde(rename = "subgroupId")]
    pub subgroup_id: Option<i64>,
    #[serde(rename = "subgroupName")]
    pub subgroup_name: Option<String>,
    #[serde(rename = "anomalyType")]
    pub anomaly_type: String,
    pub score: f64,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
}

impl AnomalyRecord {
    /// Whether the engine still considers this anomaly in progress.
    pub fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }
}
