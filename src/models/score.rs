use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample of an anomaly-score time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

impl ScorePoint {
    pub fn new(timestamp: DateTime<Utc>, score: f64) -> Self {
        Self { timestamp, score }
    }
}
