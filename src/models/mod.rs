//! Data models exchanged with the relational anomaly detection engine.
//!
//! - `AnomalyRecord`: a detected anomaly on a parameter group or subgroup
//! - `ScorePoint`: one sample of an anomaly-score time series
//! - `ElementInfo`: near-static display metadata for a monitored element

pub mod anomaly;
pub mod element;
pub mod score;

pub use anomaly::AnomalyRecord;
pub use element::ElementInfo;
pub use score::ScorePoint;
