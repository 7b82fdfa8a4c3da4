//! Gateway to the remote relational anomaly detection engine.
//!
//! The caches never talk to the engine directly; they go through the
//! `AnalyticsGateway` trait so tests can substitute a scripted gateway and
//! hosts can swap the transport. `HttpGateway` is the production
//! implementation against the engine's REST facade.
//!
//! Score-series queries can be addressed three ways, not all of which every
//! engine version understands. `SeriesShape` makes the addressing mode an
//! explicit value so the score cache can walk its fallback chain without
//! exception-driven control flow.

pub mod client;
pub mod error;

use chrono::{DateTime, Utc};

use crate::models::{AnomalyRecord, ElementInfo, ScorePoint};

pub use client::HttpGateway;
pub use error::GatewayError;

/// Addressing mode for a score-series query, in fallback priority order:
/// subgroup id, then subgroup name, then the whole-group aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesShape {
    BySubgroupId {
        owner_id: i64,
        group_name: String,
        subgroup_id: i64,
    },
    BySubgroupName {
        owner_id: i64,
        group_name: String,
        subgroup_name: String,
    },
    WholeGroup {
        owner_id: i64,
        group_name: String,
    },
}

impl std::fmt::Display for SeriesShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesShape::BySubgroupId { subgroup_id, .. } => {
                write!(f, "subgroup id {}", subgroup_id)
            }
            SeriesShape::BySubgroupName { subgroup_name, .. } => {
                write!(f, "subgroup name {:?}", subgroup_name)
            }
            SeriesShape::WholeGroup { group_name, .. } => {
                write!(f, "whole group {:?}", group_name)
            }
        }
    }
}

/// Remote analytics engine, as seen by the cache layer.
///
/// One call per cache miss or refresh; implementations are expected to block
/// for the round-trip. A shape the engine cannot answer must come back as
/// `GatewayError::UnsupportedShape`, anything else is a hard failure.
pub trait AnalyticsGateway: Send + Sync {
    /// All anomalies detected inside the given window.
    fn fetch_anomalies(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<AnomalyRecord>, GatewayError>;

    /// Anomaly-score samples for one group or subgroup, ascending by
    /// timestamp.
    fn fetch_score_series(
        &self,
        shape: &SeriesShape,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScorePoint>, GatewayError>;

    /// Display metadata for a monitored element.
    fn fetch_element_info(
        &self,
        owner_id: i64,
        element_id: i64,
    ) -> Result<ElementInfo, GatewayError>;
}
