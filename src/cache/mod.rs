//! In-memory caches between the query surfaces and the analytics engine.
//!
//! Three caches with deliberately different policies:
//!
//! - `EntityCache`: keyed by `(owner_id, element_id)`, no TTL, batch
//!   half-eviction by last touch. For near-static element metadata.
//! - `AnomalyListCache`: one anomaly list per user identity, 5 minute TTL,
//!   single-oldest FIFO eviction.
//! - `ScoreSeriesCache`: one score series per `(identity, owner, group,
//!   subgroup)`, answers sub-range queries by subsumption, same TTL and
//!   FIFO eviction as the list cache.
//!
//! Each instance owns one coarse lock held across the whole get-or-fetch
//! sequence, remote round-trip included. A second caller for an overlapping
//! range blocks instead of triggering a duplicate fetch.
//!
//! Every per-user operation filters by the caller's identity; a cached
//! result is never reused across identities, even for identical query
//! parameters.

pub mod anomalies;
pub mod entity;
pub mod scores;

use thiserror::Error;

use crate::gateway::GatewayError;

pub use anomalies::AnomalyListCache;
pub use entity::{EntityCache, EntityKey};
pub use scores::{ScoreKey, ScoreSeriesCache};

/// The one failure kind the caches surface. Failures are never cached, so
/// the next call retries the engine unconditionally.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("communication with the analytics engine failed")]
    Communication(#[source] GatewayError),
}
