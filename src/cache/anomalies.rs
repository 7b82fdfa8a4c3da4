//! Per-user cache for the anomaly list view.
//!
//! The list view polls; without this cache every poll would be a full
//! 30-day fetch. One entry per identity, fresh for 5 minutes, and the
//! oldest-inserted entry makes room when a sixth user shows up.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::CacheConfig;
use crate::gateway::AnalyticsGateway;
use crate::models::AnomalyRecord;

use super::CacheError;

struct ListEntry {
    identity: String,
    fetched_at: DateTime<Utc>,
    anomalies: Vec<AnomalyRecord>,
}

pub struct AnomalyListCache {
    gateway: Arc<dyn AnalyticsGateway>,
    config: CacheConfig,
    /// Insertion order is the eviction order.
    entries: Mutex<Vec<ListEntry>>,
}

impl AnomalyListCache {
    pub fn new(gateway: Arc<dyn AnalyticsGateway>, config: CacheConfig) -> Self {
        Self {
            gateway,
            config,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Anomalies over the trailing window for this identity, fetched at most
    /// once per TTL.
    ///
    /// A gateway failure surfaces as `CacheError::Communication` and leaves
    /// the cache untouched, so the next call retries.
    pub fn get(&self, identity: &str) -> Result<Vec<AnomalyRecord>, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let ttl = self.config.ttl();

        if let Some(entry) = entries
            .iter()
            .find(|e| e.identity == identity && now <= e.fetched_at + ttl)
        {
            debug!(identity, count = entry.anomalies.len(), "anomaly list served from cache");
            return Ok(entry.anomalies.clone());
        }

        let window_start = now - self.config.anomaly_window();
        let anomalies = self
            .gateway
            .fetch_anomalies(window_start, now)
            .map_err(CacheError::Communication)?;
        debug!(identity, count = anomalies.len(), "anomaly list fetched");

        // One live entry per identity: any previous entry for this user goes,
        // along with every expired entry regardless of owner.
        entries.retain(|e| e.identity != identity && now <= e.fetched_at + ttl);
        if entries.len() >= self.config.max_entries {
            let evicted = entries.remove(0);
            debug!(identity = %evicted.identity, "anomaly list cache full, evicted oldest entry");
        }
        entries.push(ListEntry {
            identity: identity.to_string(),
            fetched_at: now,
            anomalies: anomalies.clone(),
        });

        Ok(anomalies)
    }
}
