//! Cache tuning knobs.
//!
//! The defaults reproduce the platform's shipped behavior; host applications
//! can deserialize a `CacheConfig` from their own settings store to override
//! them (for instance to shrink capacities in integration environments).

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Consider a list or score entry stale after 5 minutes.
const DEFAULT_TTL_MINUTES: i64 = 5;

/// Entries held per cache instance. Small on purpose: each entry can carry a
/// full 7-day score series.
const DEFAULT_MAX_ENTRIES: usize = 5;

/// How far back a coalesced score fetch reaches beyond the asked-for range.
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Slack applied to the subsumption test so near-miss windows from sliding
/// trend views still count as hits.
const DEFAULT_TOLERANCE_MINUTES: i64 = 5;

/// Trailing window fetched for the anomaly list.
const DEFAULT_ANOMALY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "ttlMinutes")]
    pub ttl_minutes: i64,
    #[serde(rename = "maxEntries")]
    pub max_entries: usize,
    #[serde(rename = "lookbackDays")]
    pub lookback_days: i64,
    #[serde(rename = "toleranceMinutes")]
    pub tolerance_minutes: i64,
    #[serde(rename = "anomalyWindowDays")]
    pub anomaly_window_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_TTL_MINUTES,
            max_entries: DEFAULT_MAX_ENTRIES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            anomaly_window_days: DEFAULT_ANOMALY_WINDOW_DAYS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }

    pub fn lookback(&self) -> Duration {
        Duration::days(self.lookback_days)
    }

    pub fn tolerance(&self) -> Duration {
        Duration::minutes(self.tolerance_minutes)
    }

    pub fn anomaly_window(&self) -> Duration {
        Duration::days(self.anomaly_window_days)
    }
}
