//! Range-aware cache for anomaly-score time series.
//!
//! A live trend view slides its window a few seconds at a time; refetching
//! the series for every slide would hammer the engine. Instead each miss
//! fetches a window widened to 7 days back and up to now, and later queries
//! that fall inside a stored window (with 5 minutes of slack for clock and
//! alignment jitter) are answered from memory with a sub-slice.
//!
//! Older engine versions cannot address a series every way, so a miss walks
//! the addressing modes in priority order: subgroup id, subgroup name,
//! whole-group aggregate. Only an explicit "shape unsupported" answer
//! advances the walk; real failures abort it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::CacheConfig;
use crate::gateway::{AnalyticsGateway, GatewayError, SeriesShape};
use crate::models::ScorePoint;

use super::CacheError;

/// Identity of one cached series. Equality includes the user identity, so a
/// lookup can never cross user boundaries by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreKey {
    pub identity: String,
    pub owner_id: i64,
    pub group_name: String,
    pub subgroup_name: Option<String>,
    pub subgroup_id: Option<i64>,
}

impl ScoreKey {
    /// Whole-group query, no subgroup addressing.
    pub fn group(identity: impl Into<String>, owner_id: i64, group_name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            owner_id,
            group_name: group_name.into(),
            subgroup_name: None,
            subgroup_id: None,
        }
    }

    /// Addressing modes to try for this key, most specific first.
    fn shapes(&self) -> Vec<SeriesShape> {
        let mut shapes = Vec::new();
        if let Some(subgroup_id) = self.subgroup_id {
            shapes.push(SeriesShape::BySubgroupId {
                owner_id: self.owner_id,
                group_name: self.group_name.clone(),
                subgroup_id,
            });
        }
        if let Some(ref subgroup_name) = self.subgroup_name {
            shapes.push(SeriesShape::BySubgroupName {
                owner_id: self.owner_id,
                group_name: self.group_name.clone(),
                subgroup_name: subgroup_name.clone(),
            });
        }
        shapes.push(SeriesShape::WholeGroup {
            owner_id: self.owner_id,
            group_name: self.group_name.clone(),
        });
        shapes
    }
}

struct SeriesEntry {
    key: ScoreKey,
    cached_at: DateTime<Utc>,
    /// Full coalesced window actually fetched; may be much wider than any
    /// single caller's query.
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    /// Ascending by timestamp; replaced wholesale on refresh, never appended.
    series: Vec<ScorePoint>,
}

pub struct ScoreSeriesCache {
    gateway: Arc<dyn AnalyticsGateway>,
    config: CacheConfig,
    /// Insertion order is the eviction order.
    entries: Mutex<Vec<SeriesEntry>>,
}

impl ScoreSeriesCache {
    pub fn new(gateway: Arc<dyn AnalyticsGateway>, config: CacheConfig) -> Self {
        Self {
            gateway,
            config,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Score samples for `[start, end]`, served from a stored series when one
    /// subsumes the range, fetched otherwise. `skip_cache` forces a refetch
    /// (used by the explicit refresh action in the UI).
    ///
    /// The whole check-fetch-store sequence runs under the instance lock, so
    /// concurrent callers for overlapping ranges block on one fetch instead
    /// of issuing duplicates.
    pub fn get(
        &self,
        key: &ScoreKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        skip_cache: bool,
    ) -> Result<Vec<ScorePoint>, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let ttl = self.config.ttl();
        let tolerance = self.config.tolerance();

        if !skip_cache {
            if let Some(entry) = entries.iter().find(|e| {
                e.key == *key
                    && now - e.cached_at <= ttl
                    && start >= e.window_start - tolerance
                    && end <= e.window_end + tolerance
            }) {
                debug!(
                    identity = %key.identity,
                    group = %key.group_name,
                    "score series served from cache"
                );
                return Ok(Self::slice(&entry.series, start, end));
            }
        }

        // Coalesce: fetch back to the 7-day horizon and forward to now, so
        // the next slide of the trend window lands inside the stored range.
        let window_start = start.min(now - self.config.lookback());
        let window_end = end.max(now);
        let series = self.fetch_with_fallback(key, window_start, window_end)?;

        entries.retain(|e| e.key != *key && now - e.cached_at <= ttl);
        if entries.len() >= self.config.max_entries {
            let evicted = entries.remove(0);
            debug!(
                identity = %evicted.key.identity,
                group = %evicted.key.group_name,
                "score cache full, evicted oldest entry"
            );
        }

        let result = Self::slice(&series, start, end);
        entries.push(SeriesEntry {
            key: key.clone(),
            cached_at: now,
            window_start,
            window_end,
            series,
        });

        Ok(result)
    }

    /// Walk the addressing modes until one answers. "Shape unsupported" is
    /// an expected condition and moves to the next mode; anything else is a
    /// hard failure. Exhausting the chain is reported as a communication
    /// failure like any other fetch problem.
    fn fetch_with_fallback(
        &self,
        key: &ScoreKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScorePoint>, CacheError> {
        let mut last_refusal = None;
        for shape in key.shapes() {
            match self.gateway.fetch_score_series(&shape, start, end) {
                Ok(mut series) => {
                    series.sort_by_key(|point| point.timestamp);
                    debug!(shape = %shape, points = series.len(), "score series fetched");
                    return Ok(series);
                }
                Err(GatewayError::UnsupportedShape(reason)) => {
                    debug!(shape = %shape, reason = %reason, "shape refused, trying next");
                    last_refusal = Some(GatewayError::UnsupportedShape(reason));
                }
                Err(e) => return Err(CacheError::Communication(e)),
            }
        }
        Err(CacheError::Communication(last_refusal.unwrap_or_else(
            || GatewayError::UnsupportedShape("no addressing mode accepted".to_string()),
        )))
    }

    fn slice(series: &[ScorePoint], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<ScorePoint> {
        series
            .iter()
            .filter(|point| point.timestamp >= start && point.timestamp <= end)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Duration;

    use crate::models::{AnomalyRecord, ElementInfo};

    use super::*;

    /// Gateway serving one fixed series, with per-shape refusal switches and
    /// a log of every shape it was asked for.
    struct ScriptedGateway {
        series: Vec<ScorePoint>,
        refuse_subgroup_id: bool,
        refuse_subgroup_name: bool,
        refuse_whole_group: bool,
        hard_fail: AtomicBool,
        calls: Mutex<Vec<SeriesShape>>,
    }

    impl ScriptedGateway {
        fn new(series: Vec<ScorePoint>) -> Self {
            Self {
                series,
                refuse_subgroup_id: false,
                refuse_subgroup_name: false,
                refuse_whole_group: false,
                hard_fail: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl AnalyticsGateway for ScriptedGateway {
        fn fetch_anomalies(
            &self,
            _window_start: DateTime<Utc>,
            _window_end: DateTime<Utc>,
        ) -> Result<Vec<AnomalyRecord>, GatewayError> {
            unreachable!("not used by the score cache")
        }

        fn fetch_score_series(
            &self,
            shape: &SeriesShape,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ScorePoint>, GatewayError> {
            self.calls.lock().unwrap().push(shape.clone());
            if self.hard_fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Engine("engine restarting".to_string()));
            }
            let refused = match shape {
                SeriesShape::BySubgroupId { .. } => self.refuse_subgroup_id,
                SeriesShape::BySubgroupName { .. } => self.refuse_subgroup_name,
                SeriesShape::WholeGroup { .. } => self.refuse_whole_group,
            };
            if refused {
                return Err(GatewayError::UnsupportedShape(format!(
                    "cannot address {}",
                    shape
                )));
            }
            Ok(self.series.clone())
        }

        fn fetch_element_info(
            &self,
            _owner_id: i64,
            _element_id: i64,
        ) -> Result<ElementInfo, GatewayError> {
            unreachable!("not used by the score cache")
        }
    }

    fn subgroup_key(identity: &str) -> ScoreKey {
        ScoreKey {
            identity: identity.to_string(),
            owner_id: 7,
            group_name: "edge-routers".to_string(),
            subgroup_name: Some("rack-12".to_string()),
            subgroup_id: Some(3),
        }
    }

    /// One sample per hour over the last `hours` hours.
    fn hourly_series(hours: i64) -> Vec<ScorePoint> {
        let now = Utc::now();
        (0..hours)
            .rev()
            .map(|h| ScorePoint::new(now - Duration::hours(h), 0.1 * h as f64))
            .collect()
    }

    fn backdate(cache: &ScoreSeriesCache, key: &ScoreKey, age: Duration) {
        let mut entries = cache.entries.lock().unwrap();
        let entry = entries.iter_mut().find(|e| e.key == *key).unwrap();
        entry.cached_at = Utc::now() - age;
    }

    fn small_config(max_entries: usize) -> CacheConfig {
        CacheConfig {
            max_entries,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn test_subsumed_range_served_without_fetch() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(48)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = subgroup_key("alice");
        let now = Utc::now();

        cache
            .get(&key, now - Duration::hours(24), now, false)
            .unwrap();
        assert_eq!(gateway.call_count(), 1);

        // Narrower range inside the stored window: no second fetch.
        let inner = cache
            .get(
                &key,
                now - Duration::hours(12),
                now - Duration::hours(1),
                false,
            )
            .unwrap();
        assert_eq!(gateway.call_count(), 1);
        assert!(!inner.is_empty());
        assert!(inner
            .iter()
            .all(|p| p.timestamp >= now - Duration::hours(12)
                && p.timestamp <= now - Duration::hours(1)));
    }

    #[test]
    fn test_range_outside_tolerance_refetches_with_coalesced_window() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(48)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = subgroup_key("alice");
        let now = Utc::now();

        cache
            .get(&key, now - Duration::hours(2), now - Duration::hours(1), false)
            .unwrap();

        // Asking 10 minutes past the stored window end, outside the 5-minute
        // tolerance: exactly one refetch.
        cache
            .get(&key, now - Duration::hours(1), now + Duration::minutes(10), false)
            .unwrap();
        assert_eq!(gateway.call_count(), 2);

        // The replacement entry stores the widened window, not the ask.
        let entries = cache.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].window_start <= now - Duration::days(6));
        assert!(entries[0].window_end >= now + Duration::minutes(10));
    }

    #[test]
    fn test_query_start_before_lookback_widens_the_window() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(4)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = subgroup_key("alice");
        let now = Utc::now();

        let start = now - Duration::days(30);
        cache.get(&key, start, now, false).unwrap();

        let entries = cache.entries.lock().unwrap();
        assert!(entries[0].window_start <= start);
        assert!(entries[0].window_end >= now);
    }

    #[test]
    fn test_skip_cache_forces_refetch() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = subgroup_key("alice");
        let now = Utc::now();

        cache.get(&key, now - Duration::hours(6), now, false).unwrap();
        cache.get(&key, now - Duration::hours(6), now, true).unwrap();
        assert_eq!(gateway.call_count(), 2);
        // Still one entry for the key after the forced refresh.
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_expired_entry_refetches() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = subgroup_key("alice");
        let now = Utc::now();

        cache.get(&key, now - Duration::hours(6), now, false).unwrap();
        backdate(&cache, &key, Duration::minutes(6));

        cache.get(&key, now - Duration::hours(6), now, false).unwrap();
        assert_eq!(gateway.call_count(), 2);
    }

    #[test]
    fn test_identities_never_share_series() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let now = Utc::now();

        cache
            .get(&subgroup_key("alice"), now - Duration::hours(6), now, false)
            .unwrap();
        // Identical parameters under a different identity: separate fetch,
        // separate entry.
        cache
            .get(&subgroup_key("bob"), now - Duration::hours(6), now, false)
            .unwrap();

        assert_eq!(gateway.call_count(), 2);
        assert_eq!(cache.entries.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_subgroup_id_shape_is_probed_first_and_name_answers() {
        let mut gateway = ScriptedGateway::new(hourly_series(24));
        gateway.refuse_subgroup_id = true;
        let gateway = Arc::new(gateway);
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let now = Utc::now();

        let series = cache
            .get(&subgroup_key("alice"), now - Duration::hours(6), now, false)
            .unwrap();
        assert!(!series.is_empty());

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], SeriesShape::BySubgroupId { .. }));
        assert!(matches!(calls[1], SeriesShape::BySubgroupName { .. }));
    }

    #[test]
    fn test_whole_group_key_skips_subgroup_shapes() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let key = ScoreKey::group("alice", 7, "edge-routers");
        let now = Utc::now();

        cache.get(&key, now - Duration::hours(6), now, false).unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], SeriesShape::WholeGroup { .. }));
    }

    #[test]
    fn test_every_shape_refused_surfaces_communication_failure() {
        let mut gateway = ScriptedGateway::new(hourly_series(24));
        gateway.refuse_subgroup_id = true;
        gateway.refuse_subgroup_name = true;
        gateway.refuse_whole_group = true;
        let gateway = Arc::new(gateway);
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let now = Utc::now();

        let err = cache
            .get(&subgroup_key("alice"), now - Duration::hours(6), now, false)
            .unwrap_err();
        assert!(matches!(err, CacheError::Communication(_)));
        assert_eq!(gateway.call_count(), 3);
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hard_failure_aborts_the_fallback_chain() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        gateway.hard_fail.store(true, Ordering::SeqCst);
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());
        let now = Utc::now();

        let err = cache
            .get(&subgroup_key("alice"), now - Duration::hours(6), now, false)
            .unwrap_err();
        assert!(matches!(err, CacheError::Communication(_)));
        // No fallback probing after a real failure.
        assert_eq!(gateway.call_count(), 1);
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest_inserted_key() {
        let gateway = Arc::new(ScriptedGateway::new(hourly_series(24)));
        let cache = ScoreSeriesCache::new(gateway.clone(), small_config(2));
        let now = Utc::now();

        cache
            .get(&subgroup_key("alice"), now - Duration::hours(6), now, false)
            .unwrap();
        cache
            .get(&subgroup_key("bob"), now - Duration::hours(6), now, false)
            .unwrap();
        cache
            .get(&subgroup_key("carol"), now - Duration::hours(6), now, false)
            .unwrap();

        let entries = cache.entries.lock().unwrap();
        let identities: Vec<&str> = entries.iter().map(|e| e.key.identity.as_str()).collect();
        assert_eq!(identities, vec!["bob", "carol"]);
    }

    #[test]
    fn test_slice_bounds_are_inclusive() {
        let now = Utc::now();
        let series = vec![
            ScorePoint::new(now - Duration::minutes(20), 0.1),
            ScorePoint::new(now - Duration::minutes(10), 0.2),
            ScorePoint::new(now, 0.3),
        ];
        let sliced =
            ScoreSeriesCache::slice(&series, now - Duration::minutes(20), now - Duration::minutes(10));
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced[0].score, 0.1);
        assert_eq!(sliced[1].score, 0.2);
    }

    #[test]
    fn test_fetched_series_is_stored_sorted() {
        let now = Utc::now();
        // Engine answer arrives out of order.
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScorePoint::new(now - Duration::minutes(5), 0.2),
            ScorePoint::new(now - Duration::minutes(15), 0.1),
            ScorePoint::new(now - Duration::minutes(1), 0.3),
        ]));
        let cache = ScoreSeriesCache::new(gateway.clone(), CacheConfig::default());

        let series = cache
            .get(&subgroup_key("alice"), now - Duration::hours(1), now, false)
            .unwrap();
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
