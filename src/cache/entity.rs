//! Keyed memoization for near-static element metadata.
//!
//! No TTL: names and protocol metadata change rarely enough that capacity is
//! the only bound. When the map outgrows its capacity the least recently
//! touched half is dropped in one batch, which amortizes eviction cost and
//! only needs approximate recency.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::gateway::AnalyticsGateway;
use crate::models::ElementInfo;

/// Caller-supplied fetch operation. `None` means the value could not be
/// obtained; it is reported to the caller but never cached.
pub type EntityFetcher<T> = Box<dyn Fn(i64, i64) -> Option<T> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub owner_id: i64,
    pub element_id: i64,
}

struct EntityRecord<T> {
    value: T,
    /// Last insert or read; drives eviction order.
    touched_at: DateTime<Utc>,
}

pub struct EntityCache<T> {
    max_entries: usize,
    fetch: EntityFetcher<T>,
    entries: Mutex<HashMap<EntityKey, EntityRecord<T>>>,
}

impl<T: Clone> EntityCache<T> {
    /// The fetch operation is injected at construction so tests and hosts
    /// can instantiate isolated caches instead of sharing hidden state.
    pub fn new<F>(max_entries: usize, fetch: F) -> Self
    where
        F: Fn(i64, i64) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            max_entries,
            fetch: Box::new(fetch),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for the key, fetching on a miss.
    ///
    /// A failed fetch is not cached; the next call retries, so a transient
    /// outage cannot poison the map with a permanent unknown.
    pub fn get(&self, owner_id: i64, element_id: i64) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        let key = EntityKey {
            owner_id,
            element_id,
        };

        if let Some(record) = entries.get_mut(&key) {
            record.touched_at = Utc::now();
            return Some(record.value.clone());
        }

        match (self.fetch)(owner_id, element_id) {
            Some(value) => {
                entries.insert(
                    key,
                    EntityRecord {
                        value: value.clone(),
                        touched_at: Utc::now(),
                    },
                );
                if entries.len() > self.max_entries {
                    Self::evict_oldest_half(&mut entries, self.max_entries);
                }
                Some(value)
            }
            None => {
                debug!(owner_id, element_id, "entity fetch failed, not cached");
                None
            }
        }
    }

    /// Pure cache read: refreshes the touch timestamp on a hit, never
    /// fetches.
    pub fn get_cached(&self, owner_id: i64, element_id: i64) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        let key = EntityKey {
            owner_id,
            element_id,
        };
        entries.get_mut(&key).map(|record| {
            record.touched_at = Utc::now();
            record.value.clone()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_oldest_half(entries: &mut HashMap<EntityKey, EntityRecord<T>>, max_entries: usize) {
        let mut by_age: Vec<(EntityKey, DateTime<Utc>)> = entries
            .iter()
            .map(|(key, record)| (*key, record.touched_at))
            .collect();
        by_age.sort_by_key(|(_, touched_at)| *touched_at);

        for (key, _) in by_age.into_iter().take(max_entries / 2) {
            entries.remove(&key);
        }
        debug!(remaining = entries.len(), "entity cache evicted oldest half");
    }
}

impl EntityCache<ElementInfo> {
    /// Cache for element display metadata backed by the analytics gateway.
    /// Gateway failures degrade to `None` so callers can fall back to a
    /// placeholder label instead of aborting the whole view.
    pub fn element_info(gateway: Arc<dyn AnalyticsGateway>, max_entries: usize) -> Self {
        Self::new(max_entries, move |owner_id, element_id| {
            match gateway.fetch_element_info(owner_id, element_id) {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(owner_id, element_id, error = %e, "element info lookup failed");
                    None
                }
            }
        })
    }
}
