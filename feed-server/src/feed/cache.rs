//! Concurrent arrival cache.
//!
//! The single shared resource of the pipeline: the fetcher is its one
//! writer, every HTTP handler and the broadcast hub are readers.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::arrival::Arrival;

struct Inner {
    arrivals: HashMap<String, Vec<Arrival>>,
    updated_at: Option<Instant>,
}

/// Latest arrival list per stop, plus a cache-global freshness stamp.
pub struct ArrivalCache {
    inner: RwLock<Inner>,
    stale_after: Duration,
}

impl ArrivalCache {
    /// Create an empty cache. `stale_after` must exceed the poll
    /// interval or ordinary jitter will look like staleness.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                arrivals: HashMap::new(),
                updated_at: None,
            }),
            stale_after,
        }
    }

    /// Merge one poll cycle's results in.
    ///
    /// Every stop present in `fresh` has its list replaced (sorted
    /// ascending by minutes); stops absent from `fresh` are untouched,
    /// so a feed that failed this cycle keeps its previous entries.
    /// The freshness stamp advances even for an empty map: an empty
    /// successful cycle still proves liveness.
    pub async fn update(&self, fresh: HashMap<String, Vec<Arrival>>) {
        let mut inner = self.inner.write().await;
        for (stop_id, mut list) in fresh {
            list.sort_by_key(|a| a.minutes);
            inner.arrivals.insert(stop_id, list);
        }
        inner.updated_at = Some(Instant::now());
    }

    /// Union of the requested stops' arrivals, sorted ascending by
    /// minutes. Unknown ids and an empty set yield an empty list,
    /// never an error.
    pub async fn get_for_stops(&self, stops: &HashSet<String>) -> Vec<Arrival> {
        let inner = self.inner.read().await;
        let mut result: Vec<Arrival> = stops
            .iter()
            .filter_map(|stop_id| inner.arrivals.get(stop_id))
            .flatten()
            .cloned()
            .collect();
        result.sort_by_key(|a| a.minutes);
        result
    }

    /// Every cached arrival across all stops, sorted ascending by minutes.
    pub async fn get_all(&self) -> Vec<Arrival> {
        let inner = self.inner.read().await;
        let mut result: Vec<Arrival> = inner.arrivals.values().flatten().cloned().collect();
        result.sort_by_key(|a| a.minutes);
        result
    }

    /// True when the cache has never been updated or the last update
    /// is older than the staleness threshold.
    pub async fn is_stale(&self) -> bool {
        let inner = self.inner.read().await;
        match inner.updated_at {
            Some(updated_at) => updated_at.elapsed() > self.stale_after,
            None => true,
        }
    }
}
