//! Fan-out of cache updates to streaming subscribers.
//!
//! The fetcher raises a coalescing `Notify` signal after each cycle;
//! the hub's run loop re-derives every subscriber's filtered view from
//! the cache and pushes it onto that subscriber's bounded queue. A full
//! queue drops the frame for that subscriber only — a slow client loses
//! intermediate updates, it never stalls the loop or its peers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, watch};
use tracing::{debug, info};

use crate::feed::{Arrival, ArrivalCache};

/// Frames buffered per subscriber before pushes start being dropped.
const OUTBOUND_QUEUE_CAPACITY: usize = 8;

struct Subscriber {
    stops: HashSet<String>,
    tx: mpsc::Sender<Vec<Arrival>>,
}

type Registry = Arc<Mutex<HashMap<u64, Subscriber>>>;

/// Distributes cache-derived arrival views to live subscribers.
pub struct BroadcastHub {
    cache: Arc<ArrivalCache>,
    signal: Arc<Notify>,
    registry: Registry,
    next_id: AtomicU64,
}

impl BroadcastHub {
    /// Create a hub over `cache`, woken by `signal` (shared with the
    /// fetcher).
    pub fn new(cache: Arc<ArrivalCache>, signal: Arc<Notify>) -> Self {
        Self {
            cache,
            signal,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a subscriber interested in `stops`.
    ///
    /// An empty set means interested in nothing, matching the pull
    /// path's semantics for an explicit empty filter. The current
    /// filtered cache view is enqueued immediately so a new subscriber
    /// never waits a full poll interval for first data.
    pub async fn subscribe(&self, stops: HashSet<String>) -> Subscription {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        // Initial push; the channel is fresh so this cannot be full.
        let initial = self.cache.get_for_stops(&stops).await;
        let _ = tx.try_send(initial);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.registry).insert(id, Subscriber { stops, tx });
        debug!(subscriber = id, "subscriber registered");

        Subscription {
            id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Drain broadcast signals until shutdown.
    ///
    /// On shutdown the registry is cleared, which closes every
    /// subscriber's queue and ends their streams.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.signal.notified() => self.broadcast().await,
                _ = shutdown.changed() => {
                    info!("broadcast hub shutting down");
                    lock(&self.registry).clear();
                    return;
                }
            }
        }
    }

    /// Push each registered subscriber its current filtered view.
    async fn broadcast(&self) {
        // Snapshot outside the cache reads; register/unregister must not
        // block on a broadcast in progress.
        let snapshot: Vec<(u64, HashSet<String>, mpsc::Sender<Vec<Arrival>>)> = lock(&self.registry)
            .iter()
            .map(|(id, s)| (*id, s.stops.clone(), s.tx.clone()))
            .collect();

        for (id, stops, tx) in snapshot {
            let view = self.cache.get_for_stops(&stops).await;
            match tx.try_send(view) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = id, "outbound queue full, dropping frame");
                }
                // Receiver already gone; its Drop guard unregisters it.
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

fn lock(registry: &Mutex<HashMap<u64, Subscriber>>) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A live subscription's receiving half.
///
/// Dropping it unregisters the subscriber, so the hub's live set never
/// accumulates dead entries regardless of how the connection ends.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Vec<Arrival>>,
    registry: Registry,
}

impl Subscription {
    /// Receive the next pushed frame; `None` once the hub shuts down.
    pub async fn recv(&mut self) -> Option<Vec<Arrival>> {
        self.rx.recv().await
    }

    /// Adapt into a stream of frames for the SSE layer. The guard
    /// travels inside the stream, so client disconnect unregisters.
    pub fn into_stream(self) -> impl Stream<Item = Vec<Arrival>> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.rx.recv().await.map(|frame| (frame, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.id);
    }
}
