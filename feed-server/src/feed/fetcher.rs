//! Periodic concurrent feed polling.
//!
//! One task drives the fetch/merge/signal cycle: every interval tick it
//! hits each configured endpoint in parallel, joins all of them, merges
//! whatever succeeded, writes the merge into the cache, and pokes the
//! broadcast hub. A feed that fails a cycle contributes nothing and is
//! retried on the next tick; the loop itself never dies on a feed error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::stations::StationDirectory;

use super::arrival::Arrival;
use super::cache::ArrivalCache;
use super::error::FeedError;
use super::parser::parse_feed;

/// Per-request timeout for upstream feed fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Polls all configured GTFS-RT endpoints on a fixed interval.
pub struct FeedFetcher {
    feeds: HashMap<String, String>,
    interval: Duration,
    cache: Arc<ArrivalCache>,
    directory: Arc<StationDirectory>,
    http: reqwest::Client,
    signal: Arc<Notify>,
}

impl FeedFetcher {
    /// Create a fetcher over `feeds` (name → endpoint URL).
    ///
    /// `signal` is the coalescing broadcast notification shared with
    /// the hub; it is poked once per completed cycle.
    pub fn new(
        feeds: HashMap<String, String>,
        interval: Duration,
        cache: Arc<ArrivalCache>,
        directory: Arc<StationDirectory>,
        signal: Arc<Notify>,
    ) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            feeds,
            interval,
            cache,
            directory,
            http,
            signal,
        })
    }

    /// Run until the shutdown signal fires.
    ///
    /// The first cycle starts immediately; cycles never overlap because
    /// the next tick is only awaited after the previous cycle's per-feed
    /// tasks have all been joined.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.fetch_cycle().await,
                _ = shutdown.changed() => {
                    info!("feed fetcher shutting down");
                    return;
                }
            }
        }
    }

    /// One poll cycle: fetch every feed concurrently, join all, merge,
    /// update the cache, signal the hub.
    pub async fn fetch_cycle(&self) {
        let fetches = self.feeds.iter().map(|(name, url)| async move {
            (name.as_str(), self.fetch_one(url).await)
        });
        let results = future::join_all(fetches).await;

        let mut merged: HashMap<String, Vec<Arrival>> = HashMap::new();
        let mut succeeded = 0usize;
        for (name, result) in results {
            match result {
                Ok(parsed) => {
                    succeeded += 1;
                    merge_into(&mut merged, parsed);
                }
                Err(e) => warn!(feed = name, error = %e, "feed fetch failed"),
            }
        }

        debug!(
            feeds = succeeded,
            stops = merged.len(),
            "fetch cycle merged"
        );
        self.cache.update(merged).await;
        self.signal.notify_one();
    }

    async fn fetch_one(&self, url: &str) -> Result<HashMap<String, Vec<Arrival>>, FeedError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        parse_feed(&bytes, &self.directory)
    }
}

/// Union by stop id, concatenating lists from different feeds.
///
/// Feeds cover disjoint line sets, so same-stop collisions are additive;
/// duplicates from genuinely overlapping coverage are preserved as-is.
fn merge_into(
    merged: &mut HashMap<String, Vec<Arrival>>,
    parsed: HashMap<String, Vec<Arrival>>,
) {
    for (stop_id, list) in parsed {
        merged.entry(stop_id).or_default().extend(list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
    use gtfs_rt::{FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate};
    use prost::Message;

    fn arrival(stop_id: &str, line: &str, minutes: u32) -> Arrival {
        Arrival {
            stop_id: stop_id.to_string(),
            station: String::new(),
            line: line.to_string(),
            direction: String::new(),
            direction_code: String::new(),
            minutes,
        }
    }

    #[test]
    fn merge_concatenates_shared_stops() {
        let mut merged = HashMap::new();
        merge_into(
            &mut merged,
            HashMap::from([("R16".to_string(), vec![arrival("R16", "N", 4)])]),
        );
        merge_into(
            &mut merged,
            HashMap::from([
                ("R16".to_string(), vec![arrival("R16", "W", 6)]),
                ("L08".to_string(), vec![arrival("L08", "L", 2)]),
            ]),
        );

        assert_eq!(merged.len(), 2);
        let lines: Vec<&str> = merged["R16"].iter().map(|a| a.line.as_str()).collect();
        assert_eq!(lines, vec!["N", "W"]);
    }

    fn directory() -> Arc<StationDirectory> {
        let csv = "Station ID,Complex ID,GTFS Stop ID,Division,Line,Stop Name,Borough,Daytime Routes,Structure,GTFS Latitude,GTFS Longitude,North Direction Label,South Direction Label\n\
                   120,120,L08,BMT,Canarsie,Bedford Av,Bk,L,Subway,40.7,-73.9,Manhattan,Canarsie - Rockaway Pkwy\n\
                   161,161,A31,IND,8th Av,14 St,M,A C E,Subway,40.7,-74.0,Uptown,Downtown\n";
        Arc::new(StationDirectory::from_reader(csv.as_bytes()).unwrap())
    }

    fn encoded_feed(stop_id: &str, route: &str, seconds_ahead: i64) -> Vec<u8> {
        let now = chrono::Utc::now().timestamp();
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                ..Default::default()
            },
            entity: vec![FeedEntity {
                id: "1".to_string(),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        route_id: Some(route.to_string()),
                        ..Default::default()
                    },
                    stop_time_update: vec![StopTimeUpdate {
                        stop_id: Some(stop_id.to_string()),
                        arrival: Some(StopTimeEvent {
                            time: Some(now + seconds_ahead),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            }],
        };
        feed.encode_to_vec()
    }

    /// Serve fixed bytes on an ephemeral local port.
    async fn serve_bytes(bytes: Vec<u8>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/feed", get(move || async move { bytes.clone() }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/feed")
    }

    #[tokio::test]
    async fn cycle_tolerates_a_failing_feed() {
        let good_url = serve_bytes(encoded_feed("L08N", "L", 300)).await;
        // Nothing listens here; connection refused.
        let bad_url = "http://127.0.0.1:1/feed".to_string();

        let cache = Arc::new(ArrivalCache::new(Duration::from_secs(90)));
        let signal = Arc::new(Notify::new());
        let fetcher = FeedFetcher::new(
            HashMap::from([("L".to_string(), good_url), ("ACE".to_string(), bad_url)]),
            Duration::from_secs(30),
            Arc::clone(&cache),
            directory(),
            Arc::clone(&signal),
        )
        .unwrap();

        fetcher.fetch_cycle().await;

        let all = cache.get_all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].stop_id, "L08");
        assert!(!cache.is_stale().await);
    }

    #[tokio::test]
    async fn failed_feed_leaves_previous_cycle_data_intact() {
        let l_url = serve_bytes(encoded_feed("L08N", "L", 300)).await;
        let ace_url = serve_bytes(encoded_feed("A31S", "A", 600)).await;

        let cache = Arc::new(ArrivalCache::new(Duration::from_secs(90)));
        let signal = Arc::new(Notify::new());

        // Cycle 1: both feeds succeed.
        let fetcher = FeedFetcher::new(
            HashMap::from([
                ("L".to_string(), l_url.clone()),
                ("ACE".to_string(), ace_url),
            ]),
            Duration::from_secs(30),
            Arc::clone(&cache),
            directory(),
            Arc::clone(&signal),
        )
        .unwrap();
        fetcher.fetch_cycle().await;
        assert_eq!(cache.get_all().await.len(), 2);

        // Cycle 2: the ACE feed is down. Its stop must keep cycle 1 data.
        let fetcher = FeedFetcher::new(
            HashMap::from([
                ("L".to_string(), l_url),
                ("ACE".to_string(), "http://127.0.0.1:1/feed".to_string()),
            ]),
            Duration::from_secs(30),
            Arc::clone(&cache),
            directory(),
            signal,
        )
        .unwrap();
        fetcher.fetch_cycle().await;

        let all = cache.get_all().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|a| a.stop_id == "A31"));
    }

    #[tokio::test]
    async fn cycle_signals_the_hub() {
        let url = serve_bytes(encoded_feed("L08N", "L", 300)).await;
        let cache = Arc::new(ArrivalCache::new(Duration::from_secs(90)));
        let signal = Arc::new(Notify::new());
        let fetcher = FeedFetcher::new(
            HashMap::from([("L".to_string(), url)]),
            Duration::from_secs(30),
            cache,
            directory(),
            Arc::clone(&signal),
        )
        .unwrap();

        fetcher.fetch_cycle().await;

        // notify_one left a permit; this must resolve immediately.
        tokio::time::timeout(Duration::from_secs(1), signal.notified())
            .await
            .expect("broadcast signal not raised");
    }
}
