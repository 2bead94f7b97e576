//! GTFS-RT payload decoding and normalization.
//!
//! Turns one raw protobuf feed into `base stop id -> [Arrival]`.
//! Only a malformed top-level payload is an error; anything wrong with
//! an individual record (short stop id, unknown station, missing time)
//! skips that record and nothing else.

use std::collections::HashMap;

use chrono::Utc;
use gtfs_rt::FeedMessage;
use prost::Message;

use crate::stations::StationDirectory;

use super::arrival::Arrival;
use super::error::FeedError;

/// Decode one feed payload into per-stop arrival lists.
///
/// Pure apart from reading the clock; events already in the past at
/// decode time are excluded.
pub fn parse_feed(
    bytes: &[u8],
    directory: &StationDirectory,
) -> Result<HashMap<String, Vec<Arrival>>, FeedError> {
    let feed = FeedMessage::decode(bytes)?;
    Ok(collect_arrivals(&feed, directory, Utc::now().timestamp()))
}

/// Walk the decoded feed's trip updates relative to `now` (Unix seconds).
fn collect_arrivals(
    feed: &FeedMessage,
    directory: &StationDirectory,
    now: i64,
) -> HashMap<String, Vec<Arrival>> {
    let mut arrivals: HashMap<String, Vec<Arrival>> = HashMap::new();

    for entity in &feed.entity {
        let Some(update) = &entity.trip_update else {
            continue;
        };

        // Route id may be absent from the trip descriptor; that is not
        // a reason to drop the whole feed.
        let line = update.trip.route_id.clone().unwrap_or_default();

        for stop_time in &update.stop_time_update {
            let Some(raw_id) = stop_time.stop_id.as_deref() else {
                continue;
            };
            if raw_id.len() < 3 {
                continue;
            }

            let (stop_id, direction_code) = split_platform_id(raw_id);

            let Some(station) = directory.resolve(stop_id) else {
                // Feeds reference platforms outside the directory's coverage.
                continue;
            };

            // Prefer the predicted arrival, fall back to departure.
            let event_time = stop_time
                .arrival
                .as_ref()
                .and_then(|e| e.time)
                .or_else(|| stop_time.departure.as_ref().and_then(|e| e.time));
            let Some(event_time) = event_time else {
                continue;
            };
            if event_time < now {
                continue;
            }

            let direction = match direction_code {
                "N" => station.north_label.clone(),
                "S" => station.south_label.clone(),
                _ => String::new(),
            };

            arrivals.entry(stop_id.to_string()).or_default().push(Arrival {
                stop_id: stop_id.to_string(),
                station: station.name.clone(),
                line: line.clone(),
                direction,
                direction_code: direction_code.to_string(),
                minutes: minutes_until(event_time, now),
            });
        }
    }

    arrivals
}

/// Split a platform id like "L08N" into ("L08", "N").
///
/// Only a trailing `N` or `S` is a direction suffix; anything else
/// leaves the whole id as the base with an empty code.
fn split_platform_id(raw: &str) -> (&str, &str) {
    match raw.as_bytes().last() {
        Some(b'N') => (&raw[..raw.len() - 1], "N"),
        Some(b'S') => (&raw[..raw.len() - 1], "S"),
        _ => (raw, ""),
    }
}

/// Minutes from `now` to `event_time`, rounded to nearest.
/// Callers must have already excluded past events.
fn minutes_until(event_time: i64, now: i64) -> u32 {
    ((event_time - now) as f64 / 60.0).round() as u32
}
