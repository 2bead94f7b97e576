//! HTTP route handlers.

use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

use crate::stations::Station;

use super::dto::*;
use super::state::AppState;

/// Cadence of comment-only keepalive frames on the stream, to stop
/// intermediaries from closing quiet connections.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/arrivals", get(arrivals))
        .route("/stream", get(stream))
        .route("/stations", get(stations))
        .route("/stations/search", get(search_stations))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Pull path: current arrivals for the requested stops (or all stops),
/// with an explicit staleness flag. Never an error, even mid-outage.
async fn arrivals(
    State(state): State<AppState>,
    Query(query): Query<ArrivalsQuery>,
) -> Json<ArrivalsResponse> {
    let arrivals = match &query.stops {
        None => state.cache.get_all().await,
        Some(raw) => {
            let stops = parse_stop_filter(raw);
            state.cache.get_for_stops(&stops).await
        }
    };

    Json(ArrivalsResponse {
        arrivals,
        stale: state.cache.is_stale().await,
    })
}

/// Push path: subscribe to the broadcast hub and stream filtered
/// arrival frames as server-sent events.
///
/// `stops` is a repeated query parameter. The subscription's drop guard
/// unregisters when the client disconnects.
async fn stream(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stops: HashSet<String> = params
        .into_iter()
        .filter(|(key, _)| key == "stops")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .collect();

    let subscription = state.hub.subscribe(stops).await;
    let stream = subscription.into_stream().map(|frame| {
        let data = serde_json::to_string(&frame).unwrap_or_else(|_| "[]".to_string());
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEPALIVE_INTERVAL)
            .text("keepalive"),
    )
}

/// Full station directory.
async fn stations(State(state): State<AppState>) -> Json<Vec<Station>> {
    Json(state.directory.all().to_vec())
}

/// Station search by name substring or line.
async fn search_stations(
    State(state): State<AppState>,
    Query(query): Query<StationSearchQuery>,
) -> Json<Vec<Station>> {
    let q = query.q.as_deref().unwrap_or("").trim();
    if q.is_empty() {
        return Json(Vec::new());
    }
    Json(state.directory.search(q).into_iter().cloned().collect())
}

/// Parse a comma-separated stop filter, ignoring blanks.
fn parse_stop_filter(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
