//! Request and response shapes for the HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::feed::Arrival;

/// Query for `GET /arrivals`.
#[derive(Debug, Deserialize)]
pub struct ArrivalsQuery {
    /// Comma-separated stop ids. Omitted means all stops; present but
    /// empty means an empty filter.
    pub stops: Option<String>,
}

/// Response body for `GET /arrivals`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArrivalsResponse {
    pub arrivals: Vec<Arrival>,

    /// True when the cache has not been refreshed within the expected
    /// interval; consumers should surface aging data rather than hide it.
    pub stale: bool,
}

/// Query for `GET /stations/search`.
#[derive(Debug, Deserialize)]
pub struct StationSearchQuery {
    pub q: Option<String>,
}
