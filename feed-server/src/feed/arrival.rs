//! The arrival value type.

use serde::{Deserialize, Serialize};

/// A single upcoming train at one station.
///
/// Arrivals are values: constructed once by the parser and never mutated.
/// The JSON field names are a compatibility surface for existing consumers
/// and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Base station identifier (platform direction suffix stripped).
    pub stop_id: String,

    /// Human-readable station name.
    pub station: String,

    /// Route identifier from the trip descriptor (e.g. "L", "6").
    pub line: String,

    /// Human-readable direction label ("Manhattan", "Coney Island", ...).
    pub direction: String,

    /// "N", "S", or "" when the feed's stop id carried no suffix.
    pub direction_code: String,

    /// Minutes until arrival, rounded to nearest, never negative.
    pub minutes: u32,
}
