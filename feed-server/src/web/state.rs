//! Application state for the web layer.

use std::sync::Arc;

use crate::feed::ArrivalCache;
use crate::hub::BroadcastHub;
use crate::stations::StationDirectory;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Latest arrivals per stop
    pub cache: Arc<ArrivalCache>,

    /// Fan-out hub for stream subscribers
    pub hub: Arc<BroadcastHub>,

    /// Read-only station reference data
    pub directory: Arc<StationDirectory>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        cache: Arc<ArrivalCache>,
        hub: Arc<BroadcastHub>,
        directory: Arc<StationDirectory>,
    ) -> Self {
        Self {
            cache,
            hub,
            directory,
        }
    }
}
