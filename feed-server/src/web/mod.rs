//! HTTP layer: pull queries, the SSE push stream, and station lookups.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
