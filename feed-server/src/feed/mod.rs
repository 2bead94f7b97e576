//! Feed ingestion pipeline: fetch, parse, cache.
//!
//! The fetcher polls every configured GTFS-RT endpoint concurrently,
//! the parser normalizes trip updates into [`Arrival`] values, and the
//! cache holds the latest per-station lists for the web layer.

mod arrival;
mod cache;
mod error;
mod fetcher;
mod parser;

pub use arrival::Arrival;
pub use cache::ArrivalCache;
pub use error::FeedError;
pub use fetcher::FeedFetcher;
pub use parser::parse_feed;
