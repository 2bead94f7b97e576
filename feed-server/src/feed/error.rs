//! Feed pipeline error types.

/// Errors from fetching or decoding one feed.
///
/// All variants are scoped to a single feed for a single poll cycle:
/// the fetcher logs them and moves on, it never terminates on one.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status code
    #[error("unexpected status code {0}")]
    Status(u16),

    /// Payload was not a well-formed GTFS-RT message
    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}
