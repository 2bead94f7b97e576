//! Station directory error types.

/// Errors loading the station directory. Only possible at startup,
/// where they are process-fatal.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Could not open the stations file
    #[error("failed to read stations file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV
    #[error("failed to parse stations CSV: {0}")]
    Csv(#[from] csv::Error),
}
