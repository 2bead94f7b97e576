//! Static station reference data.
//!
//! Loaded once at startup from the MTA `Stations.csv` export and shared
//! read-only with the parser and the web layer.

mod directory;
mod error;

pub use directory::{Station, StationDirectory};
pub use error::DirectoryError;
