//! Station directory: base stop id → station metadata.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::DirectoryError;

// Column indices in the MTA Stations.csv export.
const COL_GTFS_STOP_ID: usize = 2;
const COL_STOP_NAME: usize = 5;
const COL_DAYTIME_ROUTES: usize = 7;
const COL_NORTH_LABEL: usize = 11;
const COL_SOUTH_LABEL: usize = 12;

/// One station platform group, keyed by its GTFS base stop id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Base stop id, e.g. "L08".
    pub stop_id: String,

    /// Station name, e.g. "Bedford Av".
    pub name: String,

    /// Routes serving this station during the day.
    pub lines: Vec<String>,

    /// Label for northbound platforms, e.g. "Manhattan".
    pub north_label: String,

    /// Label for southbound platforms, e.g. "Canarsie - Rockaway Pkwy".
    pub south_label: String,
}

/// Immutable lookup from base stop id to station metadata.
///
/// Constructed once at startup and shared as an `Arc`; never mutated
/// afterwards, so readers need no locking.
#[derive(Debug)]
pub struct StationDirectory {
    by_stop: HashMap<String, usize>,
    stations: Vec<Station>,
}

impl StationDirectory {
    /// Load the directory from a `Stations.csv` file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load the directory from any CSV source in the `Stations.csv`
    /// column layout. Rows with too few columns are skipped.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, DirectoryError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut stations = Vec::new();
        let mut by_stop = HashMap::new();

        for record in csv.records() {
            let record = record?;
            if record.len() <= COL_SOUTH_LABEL {
                continue;
            }

            let station = Station {
                stop_id: record[COL_GTFS_STOP_ID].to_string(),
                name: record[COL_STOP_NAME].to_string(),
                lines: record[COL_DAYTIME_ROUTES]
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                north_label: record[COL_NORTH_LABEL].to_string(),
                south_label: record[COL_SOUTH_LABEL].to_string(),
            };

            by_stop.insert(station.stop_id.clone(), stations.len());
            stations.push(station);
        }

        Ok(Self { by_stop, stations })
    }

    /// Look up a station by its base stop id.
    pub fn resolve(&self, stop_id: &str) -> Option<&Station> {
        self.by_stop.get(stop_id).map(|&i| &self.stations[i])
    }

    /// All stations, in file order.
    pub fn all(&self) -> &[Station] {
        &self.stations
    }

    /// Case-insensitive search by station name substring or exact line
    /// match, deduplicated by stop id.
    pub fn search(&self, query: &str) -> Vec<&Station> {
        let query = query.to_lowercase();
        let mut seen = HashSet::new();
        self.stations
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&query)
                    || s.lines.iter().any(|l| l.to_lowercase() == query)
            })
            .filter(|s| seen.insert(s.stop_id.as_str()))
            .collect()
    }

    /// Number of stations in the directory.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
