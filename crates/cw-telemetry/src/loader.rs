//! CSV telemetry loader.
//!
//! # CSV format
//!
//! Long format, one row per reading.  Column aliases from the original
//! exports (`cauldron_id`, `level`) are accepted.
//!
//! ```csv
//! reservoir_id,timestamp,volume
//! cauldron_001,2024-10-30T00:00:00Z,412.5
//! cauldron_001,2024-10-30T00:01:00Z,414.6
//! cauldron_002,2024-10-30T00:00:00+01:00,120.0
//! ```
//!
//! Rows that fail to parse (wrong column type, missing cell) are returned as
//! `TelemetryRecord::default()` placeholders so they are rejected with a
//! reason downstream instead of aborting the file.

use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::{TelemetryError, TelemetryRecord};

/// Load telemetry records from a CSV file.
pub fn load_samples_csv(path: &Path) -> Result<Vec<TelemetryRecord>, TelemetryError> {
    let file = std::fs::File::open(path).map_err(TelemetryError::Io)?;
    load_samples_reader(file)
}

/// Like [`load_samples_csv`] but accepts any `Read` source.
pub fn load_samples_reader<R: Read>(reader: R) -> Result<Vec<TelemetryRecord>, TelemetryError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    if !headers.iter().any(|h| h == "timestamp") {
        return Err(TelemetryError::Parse(format!(
            "telemetry CSV needs a `timestamp` column, found {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut records = Vec::new();
    for (line, row) in csv_reader.deserialize::<TelemetryRecord>().enumerate() {
        match row {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!(line = line + 2, error = %e, "unparseable telemetry row");
                records.push(TelemetryRecord::default());
            }
        }
    }
    Ok(records)
}
