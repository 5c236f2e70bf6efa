//! CSV ticket loader.
//!
//! ```csv
//! reservoir_id,date,volume,ticket_id,courier_id
//! cauldron_001,2024-01-05,300.0,TT_20240105_001,courier_01
//! cauldron_002,2024-01-05,120.5,,
//! ```
//!
//! `cauldron_id`, `amount_collected` and `volume_collected` are accepted as
//! column aliases.  `ticket_id` and `courier_id` are optional.

use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::{ReconcileError, ReconcileResult, TicketRecord};

pub fn load_tickets_csv(path: &Path) -> ReconcileResult<Vec<TicketRecord>> {
    let file = std::fs::File::open(path)?;
    load_tickets_reader(file)
}

pub fn load_tickets_reader<R: Read>(reader: R) -> ReconcileResult<Vec<TicketRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    if !headers.iter().any(|h| h == "date") {
        return Err(ReconcileError::Parse(format!(
            "ticket CSV needs a `date` column, found {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut records = Vec::new();
    for (line, row) in csv_reader.deserialize::<TicketRecord>().enumerate() {
        match row {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!(line = line + 2, error = %e, "unparseable ticket row");
                records.push(TicketRecord::default());
            }
        }
    }
    Ok(records)
}
